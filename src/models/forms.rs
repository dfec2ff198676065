use serde::Deserialize;

use super::task::{TaskPatch, TaskStatus};
use crate::errors::{AppError, AppResult};

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 100;
const USERNAME_MIN: usize = 3;
const PASSWORD_MIN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> AppResult<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_strong_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        if self.password.chars().count() < PASSWORD_MIN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                PASSWORD_MIN
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
}

impl ProfileForm {
    pub fn validate(&self) -> AppResult<()> {
        validate_username(&self.username)
    }
}

// The role stays a raw string so unknown values surface as InvalidRole rather
// than a body deserialization failure.
#[derive(Debug, Deserialize)]
pub struct ChangeRoleForm {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: Option<TaskStatus>,
}

impl NewTask {
    pub fn validate(&self) -> AppResult<()> {
        validate_title(&self.title)?;
        validate_description(&self.description)
    }
}

impl TaskPatch {
    /// Checks supplied fields only; an empty patch is rejected separately.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

/// Lowercased, trimmed form used as the uniqueness key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_title(title: &str) -> AppResult<()> {
    let len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "Title must be between {} and {} characters",
            TITLE_MIN, TITLE_MAX
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> AppResult<()> {
    if description.is_empty() {
        return Err(AppError::Validation("Description is required".into()));
    }
    Ok(())
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.chars().count() < USERNAME_MIN
        || !username.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AppError::Validation(format!(
            "Username must be alphanumeric and at least {} characters",
            USERNAME_MIN
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .split('.')
                    .all(|label| !label.is_empty())
                && domain.contains('.')
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    Ok(())
}

fn validate_strong_password(password: &str) -> AppResult<()> {
    let strong = password.chars().count() >= PASSWORD_MIN
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_punctuation() || c == ' ');
    if !strong {
        return Err(AppError::Validation(
            "Password must be at least 8 characters with upper and lower case letters, a number and a symbol"
                .into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn registration_rules() {
        assert!(register("alice", "alice@example.com", "Str0ng!pass").validate().is_ok());
        assert!(register("al", "alice@example.com", "Str0ng!pass").validate().is_err());
        assert!(register("al ice", "alice@example.com", "Str0ng!pass").validate().is_err());
        assert!(register("alice", "alice.example.com", "Str0ng!pass").validate().is_err());
        assert!(register("alice", "alice@example", "Str0ng!pass").validate().is_err());
        assert!(register("alice", "alice@example.com", "weakpass").validate().is_err());
        assert!(register("alice", "alice@example.com", "NoSymbol123").validate().is_err());
    }

    #[test]
    fn password_classes_count_ascii_only() {
        assert!(register("alice", "alice@example.com", "Str0ng pass").validate().is_ok());
        // 'É' is not an ASCII uppercase letter
        assert!(register("alice", "alice@example.com", "Éstr0ng!pass").validate().is_err());
        // 'é' and '€' are not ASCII symbols
        assert!(register("alice", "alice@example.com", "Str0ngpassé").validate().is_err());
        assert!(register("alice", "alice@example.com", "Str0ngpass€").validate().is_err());
    }

    #[test]
    fn task_title_length_bounds() {
        let task = |title: &str| NewTask {
            title: title.into(),
            description: "desc".into(),
            status: None,
        };
        assert!(task("abc").validate().is_ok());
        assert!(task(&"x".repeat(100)).validate().is_ok());
        assert!(task("ab").validate().is_err());
        assert!(task(&"x".repeat(101)).validate().is_err());
    }

    #[test]
    fn task_requires_description() {
        let task = NewTask {
            title: "Buy milk".into(),
            description: String::new(),
            status: None,
        };
        assert!(matches!(task.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn patch_validates_supplied_fields_only() {
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..TaskPatch::default()
        };
        assert!(patch.validate().is_ok());

        let patch = TaskPatch {
            title: Some("no".into()),
            ..TaskPatch::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
