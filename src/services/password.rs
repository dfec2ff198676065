use bcrypt::{hash, verify};

use crate::errors::{AppError, AppResult};

/// bcrypt hashing, run on the blocking pool so request tasks only suspend.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: String) -> AppResult<String> {
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash(password.as_bytes(), cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(AppError::from)
    }

    pub async fn verify(&self, password: String, password_hash: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || verify(password.as_bytes(), &password_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
            .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = PasswordHasher::new(4);
        let hashed = hasher.hash("Str0ng!pass".into()).await.unwrap();

        assert_ne!(hashed, "Str0ng!pass");
        assert!(hasher.verify("Str0ng!pass".into(), hashed.clone()).await.unwrap());
        assert!(!hasher.verify("Wr0ng!pass".into(), hashed).await.unwrap());
    }
}
