mod forms;
mod task;
mod user;

pub use forms::{normalize_email, ChangeRoleForm, LoginForm, NewTask, ProfileForm, RegisterForm};
pub use task::{Task, TaskPatch, TaskStatus, TaskWithOwner};
pub use user::{OwnerSummary, Role, User, UserProfile};
