mod auth;
mod health_check;
mod users;

pub use auth::{login, refresh, AuthResponse, RefreshForm};
pub use health_check::health_check;
pub use users::{current_user, get_user, UserResponse};
