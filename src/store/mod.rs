/// Credential Store
///
/// Read-only access to user records. The authentication core only needs to
/// find a user by email (login) or by id (refresh, profile).

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// A user record as stored by the credential store
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name embedded in access tokens
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
}
