use async_trait::async_trait;

use super::{CredentialStore, User};
use crate::error::AppError;

/// Fixed set of users, built once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    users: Vec<User>,
}

impl InMemoryCredentialStore {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, email: &str) -> User {
        User {
            id,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lookup_by_email_and_id() {
        let store = InMemoryCredentialStore::default()
            .with_user(user(1, "admin@example.com"))
            .with_user(user(2, "other@example.com"));

        let found = store.user_by_email("other@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(2));

        let found = store.user_by_id(1).await.unwrap();
        assert_eq!(found.map(|u| u.email), Some("admin@example.com".to_string()));

        assert!(store.user_by_email("missing@example.com").await.unwrap().is_none());
        assert!(store.user_by_id(99).await.unwrap().is_none());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(user(1, "a@b.c").display_name(), "Test User");
    }
}
