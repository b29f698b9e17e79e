/// Session Issuer
///
/// Turns a login payload into a token pair. Every credential failure (unknown
/// email, wrong password, unusable stored hash) collapses into the same
/// `InvalidCredentials` outcome.

use std::sync::Arc;

use serde::Deserialize;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::{verify_password, DecoyHash};
use crate::auth::TokenPair;
use crate::error::{AppError, AuthError};
use crate::store::{CredentialStore, User};

/// Login payload; transient and never persisted
#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_json(payload: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(payload).map_err(|_| AuthError::UndecodablePayload)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Issued session: the authenticated user and their new tokens
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionIssuer {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    decoy: Arc<DecoyHash>,
}

impl SessionIssuer {
    /// `password_hash_cost` must be the bcrypt cost of the stored hashes.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: Arc<TokenCodec>,
        password_hash_cost: u32,
    ) -> Self {
        Self {
            store,
            codec,
            decoy: Arc::new(DecoyHash::new(password_hash_cost)),
        }
    }

    /// Decode a JSON login payload and authenticate it.
    pub async fn authenticate_payload(&self, payload: &[u8]) -> Result<Session, AppError> {
        let credentials = Credentials::from_json(payload)?;
        self.authenticate(credentials).await
    }

    pub async fn authenticate(&self, credentials: Credentials) -> Result<Session, AppError> {
        let Credentials { email, password } = credentials;

        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials.into());
        }

        let user = self.store.user_by_email(&email).await?;

        let user = match user {
            Some(user) => user,
            None => {
                let decoy = self.decoy.clone();
                run_blocking(move || decoy.verify(&password)).await?;
                tracing::debug!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let stored_hash = user.password_hash.clone();
        let matches = run_blocking(move || verify_password(&password, &stored_hash)).await?;
        match matches {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(user_id = user.id, "Password mismatch");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "Stored password hash unusable");
                return Err(AuthError::InvalidCredentials.into());
            }
        }

        let tokens = self.codec.issue_pair(&user)?;

        tracing::info!(user_id = user.id, "User authenticated");

        Ok(Session { user, tokens })
    }
}

/// bcrypt is CPU-bound; keep it off the async workers.
async fn run_blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))
}
