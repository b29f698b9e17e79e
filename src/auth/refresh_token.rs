/// Refresh Token Handling
///
/// Renews a token pair from a refresh token. Each call is independent:
///
/// received -> validated -> too early | rejected | reissued
///
/// - received -> validated: signature and expiry only (refresh tokens carry no issuer)
/// - validated -> too early: more than the grace period left before expiry
/// - validated -> rejected: the subject no longer resolves to a user
/// - validated -> reissued: a fresh pair for the same subject

use std::sync::Arc;

use actix_web::cookie::{time::Duration as CookieDuration, time::OffsetDateTime, Cookie, SameSite};
use chrono::Duration;

use crate::auth::claims::{RefreshClaims, TokenPair};
use crate::auth::jwt::TokenCodec;
use crate::configuration::RefreshCookieSettings;
use crate::error::{AppError, AuthError};
use crate::store::CredentialStore;

/// Result of a successful renewal
#[derive(Debug)]
pub struct Reissued {
    pub user_id: i64,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct RefreshHandler {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
    grace_period: Duration,
}

impl RefreshHandler {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn CredentialStore>, grace_period_secs: i64) -> Self {
        Self {
            codec,
            store,
            grace_period: Duration::try_seconds(grace_period_secs).unwrap_or(Duration::MAX),
        }
    }

    pub async fn refresh(&self, token: &str) -> Result<Reissued, AppError> {
        let claims = self.validate(token)?;
        self.check_renewal_window(&claims)?;

        let user_id = claims
            .user_id()
            .map_err(|e| AppError::Auth(AuthError::from_refresh(&e)))?;

        let user = match self.store.user_by_id(user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = user_id, "Refresh for unknown subject");
                return Err(AuthError::UnknownSubject.into());
            }
        };

        let tokens = self.codec.issue_pair(&user)?;

        tracing::info!(user_id = user_id, "Token pair reissued");

        Ok(Reissued { user_id, tokens })
    }

    fn validate(&self, token: &str) -> Result<RefreshClaims, AppError> {
        self.codec.verify_refresh(token).map_err(|e| {
            tracing::warn!(error = %e, "Refresh token rejected");
            AppError::Auth(AuthError::from_refresh(&e))
        })
    }

    fn check_renewal_window(&self, claims: &RefreshClaims) -> Result<(), AppError> {
        let remaining = claims.registered.exp - self.codec.now().timestamp();
        let grace = self.grace_period.num_seconds();
        if remaining > grace {
            return Err(AuthError::TokenNotYetRenewable {
                retry_after: remaining - grace,
            }
            .into());
        }
        Ok(())
    }
}

/// Replacement refresh cookie matching the new refresh token's lifetime
pub fn refresh_cookie(
    settings: &RefreshCookieSettings,
    tokens: &TokenPair,
    lifetime: Duration,
) -> Cookie<'static> {
    let mut builder = Cookie::build(settings.name.clone(), tokens.refresh_token.clone())
        .path(settings.path.clone())
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(lifetime.num_seconds()));

    if let Ok(expires) = OffsetDateTime::from_unix_timestamp(tokens.refresh_expires_at.timestamp()) {
        builder = builder.expires(expires);
    }
    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }

    builder.finish()
}
