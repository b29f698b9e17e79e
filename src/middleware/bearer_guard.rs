/// Bearer Guard
///
/// Validates the access token from the Authorization header and injects
/// the verified claims into request extensions for route handlers.

use actix_web::{
    dev::ServiceRequest,
    http::header::{self, HeaderMap, HeaderValue},
    HttpMessage, HttpResponse, ResponseError,
};
use std::sync::Arc;

use crate::auth::{AccessClaims, TokenCodec};
use crate::error::{AppError, AuthError};
use crate::middleware::Interceptor;

/// Guard for protected scopes
///
/// Every response passing through it carries `Vary: Authorization`.
pub struct BearerGuard {
    codec: Arc<TokenCodec>,
}

impl BearerGuard {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Check a raw Authorization header value.
    pub fn verify(&self, authorization: Option<&str>) -> Result<AccessClaims, AuthError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)?;

        self.codec.verify_access(token).map_err(|e| {
            tracing::warn!(error = %e, "Access token rejected");
            AuthError::from_access(&e)
        })
    }
}

/// Exactly `Bearer <token>`; anything else is treated as no token at all.
fn bearer_token(header: &str) -> Option<&str> {
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Some(*token),
        _ => None,
    }
}

impl Interceptor for BearerGuard {
    fn intercept(&self, req: &ServiceRequest) -> Result<(), HttpResponse> {
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match self.verify(authorization) {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.registered.sub, "Access token verified");
                req.extensions_mut().insert(claims);
                Ok(())
            }
            Err(e) => Err(AppError::Auth(e).error_response()),
        }
    }

    fn decorate(&self, headers: &mut HeaderMap) {
        headers.append(header::VARY, HeaderValue::from_static("Authorization"));
    }
}
