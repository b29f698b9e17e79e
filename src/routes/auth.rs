/// Authentication Routes
///
/// Login with email/password and silent renewal of the token pair.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{refresh_cookie, RefreshHandler, SessionIssuer, TokenCodec, TokenPair};
use crate::configuration::RefreshCookieSettings;
use crate::error::{AppError, ErrorContext, ValidationError};

/// Token refresh form
#[derive(Deserialize)]
pub struct RefreshForm {
    pub refresh_token: Option<String>,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(tokens: TokenPair, codec: &TokenCodec) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: codec.access_ttl().num_seconds(),
        }
    }
}

/// POST /v1/auth
///
/// Authenticate with a JSON `{email, password}` body.
///
/// # Errors
/// - 401: Undecodable body, unknown email or wrong password (same message)
/// - 500: Token signing failure
pub async fn login(
    body: web::Bytes,
    issuer: web::Data<SessionIssuer>,
    codec: web::Data<TokenCodec>,
    cookie_settings: web::Data<RefreshCookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let session = issuer.authenticate_payload(&body).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %session.user.id,
        "User logged in successfully"
    );

    let mut response = HttpResponse::Ok();
    if cookie_settings.enabled {
        response.cookie(refresh_cookie(
            &cookie_settings,
            &session.tokens,
            codec.refresh_ttl(),
        ));
    }

    Ok(response.json(AuthResponse::new(session.tokens, &codec)))
}

/// POST /v1/refresh, POST /v1/refresh-token
///
/// Renew the token pair from a refresh token sent as the `refresh_token`
/// form field or in the refresh cookie. The form field wins when both are
/// present.
///
/// # Errors
/// - 400: No token, malformed or forged token, unknown user
/// - 401: Refresh token expired
/// - 425: Refresh token not yet inside the renewal window (`Retry-After` set)
pub async fn refresh(
    req: HttpRequest,
    form: Option<web::Form<RefreshForm>>,
    handler: web::Data<RefreshHandler>,
    codec: web::Data<TokenCodec>,
    cookie_settings: web::Data<RefreshCookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let from_form = form
        .and_then(|f| f.into_inner().refresh_token)
        .filter(|t| !t.is_empty());
    let (token, via_cookie) = match from_form {
        Some(token) => (token, false),
        None => match req.cookie(&cookie_settings.name) {
            Some(cookie) if !cookie.value().is_empty() => (cookie.value().to_string(), true),
            _ => {
                return Err(ValidationError::EmptyField("refresh_token".to_string()).into());
            }
        },
    };

    let reissued = handler.refresh(&token).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %reissued.user_id,
        via_cookie,
        "Token refreshed successfully"
    );

    let mut response = HttpResponse::Ok();
    if cookie_settings.enabled || via_cookie {
        response.cookie(refresh_cookie(
            &cookie_settings,
            &reissued.tokens,
            codec.refresh_ttl(),
        ));
    }

    Ok(response.json(AuthResponse::new(reissued.tokens, &codec)))
}
