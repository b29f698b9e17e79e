/// Error Handling Module
///
/// Unified error handling for the authentication service:
/// 1. Token codec failures (what exactly went wrong with a token)
/// 2. Authentication outcomes (what the client is allowed to learn)
/// 3. Credential store and validation errors
/// 4. HTTP response mapping with structured logging
///
/// No internal error string is ever serialized into a response body.

use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Failures of the token codec, one per verification step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not three base64url segments, undecodable header/payload, or missing claims
    Malformed,
    /// Header declares `none` or an algorithm outside the HMAC family
    UnsupportedAlgorithm(String),
    SignatureInvalid,
    Expired,
    /// Issuer or audience does not name this service
    WrongIssuer,
    /// Claims could not be serialized or signed
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::UnsupportedAlgorithm(alg) => {
                write!(f, "token uses unsupported signing algorithm {}", alg)
            }
            TokenError::SignatureInvalid => write!(f, "token signature is invalid"),
            TokenError::Expired => write!(f, "token is expired"),
            TokenError::WrongIssuer => write!(f, "token was issued for another service"),
            TokenError::Signing(msg) => write!(f, "token signing failed: {}", msg),
        }
    }
}

impl StdError for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm("unknown".to_string())
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => TokenError::WrongIssuer,
            _ => TokenError::Malformed,
        }
    }
}

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
        }
    }
}

impl StdError for ValidationError {}

/// Credential store errors
#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Query(String),
    Connection(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::Query(msg) => write!(f, "Query error: {}", msg),
            StoreError::Connection(msg) => write!(f, "Credential store connection error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

/// Authentication and authorization errors
///
/// These are the outcomes a client may observe. Token failures are folded
/// into them depending on where the token was presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    UndecodablePayload,
    InvalidCredentials,
    /// Authorization header missing or not of the form `Bearer <token>`
    MissingToken,
    TokenExpired,
    TokenInvalid,
    WrongIssuer,
    RefreshTokenInvalid,
    TokenNotYetRenewable { retry_after: i64 },
    UnknownSubject,
}

impl AuthError {
    /// Outcome of a failed access-token check on a protected route.
    pub fn from_access(err: &TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::WrongIssuer => AuthError::WrongIssuer,
            _ => AuthError::TokenInvalid,
        }
    }

    /// Outcome of a failed refresh-token check.
    pub fn from_refresh(err: &TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            _ => AuthError::RefreshTokenInvalid,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::UndecodablePayload => write!(f, "Authentication payload could not be decoded"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MissingToken => write!(f, "Missing or invalid authorization header"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::WrongIssuer => write!(f, "Token issuer mismatch"),
            AuthError::RefreshTokenInvalid => write!(f, "Invalid refresh token"),
            AuthError::TokenNotYetRenewable { retry_after } => {
                write!(f, "Refresh token not yet renewable, retry in {}s", retry_after)
            }
            AuthError::UnknownSubject => write!(f, "Refresh token subject is unknown"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Store(StoreError),
    Auth(AuthError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

/// Signing failures are internal; every other token failure reads as an invalid token.
impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => AppError::Internal(msg),
            other => AppError::Auth(AuthError::from_access(&other)),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                AppError::Store(StoreError::NotFound("Record not found".to_string()))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Store(StoreError::Connection(err.to_string()))
            }
            other => AppError::Store(StoreError::Query(other.to_string())),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// 425 Too Early
pub fn too_early() -> StatusCode {
    StatusCode::from_u16(425).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Request is missing required data",
            ),

            AppError::Store(e) => match e {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found"),
                StoreError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Credential store temporarily unavailable",
                ),
                StoreError::Query(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Internal server error",
                ),
            },

            AppError::Auth(e) => match e {
                AuthError::UndecodablePayload => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_PAYLOAD",
                    "Invalid credentials",
                ),
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Invalid credentials",
                ),
                AuthError::MissingToken => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Missing or invalid authorization header",
                ),
                AuthError::TokenExpired => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_EXPIRED",
                    "Token has expired",
                ),
                AuthError::TokenInvalid | AuthError::WrongIssuer => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid token",
                ),
                AuthError::RefreshTokenInvalid => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_REFRESH_TOKEN",
                    "Invalid refresh token",
                ),
                AuthError::TokenNotYetRenewable { .. } => (
                    too_early(),
                    "TOO_EARLY",
                    "Token is not yet eligible for renewal",
                ),
                AuthError::UnknownSubject => (
                    StatusCode::BAD_REQUEST,
                    "UNKNOWN_SUBJECT",
                    "Invalid refresh token",
                ),
            },

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.classify();

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message.to_string(),
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Store(StoreError::NotFound(_)) => {
                tracing::info!(request_id = request_id, error = %self, "Record not found");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Credential store error");
            }
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials | AuthError::UndecodablePayload => {
                    tracing::warn!(request_id = request_id, error = %e, "Invalid credentials attempt");
                }
                AuthError::TokenNotYetRenewable { .. } => {
                    tracing::info!(request_id = request_id, error = %e, "Early refresh attempt");
                }
                _ => {
                    tracing::warn!(request_id = request_id, error = %e, "Authentication error");
                }
            },
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        let mut builder = HttpResponse::build(status);
        if let AppError::Auth(AuthError::TokenNotYetRenewable { retry_after }) = self {
            builder.insert_header((header::RETRY_AFTER, (*retry_after).max(1).to_string()));
        }
        builder.json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Store(_) | AppError::Internal(_) => {
                tracing::error!(error = %error, context = ?context, "Operation failed");
            }
            _ => {
                tracing::warn!(error = %error, context = ?context, "Operation rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn test_token_error_display() {
        assert_eq!(TokenError::Expired.to_string(), "token is expired");
        assert_eq!(
            TokenError::UnsupportedAlgorithm("none".to_string()).to_string(),
            "token uses unsupported signing algorithm none"
        );
    }

    #[test]
    fn test_access_context_mapping() {
        assert_eq!(AuthError::from_access(&TokenError::Expired), AuthError::TokenExpired);
        assert_eq!(AuthError::from_access(&TokenError::WrongIssuer), AuthError::WrongIssuer);
        assert_eq!(
            AuthError::from_access(&TokenError::SignatureInvalid),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn test_refresh_context_mapping() {
        assert_eq!(AuthError::from_refresh(&TokenError::Expired), AuthError::TokenExpired);
        assert_eq!(
            AuthError::from_refresh(&TokenError::Malformed),
            AuthError::RefreshTokenInvalid
        );
    }

    #[test]
    fn test_signing_failure_is_internal() {
        let err: AppError = TokenError::Signing("boom".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (AppError::Auth(AuthError::InvalidCredentials), 401),
            (AppError::Auth(AuthError::UndecodablePayload), 401),
            (AppError::Auth(AuthError::MissingToken), 401),
            (AppError::Auth(AuthError::TokenExpired), 401),
            (AppError::Auth(AuthError::WrongIssuer), 401),
            (AppError::Auth(AuthError::RefreshTokenInvalid), 400),
            (AppError::Auth(AuthError::TokenNotYetRenewable { retry_after: 10 }), 425),
            (AppError::Auth(AuthError::UnknownSubject), 400),
            (AppError::Store(StoreError::NotFound("user".to_string())), 404),
            (AppError::Validation(ValidationError::EmptyField("refresh_token".to_string())), 400),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "wrong status for {}", err);
        }
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = AppError::Internal("secret key material".to_string());
        let response = ResponseError::error_response(&err);
        let body = response.into_body().try_into_bytes().unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret key material"));
        assert!(text.contains("INTERNAL_ERROR"));
    }

    #[test]
    fn test_too_early_sets_retry_after() {
        let err = AppError::Auth(AuthError::TokenNotYetRenewable { retry_after: 42 });
        let response = ResponseError::error_response(&err);
        assert_eq!(response.status().as_u16(), 425);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap().to_str().unwrap(),
            "42"
        );
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("token_refresh");
        assert_eq!(ctx.operation, "token_refresh");
        assert!(ctx.user_id.is_none());

        let ctx_with_user = ctx.with_user_id("7".to_string());
        assert_eq!(ctx_with_user.user_id, Some("7".to_string()));
    }
}
