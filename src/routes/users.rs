use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::AccessClaims;
use crate::error::{AppError, ErrorContext, StoreError};
use crate::store::{CredentialStore, User};

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

async fn find_user(
    store: &dyn CredentialStore,
    user_id: i64,
    context: &ErrorContext,
) -> Result<User, AppError> {
    store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Store(StoreError::NotFound("User not found".to_string())))
        .map_err(|e| {
            context.log_error(&e);
            e
        })
}

/// GET /v1/users/me
///
/// **Requires valid access token**; claims are injected by the Bearer Guard.
///
/// # Errors
/// - 401: Missing or invalid token (handled by the guard)
/// - 404: The token's user no longer exists
pub async fn current_user(
    claims: web::ReqData<AccessClaims>,
    store: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let context = ErrorContext::new("current_user").with_user_id(user_id.to_string());

    let user = find_user(store.get_ref(), user_id, &context).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// GET /v1/users/{id}
///
/// **Requires valid access token**.
///
/// # Errors
/// - 401: Missing or invalid token (handled by the guard)
/// - 404: No user with that id, or a non-numeric id
pub async fn get_user(
    path: web::Path<i64>,
    claims: web::ReqData<AccessClaims>,
    store: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let context = ErrorContext::new("get_user").with_user_id(claims.registered.sub.clone());

    let user = find_user(store.get_ref(), user_id, &context).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
