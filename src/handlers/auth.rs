use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::database::models::{ChangePasswordInput, LoginInput, SignupInput, UserInfo};
use crate::database::repositories::UserRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::auth::Claims;

/// Self-service signup. The account is created inactive; HR approves it
/// before the first login.
pub async fn signup(
    state: web::Data<AppState>,
    input: web::Json<SignupInput>,
) -> Result<HttpResponse, AppError> {
    let user = state.auth_service.signup(input.into_inner()).await?;

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        Some(UserInfo::from(user)),
        "Account created. An HR member will approve it shortly.",
    )))
}

pub async fn login(
    state: web::Data<AppState>,
    input: web::Json<LoginInput>,
) -> Result<HttpResponse, AppError> {
    let response = state.auth_service.login(input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

pub async fn me(
    claims: Claims,
    users: web::Data<UserRepository>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::from(user))))
}

pub async fn change_password(
    claims: Claims,
    state: web::Data<AppState>,
    input: web::Json<ChangePasswordInput>,
) -> Result<HttpResponse, AppError> {
    state
        .auth_service
        .change_password(claims.sub, input.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Password changed.",
    )))
}
