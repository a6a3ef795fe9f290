use actix_web::{HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{
    CreateUserInput, DepartmentInput, TeamInput, UpdateUserInput, UserFilter, UserInfo,
};
use crate::database::repositories::{DepartmentRepository, TeamRepository, UserRepository};
use crate::error::AppError;
use crate::handlers::shared::{ApiResponse, page_bounds, parse_choice};
use crate::services::auth::Claims;

// Every handler here is HR-only; the organization directory and the user
// directory are reference data maintained by HR.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub department: Option<Uuid>,
    pub approval: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListData {
    pub users: Vec<UserInfo>,
    pub unapproved_count: i64,
}

// Departments.

pub async fn create_department(
    claims: Claims,
    departments: web::Data<DepartmentRepository>,
    input: web::Json<DepartmentInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let department = departments.create(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(department)))
}

pub async fn get_departments(
    claims: Claims,
    departments: web::Data<DepartmentRepository>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let all = departments.list().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(all)))
}

pub async fn get_department(
    claims: Claims,
    departments: web::Data<DepartmentRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let department = departments
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(department)))
}

pub async fn update_department(
    claims: Claims,
    departments: web::Data<DepartmentRepository>,
    path: web::Path<Uuid>,
    input: web::Json<DepartmentInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let department = departments
        .update(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(department)))
}

pub async fn delete_department(
    claims: Claims,
    departments: web::Data<DepartmentRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    departments
        .delete(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;
    Ok(HttpResponse::NoContent().finish())
}

// Teams.

pub async fn create_team(
    claims: Claims,
    teams: web::Data<TeamRepository>,
    input: web::Json<TeamInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let team = teams.create(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(team)))
}

pub async fn get_teams(
    claims: Claims,
    teams: web::Data<TeamRepository>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let all = teams.list().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(all)))
}

pub async fn get_team(
    claims: Claims,
    teams: web::Data<TeamRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let team = teams
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(team)))
}

pub async fn update_team(
    claims: Claims,
    teams: web::Data<TeamRepository>,
    path: web::Path<Uuid>,
    input: web::Json<TeamInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let team = teams
        .update(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(team)))
}

pub async fn delete_team(
    claims: Claims,
    teams: web::Data<TeamRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    teams
        .delete(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;
    Ok(HttpResponse::NoContent().finish())
}

// User directory.

pub async fn get_users(
    claims: Claims,
    users: web::Data<UserRepository>,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;

    let filter = UserFilter {
        query: query.q.clone().filter(|s| !s.is_empty()),
        role: parse_choice(&query.role).map_err(AppError::Validation)?,
        department_id: query.department,
        approval: parse_choice(&query.approval).map_err(AppError::Validation)?,
    };
    let (limit, offset) = page_bounds(query.page, query.per_page);

    let listed = users.list(&filter, limit, offset).await?;
    let unapproved_count = users.unapproved_count().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(UserListData {
        users: listed.into_iter().map(UserInfo::from).collect(),
        unapproved_count,
    })))
}

pub async fn create_user(
    claims: Claims,
    state: web::Data<AppState>,
    input: web::Json<CreateUserInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let user = state.auth_service.create_user(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(UserInfo::from(user))))
}

pub async fn get_user(
    claims: Claims,
    users: web::Data<UserRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let user = users
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::from(user))))
}

pub async fn update_user(
    claims: Claims,
    users: web::Data<UserRepository>,
    path: web::Path<Uuid>,
    input: web::Json<UpdateUserInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let user = users
        .update(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::from(user))))
}

pub async fn delete_user(
    claims: Claims,
    users: web::Data<UserRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    users
        .delete(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::NoContent().finish())
}

/// Activates a self-registered account so it can log in.
pub async fn approve_user(
    claims: Claims,
    users: web::Data<UserRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;

    let id = path.into_inner();
    users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let message = if users.activate(id).await? {
        "User approved."
    } else {
        "User is already approved."
    };

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(None, message)))
}

fn require_hr(claims: &Claims) -> Result<(), AppError> {
    if claims.is_hr() {
        Ok(())
    } else {
        Err(AppError::forbidden("HR role required."))
    }
}
