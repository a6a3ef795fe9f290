use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{ApplicationFilter, ApplicationInput, ApplicationStatus};
use crate::database::repositories::UserRepository;
use crate::error::AppError;
use crate::handlers::shared::{ApiResponse, blocked_response, page_bounds, parse_choice};
use crate::services::authorization::ActorContext;
use crate::services::{Outcome, WorkflowService, auth::Claims};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    pub application_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub applicant_name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ApplicationListQuery {
    fn to_filter(&self) -> Result<ApplicationFilter, AppError> {
        Ok(ApplicationFilter {
            status: parse_choice(&self.status).map_err(AppError::Validation)?,
            application_type: parse_choice(&self.application_type).map_err(AppError::Validation)?,
            start_date: self.start_date,
            end_date: self.end_date,
            applicant_name: self.applicant_name.clone().filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SendBackRequest {
    pub reason: String,
}

/// Create a new application; it starts in manager review.
pub async fn create_application(
    claims: Claims,
    workflow: web::Data<WorkflowService>,
    input: web::Json<ApplicationInput>,
) -> Result<HttpResponse, AppError> {
    let application = workflow.submit(claims.sub, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(application)))
}

/// The requester's own applications.
pub async fn get_my_applications(
    claims: Claims,
    workflow: web::Data<WorkflowService>,
    query: web::Query<ApplicationListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.to_filter()?;
    let (limit, offset) = page_bounds(query.page, query.per_page);

    let applications = workflow
        .list_for_applicant(claims.sub, &filter, limit, offset)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(applications)))
}

pub async fn get_my_application(
    claims: Claims,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let application = workflow
        .get_for_applicant(path.into_inner(), claims.sub)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
}

/// Edit an application still in manager review.
pub async fn update_my_application(
    claims: Claims,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
    input: web::Json<ApplicationInput>,
) -> Result<HttpResponse, AppError> {
    match workflow
        .update_by_applicant(path.into_inner(), claims.sub, input.into_inner())
        .await?
    {
        Outcome::Applied(application) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn delete_my_application(
    claims: Claims,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    match workflow
        .delete_by_applicant(path.into_inner(), claims.sub)
        .await?
    {
        Outcome::Applied(()) => Ok(HttpResponse::NoContent().finish()),
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

// Manager review.

pub async fn get_manager_applications(
    claims: Claims,
    users: web::Data<UserRepository>,
    workflow: web::Data<WorkflowService>,
    query: web::Query<ApplicationListQuery>,
) -> Result<HttpResponse, AppError> {
    let actor = manager_context(&claims, &users).await?;
    let filter = query.to_filter()?;
    let (limit, offset) = page_bounds(query.page, query.per_page);

    let applications = workflow
        .list_for_manager(&actor, &filter, limit, offset)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(applications)))
}

pub async fn get_manager_application(
    claims: Claims,
    users: web::Data<UserRepository>,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let actor = manager_context(&claims, &users).await?;
    let application = workflow.get_for_manager(path.into_inner(), &actor).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
}

pub async fn manager_approve_application(
    claims: Claims,
    users: web::Data<UserRepository>,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let actor = manager_context(&claims, &users).await?;
    match workflow.approve_by_manager(path.into_inner(), &actor).await? {
        Outcome::Applied(application) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn manager_reject_application(
    claims: Claims,
    users: web::Data<UserRepository>,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
    body: web::Json<RejectRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = manager_context(&claims, &users).await?;
    match workflow
        .reject(path.into_inner(), &actor, &body.reason)
        .await?
    {
        Outcome::Applied(application) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn manager_send_back_application(
    claims: Claims,
    users: web::Data<UserRepository>,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
    body: web::Json<SendBackRequest>,
) -> Result<HttpResponse, AppError> {
    require_manager(&claims)?;

    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("A send-back reason is required."));
    }

    let actor = ActorContext::load(&claims, &users).await?;
    match workflow
        .send_back(path.into_inner(), &actor, Some(reason.to_string()), false)
        .await?
    {
        Outcome::Applied(application) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

// HR review.

pub async fn get_hr_applications(
    claims: Claims,
    workflow: web::Data<WorkflowService>,
    query: web::Query<ApplicationListQuery>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let filter = query.to_filter()?;
    let (limit, offset) = page_bounds(query.page, query.per_page);

    let applications = workflow.list_for_hr(&filter, limit, offset).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(applications)))
}

pub async fn get_hr_application(
    claims: Claims,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let application = workflow.get_for_hr(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
}

pub async fn hr_approve_application(
    claims: Claims,
    users: web::Data<UserRepository>,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let actor = ActorContext::load(&claims, &users).await?;

    match workflow.approve_by_hr(path.into_inner(), &actor).await? {
        Outcome::Applied(application) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

/// HR send-back: an approved application has its approval cancelled and
/// returns to HR review; anything earlier returns to manager review.
pub async fn hr_send_back_application(
    claims: Claims,
    users: web::Data<UserRepository>,
    workflow: web::Data<WorkflowService>,
    path: web::Path<Uuid>,
    body: web::Json<SendBackRequest>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;

    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("A send-back reason is required."));
    }

    let actor = ActorContext::load(&claims, &users).await?;
    let id = path.into_inner();
    let current = workflow.get_for_hr(id).await?;
    let cancel_approval = current.status == ApplicationStatus::Approved;

    match workflow
        .send_back(id, &actor, Some(reason.to_string()), cancel_approval)
        .await?
    {
        Outcome::Applied(application) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(application)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

fn require_hr(claims: &Claims) -> Result<(), AppError> {
    if claims.is_hr() {
        Ok(())
    } else {
        Err(AppError::forbidden("HR role required."))
    }
}

fn require_manager(claims: &Claims) -> Result<(), AppError> {
    if claims.is_manager() {
        Ok(())
    } else {
        Err(AppError::forbidden("Manager role required."))
    }
}

async fn manager_context(
    claims: &Claims,
    users: &UserRepository,
) -> Result<ActorContext, AppError> {
    require_manager(claims)?;
    Ok(ActorContext::load(claims, users).await?)
}
