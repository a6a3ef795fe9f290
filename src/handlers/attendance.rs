use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{
    AttendanceFilter, AttendanceInput, AttendanceRecord, BreakRecord, DailyAttendanceEntry,
};
use crate::database::repositories::UserRepository;
use crate::error::AppError;
use crate::handlers::shared::{ApiResponse, blocked_response, page_bounds, parse_choice};
use crate::services::authorization::ActorContext;
use crate::services::{AttendanceService, Outcome, auth::Claims};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListQuery {
    pub q: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub read_status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl AttendanceListQuery {
    fn to_filter(&self, with_query: bool) -> Result<AttendanceFilter, AppError> {
        Ok(AttendanceFilter {
            query: if with_query {
                self.q.clone().filter(|s| !s.is_empty())
            } else {
                None
            },
            start_date: self.start_date,
            end_date: self.end_date,
            read_status: parse_choice(&self.read_status).map_err(AppError::Validation)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOverviewQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub record: Option<AttendanceRecord>,
    pub active_break: Option<BreakRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListData {
    pub records: Vec<AttendanceRecord>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDetailData {
    pub record: AttendanceRecord,
    pub breaks: Vec<BreakRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOverviewData {
    pub date: NaiveDate,
    pub entries: Vec<DailyAttendanceEntry>,
    pub unread_count: i64,
}

/// Today's record plus the break in progress, for the punch screen.
pub async fn get_dashboard(
    claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    let (record, active_break) = service.dashboard(claims.sub).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(DashboardData {
        record,
        active_break,
    })))
}

pub async fn clock_in(
    claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    match service.clock_in(claims.sub).await? {
        Outcome::Applied(record) => Ok(HttpResponse::Ok().json(ApiResponse::success(record))),
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn clock_out(
    claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    match service.clock_out(claims.sub).await? {
        Outcome::Applied(record) => Ok(HttpResponse::Ok().json(ApiResponse::success(record))),
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn start_break(
    claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    match service.start_break(claims.sub).await? {
        Outcome::Applied(break_record) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(break_record)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn end_break(
    claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    match service.end_break(claims.sub).await? {
        Outcome::Applied(break_record) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(break_record)))
        }
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn update_note(
    claims: Claims,
    service: web::Data<AttendanceService>,
    body: web::Json<NoteRequest>,
) -> Result<HttpResponse, AppError> {
    let record = service.update_note(claims.sub, &body.note).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

pub async fn get_my_records(
    claims: Claims,
    service: web::Data<AttendanceService>,
    query: web::Query<AttendanceListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.to_filter(false)?;
    let (limit, offset) = page_bounds(query.page, query.per_page);

    let records = service.list_own(claims.sub, &filter, limit, offset).await?;
    let unread_count = service.own_unread_count(claims.sub).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AttendanceListData {
        records,
        unread_count,
    })))
}

pub async fn get_my_record(
    claims: Claims,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (record, breaks) = service.get_own_record(path.into_inner(), claims.sub).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(AttendanceDetailData { record, breaks })))
}

// Manager overview.

pub async fn get_daily_overview(
    claims: Claims,
    users: web::Data<UserRepository>,
    service: web::Data<AttendanceService>,
    query: web::Query<DailyOverviewQuery>,
) -> Result<HttpResponse, AppError> {
    if !claims.is_manager() {
        return Err(AppError::forbidden("Manager role required."));
    }
    let actor = ActorContext::load(&claims, &users).await?;

    let date = query.date.unwrap_or_else(|| service.today());
    let submission = parse_choice(&query.status).map_err(AppError::Validation)?;
    let (limit, offset) = page_bounds(query.page, query.per_page);

    let entries = service
        .daily_overview(&actor.managed_departments, date, submission, limit, offset)
        .await?;
    let unread_count = service
        .daily_unread_count(&actor.managed_departments, date)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(DailyOverviewData {
        date,
        entries,
        unread_count,
    })))
}

// HR ledger maintenance.

pub async fn get_hr_records(
    claims: Claims,
    service: web::Data<AttendanceService>,
    query: web::Query<AttendanceListQuery>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let filter = query.to_filter(true)?;
    let (limit, offset) = page_bounds(query.page, query.per_page);

    let records = service.hr_list(&filter, limit, offset).await?;
    let unread_count = service.hr_unread_count().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AttendanceListData {
        records,
        unread_count,
    })))
}

pub async fn create_hr_record(
    claims: Claims,
    service: web::Data<AttendanceService>,
    input: web::Json<AttendanceInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let record = service.hr_create(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(record)))
}

pub async fn get_hr_record(
    claims: Claims,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    let (record, breaks) = service.hr_get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(AttendanceDetailData { record, breaks })))
}

pub async fn update_hr_record(
    claims: Claims,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
    input: web::Json<AttendanceInput>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    match service.hr_update(path.into_inner(), input.into_inner()).await? {
        Outcome::Applied(record) => Ok(HttpResponse::Ok().json(ApiResponse::success(record))),
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn delete_hr_record(
    claims: Claims,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    match service.hr_delete(path.into_inner()).await? {
        Outcome::Applied(()) => Ok(HttpResponse::NoContent().finish()),
        Outcome::Blocked(message) => Ok(blocked_response(message)),
    }
}

pub async fn mark_record_read(
    claims: Claims,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    service.mark_read(path.into_inner(), claims.sub).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Record confirmed.",
    )))
}

pub async fn unmark_record_read(
    claims: Claims,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    require_hr(&claims)?;
    service.unmark_read(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Record reopened.",
    )))
}

fn require_hr(claims: &Claims) -> Result<(), AppError> {
    if claims.is_hr() {
        Ok(())
    } else {
        Err(AppError::forbidden("HR role required."))
    }
}
