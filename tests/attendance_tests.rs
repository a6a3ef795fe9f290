use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

use kintai::database::models::UserRole;
use kintai::handlers::attendance;

mod common;

fn attendance_routes() -> actix_web::Scope {
    web::scope("/api/v1")
        .service(
            web::scope("/attendance")
                .route("/dashboard", web::get().to(attendance::get_dashboard))
                .route("/clock-in", web::post().to(attendance::clock_in))
                .route("/clock-out", web::post().to(attendance::clock_out))
                .route("/break/start", web::post().to(attendance::start_break))
                .route("/break/end", web::post().to(attendance::end_break))
                .route("/note", web::put().to(attendance::update_note))
                .route("/records", web::get().to(attendance::get_my_records)),
        )
        .service(
            web::scope("/manager/attendance")
                .route("/daily", web::get().to(attendance::get_daily_overview)),
        )
        .service(
            web::scope("/hr/attendance")
                .route("", web::get().to(attendance::get_hr_records))
                .route("", web::post().to(attendance::create_hr_record))
                .route("/{id}", web::put().to(attendance::update_hr_record))
                .route("/{id}", web::delete().to(attendance::delete_hr_record))
                .route("/{id}/mark-read", web::post().to(attendance::mark_record_read)),
        )
}

macro_rules! init_app {
    ($data:expr) => {
        test::init_service(
            App::new()
                .app_data($data.users.clone())
                .app_data($data.attendance.clone())
                .app_data($data.config.clone())
                .service(attendance_routes()),
        )
        .await
    };
}

#[actix_web::test]
#[serial]
async fn test_clock_in_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/clock-in")
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_dashboard_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::get()
        .uri("/api/v1/attendance/dashboard")
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_my_records_reject_invalid_read_status() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::get()
        .uri("/api/v1/attendance/records?readStatus=archived")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_daily_overview_refuses_employees() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::get()
        .uri("/api/v1/manager/attendance/daily")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_hr_ledger_refuses_employees() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::get()
        .uri("/api/v1/hr/attendance")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_hr_create_refuses_managers() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Manager);

    let req = test::TestRequest::post()
        .uri("/api/v1/hr/attendance")
        .insert_header(common::auth_header(&token))
        .set_json(&json!({
            "userId": uuid::Uuid::new_v4(),
            "date": "2024-06-03"
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_mark_read_refuses_non_hr() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Manager);

    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/v1/hr/attendance/{}/mark-read",
            uuid::Uuid::new_v4()
        ))
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
