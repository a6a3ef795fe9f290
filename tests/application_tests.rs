use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

use kintai::database::models::UserRole;
use kintai::handlers::applications;

mod common;

fn application_routes() -> actix_web::Scope {
    web::scope("/api/v1")
        .service(
            web::scope("/applications")
                .route("", web::post().to(applications::create_application))
                .route("", web::get().to(applications::get_my_applications))
                .route("/{id}", web::get().to(applications::get_my_application))
                .route("/{id}", web::put().to(applications::update_my_application))
                .route("/{id}", web::delete().to(applications::delete_my_application)),
        )
        .service(
            web::scope("/manager/applications")
                .route("", web::get().to(applications::get_manager_applications))
                .route(
                    "/{id}/approve",
                    web::post().to(applications::manager_approve_application),
                )
                .route(
                    "/{id}/reject",
                    web::post().to(applications::manager_reject_application),
                )
                .route(
                    "/{id}/send-back",
                    web::post().to(applications::manager_send_back_application),
                ),
        )
        .service(
            web::scope("/hr/applications")
                .route("", web::get().to(applications::get_hr_applications))
                .route(
                    "/{id}/approve",
                    web::post().to(applications::hr_approve_application),
                )
                .route(
                    "/{id}/send-back",
                    web::post().to(applications::hr_send_back_application),
                ),
        )
}

macro_rules! init_app {
    ($data:expr) => {
        test::init_service(
            App::new()
                .app_data($data.app_state.clone())
                .app_data($data.users.clone())
                .app_data($data.workflow.clone())
                .app_data($data.config.clone())
                .service(application_routes()),
        )
        .await
    };
}

#[actix_web::test]
#[serial]
async fn test_create_application_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::post()
        .uri("/api/v1/applications")
        .set_json(&json!({
            "applicationType": "paid_leave",
            "startAt": "2024-06-10T00:00:00Z",
            "reason": "Vacation"
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_garbage_token_is_rejected() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::get()
        .uri("/api/v1/applications")
        .insert_header(common::auth_header("not-a-jwt"))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_create_application_requires_reason() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::post()
        .uri("/api/v1/applications")
        .insert_header(common::auth_header(&token))
        .set_json(&json!({
            "applicationType": "paid_leave",
            "startAt": "2024-06-10T00:00:00Z",
            "reason": "   "
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_create_application_rejects_inverted_range() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::post()
        .uri("/api/v1/applications")
        .insert_header(common::auth_header(&token))
        .set_json(&json!({
            "applicationType": "business_trip",
            "startAt": "2024-06-10T09:00:00Z",
            "endAt": "2024-06-09T09:00:00Z",
            "reason": "Client visit"
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_list_rejects_invalid_status_filter() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::get()
        .uri("/api/v1/applications?status=bogus")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_manager_queue_refuses_employees() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::get()
        .uri("/api/v1/manager/applications")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_hr_queue_refuses_managers() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Manager);

    let req = test::TestRequest::get()
        .uri("/api/v1/hr/applications")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_manager_send_back_requires_reason() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Manager);

    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/v1/manager/applications/{}/send-back",
            uuid::Uuid::new_v4()
        ))
        .insert_header(common::auth_header(&token))
        .set_json(&json!({ "reason": "  " }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_hr_send_back_requires_reason() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Hr);

    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/v1/hr/applications/{}/send-back",
            uuid::Uuid::new_v4()
        ))
        .insert_header(common::auth_header(&token))
        .set_json(&json!({ "reason": "" }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_approve_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/v1/manager/applications/{}/approve",
            uuid::Uuid::new_v4()
        ))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
