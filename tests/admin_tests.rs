use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

use kintai::database::models::UserRole;
use kintai::handlers::admin;

mod common;

fn admin_routes() -> actix_web::Scope {
    web::scope("/api/v1")
        .service(
            web::scope("/hr/departments")
                .route("", web::post().to(admin::create_department))
                .route("", web::get().to(admin::get_departments))
                .route("/{id}", web::delete().to(admin::delete_department)),
        )
        .service(
            web::scope("/hr/teams")
                .route("", web::post().to(admin::create_team))
                .route("", web::get().to(admin::get_teams)),
        )
        .service(
            web::scope("/hr/users")
                .route("", web::get().to(admin::get_users))
                .route("", web::post().to(admin::create_user))
                .route("/{id}/approve", web::post().to(admin::approve_user)),
        )
}

macro_rules! init_app {
    ($data:expr) => {
        test::init_service(
            App::new()
                .app_data($data.app_state.clone())
                .app_data($data.users.clone())
                .app_data($data.departments.clone())
                .app_data($data.teams.clone())
                .app_data($data.config.clone())
                .service(admin_routes()),
        )
        .await
    };
}

#[actix_web::test]
#[serial]
async fn test_department_list_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::get()
        .uri("/api/v1/hr/departments")
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_department_create_refuses_employees() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Employee);

    let req = test::TestRequest::post()
        .uri("/api/v1/hr/departments")
        .insert_header(common::auth_header(&token))
        .set_json(&json!({ "name": "Engineering" }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_team_list_refuses_managers() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Manager);

    let req = test::TestRequest::get()
        .uri("/api/v1/hr/teams")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
#[serial]
async fn test_user_directory_rejects_invalid_role_filter() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Hr);

    let req = test::TestRequest::get()
        .uri("/api/v1/hr/users?role=superuser")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn test_user_approve_refuses_non_hr() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);
    let token = ctx.token_for(UserRole::Manager);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/hr/users/{}/approve", uuid::Uuid::new_v4()))
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
