use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serial_test::serial;

use kintai::handlers::{auth, notifications};

mod common;

macro_rules! init_app {
    ($data:expr) => {
        test::init_service(
            App::new()
                .app_data($data.app_state.clone())
                .app_data($data.users.clone())
                .app_data($data.notifications.clone())
                .app_data($data.config.clone())
                .service(
                    web::scope("/api/v1")
                        .service(
                            web::scope("/auth")
                                .route("/me", web::get().to(auth::me))
                                .route(
                                    "/change-password",
                                    web::post().to(auth::change_password),
                                ),
                        )
                        .service(
                            web::scope("/notifications")
                                .route("", web::get().to(notifications::get_notifications))
                                .route(
                                    "/unread-count",
                                    web::get().to(notifications::get_unread_count),
                                ),
                        ),
                ),
        )
        .await
    };
}

#[actix_web::test]
#[serial]
async fn test_me_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_change_password_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/change-password")
        .set_json(&serde_json::json!({
            "currentPassword": "old",
            "newPassword": "newpassword"
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_notifications_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications")
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_unread_count_unauthorized() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications/unread-count")
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn test_expired_token_is_rejected() {
    common::setup_test_env();
    let ctx = common::TestContext::new();
    let data = common::build_data(&ctx);
    let app = init_app!(data);

    // Signed with the right secret but already expired.
    let claims = kintai::services::auth::Claims {
        sub: uuid::Uuid::new_v4(),
        username: "ghost".to_string(),
        role: kintai::database::models::UserRole::Employee,
        exp: (chrono::Utc::now() - chrono::Duration::days(1)).timestamp() as usize,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(ctx.config.jwt_secret.as_ref()),
    )
    .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(common::auth_header(&token))
        .to_request();

    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
