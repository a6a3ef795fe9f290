use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use anyhow::Result;

use kintai::database::{
    init_database,
    repositories::{
        ApplicationRepository, AttendanceRepository, DepartmentRepository, NotificationRepository,
        TeamRepository, UserRepository,
    },
};
use kintai::handlers::{admin, applications, attendance, auth, notifications};
use kintai::middleware::RequestId;
use kintai::services::{
    AttendanceService, AuthService, Clock, Notifier, SystemClock, WorkflowService,
};
use kintai::{AppState, Config};

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("Kintai API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    log::info!("Configuration loaded (environment: {})", config.environment);

    let pool = init_database(&config.database_url).await?;
    log::info!("Database initialized");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let user_repository = UserRepository::new(pool.clone());
    let department_repository = DepartmentRepository::new(pool.clone());
    let team_repository = TeamRepository::new(pool.clone());
    let application_repository = ApplicationRepository::new(pool.clone());
    let attendance_repository = AttendanceRepository::new(pool.clone());
    let notification_repository = NotificationRepository::new(pool.clone());

    let auth_service = AuthService::new(config.clone(), user_repository.clone(), clock.clone());
    let notifier = Notifier::new(notification_repository.clone(), clock.clone());
    let workflow_service = WorkflowService::new(
        pool.clone(),
        application_repository.clone(),
        user_repository.clone(),
        notifier.clone(),
        clock.clone(),
    );
    let attendance_service =
        AttendanceService::new(pool.clone(), attendance_repository.clone(), clock.clone());

    let app_state = web::Data::new(AppState {
        auth_service,
        notifier: notifier.clone(),
    });
    let user_repo_data = web::Data::new(user_repository);
    let department_repo_data = web::Data::new(department_repository);
    let team_repo_data = web::Data::new(team_repository);
    let notification_repo_data = web::Data::new(notification_repository);
    let workflow_service_data = web::Data::new(workflow_service);
    let attendance_service_data = web::Data::new(attendance_service);
    let config_data = web::Data::new(config.clone());

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(user_repo_data.clone())
            .app_data(department_repo_data.clone())
            .app_data(team_repo_data.clone())
            .app_data(notification_repo_data.clone())
            .app_data(workflow_service_data.clone())
            .app_data(attendance_service_data.clone())
            .app_data(config_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&config.client_base_url)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestId)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(hello)
            .service(health)
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/signup", web::post().to(auth::signup))
                            .route("/login", web::post().to(auth::login))
                            .route("/me", web::get().to(auth::me))
                            .route("/change-password", web::post().to(auth::change_password)),
                    )
                    .service(
                        web::scope("/applications")
                            .route("", web::post().to(applications::create_application))
                            .route("", web::get().to(applications::get_my_applications))
                            .route("/{id}", web::get().to(applications::get_my_application))
                            .route("/{id}", web::put().to(applications::update_my_application))
                            .route(
                                "/{id}",
                                web::delete().to(applications::delete_my_application),
                            ),
                    )
                    .service(
                        web::scope("/manager/applications")
                            .route("", web::get().to(applications::get_manager_applications))
                            .route("/{id}", web::get().to(applications::get_manager_application))
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
                            .route("/{id}", web::get().to(applications::get_hr_application))
                            .route(
                                "/{id}/approve",
                                web::post().to(applications::hr_approve_application),
                            )
                            .route(
                                "/{id}/send-back",
                                web::post().to(applications::hr_send_back_application),
                            ),
                    )
                    .service(
                        web::scope("/attendance")
                            .route("/dashboard", web::get().to(attendance::get_dashboard))
                            .route("/clock-in", web::post().to(attendance::clock_in))
                            .route("/clock-out", web::post().to(attendance::clock_out))
                            .route("/break/start", web::post().to(attendance::start_break))
                            .route("/break/end", web::post().to(attendance::end_break))
                            .route("/note", web::put().to(attendance::update_note))
                            .route("/records", web::get().to(attendance::get_my_records))
                            .route("/records/{id}", web::get().to(attendance::get_my_record)),
                    )
                    .service(
                        web::scope("/manager/attendance")
                            .route("/daily", web::get().to(attendance::get_daily_overview)),
                    )
                    .service(
                        web::scope("/hr/attendance")
                            .route("", web::get().to(attendance::get_hr_records))
                            .route("", web::post().to(attendance::create_hr_record))
                            .route("/{id}", web::get().to(attendance::get_hr_record))
                            .route("/{id}", web::put().to(attendance::update_hr_record))
                            .route("/{id}", web::delete().to(attendance::delete_hr_record))
                            .route(
                                "/{id}/mark-read",
                                web::post().to(attendance::mark_record_read),
                            )
                            .route(
                                "/{id}/unmark-read",
                                web::post().to(attendance::unmark_record_read),
                            ),
                    )
                    .service(
                        web::scope("/hr/departments")
                            .route("", web::post().to(admin::create_department))
                            .route("", web::get().to(admin::get_departments))
                            .route("/{id}", web::get().to(admin::get_department))
                            .route("/{id}", web::put().to(admin::update_department))
                            .route("/{id}", web::delete().to(admin::delete_department)),
                    )
                    .service(
                        web::scope("/hr/teams")
                            .route("", web::post().to(admin::create_team))
                            .route("", web::get().to(admin::get_teams))
                            .route("/{id}", web::get().to(admin::get_team))
                            .route("/{id}", web::put().to(admin::update_team))
                            .route("/{id}", web::delete().to(admin::delete_team)),
                    )
                    .service(
                        web::scope("/hr/users")
                            .route("", web::get().to(admin::get_users))
                            .route("", web::post().to(admin::create_user))
                            .route("/{id}", web::get().to(admin::get_user))
                            .route("/{id}", web::put().to(admin::update_user))
                            .route("/{id}", web::delete().to(admin::delete_user))
                            .route("/{id}/approve", web::post().to(admin::approve_user)),
                    )
                    .service(
                        web::scope("/notifications")
                            .route("", web::get().to(notifications::get_notifications))
                            .route(
                                "/unread-count",
                                web::get().to(notifications::get_unread_count),
                            )
                            .route(
                                "/{id}/read",
                                web::post().to(notifications::mark_notification_read),
                            )
                            .route(
                                "/{id}",
                                web::delete().to(notifications::delete_notification),
                            ),
                    ),
            )
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
