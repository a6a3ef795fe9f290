use std::env;
use std::sync::Arc;

use actix_web::web;
use chrono::Utc;
use fake::Fake;
use fake::faker::internet::en::Username;
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::PgPool;
use uuid::Uuid;

use kintai::database::models::UserRole;
use kintai::database::repositories::{
    ApplicationRepository, AttendanceRepository, DepartmentRepository, NotificationRepository,
    TeamRepository, UserRepository,
};
use kintai::services::auth::Claims;
use kintai::services::{
    AttendanceService, AuthService, Clock, Notifier, SystemClock, WorkflowService,
};
use kintai::{AppState, Config};

pub struct TestContext {
    pub pool: PgPool,
    pub config: Config,
}

impl TestContext {
    /// The pool is lazy: no connection is opened until a query actually
    /// runs, so these tests can drive every path that rejects a request
    /// before touching storage.
    pub fn new() -> Self {
        let config = Config {
            database_url: "postgres://localhost:5432/kintai_test".to_string(),
            jwt_secret: "test-jwt-secret-key-that-is-long-enough".to_string(),
            jwt_expiration_days: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            client_base_url: "http://localhost:3000".to_string(),
        };
        let pool = PgPool::connect_lazy(&config.database_url).expect("lazy pool");

        TestContext { pool, config }
    }

    /// A real signed token for an arbitrary user with the given role.
    pub fn token_for(&self, role: UserRole) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: Username().fake(),
            role,
            exp: (Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )
        .expect("Failed to sign test token")
    }
}

/// All the app data main() registers, built over the test context's pool.
pub struct TestData {
    pub app_state: web::Data<AppState>,
    pub users: web::Data<UserRepository>,
    pub departments: web::Data<DepartmentRepository>,
    pub teams: web::Data<TeamRepository>,
    pub notifications: web::Data<NotificationRepository>,
    pub workflow: web::Data<WorkflowService>,
    pub attendance: web::Data<AttendanceService>,
    pub config: web::Data<Config>,
}

pub fn build_data(ctx: &TestContext) -> TestData {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let user_repository = UserRepository::new(ctx.pool.clone());
    let department_repository = DepartmentRepository::new(ctx.pool.clone());
    let team_repository = TeamRepository::new(ctx.pool.clone());
    let application_repository = ApplicationRepository::new(ctx.pool.clone());
    let attendance_repository = AttendanceRepository::new(ctx.pool.clone());
    let notification_repository = NotificationRepository::new(ctx.pool.clone());

    let auth_service = AuthService::new(ctx.config.clone(), user_repository.clone(), clock.clone());
    let notifier = Notifier::new(notification_repository.clone(), clock.clone());
    let workflow_service = WorkflowService::new(
        ctx.pool.clone(),
        application_repository,
        user_repository.clone(),
        notifier.clone(),
        clock.clone(),
    );
    let attendance_service =
        AttendanceService::new(ctx.pool.clone(), attendance_repository, clock);

    TestData {
        app_state: web::Data::new(AppState {
            auth_service,
            notifier,
        }),
        users: web::Data::new(user_repository),
        departments: web::Data::new(department_repository),
        teams: web::Data::new(team_repository),
        notifications: web::Data::new(notification_repository),
        workflow: web::Data::new(workflow_service),
        attendance: web::Data::new(attendance_service),
        config: web::Data::new(ctx.config.clone()),
    }
}

pub fn auth_header(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}
