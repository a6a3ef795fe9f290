pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

pub use config::Config;
pub use database::repositories::{
    ApplicationRepository, AttendanceRepository, DepartmentRepository, NotificationRepository,
    TeamRepository, UserRepository,
};
pub use error::AppError;
pub use services::{AttendanceService, AuthService, Notifier, WorkflowService};

pub struct AppState {
    pub auth_service: AuthService,
    pub notifier: Notifier,
}
