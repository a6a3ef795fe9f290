pub mod application;
pub mod attendance;
pub mod department;
pub mod notification;
pub mod team;
pub mod user;

pub use application::ApplicationRepository;
pub use attendance::AttendanceRepository;
pub use department::DepartmentRepository;
pub use notification::NotificationRepository;
pub use team::TeamRepository;
pub use user::UserRepository;
