pub mod application;
pub mod attendance;
pub mod department;
pub mod macros;
pub mod notification;
pub mod team;
pub mod user;

// Re-export all models for easy importing
pub use application::*;
pub use attendance::*;
pub use department::*;
pub use notification::*;
pub use team::*;
pub use user::*;
