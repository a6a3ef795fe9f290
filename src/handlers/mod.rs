pub mod admin;
pub mod applications;
pub mod attendance;
pub mod auth;
pub mod notifications;
pub mod shared;
