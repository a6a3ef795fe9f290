pub mod attendance;
pub mod auth;
pub mod authorization;
pub mod clock;
pub mod notifier;
pub mod workflow;

pub use attendance::AttendanceService;
pub use auth::{AuthService, Claims};
pub use authorization::ActorContext;
pub use clock::{Clock, SystemClock};
pub use notifier::Notifier;
pub use workflow::WorkflowService;

/// Result of an operation guarded by current state. A blocked operation is
/// a benign no-op carrying a user-facing warning, not a fault; nothing was
/// mutated.
#[derive(Debug)]
pub enum Outcome<T> {
    Applied(T),
    Blocked(&'static str),
}
