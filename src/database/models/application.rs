use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use super::user::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub application_type: ApplicationType,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub status: ApplicationStatus,
    pub manager_approver_id: Option<Uuid>,
    pub manager_approved_at: Option<DateTime<Utc>>,
    pub hr_approver_id: Option<Uuid>,
    pub hr_approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum ApplicationType {
        PaidLeave => "paid_leave",
        Late => "late",
        EarlyLeave => "early_leave",
        Absence => "absence",
        BusinessTrip => "business_trip",
        Remote => "remote",
        Other => "other",
    }
}

impl ApplicationType {
    /// Human-readable name used in notification messages.
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationType::PaidLeave => "paid leave",
            ApplicationType::Late => "late arrival",
            ApplicationType::EarlyLeave => "early leave",
            ApplicationType::Absence => "absence",
            ApplicationType::BusinessTrip => "business trip",
            ApplicationType::Remote => "remote work",
            ApplicationType::Other => "other",
        }
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum ApplicationStatus {
        PendingManager => "pending_manager",
        PendingHr => "pending_hr",
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// A transition was requested from a status that does not allow it. This is
/// a user-facing "nothing happened" signal, not a fault; callers surface the
/// message as a warning and leave the row untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionBlocked(pub &'static str);

/// Stage an application was returned to by a send-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentBackTo {
    ManagerReview,
    HrReview,
}

impl Application {
    pub fn approve_by_manager(
        &mut self,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionBlocked> {
        if self.status != ApplicationStatus::PendingManager {
            return Err(TransitionBlocked("This application cannot be approved."));
        }
        self.manager_approver_id = Some(actor_id);
        self.manager_approved_at = Some(now);
        self.status = ApplicationStatus::PendingHr;
        self.rejection_reason = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn approve_by_hr(
        &mut self,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionBlocked> {
        if self.status != ApplicationStatus::PendingHr {
            return Err(TransitionBlocked("This application cannot be approved."));
        }
        self.hr_approver_id = Some(actor_id);
        self.hr_approved_at = Some(now);
        self.status = ApplicationStatus::Approved;
        self.rejection_reason = None;
        self.updated_at = now;
        Ok(())
    }

    /// Rejection is only wired from the manager review stage; HR has no
    /// reject action, only approve and send-back.
    pub fn reject_by_manager(
        &mut self,
        actor_id: Uuid,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionBlocked> {
        if self.status != ApplicationStatus::PendingManager {
            return Err(TransitionBlocked("This application cannot be rejected."));
        }
        self.manager_approver_id = Some(actor_id);
        self.status = ApplicationStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    /// Returns the application to an earlier stage. Which stage depends on
    /// the actor's role: a manager always returns it to their own review
    /// queue; HR returns it to manager review, or keeps it at HR review when
    /// cancelling an already-granted approval.
    pub fn send_back(
        &mut self,
        actor_role: UserRole,
        reason: Option<String>,
        cancel_approval: bool,
        now: DateTime<Utc>,
    ) -> Result<SentBackTo, TransitionBlocked> {
        if !matches!(
            self.status,
            ApplicationStatus::PendingManager
                | ApplicationStatus::PendingHr
                | ApplicationStatus::Approved
        ) {
            return Err(TransitionBlocked("This application cannot be sent back."));
        }

        let target = match actor_role {
            UserRole::Manager => {
                self.status = ApplicationStatus::PendingManager;
                self.manager_approver_id = None;
                SentBackTo::ManagerReview
            }
            UserRole::Hr => {
                if cancel_approval {
                    self.status = ApplicationStatus::PendingHr;
                    self.hr_approver_id = None;
                    SentBackTo::HrReview
                } else {
                    self.status = ApplicationStatus::PendingManager;
                    self.hr_approver_id = None;
                    SentBackTo::ManagerReview
                }
            }
            UserRole::Employee => {
                return Err(TransitionBlocked("This application cannot be sent back."));
            }
        };

        self.rejection_reason = reason;
        self.updated_at = now;
        Ok(target)
    }

    /// The requester may touch their application only before a manager has
    /// picked it up.
    pub fn editable_by_applicant(&self) -> bool {
        self.status == ApplicationStatus::PendingManager
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    pub application_type: ApplicationType,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub reason: String,
}

impl ApplicationInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("A reason is required.".to_string());
        }
        if let Some(end_at) = self.end_at {
            if end_at < self.start_at {
                return Err("End must not be before start.".to_string());
            }
        }
        Ok(())
    }
}

/// Filter criteria shared by the applicant, manager and HR list views.
/// Date bounds are inclusive calendar dates on both ends.
#[derive(Debug, Default, Clone)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub application_type: Option<ApplicationType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring over the applicant's full name.
    pub applicant_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn pending_application(status: ApplicationStatus) -> Application {
        let created = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        Application {
            id: Uuid::new_v4(),
            applicant_id: Uuid::new_v4(),
            application_type: ApplicationType::PaidLeave,
            start_at: created,
            end_at: None,
            reason: "Family matters".to_string(),
            status,
            manager_approver_id: None,
            manager_approved_at: None,
            hr_approver_id: None,
            hr_approved_at: None,
            rejection_reason: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 4, 10, 30, 0).unwrap()
    }

    #[test]
    fn manager_approval_moves_to_hr_review() {
        let mut app = pending_application(ApplicationStatus::PendingManager);
        app.rejection_reason = Some("old note".to_string());
        let manager = Uuid::new_v4();

        app.approve_by_manager(manager, now()).unwrap();

        assert_eq!(app.status, ApplicationStatus::PendingHr);
        assert_eq!(app.manager_approver_id, Some(manager));
        assert_eq!(app.manager_approved_at, Some(now()));
        assert_eq!(app.rejection_reason, None);
    }

    #[test]
    fn manager_approval_is_blocked_outside_manager_review() {
        for status in [
            ApplicationStatus::PendingHr,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
        ] {
            let mut app = pending_application(status);
            let before = app.clone();

            assert!(app.approve_by_manager(Uuid::new_v4(), now()).is_err());
            assert_eq!(app.status, before.status);
            assert_eq!(app.manager_approver_id, before.manager_approver_id);
        }
    }

    #[test]
    fn hr_approval_terminates_the_flow() {
        let mut app = pending_application(ApplicationStatus::PendingHr);
        let hr = Uuid::new_v4();

        app.approve_by_hr(hr, now()).unwrap();

        assert_eq!(app.status, ApplicationStatus::Approved);
        assert_eq!(app.hr_approver_id, Some(hr));
        assert_eq!(app.hr_approved_at, Some(now()));
    }

    #[test]
    fn hr_approval_is_blocked_outside_hr_review() {
        for status in [
            ApplicationStatus::PendingManager,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
        ] {
            let mut app = pending_application(status);
            assert!(app.approve_by_hr(Uuid::new_v4(), now()).is_err());
            assert_eq!(app.status, status);
        }
    }

    #[test]
    fn rejection_records_actor_and_reason() {
        let mut app = pending_application(ApplicationStatus::PendingManager);
        let manager = Uuid::new_v4();

        app.reject_by_manager(manager, "Short staffed that week".to_string(), now())
            .unwrap();

        assert_eq!(app.status, ApplicationStatus::Rejected);
        assert_eq!(app.manager_approver_id, Some(manager));
        assert_eq!(
            app.rejection_reason.as_deref(),
            Some("Short staffed that week")
        );
    }

    #[test]
    fn rejection_is_blocked_after_manager_review() {
        for status in [
            ApplicationStatus::PendingHr,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
        ] {
            let mut app = pending_application(status);
            assert!(
                app.reject_by_manager(Uuid::new_v4(), "reason".to_string(), now())
                    .is_err()
            );
            assert_eq!(app.status, status);
        }
    }

    #[test]
    fn manager_send_back_after_own_approval_reopens_manager_review() {
        let mut app = pending_application(ApplicationStatus::PendingManager);
        let manager = Uuid::new_v4();
        app.approve_by_manager(manager, now()).unwrap();

        let target = app
            .send_back(
                UserRole::Manager,
                Some("Dates need fixing".to_string()),
                false,
                now(),
            )
            .unwrap();

        assert_eq!(target, SentBackTo::ManagerReview);
        assert_eq!(app.status, ApplicationStatus::PendingManager);
        assert_eq!(app.manager_approver_id, None);
    }

    #[test]
    fn hr_send_back_returns_to_manager_review() {
        let mut app = pending_application(ApplicationStatus::PendingHr);
        app.hr_approver_id = Some(Uuid::new_v4());

        let target = app
            .send_back(UserRole::Hr, Some("Needs detail".to_string()), false, now())
            .unwrap();

        assert_eq!(target, SentBackTo::ManagerReview);
        assert_eq!(app.status, ApplicationStatus::PendingManager);
        assert_eq!(app.hr_approver_id, None);
        assert_eq!(app.rejection_reason.as_deref(), Some("Needs detail"));
    }

    #[test]
    fn hr_cancel_approval_returns_to_hr_review() {
        let mut app = pending_application(ApplicationStatus::Approved);
        app.hr_approver_id = Some(Uuid::new_v4());

        let target = app
            .send_back(
                UserRole::Hr,
                Some("Granted by mistake".to_string()),
                true,
                now(),
            )
            .unwrap();

        assert_eq!(target, SentBackTo::HrReview);
        assert_eq!(app.status, ApplicationStatus::PendingHr);
        assert_eq!(app.hr_approver_id, None);
    }

    #[test]
    fn send_back_from_rejected_is_blocked() {
        let mut app = pending_application(ApplicationStatus::Rejected);
        assert!(
            app.send_back(UserRole::Manager, Some("x".to_string()), false, now())
                .is_err()
        );
        assert_eq!(app.status, ApplicationStatus::Rejected);
    }

    #[test]
    fn applicant_edit_window_closes_once_advanced() {
        assert!(pending_application(ApplicationStatus::PendingManager).editable_by_applicant());
        assert!(!pending_application(ApplicationStatus::PendingHr).editable_by_applicant());
        assert!(!pending_application(ApplicationStatus::Approved).editable_by_applicant());
        assert!(!pending_application(ApplicationStatus::Rejected).editable_by_applicant());
    }

    #[test]
    fn input_requires_a_non_blank_reason() {
        let input = ApplicationInput {
            application_type: ApplicationType::Late,
            start_at: now(),
            end_at: None,
            reason: "   ".to_string(),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn input_rejects_inverted_range() {
        let input = ApplicationInput {
            application_type: ApplicationType::PaidLeave,
            start_at: now(),
            end_at: Some(now() - chrono::Duration::hours(1)),
            reason: "Trip".to_string(),
        };
        assert!(input.validate().is_err());
    }
}
