use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{
    Application, ApplicationFilter, ApplicationInput, SentBackTo, UserRole,
};
use crate::database::repositories::{ApplicationRepository, UserRepository};
use crate::error::AppError;
use crate::services::Outcome;
use crate::services::authorization::ActorContext;
use crate::services::clock::Clock;
use crate::services::notifier::Notifier;

fn application_link(id: Uuid) -> String {
    format!("/applications/{}", id)
}

/// The approval workflow. Every transition runs as one transaction over the
/// row-locked application: state check, mutation, commit. Notifications go
/// out after the commit, best-effort.
#[derive(Clone)]
pub struct WorkflowService {
    pool: PgPool,
    applications: ApplicationRepository,
    users: UserRepository,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl WorkflowService {
    pub fn new(
        pool: PgPool,
        applications: ApplicationRepository,
        users: UserRepository,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            applications,
            users,
            notifier,
            clock,
        }
    }

    /// Files a new application in manager review and tells the applicant's
    /// department manager about it.
    pub async fn submit(
        &self,
        applicant_id: Uuid,
        input: ApplicationInput,
    ) -> Result<Application, AppError> {
        input.validate().map_err(AppError::Validation)?;

        let applicant = self
            .users
            .find_by_id(applicant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let application = self
            .applications
            .create(applicant_id, &input, self.clock.now())
            .await?;

        if let Some(department_id) = applicant.department_id {
            if let Some(manager_id) = self.users.department_manager(department_id).await? {
                if manager_id != applicant_id {
                    self.notifier
                        .send(
                            applicant_id,
                            manager_id,
                            format!(
                                "New {} application from {}.",
                                application.application_type.label(),
                                applicant.full_name
                            ),
                            Some(application_link(application.id)),
                        )
                        .await;
                }
            }
        }

        Ok(application)
    }

    pub async fn approve_by_manager(
        &self,
        id: Uuid,
        actor: &ActorContext,
    ) -> Result<Outcome<Application>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut application = self
            .applications
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        self.check_manager_scope(&mut tx, actor, application.applicant_id)
            .await?;

        match application.approve_by_manager(actor.user_id, self.clock.now()) {
            Err(blocked) => {
                tx.rollback().await.map_err(AppError::from)?;
                Ok(Outcome::Blocked(blocked.0))
            }
            Ok(()) => {
                self.applications
                    .persist_transition(&mut tx, &application)
                    .await?;
                tx.commit().await.map_err(AppError::from)?;
                Ok(Outcome::Applied(application))
            }
        }
    }

    pub async fn approve_by_hr(
        &self,
        id: Uuid,
        actor: &ActorContext,
    ) -> Result<Outcome<Application>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut application = self
            .applications
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        match application.approve_by_hr(actor.user_id, self.clock.now()) {
            Err(blocked) => {
                tx.rollback().await.map_err(AppError::from)?;
                Ok(Outcome::Blocked(blocked.0))
            }
            Ok(()) => {
                self.applications
                    .persist_transition(&mut tx, &application)
                    .await?;
                tx.commit().await.map_err(AppError::from)?;

                self.notifier
                    .send(
                        actor.user_id,
                        application.applicant_id,
                        format!(
                            "Your {} application was approved by HR.",
                            application.application_type.label()
                        ),
                        Some(application_link(application.id)),
                    )
                    .await;

                Ok(Outcome::Applied(application))
            }
        }
    }

    /// Manager-side rejection; HR has no reject action.
    pub async fn reject(
        &self,
        id: Uuid,
        actor: &ActorContext,
        reason: &str,
    ) -> Result<Outcome<Application>, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("A rejection reason is required."));
        }

        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut application = self
            .applications
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        self.check_manager_scope(&mut tx, actor, application.applicant_id)
            .await?;

        match application.reject_by_manager(actor.user_id, reason.to_string(), self.clock.now()) {
            Err(blocked) => {
                tx.rollback().await.map_err(AppError::from)?;
                Ok(Outcome::Blocked(blocked.0))
            }
            Ok(()) => {
                self.applications
                    .persist_transition(&mut tx, &application)
                    .await?;
                tx.commit().await.map_err(AppError::from)?;
                Ok(Outcome::Applied(application))
            }
        }
    }

    /// Returns an application to an earlier stage. Reason presence is the
    /// calling handler's contract; the operation records whatever it gets.
    pub async fn send_back(
        &self,
        id: Uuid,
        actor: &ActorContext,
        reason: Option<String>,
        cancel_approval: bool,
    ) -> Result<Outcome<Application>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut application = self
            .applications
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        if actor.role == UserRole::Manager {
            self.check_manager_scope(&mut tx, actor, application.applicant_id)
                .await?;
        }

        match application.send_back(actor.role, reason, cancel_approval, self.clock.now()) {
            Err(blocked) => {
                tx.rollback().await.map_err(AppError::from)?;
                Ok(Outcome::Blocked(blocked.0))
            }
            Ok(target) => {
                self.applications
                    .persist_transition(&mut tx, &application)
                    .await?;
                tx.commit().await.map_err(AppError::from)?;

                let stage = match target {
                    SentBackTo::ManagerReview => "manager review",
                    SentBackTo::HrReview => "HR review",
                };
                self.notifier
                    .send(
                        actor.user_id,
                        application.applicant_id,
                        format!(
                            "Your {} application was sent back to {}.",
                            application.application_type.label(),
                            stage
                        ),
                        Some(application_link(application.id)),
                    )
                    .await;

                Ok(Outcome::Applied(application))
            }
        }
    }

    /// Requester-side edit, allowed only while the application has not
    /// advanced past manager review.
    pub async fn update_by_applicant(
        &self,
        id: Uuid,
        applicant_id: Uuid,
        input: ApplicationInput,
    ) -> Result<Outcome<Application>, AppError> {
        input.validate().map_err(AppError::Validation)?;

        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let application = self
            .applications
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        if application.applicant_id != applicant_id {
            return Err(AppError::forbidden("Not your application."));
        }
        if !application.editable_by_applicant() {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(Outcome::Blocked(
                "This application has already been reviewed and can no longer be edited.",
            ));
        }

        let updated = self
            .applications
            .update_content(&mut tx, id, &input, self.clock.now())
            .await?;
        tx.commit().await.map_err(AppError::from)?;

        Ok(Outcome::Applied(updated))
    }

    pub async fn delete_by_applicant(
        &self,
        id: Uuid,
        applicant_id: Uuid,
    ) -> Result<Outcome<()>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let application = self
            .applications
            .find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        if application.applicant_id != applicant_id {
            return Err(AppError::forbidden("Not your application."));
        }
        if !application.editable_by_applicant() {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(Outcome::Blocked(
                "This application has already been reviewed and can no longer be deleted.",
            ));
        }

        self.applications.delete(&mut tx, id).await?;
        tx.commit().await.map_err(AppError::from)?;

        Ok(Outcome::Applied(()))
    }

    pub async fn get_for_applicant(
        &self,
        id: Uuid,
        applicant_id: Uuid,
    ) -> Result<Application, AppError> {
        let application = self
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        if application.applicant_id != applicant_id {
            return Err(AppError::forbidden("Not your application."));
        }

        Ok(application)
    }

    pub async fn get_for_manager(
        &self,
        id: Uuid,
        actor: &ActorContext,
    ) -> Result<Application, AppError> {
        let application = self
            .applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        let applicant = self
            .users
            .find_by_id(application.applicant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !actor.may_review(applicant.id, applicant.department_id, applicant.team_id) {
            return Err(AppError::forbidden(
                "This application is outside your review scope.",
            ));
        }

        Ok(application)
    }

    pub async fn get_for_hr(&self, id: Uuid) -> Result<Application, AppError> {
        self.applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))
    }

    pub async fn list_for_applicant(
        &self,
        applicant_id: Uuid,
        filter: &ApplicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Application>, AppError> {
        Ok(self
            .applications
            .list_for_applicant(applicant_id, filter, limit, offset)
            .await?)
    }

    pub async fn list_for_manager(
        &self,
        actor: &ActorContext,
        filter: &ApplicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Application>, AppError> {
        Ok(self
            .applications
            .list_for_manager(
                &actor.managed_departments,
                &actor.managed_teams,
                actor.user_id,
                filter,
                limit,
                offset,
            )
            .await?)
    }

    pub async fn list_for_hr(
        &self,
        filter: &ApplicationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Application>, AppError> {
        Ok(self.applications.list_for_hr(filter, limit, offset).await?)
    }

    /// Scope check shared by the manager-side transitions, read under the
    /// same transaction as the row lock.
    async fn check_manager_scope(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        actor: &ActorContext,
        applicant_id: Uuid,
    ) -> Result<(), AppError> {
        let (department_id, team_id) = self
            .users
            .unit_of_user(tx, applicant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !actor.may_review(applicant_id, department_id, team_id) {
            return Err(AppError::forbidden(
                "This application is outside your review scope.",
            ));
        }

        Ok(())
    }
}
