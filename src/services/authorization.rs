use anyhow::Result;
use uuid::Uuid;

use crate::database::models::UserRole;
use crate::database::repositories::UserRepository;
use crate::services::auth::Claims;

/// Everything authorization decisions are made from: the authenticated
/// actor's identity, role, and the organizational units they are the
/// designated manager of. Loaded once per request; the operations
/// themselves never touch the directory again.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub role: UserRole,
    pub managed_departments: Vec<Uuid>,
    pub managed_teams: Vec<Uuid>,
}

impl ActorContext {
    pub async fn load(claims: &Claims, users: &UserRepository) -> Result<Self> {
        let (managed_departments, managed_teams) = users.managed_unit_ids(claims.sub).await?;
        Ok(Self {
            user_id: claims.sub,
            role: claims.role,
            managed_departments,
            managed_teams,
        })
    }

    /// Does this actor manage the department or team a record belongs to.
    pub fn manages(&self, department_id: Option<Uuid>, team_id: Option<Uuid>) -> bool {
        let manages_department =
            department_id.is_some_and(|id| self.managed_departments.contains(&id));
        let manages_team = team_id.is_some_and(|id| self.managed_teams.contains(&id));
        manages_department || manages_team
    }

    /// Manager review scope: the applicant must sit in a managed unit, and
    /// managers never review their own applications.
    pub fn may_review(
        &self,
        applicant_id: Uuid,
        department_id: Option<Uuid>,
        team_id: Option<Uuid>,
    ) -> bool {
        applicant_id != self.user_id && self.manages(department_id, team_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_of(departments: Vec<Uuid>, teams: Vec<Uuid>) -> ActorContext {
        ActorContext {
            user_id: Uuid::new_v4(),
            role: UserRole::Manager,
            managed_departments: departments,
            managed_teams: teams,
        }
    }

    #[test]
    fn department_membership_grants_scope() {
        let dept = Uuid::new_v4();
        let actor = manager_of(vec![dept], vec![]);

        assert!(actor.manages(Some(dept), None));
        assert!(!actor.manages(Some(Uuid::new_v4()), None));
        assert!(!actor.manages(None, None));
    }

    #[test]
    fn team_membership_grants_scope_independently_of_department() {
        let team = Uuid::new_v4();
        let actor = manager_of(vec![], vec![team]);

        assert!(actor.manages(Some(Uuid::new_v4()), Some(team)));
        assert!(actor.manages(None, Some(team)));
    }

    #[test]
    fn own_applications_are_out_of_review_scope() {
        let dept = Uuid::new_v4();
        let actor = manager_of(vec![dept], vec![]);

        assert!(actor.may_review(Uuid::new_v4(), Some(dept), None));
        assert!(!actor.may_review(actor.user_id, Some(dept), None));
    }
}
