use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub employee_number: String,
    pub full_name: String,
    pub gender: Gender,
    pub role: UserRole,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum UserRole {
        Employee => "employee",
        Manager => "manager",
        Hr => "hr",
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Employee
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum Gender {
        Male => "male",
        Female => "female",
        Other => "other",
        NoAnswer => "no_answer",
    }
}

impl User {
    /// Staff access is derived from the role, not stored.
    pub fn is_staff(&self) -> bool {
        self.role == UserRole::Hr
    }

    pub fn is_employee(&self) -> bool {
        self.role == UserRole::Employee
    }

    pub fn is_manager(&self) -> bool {
        self.role == UserRole::Manager
    }

    pub fn is_hr(&self) -> bool {
        self.role == UserRole::Hr
    }
}

/// Self-service signup. The role is fixed to `employee` and the account
/// stays inactive until an HR actor approves it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub employee_number: String,
    pub full_name: String,
    pub gender: Option<Gender>,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// HR-side account creation; the role is chosen explicitly and the account
/// is active immediately.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub employee_number: String,
    pub full_name: String,
    pub gender: Option<Gender>,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// HR-side profile update. The role is a business classification fixed at
/// creation and is deliberately absent here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub email: String,
    pub employee_number: String,
    pub full_name: String,
    pub gender: Gender,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub employee_number: String,
    pub full_name: String,
    pub role: UserRole,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub is_active: bool,
    pub is_staff: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        let is_staff = user.is_staff();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            employee_number: user.employee_number,
            full_name: user.full_name,
            role: user.role,
            department_id: user.department_id,
            team_id: user.team_id,
            is_active: user.is_active,
            is_staff,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Directory filter used by the HR user list.
#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    /// Case-insensitive substring over username and full name.
    pub query: Option<String>,
    pub role: Option<UserRole>,
    pub department_id: Option<Uuid>,
    pub approval: Option<ApprovalFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalFilter {
    Approved,
    Unapproved,
}

impl std::str::FromStr for ApprovalFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ApprovalFilter::Approved),
            "unapproved" => Ok(ApprovalFilter::Unapproved),
            _ => Err(format!("Invalid ApprovalFilter: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn staff_flag_follows_role() {
        let mut user = sample_user(UserRole::Employee);
        assert!(!user.is_staff());

        user.role = UserRole::Hr;
        assert!(user.is_staff());

        user.role = UserRole::Manager;
        assert!(!user.is_staff());
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        assert!("admin".parse::<UserRole>().is_err());
    }

    fn sample_user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "tanaka".to_string(),
            email: "tanaka@example.com".to_string(),
            password_hash: "hash".to_string(),
            employee_number: "E-0001".to_string(),
            full_name: "Tanaka Taro".to_string(),
            gender: Gender::NoAnswer,
            role,
            department_id: None,
            team_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
