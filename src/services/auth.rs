use actix_web::{
    Error as ActixError, FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized,
    web::Data,
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::future::{Ready, ready};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::{
    AuthResponse, ChangePasswordInput, CreateUserInput, Gender, LoginInput, SignupInput, User,
    UserRole,
};
use crate::database::repositories::UserRepository;
use crate::error::AppError;
use crate::services::clock::Clock;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
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

impl FromRequest for Claims {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "));

        if let Some(token) = token {
            if let Some(config) = req.app_data::<Data<Config>>() {
                return match decode::<Claims>(
                    token,
                    &DecodingKey::from_secret(config.jwt_secret.as_ref()),
                    &Validation::new(Algorithm::HS256),
                ) {
                    Ok(token_data) => ready(Ok(token_data.claims)),
                    Err(_) => ready(Err(ErrorUnauthorized("Invalid token"))),
                };
            }
        }

        ready(Err(ErrorUnauthorized(
            "Missing or invalid authorization header",
        )))
    }
}

#[derive(Clone)]
pub struct AuthService {
    user_repository: UserRepository,
    config: Config,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(config: Config, user_repository: UserRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            user_repository,
            config,
            clock,
        }
    }

    /// Self-service signup. The account is created inactive with the
    /// employee role; an HR actor approves it before it can log in.
    pub async fn signup(&self, input: SignupInput) -> Result<User, AppError> {
        self.check_identifiers(&input.username, &input.employee_number)
            .await?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        let now = self.clock.now();

        let user = User {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            password_hash,
            employee_number: input.employee_number,
            full_name: input.full_name,
            gender: input.gender.unwrap_or(Gender::NoAnswer),
            role: UserRole::Employee,
            department_id: input.department_id,
            team_id: input.team_id,
            is_active: false,
            created_at: now,
            updated_at: now,
        };

        self.user_repository.create(&user).await?;

        Ok(user)
    }

    /// HR-side account creation: role chosen explicitly, active at once.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, AppError> {
        self.check_identifiers(&input.username, &input.employee_number)
            .await?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        let now = self.clock.now();

        let user = User {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            password_hash,
            employee_number: input.employee_number,
            full_name: input.full_name,
            gender: input.gender.unwrap_or(Gender::NoAnswer),
            role: input.role,
            department_id: input.department_id,
            team_id: input.team_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.user_repository.create(&user).await?;

        Ok(user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repository
            .find_by_username(&input.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password_ok = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        if !password_ok {
            return Err(AppError::Unauthorized);
        }

        // Accounts awaiting HR approval exist but cannot authenticate.
        if !user.is_active {
            return Err(AppError::forbidden("This account has not been approved yet."));
        }

        let token = self.generate_token(&user)?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: ChangePasswordInput,
    ) -> Result<(), AppError> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let current_ok = verify(&input.current_password, &user.password_hash)
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        if !current_ok {
            return Err(AppError::validation("Current password is incorrect."));
        }
        if input.new_password.len() < 8 {
            return Err(AppError::validation(
                "New password must be at least 8 characters.",
            ));
        }

        let password_hash = hash(&input.new_password, DEFAULT_COST)
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        self.user_repository
            .update_password(user_id, &password_hash, self.clock.now())
            .await?;

        Ok(())
    }

    pub fn generate_token(&self, user: &User) -> Result<String, AppError> {
        let expiration = (Utc::now() + Duration::days(self.config.jwt_expiration_days)).timestamp()
            as usize;

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            exp: expiration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::InternalServerError(e.into()))
    }

    async fn check_identifiers(
        &self,
        username: &str,
        employee_number: &str,
    ) -> Result<(), AppError> {
        if self.user_repository.username_exists(username).await? {
            return Err(AppError::validation("Username already exists."));
        }
        if self
            .user_repository
            .employee_number_exists(employee_number)
            .await?
        {
            return Err(AppError::validation("Employee number already exists."));
        }
        Ok(())
    }
}
