use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditEntity};
use crate::features::audit::AuditRecorder;
use crate::features::auth::dto::{AuthResponseDto, LoginRequestDto, RegisterRequestDto};
use crate::features::auth::password::{hash_password, verify_password};
use crate::features::auth::JwtValidator;
use crate::features::users::models::User;
use crate::features::users::UserService;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Service for authentication operations (register, login)
pub struct AuthService {
    users: Arc<UserService>,
    validator: Arc<JwtValidator>,
    audit: Arc<AuditRecorder>,
}

impl AuthService {
    pub fn new(
        users: Arc<UserService>,
        validator: Arc<JwtValidator>,
        audit: Arc<AuditRecorder>,
    ) -> Self {
        Self {
            users,
            validator,
            audit,
        }
    }

    /// Register a new regular account and sign it in
    pub async fn register(&self, dto: RegisterRequestDto) -> Result<AuthResponseDto> {
        dto.violations().into_result()?;

        let username = dto.username.trim().to_string();
        let email = dto.email.as_deref().map(str::trim).unwrap_or_default().to_string();
        let password = dto.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

        let user = self.users.register(&username, &email, &password_hash).await?;
        self.audit
            .record(Some(user.id), AuditAction::Registered, AuditEntity::User, Some(user.id))
            .await;

        self.token_for(user)
    }

    /// Check a username/password pair and issue an access token
    pub async fn login(&self, dto: LoginRequestDto) -> Result<AuthResponseDto> {
        let credentials = self.users.find_credentials(dto.username.trim()).await?;

        let Some(credentials) = credentials.filter(|c| c.user.is_active) else {
            tracing::debug!("Login rejected: unknown or inactive user");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };
        let Some(stored_hash) = credentials.password_hash else {
            tracing::debug!("Login rejected: user {} has no password", credentials.user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let password = dto.password;
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?;
        if !valid {
            tracing::debug!("Login rejected: wrong password for {}", credentials.user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        tracing::info!("User logged in: id={}", credentials.user.id);
        self.token_for(credentials.user)
    }

    fn token_for(&self, user: User) -> Result<AuthResponseDto> {
        let access_token = self.validator.issue(user.id, &user.username, None)?;
        Ok(AuthResponseDto {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.validator.default_ttl().as_secs(),
            user: user.into(),
        })
    }
}
