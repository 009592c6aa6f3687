use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::users::dtos::UserResponseDto;
use crate::shared::validation::{validate_password, validate_username, FieldErrors};

/// Request DTO for self-registration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequestDto {
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: String,
}

impl RegisterRequestDto {
    /// Every rule the registration breaks
    pub fn violations(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        let username = validate_username(&mut errors, &self.username);
        validate_password(&mut errors, "password", &self.password, &username);
        errors
    }
}

/// Request DTO for username/password login
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequestDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response DTO for authentication (register/login)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponseDto {
    /// Signed access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token expiry time in seconds
    pub expires_in: u64,
    pub user: UserResponseDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: Option<&str>, password: &str) -> RegisterRequestDto {
        RegisterRequestDto {
            username: username.to_string(),
            email: email.map(str::to_string),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let dto = registration("maria", Some("maria@school.test"), "correct horse");
        assert!(dto.violations().is_empty());
    }

    #[test]
    fn test_registration_reports_every_field() {
        let dto = registration("maria k", Some("not-an-email"), "123");
        let errors = dto.violations();
        assert_eq!(errors.get("username").len(), 1);
        assert_eq!(errors.get("email"), ["Invalid email format".to_string()]);
        assert_eq!(errors.get("password").len(), 2);
    }
}
