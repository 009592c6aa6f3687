use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::model::TokenClaims;
use crate::core::config::AuthConfig;
use crate::core::error::AppError;

/// Issues and validates HS256 access tokens.
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    leeway: u64,
    ttl: Duration,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway: config.jwt_leeway.as_secs(),
            ttl: config.token_ttl,
        }
    }

    /// Lifetime of tokens issued without an explicit TTL
    pub fn default_ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id`, valid for `ttl` (or the configured default)
    pub fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        ttl: Option<Duration>,
    ) -> Result<String, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(e.to_string()))?
            .as_secs();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + ttl.unwrap_or(self.ttl).as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            secret: secret.to_string(),
            issuer: "school-core".to_string(),
            audience: "school-api".to_string(),
            jwt_leeway: Duration::from_secs(0),
            token_ttl: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_issued_token_validates() {
        let validator = JwtValidator::new(&config("0123456789abcdef0123456789abcdef"));
        let user_id = Uuid::new_v4();

        let token = validator.issue(user_id, "student", None).unwrap();
        let claims = validator.validate_token(&token).unwrap();

        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.username, "student");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = JwtValidator::new(&config("0123456789abcdef0123456789abcdef"));
        let other = JwtValidator::new(&config("fedcba9876543210fedcba9876543210"));

        let token = issuer.issue(Uuid::new_v4(), "student", None).unwrap();
        assert!(matches!(
            other.validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let validator = JwtValidator::new(&config("0123456789abcdef0123456789abcdef"));
        assert!(validator.validate_token("not-a-jwt").is_err());
    }
}
