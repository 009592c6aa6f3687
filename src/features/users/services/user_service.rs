use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::core::database::{constraint_violation, ConstraintViolation};
use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::models::{User, UserCredentials, UserOption};
use crate::shared::constants::ROLE_TEACHER;

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, is_staff, is_active, created_at";

#[derive(FromRow)]
struct PrincipalRow {
    id: Uuid,
    username: String,
    is_staff: bool,
    is_active: bool,
    roles: Vec<String>,
}

/// Check role membership on any executor (pool or open transaction)
pub async fn has_role<'e, E>(executor: E, user_id: Uuid, role: &str) -> sqlx::Result<bool>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND r.name = $2
        )
        "#,
    )
    .bind(user_id)
    .bind(role)
    .fetch_one(executor)
    .await
}

/// Service for user lookups
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve an active user into the request principal (staff flag + roles)
    pub async fn find_principal(&self, user_id: Uuid) -> Result<Option<AuthenticatedUser>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT u.id, u.username, u.is_staff, u.is_active,
                   COALESCE(
                       ARRAY_AGG(r.name::TEXT ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL),
                       '{}'::TEXT[]
                   ) AS roles
            FROM users u
            LEFT JOIN user_roles ur ON ur.user_id = u.id
            LEFT JOIN roles r ON r.id = ur.role_id
            WHERE u.id = $1
            GROUP BY u.id
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load principal: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(row.filter(|r| r.is_active).map(|r| AuthenticatedUser {
            user_id: r.id,
            username: r.username,
            is_staff: r.is_staff,
            roles: r.roles,
        }))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    /// Account and password hash for a login attempt
    pub async fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let query =
            format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = $1");
        sqlx::query_as::<_, UserCredentials>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load credentials: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Create a regular (non-staff) account with a password
    pub async fn register(&self, username: &str, email: &str, password_hash: &str) -> Result<User> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match constraint_violation(&e) {
                Some(ConstraintViolation::Unique(_)) => {
                    AppError::conflict("username", "A user with that username already exists")
                }
                _ => {
                    tracing::error!("Failed to register user: {:?}", e);
                    AppError::Database(e)
                }
            })?;

        tracing::info!("User registered: id={}, username={}", user.id, user.username);
        Ok(user)
    }

    /// Get-or-create by username; returns the user and whether it was created
    pub async fn get_or_create(&self, username: &str, is_staff: bool) -> Result<(User, bool)> {
        let query = format!(
            "INSERT INTO users (username, is_staff) VALUES ($1, $2) \
             ON CONFLICT (username) DO NOTHING RETURNING {USER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(is_staff)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if let Some(user) = inserted {
            tracing::info!("User created: id={}, username={}", user.id, user.username);
            return Ok((user, true));
        }

        let existing = self
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User '{}' vanished", username)))?;
        Ok((existing, false))
    }

    /// Users eligible to teach a course
    pub async fn list_teachers(&self) -> Result<Vec<UserOption>> {
        sqlx::query_as::<_, UserOption>(
            r#"
            SELECT u.id, u.username
            FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            JOIN roles r ON r.id = ur.role_id
            WHERE r.name = $1 AND u.is_active = TRUE
            ORDER BY u.username
            "#,
        )
        .bind(ROLE_TEACHER)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}
