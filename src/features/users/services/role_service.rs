use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::database::{constraint_violation, ConstraintViolation};
use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditEntity};
use crate::features::audit::AuditRecorder;
use crate::features::users::dtos::{CreateRoleDto, RoleResponseDto};
use crate::features::users::models::Role;

const ROLE_SELECT: &str = r#"
    SELECT r.id, r.name,
           COALESCE(
               ARRAY_AGG(u.username::TEXT ORDER BY u.username) FILTER (WHERE u.id IS NOT NULL),
               '{}'::TEXT[]
           ) AS members
    FROM roles r
    LEFT JOIN user_roles ur ON ur.role_id = r.id
    LEFT JOIN users u ON u.id = ur.user_id
"#;

/// Service for role membership management
pub struct RoleService {
    pool: PgPool,
    audit: Arc<AuditRecorder>,
}

impl RoleService {
    pub fn new(pool: PgPool, audit: Arc<AuditRecorder>) -> Self {
        Self { pool, audit }
    }

    pub async fn list(&self) -> Result<Vec<RoleResponseDto>> {
        let query = format!("{ROLE_SELECT} GROUP BY r.id ORDER BY r.name");
        let roles: Vec<Role> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list roles: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(roles.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<RoleResponseDto> {
        let query = format!("{ROLE_SELECT} WHERE r.id = $1 GROUP BY r.id");
        let role: Option<Role> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        role.map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Role with id {} not found", id)))
    }

    /// Role by name, created when missing; returns whether it was created
    pub async fn get_or_create(&self, name: &str) -> Result<(RoleResponseDto, bool)> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING id",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let id = match inserted {
            Some(id) => {
                tracing::info!("Role created: id={}, name={}", id, name);
                id
            }
            None => sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::Database)?,
        };

        Ok((self.get(id).await?, inserted.is_some()))
    }

    pub async fn create(&self, actor: Uuid, dto: CreateRoleDto) -> Result<RoleResponseDto> {
        let name = dto.name.trim().to_string();
        let id: Uuid = sqlx::query_scalar("INSERT INTO roles (name) VALUES ($1) RETURNING id")
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match constraint_violation(&e) {
                Some(ConstraintViolation::Unique(_)) => {
                    AppError::conflict("name", format!("Role '{}' already exists", name))
                }
                _ => AppError::Database(e),
            })?;

        tracing::info!("Role created: id={}, name={}", id, name);
        self.audit
            .record(Some(actor), AuditAction::Created, AuditEntity::Role, Some(id))
            .await;

        self.get(id).await
    }

    /// Add a user to a role; adding an existing member is a no-op
    pub async fn add_member(&self, actor: Option<Uuid>, role_id: Uuid, user_id: Uuid) -> Result<RoleResponseDto> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (role_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(ConstraintViolation::ForeignKey(_)) => {
                AppError::NotFound("Role or user not found".to_string())
            }
            _ => AppError::Database(e),
        })?;

        self.audit
            .record(actor, AuditAction::MemberAdded, AuditEntity::Role, Some(role_id))
            .await;

        self.get(role_id).await
    }

    pub async fn remove_member(&self, actor: Uuid, role_id: Uuid, user_id: Uuid) -> Result<RoleResponseDto> {
        let result = sqlx::query("DELETE FROM user_roles WHERE role_id = $1 AND user_id = $2")
            .bind(role_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "User is not a member of this role".to_string(),
            ));
        }

        self.audit
            .record(Some(actor), AuditAction::MemberRemoved, AuditEntity::Role, Some(role_id))
            .await;

        self.get(role_id).await
    }
}
