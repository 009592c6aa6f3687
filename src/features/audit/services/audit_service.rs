use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::audit::dtos::{ActionLogQueryParams, ActionLogResponseDto};
use crate::features::audit::models::{ActionLog, AuditAction, AuditEntity};

/// Appends entries to the action log
pub struct AuditRecorder {
    pool: PgPool,
}

impl AuditRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry. Failures are logged and swallowed.
    pub async fn record(
        &self,
        actor: Option<Uuid>,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Option<Uuid>,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO action_logs (user_id, action, entity, entity_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(actor)
        .bind(action.as_str())
        .bind(entity.as_str())
        .bind(entity_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                "Failed to record action log entry: action={}, entity={}, entity_id={:?}: {:?}",
                action.as_str(),
                entity.as_str(),
                entity_id,
                e
            );
        }
    }

    /// List entries, newest first
    pub async fn list(
        &self,
        params: &ActionLogQueryParams,
    ) -> Result<(Vec<ActionLogResponseDto>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM action_logs l");
        push_filters(&mut count_query, params);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count action logs: {:?}", e);
                AppError::Database(e)
            })?;

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT l.id, l.user_id, u.username, l.action, l.entity, l.entity_id, l.action_time
            FROM action_logs l
            LEFT JOIN users u ON u.id = l.user_id
            "#,
        );
        push_filters(&mut query, params);
        query
            .push(" ORDER BY l.action_time DESC LIMIT ")
            .push_bind(params.pagination().limit())
            .push(" OFFSET ")
            .push_bind(params.pagination().offset());

        let logs: Vec<ActionLog> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list action logs: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((logs.into_iter().map(Into::into).collect(), total))
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, params: &ActionLogQueryParams) {
    query.push(" WHERE TRUE");
    if let Some(user_id) = params.user_id {
        query.push(" AND l.user_id = ").push_bind(user_id);
    }
    if let Some(entity) = &params.entity {
        query.push(" AND l.entity = ").push_bind(entity.clone());
    }
    if let Some(entity_id) = params.entity_id {
        query.push(" AND l.entity_id = ").push_bind(entity_id);
    }
    if let Some(from) = params.from_date {
        query.push(" AND l.action_time::date >= ").push_bind(from);
    }
    if let Some(to) = params.to_date {
        query.push(" AND l.action_time::date <= ").push_bind(to);
    }
}
