use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::database::{constraint_violation, contains_pattern, ConstraintViolation};
use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditEntity};
use crate::features::audit::AuditRecorder;
use crate::features::courses::dtos::{
    CourseDraft, CourseHistoryDto, CoursePatchDto, CourseQueryParams, CourseResponseDto,
};
use crate::features::courses::models::{Course, CourseHistory, CourseOption, HistoryType};
use crate::features::users::services::has_role;
use crate::shared::constants::{
    COURSE_HISTORY_LIMIT, PREMIUM_PRICE, ROLE_TEACHER, UPCOMING_WINDOW_DAYS,
};
use crate::shared::validation::FieldErrors;

const COURSE_SELECT: &str = r#"
    SELECT co.id, co.category_id, c.name AS category_name,
           co.teacher_id, u.username AS teacher_username,
           co.title, co.description, co.price, co.level,
           co.start_date, co.end_date, co.is_published,
           co.image_key, co.image_url,
           co.created_at, co.updated_at
    FROM courses co
    JOIN categories c ON c.id = co.category_id
    LEFT JOIN users u ON u.id = co.teacher_id
"#;

/// Which slice of the catalog a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseScope {
    All,
    /// Starting between today and a week from today
    Upcoming,
    /// Published premium courses, plus anything starting tomorrow
    PremiumOrTomorrow,
    /// Published courses not taught by this user (untaught ones included)
    ForeignPublished(Uuid),
    Category(Uuid),
}

/// Service for course catalog operations
pub struct CourseService {
    pool: PgPool,
    audit: Arc<AuditRecorder>,
}

impl CourseService {
    pub fn new(pool: PgPool, audit: Arc<AuditRecorder>) -> Self {
        Self { pool, audit }
    }

    /// List courses within `scope`, filtered and ordered by `params`.
    ///
    /// `viewer` is the caller; `mine=1` without a viewer matches nothing.
    pub async fn list(
        &self,
        scope: CourseScope,
        params: &CourseQueryParams,
        viewer: Option<Uuid>,
    ) -> Result<(Vec<CourseResponseDto>, i64)> {
        let ordering = params.ordering()?;
        let today = Utc::now().date_naive();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses co");
        push_filters(&mut count_query, scope, params, viewer, today);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count courses: {:?}", e);
                AppError::Database(e)
            })?;

        let mut query = QueryBuilder::<Postgres>::new(COURSE_SELECT);
        push_filters(&mut query, scope, params, viewer, today);
        query
            .push(" ORDER BY ")
            .push(ordering.sql())
            .push(" LIMIT ")
            .push_bind(params.pagination().limit())
            .push(" OFFSET ")
            .push_bind(params.pagination().offset());

        let courses: Vec<Course> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list courses: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((courses.into_iter().map(Into::into).collect(), total))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Course>> {
        let query = format!("{COURSE_SELECT} WHERE co.id = $1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get course: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Every course, for select boxes
    pub async fn options(&self) -> Result<Vec<CourseOption>> {
        sqlx::query_as::<_, CourseOption>(
            r#"
            SELECT co.id, co.title, c.name AS category_name
            FROM courses co
            JOIN categories c ON c.id = co.category_id
            ORDER BY co.title, c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list course options: {:?}", e);
            AppError::Database(e)
        })
    }

    /// Case-insensitive lookup of a title within a category
    pub async fn find_by_title(&self, category_id: Uuid, title: &str) -> Result<Option<CourseResponseDto>> {
        let query = format!("{COURSE_SELECT} WHERE co.category_id = $1 AND LOWER(co.title) = LOWER($2)");
        let course: Option<Course> = sqlx::query_as(&query)
            .bind(category_id)
            .bind(title.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(course.map(Into::into))
    }

    pub async fn get(&self, id: Uuid) -> Result<CourseResponseDto> {
        self.find(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| not_found(id))
    }

    /// Create a course. `actor` is `None` for system writes (seeding).
    pub async fn create(&self, actor: Option<Uuid>, draft: CourseDraft) -> Result<CourseResponseDto> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        check_references(&mut tx, &draft).await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO courses (
                category_id, teacher_id, title, description, price, level,
                start_date, end_date, is_published
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(draft.category_id)
        .bind(draft.teacher_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.level)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.is_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &draft.title))?;

        write_history(&mut tx, id, HistoryType::Created, actor).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Course created: id={}, title={}", id, draft.title);
        self.audit
            .record(actor, AuditAction::Created, AuditEntity::Course, Some(id))
            .await;

        self.get(id).await
    }

    /// Full replace
    pub async fn update(&self, actor: Uuid, id: Uuid, draft: CourseDraft) -> Result<CourseResponseDto> {
        self.write_update(actor, id, move |_| Ok(draft)).await
    }

    /// Partial update; rules are checked against the merged record
    pub async fn patch(&self, actor: Uuid, id: Uuid, patch: CoursePatchDto) -> Result<CourseResponseDto> {
        self.write_update(actor, id, move |current| {
            patch.merge(current).into_draft().map_err(AppError::from)
        })
        .await
    }

    async fn write_update<F>(&self, actor: Uuid, id: Uuid, build: F) -> Result<CourseResponseDto>
    where
        F: FnOnce(&Course) -> Result<CourseDraft>,
    {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let query = format!("{COURSE_SELECT} WHERE co.id = $1 FOR UPDATE OF co");
        let current: Course = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| not_found(id))?;

        let draft = build(&current)?;
        check_references(&mut tx, &draft).await?;

        sqlx::query(
            r#"
            UPDATE courses
            SET category_id = $2, teacher_id = $3, title = $4, description = $5,
                price = $6, level = $7, start_date = $8, end_date = $9,
                is_published = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(draft.category_id)
        .bind(draft.teacher_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.level)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.is_published)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &draft.title))?;

        write_history(&mut tx, id, HistoryType::Changed, Some(actor)).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Course updated: id={}", id);
        self.audit
            .record(Some(actor), AuditAction::Updated, AuditEntity::Course, Some(id))
            .await;

        self.get(id).await
    }

    /// Delete a course together with its enrollments
    pub async fn delete(&self, actor: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        if locked.is_none() {
            return Err(not_found(id));
        }

        write_history(&mut tx, id, HistoryType::Deleted, Some(actor)).await?;

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete course: {:?}", e);
                AppError::Database(e)
            })?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Course deleted: id={}", id);
        self.audit
            .record(Some(actor), AuditAction::Deleted, AuditEntity::Course, Some(id))
            .await;

        Ok(())
    }

    /// Point the course at a new cover image, or clear it with `None`.
    ///
    /// Returns the updated course and the storage key it replaced.
    pub async fn set_image(
        &self,
        actor: Uuid,
        id: Uuid,
        image: Option<(String, String)>,
    ) -> Result<(CourseResponseDto, Option<String>)> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT image_key FROM courses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        let Some(previous) = previous else {
            return Err(not_found(id));
        };

        let (key, url) = image.unzip();
        sqlx::query(
            "UPDATE courses SET image_key = $2, image_url = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(key)
        .bind(url)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update course image: {:?}", e);
            AppError::Database(e)
        })?;

        write_history(&mut tx, id, HistoryType::Changed, Some(actor)).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Course image updated: id={}", id);
        self.audit
            .record(Some(actor), AuditAction::Updated, AuditEntity::Course, Some(id))
            .await;

        Ok((self.get(id).await?, previous))
    }

    /// Most recent snapshots first
    pub async fn history(&self, id: Uuid) -> Result<Vec<CourseHistoryDto>> {
        if self.find(id).await?.is_none() {
            return Err(not_found(id));
        }

        let history = sqlx::query_as::<_, CourseHistory>(
            r#"
            SELECT h.history_id, h.course_id, h.revision, h.history_type, h.history_date,
                   h.history_user_id, u.username AS history_username,
                   h.title, h.price, h.level, h.start_date, h.end_date, h.is_published,
                   h.image_url
            FROM course_history h
            LEFT JOIN users u ON u.id = h.history_user_id
            WHERE h.course_id = $1
            ORDER BY h.history_date DESC, h.history_id DESC
            LIMIT $2
            "#,
        )
        .bind(id)
        .bind(COURSE_HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load course history: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(history.into_iter().map(Into::into).collect())
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Course with id {} not found", id))
}

/// Category must exist and the teacher must hold the Teacher role
async fn check_references(conn: &mut PgConnection, draft: &CourseDraft) -> Result<()> {
    let mut errors = FieldErrors::new();

    let category_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(draft.category_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(AppError::Database)?;
    if !category_exists {
        errors.add("category_id", "category does not exist");
    }

    if let Some(teacher_id) = draft.teacher_id {
        let eligible = has_role(&mut *conn, teacher_id, ROLE_TEACHER)
            .await
            .map_err(AppError::Database)?;
        if !eligible {
            errors.add("teacher_id", "user does not have the Teacher role");
        }
    }

    errors.into_result().map_err(AppError::from)
}

/// Snapshot the current row of `course_id` as the next revision
async fn write_history(
    conn: &mut PgConnection,
    course_id: Uuid,
    kind: HistoryType,
    actor: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO course_history (
            course_id, revision, history_type, history_user_id,
            title, description, category_id, teacher_id, price, level,
            start_date, end_date, is_published, image_url
        )
        SELECT co.id,
               COALESCE((SELECT MAX(h.revision) FROM course_history h WHERE h.course_id = co.id), 0) + 1,
               $2, $3,
               co.title, co.description, co.category_id, co.teacher_id, co.price, co.level,
               co.start_date, co.end_date, co.is_published, co.image_url
        FROM courses co
        WHERE co.id = $1
        "#,
    )
    .bind(course_id)
    .bind(kind.as_str())
    .bind(actor)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to write course history for {}: {:?}", course_id, e);
        AppError::Database(e)
    })?;

    Ok(())
}

fn map_write_error(e: sqlx::Error, title: &str) -> AppError {
    match constraint_violation(&e) {
        Some(ConstraintViolation::Unique(_)) => AppError::conflict(
            "title",
            format!("Course '{}' already exists in this category", title),
        ),
        Some(ConstraintViolation::ForeignKey(constraint)) => {
            let field = match constraint.as_deref() {
                Some(c) if c.contains("teacher") => "teacher_id",
                _ => "category_id",
            };
            AppError::Validation(FieldErrors::single(field, "referenced record no longer exists"))
        }
        None => {
            tracing::error!("Failed to write course: {:?}", e);
            AppError::Database(e)
        }
    }
}

fn push_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    scope: CourseScope,
    params: &CourseQueryParams,
    viewer: Option<Uuid>,
    today: NaiveDate,
) {
    query.push(" WHERE TRUE");

    match scope {
        CourseScope::All => {}
        CourseScope::Upcoming => {
            let window_end = today
                .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
                .unwrap_or(NaiveDate::MAX);
            query
                .push(" AND co.start_date BETWEEN ")
                .push_bind(today)
                .push(" AND ")
                .push_bind(window_end);
        }
        CourseScope::PremiumOrTomorrow => {
            let tomorrow = today.succ_opt().unwrap_or(NaiveDate::MAX);
            query
                .push(" AND ((co.price >= ")
                .push_bind(Decimal::from(PREMIUM_PRICE))
                .push(" AND co.is_published) OR co.start_date = ")
                .push_bind(tomorrow)
                .push(")");
        }
        CourseScope::ForeignPublished(user_id) => {
            query
                .push(" AND co.teacher_id IS DISTINCT FROM ")
                .push_bind(user_id)
                .push(" AND co.is_published");
        }
        CourseScope::Category(category_id) => {
            query.push(" AND co.category_id = ").push_bind(category_id);
        }
    }

    if let Some(category_id) = params.category_id {
        query.push(" AND co.category_id = ").push_bind(category_id);
    }
    if let Some(teacher_id) = params.teacher_id {
        query.push(" AND co.teacher_id = ").push_bind(teacher_id);
    }
    if let Some(level) = params.level {
        query.push(" AND co.level = ").push_bind(level);
    }
    if let Some(is_published) = params.is_published {
        query.push(" AND co.is_published = ").push_bind(is_published);
    }
    if let Some(price) = params.price {
        query.push(" AND co.price = ").push_bind(price);
    }
    if let Some(date) = params.start_date {
        query.push(" AND co.start_date = ").push_bind(date);
    }
    if let Some(date) = params.end_date {
        query.push(" AND co.end_date = ").push_bind(date);
    }
    if let Some(date) = params.start_date_after {
        query.push(" AND co.start_date >= ").push_bind(date);
    }
    if let Some(date) = params.start_date_before {
        query.push(" AND co.start_date <= ").push_bind(date);
    }
    if let Some(date) = params.end_date_after {
        query.push(" AND co.end_date >= ").push_bind(date);
    }
    if let Some(date) = params.end_date_before {
        query.push(" AND co.end_date <= ").push_bind(date);
    }
    if let Some(search) = params.search() {
        let pattern = contains_pattern(search);
        query
            .push(" AND (co.title ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR co.description ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
    if params.mine() {
        match viewer {
            Some(user_id) => {
                query.push(" AND co.teacher_id = ").push_bind(user_id);
            }
            None => {
                query.push(" AND FALSE");
            }
        }
    }
}
