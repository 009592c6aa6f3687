use std::sync::Arc;

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::database::{constraint_violation, contains_pattern, ConstraintViolation};
use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditEntity};
use crate::features::audit::AuditRecorder;
use crate::features::categories::dtos::{CategoryDraft, CategoryQueryParams, CategoryResponseDto};
use crate::features::categories::models::{Category, CategoryOption};

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.name, c.description,
           (SELECT COUNT(*) FROM courses co WHERE co.category_id = c.id) AS course_count,
           c.created_at, c.updated_at
    FROM categories c
"#;

/// Service for category operations
pub struct CategoryService {
    pool: PgPool,
    audit: Arc<AuditRecorder>,
}

impl CategoryService {
    pub fn new(pool: PgPool, audit: Arc<AuditRecorder>) -> Self {
        Self { pool, audit }
    }

    /// List categories ordered by name
    pub async fn list(&self, params: &CategoryQueryParams) -> Result<(Vec<CategoryResponseDto>, i64)> {
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories c");
        push_search(&mut count_query, search);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count categories: {:?}", e);
                AppError::Database(e)
            })?;

        let mut query = QueryBuilder::<Postgres>::new(CATEGORY_SELECT);
        push_search(&mut query, search);
        query
            .push(" ORDER BY c.name LIMIT ")
            .push_bind(params.pagination().limit())
            .push(" OFFSET ")
            .push_bind(params.pagination().offset());

        let categories: Vec<Category> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list categories: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((categories.into_iter().map(Into::into).collect(), total))
    }

    /// Every category, for filters and select boxes
    pub async fn options(&self) -> Result<Vec<CategoryOption>> {
        sqlx::query_as::<_, CategoryOption>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list category options: {:?}", e);
                AppError::Database(e)
            })
    }

    /// Case-insensitive lookup by name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<CategoryResponseDto>> {
        let query = format!("{CATEGORY_SELECT} WHERE LOWER(c.name) = LOWER($1)");
        let category: Option<Category> = sqlx::query_as(&query)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(category.map(Into::into))
    }

    pub async fn get(&self, id: Uuid) -> Result<CategoryResponseDto> {
        let query = format!("{CATEGORY_SELECT} WHERE c.id = $1");
        let category: Option<Category> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category: {:?}", e);
                AppError::Database(e)
            })?;

        category
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    /// Create a category. `actor` is `None` for system writes (seeding).
    pub async fn create(&self, actor: Option<Uuid>, draft: CategoryDraft) -> Result<CategoryResponseDto> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &draft.name))?;

        tracing::info!("Category created: id={}, name={}", id, draft.name);
        self.audit
            .record(actor, AuditAction::Created, AuditEntity::Category, Some(id))
            .await;

        self.get(id).await
    }

    pub async fn update(&self, actor: Uuid, id: Uuid, draft: CategoryDraft) -> Result<CategoryResponseDto> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE categories
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &draft.name))?;

        if updated.is_none() {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }

        tracing::info!("Category updated: id={}", id);
        self.audit
            .record(Some(actor), AuditAction::Updated, AuditEntity::Category, Some(id))
            .await;

        self.get(id).await
    }

    /// Delete a category together with its courses (and their enrollments)
    pub async fn delete(&self, actor: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Courses vanish through the cascade; keep their history complete.
        sqlx::query(
            r#"
            INSERT INTO course_history (
                course_id, revision, history_type, history_user_id,
                title, description, category_id, teacher_id, price, level,
                start_date, end_date, is_published, image_url
            )
            SELECT co.id,
                   COALESCE((SELECT MAX(h.revision) FROM course_history h WHERE h.course_id = co.id), 0) + 1,
                   '-', $2,
                   co.title, co.description, co.category_id, co.teacher_id, co.price, co.level,
                   co.start_date, co.end_date, co.is_published, co.image_url
            FROM courses co
            WHERE co.category_id = $1
            "#,
        )
        .bind(id)
        .bind(actor)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to snapshot courses of category {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete category: {:?}", e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Category deleted: id={}", id);
        self.audit
            .record(Some(actor), AuditAction::Deleted, AuditEntity::Category, Some(id))
            .await;

        Ok(())
    }
}

fn push_search<'a>(query: &mut QueryBuilder<'a, Postgres>, search: Option<&str>) {
    if let Some(search) = search {
        query
            .push(" WHERE c.name ILIKE ")
            .push_bind(contains_pattern(search))
            .push(r" ESCAPE '\'");
    }
}

fn map_write_error(e: sqlx::Error, name: &str) -> AppError {
    match constraint_violation(&e) {
        Some(ConstraintViolation::Unique(_)) => AppError::conflict(
            "name",
            format!("Category with name '{}' already exists", name),
        ),
        _ => {
            tracing::error!("Failed to write category: {:?}", e);
            AppError::Database(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::courses::CourseService;
    use crate::features::enrollments::EnrollmentService;
    use crate::shared::test_helpers::{category_draft, course_draft, insert_user};

    fn service(pool: &PgPool) -> CategoryService {
        CategoryService::new(pool.clone(), Arc::new(AuditRecorder::new(pool.clone())))
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_names_unique_ignoring_case(pool: PgPool) {
        let categories = service(&pool);
        categories.create(None, category_draft("Backend")).await.unwrap();

        let err = categories
            .create(None, category_draft("BACKEND"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { field, .. } if field == "name"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_delete_cascades_to_courses_and_enrollments(pool: PgPool) {
        let audit = Arc::new(AuditRecorder::new(pool.clone()));
        let categories = service(&pool);
        let courses = CourseService::new(pool.clone(), audit.clone());
        let enrollments = EnrollmentService::new(pool.clone(), audit);
        let staff = insert_user(&pool, true).await;
        let student = insert_user(&pool, false).await;

        let category = categories.create(None, category_draft("Backend")).await.unwrap();
        let course = courses
            .create(None, course_draft(category.id, None, "Go Basics"))
            .await
            .unwrap();
        enrollments.enroll(&student, course.id).await.unwrap();
        assert_eq!(categories.get(category.id).await.unwrap().course_count, 1);

        categories.delete(staff.user_id, category.id).await.unwrap();

        assert_eq!(count(&pool, "categories").await, 0);
        assert_eq!(count(&pool, "courses").await, 0);
        assert_eq!(count(&pool, "enrollments").await, 0);
        let last: String = sqlx::query_scalar(
            "SELECT history_type FROM course_history WHERE course_id = $1 ORDER BY revision DESC LIMIT 1",
        )
        .bind(course.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(last, "-");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_search_matches_percent_literally(pool: PgPool) {
        let categories = service(&pool);
        categories.create(None, category_draft("Backend")).await.unwrap();
        categories.create(None, category_draft("Full Stack % Ops")).await.unwrap();

        let params = CategoryQueryParams {
            page: 1,
            page_size: 10,
            search: Some("%".to_string()),
        };
        let (found, total) = categories.list(&params).await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(found[0].name, "Full Stack % Ops");
    }
}
