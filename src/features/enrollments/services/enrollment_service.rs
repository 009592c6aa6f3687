use std::sync::Arc;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::database::{constraint_violation, ConstraintViolation};
use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditAction, AuditEntity};
use crate::features::audit::AuditRecorder;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{enrollment_owner, Actor, Permission, Subject};
use crate::features::enrollments::dtos::{
    CreateEnrollmentDto, EnrollmentQueryParams, EnrollmentResponseDto, RosterEntryDto,
};
use crate::features::enrollments::models::{Enrollment, EnrollmentStatus, RosterEntry};
use crate::shared::validation::FieldErrors;

const ENROLLMENT_SELECT: &str = r#"
    SELECT e.id, e.user_id, u.username, e.course_id, co.title AS course_title,
           c.name AS category_name, co.teacher_id AS course_teacher_id,
           e.status, e.enrolled_at
    FROM enrollments e
    JOIN users u ON u.id = e.user_id
    JOIN courses co ON co.id = e.course_id
    JOIN categories c ON c.id = co.category_id
"#;

/// Service for the enrollment lifecycle
pub struct EnrollmentService {
    pool: PgPool,
    audit: Arc<AuditRecorder>,
}

impl EnrollmentService {
    pub fn new(pool: PgPool, audit: Arc<AuditRecorder>) -> Self {
        Self { pool, audit }
    }

    /// Get-or-create the caller's enrollment in a course.
    ///
    /// Returns the row and whether it was created by this call. Concurrent
    /// callers for the same pair all observe the single stored row.
    pub async fn enroll(&self, user: &AuthenticatedUser, course_id: Uuid) -> Result<(EnrollmentResponseDto, bool)> {
        let course_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1)")
                .bind(course_id)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::Database)?;
        if !course_exists {
            return Err(course_not_found(course_id));
        }

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO enrollments (user_id, course_id, status)
            VALUES ($1, $2, 'active')
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user.user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(ConstraintViolation::ForeignKey(_)) => course_not_found(course_id),
            _ => {
                tracing::error!("Failed to enroll: {:?}", e);
                AppError::Database(e)
            }
        })?;

        let created = inserted.is_some();
        let id = match inserted {
            Some(id) => id,
            None => sqlx::query_scalar(
                "SELECT id FROM enrollments WHERE user_id = $1 AND course_id = $2",
            )
            .bind(user.user_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            // The conflicting row was deleted between the two statements
            .ok_or_else(|| AppError::conflict("course_id", "Enrollment changed concurrently, retry"))?,
        };

        if created {
            tracing::info!(
                "Enrollment created: id={}, user={}, course={}",
                id,
                user.user_id,
                course_id
            );
            self.audit
                .record(Some(user.user_id), AuditAction::Enrolled, AuditEntity::Enrollment, Some(id))
                .await;
        }

        let enrollment = self.load(id).await?.ok_or_else(|| not_found(id))?;
        Ok((enrollment.into(), created))
    }

    /// Administrative create; an existing pair is a conflict
    pub async fn create(&self, actor: &AuthenticatedUser, dto: CreateEnrollmentDto) -> Result<EnrollmentResponseDto> {
        let owner = enrollment_owner(actor, dto.user_id)?;

        if !dto.status.is_writable() {
            return Err(FieldErrors::single("status", "must be active or finished").into());
        }
        if dto.status != EnrollmentStatus::Active {
            Actor::from(actor.clone()).authorize(Permission::AdministerEnrollment, &Subject::NONE)?;
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO enrollments (user_id, course_id, status)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(dto.course_id)
        .bind(dto.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match constraint_violation(&e) {
            Some(ConstraintViolation::Unique(_)) => {
                AppError::conflict("course_id", "User is already enrolled in this course")
            }
            Some(ConstraintViolation::ForeignKey(constraint)) => {
                let field = match constraint.as_deref() {
                    Some(c) if c.contains("user") => "user_id",
                    _ => "course_id",
                };
                AppError::Validation(FieldErrors::single(field, "referenced record does not exist"))
            }
            None => {
                tracing::error!("Failed to create enrollment: {:?}", e);
                AppError::Database(e)
            }
        })?;

        tracing::info!("Enrollment created: id={}, user={}, course={}", id, owner, dto.course_id);
        self.audit
            .record(Some(actor.user_id), AuditAction::Created, AuditEntity::Enrollment, Some(id))
            .await;

        self.get(&Actor::from(actor.clone()), id).await
    }

    /// Enrollments visible to `actor`, filtered and ordered by `params`
    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        params: &EnrollmentQueryParams,
    ) -> Result<(Vec<EnrollmentResponseDto>, i64)> {
        let order = params.order_sql().ok_or_else(|| {
            AppError::from(FieldErrors::single(
                "ordering",
                "unknown ordering; use enrolled_at or -enrolled_at",
            ))
        })?;

        let mut count_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM enrollments e JOIN courses co ON co.id = e.course_id",
        );
        push_filters(&mut count_query, actor, params);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count enrollments: {:?}", e);
                AppError::Database(e)
            })?;

        let mut query = QueryBuilder::<Postgres>::new(ENROLLMENT_SELECT);
        push_filters(&mut query, actor, params);
        query
            .push(" ORDER BY ")
            .push(order)
            .push(" LIMIT ")
            .push_bind(params.pagination().limit())
            .push(" OFFSET ")
            .push_bind(params.pagination().offset());

        let enrollments: Vec<Enrollment> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list enrollments: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((enrollments.into_iter().map(Into::into).collect(), total))
    }

    /// Detail; enrollments the actor may not see are reported as missing
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<EnrollmentResponseDto> {
        let enrollment = self.load(id).await?.ok_or_else(|| not_found(id))?;
        ensure_visible(actor, &enrollment.subject(), id)?;
        Ok(enrollment.into())
    }

    /// The user's enrollment in a course, if any
    pub async fn find_for(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<EnrollmentResponseDto>> {
        let query = format!("{ENROLLMENT_SELECT} WHERE e.user_id = $1 AND e.course_id = $2");
        let enrollment: Option<Enrollment> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(enrollment.map(Into::into))
    }

    /// active -> finished. Finishing a finished enrollment changes nothing.
    pub async fn finish(&self, actor: &Actor, id: Uuid) -> Result<EnrollmentResponseDto> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let enrollment = lock(&mut tx, id).await?;
        ensure_visible(actor, &enrollment.subject(), id)?;
        actor.authorize(Permission::FinishEnrollment, &enrollment.subject())?;

        let changed = match enrollment.status {
            EnrollmentStatus::Active => true,
            EnrollmentStatus::Finished => false,
            EnrollmentStatus::Canceled => {
                return Err(FieldErrors::single("status", "a canceled enrollment cannot be finished").into());
            }
        };

        if changed {
            set_status(&mut tx, id, EnrollmentStatus::Finished).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;

        if changed {
            tracing::info!("Enrollment finished: id={}", id);
            self.audit
                .record(actor.user_id(), AuditAction::Finished, AuditEntity::Enrollment, Some(id))
                .await;
        }

        self.get(actor, id).await
    }

    /// Withdraw from a course by deleting the active enrollment
    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let enrollment = lock(&mut tx, id).await?;
        ensure_visible(actor, &enrollment.subject(), id)?;
        actor.authorize(Permission::CancelEnrollment, &enrollment.subject())?;

        if enrollment.status != EnrollmentStatus::Active {
            return Err(FieldErrors::single("status", "only active enrollments can be canceled").into());
        }

        delete_row(&mut tx, id).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Enrollment canceled: id={}", id);
        self.audit
            .record(actor.user_id(), AuditAction::Canceled, AuditEntity::Enrollment, Some(id))
            .await;

        Ok(())
    }

    /// Administrative status change (staff)
    pub async fn update_status(&self, actor: &Actor, id: Uuid, status: EnrollmentStatus) -> Result<EnrollmentResponseDto> {
        actor.authorize(Permission::AdministerEnrollment, &Subject::NONE)?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let enrollment = lock(&mut tx, id).await?;

        if !enrollment.status.can_become(status) {
            return Err(FieldErrors::single(
                "status",
                format!("cannot change status from {} to {}", enrollment.status, status),
            )
            .into());
        }

        let changed = enrollment.status != status;
        if changed {
            set_status(&mut tx, id, status).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;

        if changed {
            tracing::info!("Enrollment updated: id={}, status={}", id, status);
            self.audit
                .record(actor.user_id(), AuditAction::Updated, AuditEntity::Enrollment, Some(id))
                .await;
        }

        self.get(actor, id).await
    }

    /// Administrative delete (staff), whatever the state
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
        actor.authorize(Permission::AdministerEnrollment, &Subject::NONE)?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        lock(&mut tx, id).await?;
        delete_row(&mut tx, id).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Enrollment deleted: id={}", id);
        self.audit
            .record(actor.user_id(), AuditAction::Deleted, AuditEntity::Enrollment, Some(id))
            .await;

        Ok(())
    }

    /// Students of a course, newest first (staff or the course teacher)
    pub async fn roster(&self, actor: &Actor, course_id: Uuid) -> Result<Vec<RosterEntryDto>> {
        let teacher: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT teacher_id FROM courses WHERE id = $1")
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::Database)?;
        let teacher_id = teacher.ok_or_else(|| course_not_found(course_id))?;

        actor.authorize(Permission::ViewRoster, &Subject::course(teacher_id))?;

        let roster = sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT e.id, e.user_id, u.username, e.status, e.enrolled_at
            FROM enrollments e
            JOIN users u ON u.id = e.user_id
            WHERE e.course_id = $1
            ORDER BY e.enrolled_at DESC, e.id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load roster: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(roster.into_iter().map(Into::into).collect())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Enrollment>> {
        let query = format!("{ENROLLMENT_SELECT} WHERE e.id = $1");
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get enrollment: {:?}", e);
                AppError::Database(e)
            })
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Enrollment with id {} not found", id))
}

/// Enrollments outside the actor's view are reported as missing, not forbidden
fn ensure_visible(actor: &Actor, subject: &Subject, id: Uuid) -> Result<()> {
    if actor.can(Permission::ViewEnrollment, subject) {
        Ok(())
    } else {
        Err(not_found(id))
    }
}

fn course_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Course with id {} not found", id))
}

async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Enrollment> {
    let query = format!("{ENROLLMENT_SELECT} WHERE e.id = $1 FOR UPDATE OF e");
    sqlx::query_as::<_, Enrollment>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| not_found(id))
}

async fn set_status(conn: &mut PgConnection, id: Uuid, status: EnrollmentStatus) -> Result<()> {
    sqlx::query("UPDATE enrollments SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update enrollment status: {:?}", e);
            AppError::Database(e)
        })?;
    Ok(())
}

async fn delete_row(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM enrollments WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete enrollment: {:?}", e);
            AppError::Database(e)
        })?;
    Ok(())
}

fn push_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    actor: &AuthenticatedUser,
    params: &EnrollmentQueryParams,
) {
    query.push(" WHERE TRUE");

    if !actor.is_staff {
        query
            .push(" AND (e.user_id = ")
            .push_bind(actor.user_id)
            .push(" OR co.teacher_id = ")
            .push_bind(actor.user_id)
            .push(")");
    }
    if params.mine() {
        query.push(" AND e.user_id = ").push_bind(actor.user_id);
    }
    if let Some(status) = params.status {
        query.push(" AND e.status = ").push_bind(status);
    }
    if let Some(course_id) = params.course_id {
        query.push(" AND e.course_id = ").push_bind(course_id);
    }
    if let Some(user_id) = params.user_id {
        query.push(" AND e.user_id = ").push_bind(user_id);
    }
    if let Some(date) = params.enrolled_after {
        query.push(" AND e.enrolled_at::date >= ").push_bind(date);
    }
    if let Some(date) = params.enrolled_before {
        query.push(" AND e.enrolled_at::date <= ").push_bind(date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::courses::CourseService;
    use crate::shared::test_helpers::{
        course_draft, insert_category, insert_teacher, insert_user, student_user, user,
    };

    struct Fixture {
        enrollments: EnrollmentService,
        course_id: Uuid,
        teacher: AuthenticatedUser,
    }

    async fn fixture(pool: &PgPool) -> Fixture {
        let audit = Arc::new(AuditRecorder::new(pool.clone()));
        let teacher = insert_teacher(pool).await;
        let category_id = insert_category(pool, "Backend").await;
        let course = CourseService::new(pool.clone(), audit.clone())
            .create(None, course_draft(category_id, Some(teacher.user_id), "Go Basics"))
            .await
            .unwrap();
        Fixture {
            enrollments: EnrollmentService::new(pool.clone(), audit),
            course_id: course.id,
            teacher,
        }
    }

    #[test]
    fn test_foreign_enrollments_look_missing() {
        let owner = student_user();
        let teacher = user(false, &["Teacher"]);
        let subject = Subject::enrollment(owner.user_id, Some(teacher.user_id));
        let id = Uuid::new_v4();

        assert!(ensure_visible(&Actor::from(owner), &subject, id).is_ok());
        assert!(ensure_visible(&Actor::from(teacher), &subject, id).is_ok());
        assert!(matches!(
            ensure_visible(&Actor::from(student_user()), &subject, id),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ensure_visible(&Actor::Anonymous, &subject, id),
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_enroll_then_finish_twice(pool: PgPool) {
        let f = fixture(&pool).await;
        let student = insert_user(&pool, false).await;
        let staff = Actor::from(insert_user(&pool, true).await);

        let (first, created) = f.enrollments.enroll(&student, f.course_id).await.unwrap();
        assert!(created);
        assert_eq!(first.status, EnrollmentStatus::Active);
        assert_eq!(first.course_title, "Go Basics");
        assert_eq!(first.category_name, "Backend");

        let (again, created) = f.enrollments.enroll(&student, f.course_id).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);
        assert_eq!(again.status, EnrollmentStatus::Active);

        let finished = f.enrollments.finish(&staff, first.id).await.unwrap();
        assert_eq!(finished.status, EnrollmentStatus::Finished);
        let finished = f.enrollments.finish(&staff, first.id).await.unwrap();
        assert_eq!(finished.status, EnrollmentStatus::Finished);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_concurrent_enrollments_share_one_row(pool: PgPool) {
        let f = fixture(&pool).await;
        let student = insert_user(&pool, false).await;

        let (a, b) = tokio::join!(
            f.enrollments.enroll(&student, f.course_id),
            f.enrollments.enroll(&student, f.course_id),
        );
        let (a, a_created) = a.unwrap();
        let (b, b_created) = b.unwrap();

        assert_eq!(a.id, b.id);
        assert!(a_created ^ b_created);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
            .bind(f.course_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_strangers_cannot_see_finish_or_cancel(pool: PgPool) {
        let f = fixture(&pool).await;
        let student = insert_user(&pool, false).await;
        let stranger = Actor::from(insert_user(&pool, false).await);
        let (enrollment, _) = f.enrollments.enroll(&student, f.course_id).await.unwrap();

        for result in [
            f.enrollments.get(&stranger, enrollment.id).await.map(|_| ()),
            f.enrollments.finish(&stranger, enrollment.id).await.map(|_| ()),
            f.enrollments.cancel(&stranger, enrollment.id).await,
        ] {
            assert!(matches!(result, Err(AppError::NotFound(_))), "{result:?}");
        }

        // The teacher sees the enrollment but may not act on it
        let teacher = Actor::from(f.teacher.clone());
        assert!(f.enrollments.get(&teacher, enrollment.id).await.is_ok());
        assert!(matches!(
            f.enrollments.finish(&teacher, enrollment.id).await,
            Err(AppError::Forbidden(_))
        ));

        f.enrollments
            .cancel(&Actor::from(student), enrollment.id)
            .await
            .unwrap();
        assert!(f.enrollments.load(enrollment.id).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_roster_limited_to_staff_and_teacher(pool: PgPool) {
        let f = fixture(&pool).await;
        let student = insert_user(&pool, false).await;
        f.enrollments.enroll(&student, f.course_id).await.unwrap();

        let roster = f
            .enrollments
            .roster(&Actor::from(f.teacher.clone()), f.course_id)
            .await
            .unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].username, student.username);

        let stranger = Actor::from(insert_user(&pool, false).await);
        assert!(matches!(
            f.enrollments.roster(&stranger, f.course_id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.enrollments.roster(&Actor::Anonymous, f.course_id).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
