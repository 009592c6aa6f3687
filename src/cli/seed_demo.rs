use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::core::error::AppError;
use crate::features::audit::AuditRecorder;
use crate::features::categories::dtos::{CategoryDraft, CategoryResponseDto};
use crate::features::categories::CategoryService;
use crate::features::courses::dtos::{CourseInputDto, CourseResponseDto};
use crate::features::courses::models::CourseLevel;
use crate::features::courses::CourseService;
use crate::features::enrollments::EnrollmentService;
use crate::features::users::{RoleService, UserService};
use crate::shared::constants::ROLE_TEACHER;
use crate::shared::validation::PRICE_LIMIT;

const DEMO_CATEGORY: &str = "Программирование";
const BASE_PRICE: i64 = 3000;
const PRICE_STEP: i64 = 500;
const COURSE_LENGTH_DAYS: i64 = 30;
const START_SPACING_DAYS: i64 = 3;

#[derive(Debug, Default)]
struct SeedReport {
    users_created: usize,
    courses_created: usize,
    enrollments_created: usize,
}

/// Idempotently create a teacher, a student, one category and `count`
/// published courses the student is actively enrolled in.
pub async fn run(pool: PgPool, teacher: &str, student: &str, count: usize) -> anyhow::Result<()> {
    let audit = Arc::new(AuditRecorder::new(pool.clone()));
    let users = UserService::new(pool.clone());
    let roles = RoleService::new(pool.clone(), audit.clone());
    let categories = CategoryService::new(pool.clone(), audit.clone());
    let courses = CourseService::new(pool.clone(), audit.clone());
    let enrollments = EnrollmentService::new(pool, audit);

    let mut report = SeedReport::default();

    let (teacher, created) = users.get_or_create(teacher, false).await?;
    report.users_created += usize::from(created);
    let (student, created) = users.get_or_create(student, false).await?;
    report.users_created += usize::from(created);

    let (role, _) = roles.get_or_create(ROLE_TEACHER).await?;
    roles.add_member(None, role.id, teacher.id).await?;

    let category = demo_category(&categories).await?;
    let principal = users
        .find_principal(student.id)
        .await?
        .with_context(|| format!("user '{}' is inactive", student.username))?;

    let today = Utc::now().date_naive();
    for i in 0..count {
        let (offset, price) = demo_schedule(i);
        let start_date = today + Duration::days(offset);
        let input = CourseInputDto {
            category_id: category.id,
            teacher_id: Some(teacher.id),
            title: format!("Demo Course {}", letter_suffix(i)),
            description: "Demo course created by seed-demo".to_string(),
            price: Decimal::from(price),
            level: CourseLevel::Beginner,
            start_date,
            end_date: start_date + Duration::days(COURSE_LENGTH_DAYS),
            is_published: true,
        };

        let (course, created) = demo_course(&courses, input).await?;
        report.courses_created += usize::from(created);

        let (_, created) = enrollments.enroll(&principal, course.id).await?;
        report.enrollments_created += usize::from(created);
    }

    tracing::info!("Demo seed finished: {:?}", report);
    println!(
        "Created {} users, {} courses, {} enrollments",
        report.users_created, report.courses_created, report.enrollments_created
    );
    Ok(())
}

async fn demo_category(categories: &CategoryService) -> anyhow::Result<CategoryResponseDto> {
    let draft = CategoryDraft {
        name: DEMO_CATEGORY.to_string(),
        description: String::new(),
    };
    match categories.create(None, draft).await {
        Ok(category) => Ok(category),
        Err(AppError::Conflict { .. }) => categories
            .find_by_name(DEMO_CATEGORY)
            .await?
            .with_context(|| format!("category '{DEMO_CATEGORY}' disappeared")),
        Err(e) => Err(e.into()),
    }
}

/// Create the course, or return the existing one with the same title
async fn demo_course(courses: &CourseService, input: CourseInputDto) -> anyhow::Result<(CourseResponseDto, bool)> {
    let category_id = input.category_id;
    let draft = input
        .into_draft()
        .map_err(|errors| anyhow::anyhow!("invalid demo course: {errors}"))?;
    let title = draft.title.clone();

    match courses.create(None, draft).await {
        Ok(course) => Ok((course, true)),
        Err(AppError::Conflict { .. }) => {
            let course = courses
                .find_by_title(category_id, &title)
                .await?
                .with_context(|| format!("course '{title}' disappeared"))?;
            Ok((course, false))
        }
        Err(e) => Err(e.into()),
    }
}

/// Start offset in days and price of the `i`-th demo course. The first one
/// starts after today; prices cycle before reaching the price limit.
fn demo_schedule(i: usize) -> (i64, i64) {
    let steps = (PRICE_LIMIT - 1 - BASE_PRICE) / PRICE_STEP + 1;
    let i = i as i64;
    (START_SPACING_DAYS * (i + 1), BASE_PRICE + PRICE_STEP * (i % steps))
}

/// Bijective base-26 suffix: 0 -> "A", 25 -> "Z", 26 -> "AA".
/// Course titles may not contain digits.
fn letter_suffix(mut n: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::validation::name_violations;

    #[test]
    fn test_letter_suffix() {
        assert_eq!(letter_suffix(0), "A");
        assert_eq!(letter_suffix(25), "Z");
        assert_eq!(letter_suffix(26), "AA");
        assert_eq!(letter_suffix(27), "AB");
        assert_eq!(letter_suffix(701), "ZZ");
        assert_eq!(letter_suffix(702), "AAA");
    }

    #[test]
    fn test_demo_schedule_starts_after_today() {
        assert_eq!(demo_schedule(0), (3, 3000));
        assert_eq!(demo_schedule(1), (6, 3500));
    }

    #[test]
    fn test_demo_prices_stay_below_limit() {
        for i in [0, 1_000, 1_993, 1_994, 1_995, 50_000] {
            let (_, price) = demo_schedule(i);
            assert!(price > 0 && price < PRICE_LIMIT, "{i}: {price}");
        }
        assert_eq!(demo_schedule(1_993).1, 999_500);
        assert_eq!(demo_schedule(1_994).1, BASE_PRICE);
    }

    #[test]
    fn test_demo_names_pass_validation() {
        assert!(name_violations(DEMO_CATEGORY).is_empty());
        for i in [0, 5, 30, 800] {
            let title = format!("Demo Course {}", letter_suffix(i));
            assert!(name_violations(&title).is_empty(), "{title}");
        }
    }
}
