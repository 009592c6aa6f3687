use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::courses::models::{Course, CourseHistory, CourseLevel};
use crate::shared::validation::{validate_date_range, validate_name, validate_price, FieldErrors};

fn default_published() -> bool {
    true
}

/// Request body for creating or replacing a course
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CourseInputDto {
    pub category_id: Uuid,
    /// Must hold the Teacher role
    pub teacher_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: String,
    #[schema(value_type = String, example = "4000.00")]
    pub price: Decimal,
    #[serde(default)]
    pub level: CourseLevel,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

/// Course input that passed every field rule. Storage rules (title
/// uniqueness, category existence, teacher role) are checked on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub category_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub level: CourseLevel,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_published: bool,
}

impl CourseInputDto {
    /// Apply field and cross-field rules; all violations are reported together
    pub fn into_draft(self) -> Result<CourseDraft, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        let title = validate_name(&mut errors, "title", &self.title);
        validate_date_range(&mut errors, self.start_date, self.end_date);
        validate_price(&mut errors, self.price);
        errors.into_result()?;

        Ok(CourseDraft {
            category_id: self.category_id,
            teacher_id: self.teacher_id,
            title,
            description: self.description.trim().to_string(),
            price: self.price,
            level: self.level,
            start_date: self.start_date,
            end_date: self.end_date,
            is_published: self.is_published,
        })
    }
}

/// Distinguishes an absent field from an explicit `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request body for a partial update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CoursePatchDto {
    pub category_id: Option<Uuid>,
    /// `null` removes the teacher
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Uuid>)]
    pub teacher_id: Option<Option<Uuid>>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub level: Option<CourseLevel>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_published: Option<bool>,
}

impl CoursePatchDto {
    /// Overlay the patch on the stored course
    pub fn merge(self, current: &Course) -> CourseInputDto {
        CourseInputDto {
            category_id: self.category_id.unwrap_or(current.category_id),
            teacher_id: self.teacher_id.unwrap_or(current.teacher_id),
            title: self.title.unwrap_or_else(|| current.title.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            price: self.price.unwrap_or(current.price),
            level: self.level.unwrap_or(current.level),
            start_date: self.start_date.unwrap_or(current.start_date),
            end_date: self.end_date.unwrap_or(current.end_date),
            is_published: self.is_published.unwrap_or(current.is_published),
        }
    }
}

/// Response DTO for course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseResponseDto {
    pub id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub teacher_id: Option<Uuid>,
    pub teacher_username: Option<String>,
    pub title: String,
    pub description: String,
    #[schema(value_type = String, example = "4000.00")]
    pub price: Decimal,
    pub level: CourseLevel,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_published: bool,
    /// Cover image, if one was uploaded
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseResponseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            category_id: c.category_id,
            category_name: c.category_name,
            teacher_id: c.teacher_id,
            teacher_username: c.teacher_username,
            title: c.title,
            description: c.description,
            price: c.price,
            level: c.level,
            start_date: c.start_date,
            end_date: c.end_date,
            is_published: c.is_published,
            image_url: c.image_url,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// One entry of a course's change history
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseHistoryDto {
    pub history_id: i64,
    pub course_id: Uuid,
    pub revision: i32,
    /// `+` created, `~` changed, `-` deleted
    pub history_type: String,
    pub history_date: DateTime<Utc>,
    /// Id and username of the author; empty for system writes
    pub history_user_id: Option<Uuid>,
    pub history_user: Option<String>,
    pub title: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub level: CourseLevel,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_published: bool,
    pub image_url: Option<String>,
}

impl From<CourseHistory> for CourseHistoryDto {
    fn from(h: CourseHistory) -> Self {
        Self {
            history_id: h.history_id,
            course_id: h.course_id,
            revision: h.revision,
            history_type: h.history_type,
            history_date: h.history_date,
            history_user_id: h.history_user_id,
            history_user: h.history_username,
            title: h.title,
            price: h.price,
            level: h.level,
            start_date: h.start_date,
            end_date: h.end_date,
            is_published: h.is_published,
            image_url: h.image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;
    use serde_json::json;
    use std::str::FromStr;

    fn go_basics() -> CourseInputDto {
        CourseInputDto {
            category_id: Uuid::new_v4(),
            teacher_id: None,
            title: "Go Basics".to_string(),
            description: Sentence(3..8).fake(),
            price: Decimal::from(4000),
            level: CourseLevel::Beginner,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            is_published: true,
        }
    }

    fn stored(input: &CourseInputDto) -> Course {
        let now = Utc::now();
        Course {
            id: Uuid::new_v4(),
            category_id: input.category_id,
            category_name: "Backend".to_string(),
            teacher_id: Some(Uuid::new_v4()),
            teacher_username: Some("teacher".to_string()),
            title: input.title.clone(),
            description: input.description.clone(),
            price: input.price,
            level: input.level,
            start_date: input.start_date,
            end_date: input.end_date,
            is_published: input.is_published,
            image_key: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_valid_course_becomes_draft() {
        let draft = go_basics().into_draft().unwrap();
        assert_eq!(draft.title, "Go Basics");
        assert_eq!(draft.price, Decimal::from(4000));
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut input = go_basics();
        input.start_date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let errors = input.into_draft().unwrap_err();
        assert_eq!(errors.get("end_date").len(), 1);
    }

    #[test]
    fn test_smallest_positive_price_accepted() {
        let mut input = go_basics();
        input.price = Decimal::from_str("0.01").unwrap();
        assert!(input.into_draft().is_ok());

        let mut input = go_basics();
        input.price = Decimal::ZERO;
        assert_eq!(input.into_draft().unwrap_err().get("price").len(), 1);
    }

    #[test]
    fn test_all_violations_reported_together() {
        let mut input = go_basics();
        input.title = "Python 3".to_string();
        input.price = Decimal::from(-5);
        input.end_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let errors = input.into_draft().unwrap_err();
        assert!(!errors.get("title").is_empty());
        assert!(!errors.get("price").is_empty());
        assert!(!errors.get("end_date").is_empty());
    }

    #[test]
    fn test_patch_merges_over_stored_course() {
        let course = stored(&go_basics());
        let patch: CoursePatchDto =
            serde_json::from_value(json!({ "price": "4500.50", "teacher_id": null })).unwrap();

        let merged = patch.merge(&course);
        assert_eq!(merged.price, Decimal::from_str("4500.50").unwrap());
        assert_eq!(merged.teacher_id, None);
        assert_eq!(merged.title, course.title);
        assert_eq!(merged.start_date, course.start_date);
    }

    #[test]
    fn test_patch_without_teacher_keeps_teacher() {
        let course = stored(&go_basics());
        let patch: CoursePatchDto = serde_json::from_value(json!({ "title": "Go Advanced" })).unwrap();

        let merged = patch.merge(&course);
        assert_eq!(merged.teacher_id, course.teacher_id);
        assert_eq!(merged.title, "Go Advanced");
    }

    #[test]
    fn test_patch_cannot_invert_dates() {
        let course = stored(&go_basics());
        let patch: CoursePatchDto =
            serde_json::from_value(json!({ "end_date": "2024-12-31" })).unwrap();

        let errors = patch.merge(&course).into_draft().unwrap_err();
        assert_eq!(errors.get("end_date").len(), 1);
    }
}
