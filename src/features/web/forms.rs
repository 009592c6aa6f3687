//! HTML form bodies.
//!
//! Browsers post every field as text, so forms keep raw strings (to re-render
//! them on error) and are converted into the same drafts the API validates.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::auth::dto::{LoginRequestDto, RegisterRequestDto};
use crate::features::courses::dtos::{CourseDraft, CourseInputDto, CourseResponseDto};
use crate::features::courses::models::CourseLevel;
use crate::features::enrollments::models::EnrollmentStatus;
use crate::shared::validation::{validate_name, validate_price, FieldErrors};

fn required<T: FromStr>(errors: &mut FieldErrors, field: &str, raw: &str, invalid: &str) -> Option<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add(field, "this field is required");
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, invalid);
            None
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CourseForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    /// Checkbox: present ("on") when ticked, absent otherwise
    #[serde(default)]
    pub is_published: Option<String>,
}

impl CourseForm {
    /// Empty form for a new course
    pub fn blank() -> Self {
        Self {
            level: CourseLevel::default().as_str().to_string(),
            is_published: Some("on".to_string()),
            ..Default::default()
        }
    }

    pub fn from_course(course: &CourseResponseDto) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            category_id: course.category_id.to_string(),
            teacher_id: course.teacher_id.map(|id| id.to_string()).unwrap_or_default(),
            price: course.price.to_string(),
            level: course.level.as_str().to_string(),
            start_date: course.start_date.to_string(),
            end_date: course.end_date.to_string(),
            is_published: course.is_published.then(|| "on".to_string()),
        }
    }

    /// Parse and validate; every problem is reported at once
    pub fn into_draft(&self) -> Result<CourseDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let category_id: Option<Uuid> =
            required(&mut errors, "category_id", &self.category_id, "select a valid category");
        let teacher_id = match self.teacher_id.trim() {
            "" => None,
            raw => match raw.parse::<Uuid>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("teacher_id", "select a valid teacher");
                    None
                }
            },
        };
        let price: Option<Decimal> = required(&mut errors, "price", &self.price, "enter a number");
        let level: Option<CourseLevel> = required(&mut errors, "level", &self.level, "select a valid level");
        let start_date: Option<NaiveDate> =
            required(&mut errors, "start_date", &self.start_date, "enter a date as YYYY-MM-DD");
        let end_date: Option<NaiveDate> =
            required(&mut errors, "end_date", &self.end_date, "enter a date as YYYY-MM-DD");

        match (category_id, price, level, start_date, end_date) {
            (Some(category_id), Some(price), Some(level), Some(start_date), Some(end_date))
                if errors.is_empty() =>
            {
                CourseInputDto {
                    category_id,
                    teacher_id,
                    title: self.title.clone(),
                    description: self.description.clone(),
                    price,
                    level,
                    start_date,
                    end_date,
                    is_published: self.is_published.is_some(),
                }
                .into_draft()
            }
            (_, price, ..) => {
                validate_name(&mut errors, "title", &self.title);
                if let Some(price) = price {
                    validate_price(&mut errors, price);
                }
                Err(errors)
            }
        }
    }
}

/// Self-enrollment form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EnrollForm {
    #[serde(default)]
    pub course_id: String,
}

impl EnrollForm {
    pub fn course_id(&self) -> Result<Uuid, FieldErrors> {
        let mut errors = FieldErrors::new();
        let id = required(&mut errors, "course_id", &self.course_id, "select a valid course");
        id.ok_or(errors)
    }
}

/// Staff status edit
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EnrollmentStatusForm {
    #[serde(default)]
    pub status: String,
}

impl EnrollmentStatusForm {
    pub fn status(&self) -> Result<EnrollmentStatus, FieldErrors> {
        let mut errors = FieldErrors::new();
        let status = required(&mut errors, "status", &self.status, "select a valid status");
        status.ok_or(errors)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

impl LoginForm {
    pub fn credentials(&self) -> LoginRequestDto {
        LoginRequestDto {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// Account sign-up; the password is typed twice
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

impl SignupForm {
    pub fn into_registration(&self) -> Result<RegisterRequestDto, FieldErrors> {
        let email = self.email.trim();
        let dto = RegisterRequestDto {
            username: self.username.clone(),
            email: (!email.is_empty()).then(|| email.to_string()),
            password: self.password1.clone(),
        };

        let mut errors = dto.violations();
        if self.password1 != self.password2 {
            errors.add("password2", "the two password fields do not match");
        }
        errors.into_result()?;
        Ok(dto)
    }
}

/// Only same-site paths are followed after login
pub fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\") {
        next
    } else {
        "/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn go_basics() -> CourseForm {
        CourseForm {
            title: "Go Basics".to_string(),
            description: "Intro".to_string(),
            category_id: Uuid::new_v4().to_string(),
            teacher_id: String::new(),
            price: "4000".to_string(),
            level: "beginner".to_string(),
            start_date: "2025-01-10".to_string(),
            end_date: "2025-03-10".to_string(),
            is_published: None,
        }
    }

    #[test]
    fn test_valid_course_form() {
        let draft = go_basics().into_draft().unwrap();
        assert_eq!(draft.title, "Go Basics");
        assert_eq!(draft.price, Decimal::from(4000));
        assert_eq!(draft.teacher_id, None);
        assert!(!draft.is_published);
    }

    #[test]
    fn test_unparsable_fields_are_reported_with_name_rules() {
        let form = CourseForm {
            title: "Go 2".to_string(),
            price: "free".to_string(),
            start_date: "10/01/2025".to_string(),
            teacher_id: "nobody".to_string(),
            ..go_basics()
        };

        let errors = form.into_draft().unwrap_err();
        assert_eq!(errors.get("price"), ["enter a number".to_string()]);
        assert_eq!(errors.get("start_date").len(), 1);
        assert_eq!(errors.get("teacher_id").len(), 1);
        assert_eq!(errors.get("title"), ["must not contain digits".to_string()]);
    }

    #[test]
    fn test_cross_field_rules_apply_to_forms() {
        let form = CourseForm {
            start_date: "2025-03-10".to_string(),
            end_date: "2025-01-10".to_string(),
            price: "0".to_string(),
            ..go_basics()
        };

        let errors = form.into_draft().unwrap_err();
        assert_eq!(errors.get("end_date").len(), 1);
        assert_eq!(errors.get("price").len(), 1);
    }

    #[test]
    fn test_blank_form_defaults() {
        let form = CourseForm::blank();
        assert_eq!(form.level, "beginner");
        assert!(form.is_published.is_some());
        assert_eq!(form.into_draft().unwrap_err().get("title"), ["must not be empty".to_string()]);
    }

    #[test]
    fn test_status_form() {
        let form = EnrollmentStatusForm {
            status: "finished".to_string(),
        };
        assert_eq!(form.status().unwrap(), EnrollmentStatus::Finished);

        let form = EnrollmentStatusForm {
            status: "paused".to_string(),
        };
        assert!(!form.status().unwrap_err().get("status").is_empty());
    }

    #[test]
    fn test_signup_form_checks_password_confirmation() {
        let form = SignupForm {
            username: "maria".to_string(),
            email: String::new(),
            password1: "correct horse".to_string(),
            password2: "correct horsf".to_string(),
        };
        let errors = form.into_registration().unwrap_err();
        assert_eq!(errors.get("password2").len(), 1);
        assert!(errors.get("password").is_empty());

        let form = SignupForm {
            password2: "correct horse".to_string(),
            ..form
        };
        let dto = form.into_registration().unwrap();
        assert_eq!(dto.email, None);
        assert_eq!(dto.password, "correct horse");
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next("/courses?page=2"), "/courses?page=2");
        assert_eq!(safe_next("https://evil.test"), "/");
        assert_eq!(safe_next("//evil.test"), "/");
        assert_eq!(safe_next(""), "/");
    }
}
