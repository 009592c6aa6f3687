use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::Category;
use crate::shared::types::{default_page, default_page_size, PaginationQuery};
use crate::shared::validation::{validate_name, FieldErrors};

/// Request body for creating or replacing a category (also the web form)
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct CategoryInputDto {
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,
}

/// Category input that passed every field rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: String,
}

impl CategoryInputDto {
    /// Apply field rules; all violations are reported together
    pub fn into_draft(self) -> Result<CategoryDraft, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        let name = validate_name(&mut errors, "name", &self.name);
        errors.into_result()?;

        Ok(CategoryDraft {
            name,
            description: self.description.trim().to_string(),
        })
    }
}

/// Query params for listing categories
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CategoryQueryParams {
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Case-insensitive substring match on name
    pub search: Option<String>,
}

impl CategoryQueryParams {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.page_size)
    }
}

impl Default for CategoryQueryParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            search: None,
        }
    }
}

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub course_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            course_count: c.course_count,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> CategoryInputDto {
        CategoryInputDto {
            name: name.to_string(),
            description: "  About it  ".to_string(),
        }
    }

    #[test]
    fn test_draft_trims_fields() {
        let draft = input("  Backend ").into_draft().unwrap();
        assert_eq!(draft.name, "Backend");
        assert_eq!(draft.description, "About it");
    }

    #[test]
    fn test_draft_rejects_bad_names() {
        for name in ["", "Web 2", "C++", "Free casino"] {
            let errors = input(name).into_draft().unwrap_err();
            assert!(!errors.get("name").is_empty(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_draft_reports_description_length() {
        let dto = CategoryInputDto {
            name: "Backend".to_string(),
            description: "a".repeat(5001),
        };
        let errors = dto.into_draft().unwrap_err();
        assert_eq!(errors.get("description").len(), 1);
    }
}
