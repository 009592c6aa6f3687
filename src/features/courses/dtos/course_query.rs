use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::features::courses::models::CourseLevel;
use crate::shared::types::{default_page, default_page_size, PaginationQuery};
use crate::shared::validation::FieldErrors;

/// Query params for listing courses
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CourseQueryParams {
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    pub category_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub level: Option<CourseLevel>,
    pub is_published: Option<bool>,
    /// Exact price match
    #[param(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_date_after: Option<NaiveDate>,
    pub start_date_before: Option<NaiveDate>,
    pub end_date_after: Option<NaiveDate>,
    pub end_date_before: Option<NaiveDate>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
    /// `created_at`, `start_date` or `price`; prefix with `-` for descending
    pub ordering: Option<String>,
    /// `1` restricts to courses the caller teaches
    pub mine: Option<String>,
}

impl Default for CourseQueryParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            category_id: None,
            teacher_id: None,
            level: None,
            is_published: None,
            price: None,
            start_date: None,
            end_date: None,
            start_date_after: None,
            start_date_before: None,
            end_date_after: None,
            end_date_before: None,
            search: None,
            ordering: None,
            mine: None,
        }
    }
}

impl CourseQueryParams {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.page_size)
    }

    pub fn mine(&self) -> bool {
        matches!(self.mine.as_deref(), Some("1") | Some("true"))
    }

    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn ordering(&self) -> Result<CourseOrdering, FieldErrors> {
        match self.ordering.as_deref().map(str::trim) {
            None | Some("") => Ok(CourseOrdering::default()),
            Some(raw) => CourseOrdering::parse(raw).ok_or_else(|| {
                FieldErrors::single(
                    "ordering",
                    format!("unknown ordering '{}'; use created_at, start_date or price", raw),
                )
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderField {
    CreatedAt,
    StartDate,
    Price,
}

/// Sort order for course listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseOrdering {
    field: OrderField,
    descending: bool,
}

impl Default for CourseOrdering {
    /// Newest first
    fn default() -> Self {
        Self {
            field: OrderField::CreatedAt,
            descending: true,
        }
    }
}

impl CourseOrdering {
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "created_at" => OrderField::CreatedAt,
            "start_date" => OrderField::StartDate,
            "price" => OrderField::Price,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    /// ORDER BY clause body (column names are fixed, never user text)
    pub fn sql(&self) -> &'static str {
        match (self.field, self.descending) {
            (OrderField::CreatedAt, false) => "co.created_at ASC, co.id",
            (OrderField::CreatedAt, true) => "co.created_at DESC, co.id",
            (OrderField::StartDate, false) => "co.start_date ASC, co.id",
            (OrderField::StartDate, true) => "co.start_date DESC, co.id",
            (OrderField::Price, false) => "co.price ASC, co.id",
            (OrderField::Price, true) => "co.price DESC, co.id",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_parse() {
        assert_eq!(CourseOrdering::parse("price").unwrap().sql(), "co.price ASC, co.id");
        assert_eq!(
            CourseOrdering::parse("-start_date").unwrap().sql(),
            "co.start_date DESC, co.id"
        );
        assert!(CourseOrdering::parse("title").is_none());
        assert!(CourseOrdering::parse("--price").is_none());
    }

    #[test]
    fn test_default_ordering_is_newest_first() {
        let params = CourseQueryParams::default();
        assert_eq!(params.ordering().unwrap().sql(), "co.created_at DESC, co.id");
    }

    #[test]
    fn test_unknown_ordering_is_a_field_error() {
        let params = CourseQueryParams {
            ordering: Some("title; DROP TABLE courses".to_string()),
            ..Default::default()
        };
        assert_eq!(params.ordering().unwrap_err().get("ordering").len(), 1);
    }

    #[test]
    fn test_mine_flag() {
        let mut params = CourseQueryParams::default();
        assert!(!params.mine());
        params.mine = Some("1".to_string());
        assert!(params.mine());
        params.mine = Some("0".to_string());
        assert!(!params.mine());
    }
}
