//! Business rules shared by the REST API and the web forms.
//!
//! Every rule is a pure function over its input. Violations are collected into
//! [`FieldErrors`] so a single submission can report all of its problems at once.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Maximum length of category names and course titles
pub const NAME_MAX_LEN: usize = 255;

/// Words that may not appear anywhere in a category name or course title.
/// Matched case-insensitively as substrings.
pub const BANNED_WORDS: &[&str] = &["casino", "spam", "scam", "xxx", "казино", "спам"];

/// Upper bound (exclusive) for a course price, matching NUMERIC(8, 2)
pub const PRICE_LIMIT: i64 = 1_000_000;
const PRICE_MAX_SCALE: u32 = 2;

lazy_static! {
    /// Latin and Cyrillic letters, whitespace and hyphens
    /// - Valid: "Backend", "Go Basics", "Веб-разработка"
    /// - Invalid: "C++", "Python 3", "data_science"
    pub static ref NAME_REGEX: Regex = Regex::new(r"^[A-Za-zА-Яа-яЁё\s-]+$").unwrap();

    /// Letters, digits and `@ . + - _`
    pub static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a single-field error
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Flattened "field: message" strings for the API error envelope
    pub fn messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field}: {m}")))
            .collect()
    }

    /// `Ok(())` when no rule was violated
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for err in field_errors {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", err.code));
                out.add(&field, message);
            }
        }
        out
    }
}

/// Every rule a category name or course title breaks.
pub fn name_violations(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return vec!["must not be empty".to_string()];
    }

    let mut violations = Vec::new();

    if trimmed.chars().count() > NAME_MAX_LEN {
        violations.push(format!("must be at most {NAME_MAX_LEN} characters"));
    }

    let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());
    if has_digit {
        violations.push("must not contain digits".to_string());
    }

    let without_digits: String = trimmed.chars().filter(|c| !c.is_ascii_digit()).collect();
    if !without_digits.is_empty() && !NAME_REGEX.is_match(&without_digits) {
        violations.push("may only contain letters, spaces and hyphens".to_string());
    }

    let lowered = trimmed.to_lowercase();
    for word in BANNED_WORDS {
        if lowered.contains(word) {
            violations.push(format!("must not contain the word \"{word}\""));
        }
    }

    violations
}

/// Check a name field and return its trimmed value.
pub fn validate_name(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    for violation in name_violations(value) {
        errors.add(field, violation);
    }
    value.trim().to_string()
}

pub fn validate_date_range(errors: &mut FieldErrors, start_date: NaiveDate, end_date: NaiveDate) {
    if start_date > end_date {
        errors.add("end_date", "start date must not be later than end date");
    }
}

pub fn validate_price(errors: &mut FieldErrors, price: Decimal) {
    if price <= Decimal::ZERO {
        errors.add("price", "must be positive");
        return;
    }
    if price.normalize().scale() > PRICE_MAX_SCALE {
        errors.add("price", "must have at most 2 decimal places");
    }
    if price >= Decimal::from(PRICE_LIMIT) {
        errors.add("price", format!("must be less than {PRICE_LIMIT}"));
    }
}

/// Check a username and return its trimmed value.
pub fn validate_username(errors: &mut FieldErrors, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add("username", "this field is required");
    } else if trimmed.chars().count() > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!("must be at most {USERNAME_MAX_LEN} characters"),
        );
    } else if !USERNAME_REGEX.is_match(trimmed) {
        errors.add(
            "username",
            "may only contain letters, digits and @/./+/-/_",
        );
    }
    trimmed.to_string()
}

/// Password strength rules checked on registration
pub fn validate_password(errors: &mut FieldErrors, field: &str, password: &str, username: &str) {
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            field,
            format!("must contain at least {PASSWORD_MIN_LEN} characters"),
        );
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "must not be entirely numeric");
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username.trim()) {
        errors.add(field, "is too similar to the username");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_name_regex_valid() {
        assert!(NAME_REGEX.is_match("Backend"));
        assert!(NAME_REGEX.is_match("Go Basics"));
        assert!(NAME_REGEX.is_match("Веб-разработка"));
        assert!(NAME_REGEX.is_match("Ёлка"));
    }

    #[test]
    fn test_name_regex_invalid() {
        assert!(!NAME_REGEX.is_match("C++"));
        assert!(!NAME_REGEX.is_match("data_science"));
        assert!(!NAME_REGEX.is_match("Python 3"));
        assert!(!NAME_REGEX.is_match(""));
    }

    #[test]
    fn test_name_violations_accepts_clean_names() {
        assert!(name_violations("Go Basics").is_empty());
        assert!(name_violations("  Machine Learning  ").is_empty());
        assert!(name_violations("Программирование").is_empty());
    }

    #[test]
    fn test_name_violations_reports_digits_only_once() {
        let violations = name_violations("Python 3");
        assert_eq!(violations, vec!["must not contain digits".to_string()]);
    }

    #[test]
    fn test_name_violations_reports_every_rule() {
        let violations = name_violations("Casino 2 & more");
        assert!(violations.contains(&"must not contain digits".to_string()));
        assert!(violations.contains(&"may only contain letters, spaces and hyphens".to_string()));
        assert!(violations.contains(&"must not contain the word \"casino\"".to_string()));
    }

    #[test]
    fn test_name_violations_blank() {
        assert_eq!(name_violations("   "), vec!["must not be empty".to_string()]);
    }

    #[test]
    fn test_banned_words_are_case_insensitive_substrings() {
        assert!(!name_violations("AntiSPAMmer").is_empty());
        assert!(!name_violations("КАЗИНО онлайн").is_empty());
    }

    #[test]
    fn test_validate_name_returns_trimmed_value() {
        let mut errors = FieldErrors::new();
        let name = validate_name(&mut errors, "name", "  Backend ");
        assert_eq!(name, "Backend");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_date_range() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let mut errors = FieldErrors::new();
        validate_date_range(&mut errors, start, end);
        validate_date_range(&mut errors, start, start);
        assert!(errors.is_empty());

        validate_date_range(&mut errors, end, start);
        assert_eq!(errors.get("end_date").len(), 1);
    }

    #[test]
    fn test_price_bounds() {
        let mut errors = FieldErrors::new();
        validate_price(&mut errors, Decimal::from_str("0.01").unwrap());
        validate_price(&mut errors, Decimal::from_str("4000").unwrap());
        validate_price(&mut errors, Decimal::from_str("999999.99").unwrap());
        validate_price(&mut errors, Decimal::from_str("12.50").unwrap());
        assert!(errors.is_empty());

        for bad in ["0", "-1", "0.001", "1000000"] {
            let mut errors = FieldErrors::new();
            validate_price(&mut errors, Decimal::from_str(bad).unwrap());
            assert_eq!(errors.get("price").len(), 1, "price {bad} should be rejected");
        }
    }

    #[test]
    fn test_field_errors_collects_multiple_fields() {
        let mut errors = FieldErrors::new();
        errors.add("title", "must not be empty");
        errors.add("price", "must be positive");
        errors.add("price", "second");

        assert_eq!(errors.get("price").len(), 2);
        assert_eq!(
            errors.messages(),
            vec![
                "price: must be positive".to_string(),
                "price: second".to_string(),
                "title: must not be empty".to_string(),
            ]
        );
        assert!(errors.into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_username_rules() {
        let mut errors = FieldErrors::new();
        assert_eq!(validate_username(&mut errors, " ivan.petrov@school "), "ivan.petrov@school");
        assert!(errors.is_empty());

        let mut errors = FieldErrors::new();
        validate_username(&mut errors, "ivan petrov");
        validate_username(&mut errors, "");
        assert_eq!(errors.get("username").len(), 2);

        let mut errors = FieldErrors::new();
        validate_username(&mut errors, &"a".repeat(USERNAME_MAX_LEN + 1));
        assert_eq!(errors.get("username").len(), 1);
    }

    #[test]
    fn test_password_rules() {
        let mut errors = FieldErrors::new();
        validate_password(&mut errors, "password", "correct horse battery", "student");
        assert!(errors.is_empty());

        let mut errors = FieldErrors::new();
        validate_password(&mut errors, "password", "1234567", "student");
        assert_eq!(errors.get("password").len(), 2);

        let mut errors = FieldErrors::new();
        validate_password(&mut errors, "password1", "Student1", "student1");
        assert_eq!(
            errors.get("password1"),
            ["is too similar to the username".to_string()]
        );
    }
}
