/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Users holding this role may be assigned as a course teacher
pub const ROLE_TEACHER: &str = "Teacher";

// =============================================================================
// CATALOG QUERIES
// =============================================================================

/// Window (in days) of the "upcoming courses" listing
pub const UPCOMING_WINDOW_DAYS: u64 = 7;

/// Minimum price of a "premium" course
pub const PREMIUM_PRICE: i64 = 5000;

/// Number of change snapshots returned by the course history endpoint
pub const COURSE_HISTORY_LIMIT: i64 = 50;

// =============================================================================
// WEB PAGES
// =============================================================================

pub const WEB_COURSES_PER_PAGE: i64 = 6;
pub const WEB_CATEGORIES_PER_PAGE: i64 = 9;
pub const WEB_ENROLLMENTS_PER_PAGE: i64 = 10;
