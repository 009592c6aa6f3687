use std::sync::Arc;

use crate::core::middleware::AuthState;
use crate::features::auth::AuthService;
use crate::features::categories::CategoryService;
use crate::features::courses::{CourseImageService, CourseService};
use crate::features::enrollments::EnrollmentService;

/// Services behind the web pages
#[derive(Clone)]
pub struct WebState {
    pub auth: AuthState,
    /// Sign-up and password login
    pub accounts: Arc<AuthService>,
    pub categories: Arc<CategoryService>,
    pub courses: Arc<CourseService>,
    pub images: Arc<CourseImageService>,
    pub enrollments: Arc<EnrollmentService>,
    /// Sets `Secure` on the session cookie
    pub secure_cookies: bool,
}
