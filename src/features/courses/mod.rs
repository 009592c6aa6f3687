//! Course catalog.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/courses` | Filtered, ordered, paginated list |
//! | POST | `/api/courses` | Create (staff) |
//! | GET | `/api/courses/{id}` | Detail |
//! | PUT / PATCH | `/api/courses/{id}` | Replace / partial update (staff) |
//! | DELETE | `/api/courses/{id}` | Delete with enrollments (staff) |
//! | GET | `/api/courses/upcoming` | Starting within the next week |
//! | GET | `/api/courses/premium-or-tomorrow` | Published premium, or starting tomorrow |
//! | GET | `/api/courses/foreign-active` | Published, taught by someone else |
//! | GET | `/api/courses/category/{category_id}` | One category |
//! | GET | `/api/courses/{id}/history` | Most recent change snapshots |
//! | PUT | `/api/courses/{id}/image` | Upload or replace the cover image (staff) |
//! | DELETE | `/api/courses/{id}/image` | Remove the cover image (staff) |
//!
//! Every write also appends a row to `course_history` inside the same
//! transaction, so a rolled back change leaves no snapshot behind.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{CourseImageService, CourseService};
