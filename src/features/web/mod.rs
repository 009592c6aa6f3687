//! Server-rendered HTML pages over the same services as the REST API.
//!
//! ## Pages
//!
//! | Path | Access |
//! |------|--------|
//! | `/`, `/courses`, `/courses/{id}` | anyone |
//! | `/categories`, `/categories/{id}` | anyone |
//! | `/courses/{id}/enroll`, `/enrollments/...` | logged in |
//! | `.../new`, `.../edit`, `.../delete` | staff (self-enrollment excepted) |
//! | `/login`, `/logout` | anyone |

pub mod error;
pub mod extractor;
pub mod forms;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod templates;

pub use state::WebState;
