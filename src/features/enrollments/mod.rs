//! Enrollment engine.
//!
//! One row per (user, course), enforced by a unique constraint. Reachable
//! states are `active` and `finished`; cancelling deletes the row. The
//! `canceled` value stays in the enum so previously stored rows still load.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::EnrollmentService;
