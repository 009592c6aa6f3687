//! Administrative action log.
//!
//! Rows are appended after a tracked mutation commits and are never updated or
//! deleted by the application. Recording is best-effort: a failed insert is
//! logged and never fails the request that triggered it.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::AuditRecorder;
