//! Course categories.
//!
//! Reads are public. Mutations require staff. Names are unique regardless of
//! case; deleting a category deletes its courses.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::CategoryService;
