pub mod audit;
pub mod auth;
pub mod categories;
pub mod courses;
pub mod enrollments;
pub mod users;
pub mod web;
