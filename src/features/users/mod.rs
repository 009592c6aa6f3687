//! Local users and roles.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/users/me` | Current user with staff flag and roles |
//! | GET | `/api/roles` | Roles with their members (staff) |
//! | POST | `/api/roles` | Create a role (staff) |
//! | PUT | `/api/roles/{id}/users/{user_id}` | Add a member (staff) |
//! | DELETE | `/api/roles/{id}/users/{user_id}` | Remove a member (staff) |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{RoleService, UserService};
