mod role_service;
mod user_service;

pub use role_service::RoleService;
pub use user_service::{has_role, UserService};
