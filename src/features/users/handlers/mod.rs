pub mod role_handler;
pub mod user_handler;

pub use role_handler::*;
pub use user_handler::*;
