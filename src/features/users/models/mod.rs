mod role;
mod user;

pub use role::Role;
pub use user::{User, UserCredentials, UserOption};
