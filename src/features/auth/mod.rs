//! Accounts, bearer token authentication and access policy.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/auth/register` | Create an account and receive a token |
//! | POST | `/api/auth/login` | Exchange username and password for a token |

mod password;
mod validator;

pub mod dto;
pub mod guards;
pub mod handler;
pub mod model;
pub mod policy;
pub mod routes;
pub mod service;

pub use service::AuthService;
pub use validator::JwtValidator;
