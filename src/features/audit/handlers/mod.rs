mod action_log_handler;

pub use action_log_handler::*;
