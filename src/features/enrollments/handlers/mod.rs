mod enrollment_handler;

pub use enrollment_handler::*;
