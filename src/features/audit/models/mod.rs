mod action_log;

pub use action_log::{ActionLog, AuditAction, AuditEntity};
