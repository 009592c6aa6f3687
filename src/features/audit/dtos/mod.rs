mod action_log_dto;

pub use action_log_dto::{ActionLogQueryParams, ActionLogResponseDto};
