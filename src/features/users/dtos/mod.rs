mod user_dto;

pub use user_dto::{CreateRoleDto, MeResponseDto, RoleResponseDto, UserResponseDto};
