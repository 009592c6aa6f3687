mod category_dto;

pub use category_dto::{CategoryDraft, CategoryInputDto, CategoryQueryParams, CategoryResponseDto};
