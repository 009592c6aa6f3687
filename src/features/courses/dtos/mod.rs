mod course_dto;
mod course_image;
mod course_query;

pub use course_dto::{
    CourseDraft, CourseHistoryDto, CourseInputDto, CoursePatchDto, CourseResponseDto,
};
pub use course_image::{CourseImageForm, CourseImageUpload, MAX_IMAGE_SIZE};
pub use course_query::CourseQueryParams;
