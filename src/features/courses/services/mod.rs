mod course_image_service;
mod course_service;

pub use course_image_service::CourseImageService;
pub use course_service::{CourseScope, CourseService};
