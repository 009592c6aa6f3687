mod course;
mod course_history;

pub use course::{Course, CourseLevel, CourseOption};
pub use course_history::{CourseHistory, HistoryType};
