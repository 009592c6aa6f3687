mod category;

pub use category::{Category, CategoryOption};
