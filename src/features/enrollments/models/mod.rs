mod enrollment;

pub use enrollment::{Enrollment, EnrollmentStatus, RosterEntry};
