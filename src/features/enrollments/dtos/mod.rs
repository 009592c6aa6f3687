mod enrollment_dto;

pub use enrollment_dto::{
    CreateEnrollmentDto, EnrollmentQueryParams, EnrollmentResponseDto, RosterEntryDto,
    UpdateEnrollmentDto,
};
