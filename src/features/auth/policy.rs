//! Access policy.
//!
//! Decisions are made over the capabilities an actor holds *relative to a record*,
//! never over the actor's type: the same user may be a student of one enrollment,
//! the teacher of another course, and nothing special for a third record.

use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;

/// Capability an actor can hold for a given record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Authenticated,
    EnrollmentOwner,
    CourseTeacher,
    Staff,
}

/// Operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    MutateCatalog,
    ViewEnrollment,
    FinishEnrollment,
    CancelEnrollment,
    AdministerEnrollment,
    ViewRoster,
    ManageRoles,
    ReadAuditLog,
}

impl Permission {
    /// Any one of these capabilities grants the permission
    fn granted_by(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Permission::MutateCatalog => &[Staff],
            Permission::ViewEnrollment => &[Staff, EnrollmentOwner, CourseTeacher],
            Permission::FinishEnrollment => &[Staff, EnrollmentOwner],
            Permission::CancelEnrollment => &[Staff, EnrollmentOwner],
            Permission::AdministerEnrollment => &[Staff],
            Permission::ViewRoster => &[Staff, CourseTeacher],
            Permission::ManageRoles => &[Staff],
            Permission::ReadAuditLog => &[Staff],
        }
    }

    fn denial_message(self) -> &'static str {
        match self {
            Permission::MutateCatalog => "Only staff can modify the catalog",
            Permission::ViewEnrollment => "You cannot view this enrollment",
            Permission::FinishEnrollment => "Only staff or the enrolled student can finish an enrollment",
            Permission::CancelEnrollment => "Only staff or the enrolled student can cancel an enrollment",
            Permission::AdministerEnrollment => "Only staff can administer enrollments",
            Permission::ViewRoster => "Only staff or the course teacher can view the roster",
            Permission::ManageRoles => "Only staff can manage roles",
            Permission::ReadAuditLog => "Only staff can read the action log",
        }
    }
}

/// Record an operation targets, reduced to the ownership facts the policy needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subject {
    pub student_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
}

impl Subject {
    pub const NONE: Subject = Subject {
        student_id: None,
        teacher_id: None,
    };

    pub fn enrollment(student_id: Uuid, course_teacher_id: Option<Uuid>) -> Self {
        Self {
            student_id: Some(student_id),
            teacher_id: course_teacher_id,
        }
    }

    pub fn course(teacher_id: Option<Uuid>) -> Self {
        Self {
            student_id: None,
            teacher_id,
        }
    }
}

/// Whoever issued the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(AuthenticatedUser),
}

impl From<Option<AuthenticatedUser>> for Actor {
    fn from(user: Option<AuthenticatedUser>) -> Self {
        user.map_or(Actor::Anonymous, Actor::User)
    }
}

impl From<AuthenticatedUser> for Actor {
    fn from(user: AuthenticatedUser) -> Self {
        Actor::User(user)
    }
}

impl Actor {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Actor::Anonymous => None,
            Actor::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user().map(|u| u.user_id)
    }

    /// Capabilities held for `subject`
    pub fn capabilities(&self, subject: &Subject) -> Vec<Capability> {
        let Some(user) = self.user() else {
            return Vec::new();
        };

        let mut caps = vec![Capability::Authenticated];
        if user.is_staff {
            caps.push(Capability::Staff);
        }
        if subject.student_id == Some(user.user_id) {
            caps.push(Capability::EnrollmentOwner);
        }
        if subject.teacher_id == Some(user.user_id) {
            caps.push(Capability::CourseTeacher);
        }
        caps
    }

    pub fn can(&self, permission: Permission, subject: &Subject) -> bool {
        let held = self.capabilities(subject);
        permission.granted_by().iter().any(|cap| held.contains(cap))
    }

    /// `Ok(())` if allowed; `Unauthorized` for anonymous callers, `Forbidden` otherwise
    pub fn authorize(&self, permission: Permission, subject: &Subject) -> Result<(), AppError> {
        if self.can(permission, subject) {
            return Ok(());
        }
        match self {
            Actor::Anonymous => Err(AppError::Unauthorized("Authentication required".to_string())),
            Actor::User(_) => Err(AppError::Forbidden(permission.denial_message().to_string())),
        }
    }
}

/// Resolve whose enrollment an administrative create targets.
///
/// Staff may enroll anyone; everyone else only themselves.
pub fn enrollment_owner(actor: &AuthenticatedUser, requested: Option<Uuid>) -> Result<Uuid, AppError> {
    match requested {
        None => Ok(actor.user_id),
        Some(id) if id == actor.user_id || actor.is_staff => Ok(id),
        Some(_) => Err(AppError::Forbidden(
            "Only staff can enroll other users".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_staff: bool) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            username: "someone".to_string(),
            is_staff,
            roles: Vec::new(),
        }
    }

    #[test]
    fn test_anonymous_has_no_capabilities() {
        let actor = Actor::Anonymous;
        assert!(actor.capabilities(&Subject::NONE).is_empty());
        assert!(matches!(
            actor.authorize(Permission::ViewEnrollment, &Subject::NONE),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_catalog_mutation_requires_staff() {
        let student = Actor::from(user(false));
        let staff = Actor::from(user(true));

        assert!(matches!(
            student.authorize(Permission::MutateCatalog, &Subject::NONE),
            Err(AppError::Forbidden(_))
        ));
        assert!(staff.authorize(Permission::MutateCatalog, &Subject::NONE).is_ok());
    }

    #[test]
    fn test_enrollment_visibility() {
        let student = user(false);
        let teacher = user(false);
        let stranger = user(false);
        let subject = Subject::enrollment(student.user_id, Some(teacher.user_id));

        assert!(Actor::from(student).can(Permission::ViewEnrollment, &subject));
        assert!(Actor::from(teacher).can(Permission::ViewEnrollment, &subject));
        assert!(Actor::from(user(true)).can(Permission::ViewEnrollment, &subject));
        assert!(!Actor::from(stranger).can(Permission::ViewEnrollment, &subject));
    }

    #[test]
    fn test_finish_allowed_for_student_and_staff_only() {
        let student = user(false);
        let teacher = user(false);
        let subject = Subject::enrollment(student.user_id, Some(teacher.user_id));

        assert!(Actor::from(student).can(Permission::FinishEnrollment, &subject));
        assert!(Actor::from(user(true)).can(Permission::FinishEnrollment, &subject));
        assert!(!Actor::from(teacher).can(Permission::FinishEnrollment, &subject));
    }

    #[test]
    fn test_roster_visible_to_teacher_and_staff_only() {
        let teacher = user(false);
        let enrolled_student = user(false);
        let subject = Subject::course(Some(teacher.user_id));

        assert!(Actor::from(teacher).can(Permission::ViewRoster, &subject));
        assert!(Actor::from(user(true)).can(Permission::ViewRoster, &subject));
        assert!(!Actor::from(enrolled_student).can(Permission::ViewRoster, &subject));
        assert!(!Actor::Anonymous.can(Permission::ViewRoster, &subject));
    }

    #[test]
    fn test_course_without_teacher_grants_nobody_teacher_capability() {
        let actor = Actor::from(user(false));
        let caps = actor.capabilities(&Subject::course(None));
        assert_eq!(caps, vec![Capability::Authenticated]);
    }

    #[test]
    fn test_enrollment_owner_resolution() {
        let student = user(false);
        let staff = user(true);
        let other = Uuid::new_v4();

        assert_eq!(enrollment_owner(&student, None).unwrap(), student.user_id);
        assert_eq!(
            enrollment_owner(&student, Some(student.user_id)).unwrap(),
            student.user_id
        );
        assert!(matches!(
            enrollment_owner(&student, Some(other)),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(enrollment_owner(&staff, Some(other)).unwrap(), other);
    }
}
