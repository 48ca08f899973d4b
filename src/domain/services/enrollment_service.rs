//! 选课服务

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{Enrollment, Grade, NewEnrollment};
use crate::errors::AppError;
use crate::infrastructure::notifier::EnrollmentNotifier;
use crate::infrastructure::repositories::{CourseRepository, EnrollmentRepository};

use super::{AuditTrail, IdGenerator};

/// Enrollment and grading operations for one request.
pub struct EnrollmentService {
    enrollments: Arc<EnrollmentRepository>,
    courses: Arc<CourseRepository>,
    ids: Arc<IdGenerator>,
    audit: Arc<AuditTrail>,
    notifier: Option<Arc<EnrollmentNotifier>>,
}

impl EnrollmentService {
    pub fn new(
        enrollments: Arc<EnrollmentRepository>,
        courses: Arc<CourseRepository>,
        ids: Arc<IdGenerator>,
        audit: Arc<AuditTrail>,
        notifier: Option<Arc<EnrollmentNotifier>>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            ids,
            audit,
            notifier,
        }
    }

    /// Enrolls a student; the course must exist and have a free seat.
    pub fn enroll(&self, course_id: Uuid, request: NewEnrollment) -> Result<Enrollment, AppError> {
        let request = request.validate()?;
        let course = self.courses.get(course_id)?;

        let enrollment = self.enrollments.create(
            request.into_enrollment(self.ids.next_id(), course.id),
            course.capacity,
        )?;

        self.audit.record(
            "enrollment.create",
            format!("{} -> {}", enrollment.student_email, course.code),
        );
        if let Some(notifier) = &self.notifier {
            notifier.queue(
                &enrollment.student_email,
                format!("Enrolled in {}", course.code),
                format!("You are enrolled in {} ({}).", course.title, course.code),
            );
        }

        tracing::info!(enrollment_id = %enrollment.id, course = %course.code, "student enrolled");
        Ok(enrollment)
    }

    pub fn list_for_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>, AppError> {
        self.courses.get(course_id)?;
        self.enrollments.list_for_course(course_id)
    }

    pub fn assign_grade(&self, enrollment_id: Uuid, grade: Grade) -> Result<Enrollment, AppError> {
        let mut enrollment = self.enrollments.get(enrollment_id)?;
        enrollment.grade = Some(grade);
        let enrollment = self.enrollments.save(enrollment)?;

        self.audit.record(
            "enrollment.grade",
            format!("{} = {}", enrollment.id, grade),
        );
        Ok(enrollment)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifier.is_some()
    }
}
