//! 仓储实现
//!
//! 请求作用域内的数据访问对象，把数据库错误翻译成领域错误。

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{Course, Enrollment};
use crate::errors::{AppError, DomainError};
use crate::infrastructure::database::{DatabaseError, MemoryDatabase};

fn translate(error: DatabaseError) -> AppError {
    match error {
        DatabaseError::DuplicateKey { table: "courses", key } => {
            DomainError::Conflict(format!("a course with code '{}' already exists", key)).into()
        }
        DatabaseError::DuplicateKey { .. } => {
            DomainError::Conflict("the student is already enrolled in this course".to_string()).into()
        }
        DatabaseError::CapacityReached { capacity, .. } => {
            DomainError::Conflict(format!("the course is full ({} seats)", capacity)).into()
        }
        DatabaseError::RowNotFound { key, .. } => DomainError::not_found("Enrollment", key).into(),
        other => other.into(),
    }
}

pub struct CourseRepository {
    db: Arc<MemoryDatabase>,
}

impl CourseRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }

    pub fn create(&self, course: Course) -> Result<Course, AppError> {
        self.db.insert_course(course.clone()).map_err(translate)?;
        Ok(course)
    }

    pub fn find(&self, id: Uuid) -> Result<Option<Course>, AppError> {
        self.db.course(id).map_err(translate)
    }

    /// Like `find`, but a missing course is a `NotFound` error.
    pub fn get(&self, id: Uuid) -> Result<Course, AppError> {
        self.find(id)?
            .ok_or_else(|| DomainError::not_found("Course", id).into())
    }

    pub fn list(&self) -> Result<Vec<Course>, AppError> {
        self.db.courses().map_err(translate)
    }
}

pub struct EnrollmentRepository {
    db: Arc<MemoryDatabase>,
}

impl EnrollmentRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }

    pub fn create(&self, enrollment: Enrollment, capacity: u32) -> Result<Enrollment, AppError> {
        self.db
            .insert_enrollment(enrollment.clone(), capacity)
            .map_err(translate)?;
        Ok(enrollment)
    }

    pub fn get(&self, id: Uuid) -> Result<Enrollment, AppError> {
        self.db
            .enrollment(id)
            .map_err(translate)?
            .ok_or_else(|| DomainError::not_found("Enrollment", id).into())
    }

    pub fn list_for_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>, AppError> {
        self.db.enrollments_for(course_id).map_err(translate)
    }

    pub fn save(&self, enrollment: Enrollment) -> Result<Enrollment, AppError> {
        self.db
            .update_enrollment(enrollment.clone())
            .map_err(translate)?;
        Ok(enrollment)
    }
}
