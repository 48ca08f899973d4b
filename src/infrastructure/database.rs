//! 内存数据库
//!
//! 课程、选课和审计日志三张表，全部保存在进程内。
//! 只接受 `memory://` 连接串。

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{AuditEntry, Course, Enrollment};
use crate::infrastructure::container::{BoxError, Connector};

pub const MEMORY_SCHEME: &str = "memory://";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("Database is not connected")]
    NotConnected,
    #[error("Unsupported database url '{0}', expected memory://<name>")]
    UnsupportedUrl(String),
    #[error("Duplicate key '{key}' in table '{table}'")]
    DuplicateKey { table: &'static str, key: String },
    #[error("No row '{key}' in table '{table}'")]
    RowNotFound { table: &'static str, key: String },
    #[error("Course {course_id} is full ({capacity} seats)")]
    CapacityReached { course_id: Uuid, capacity: u32 },
}

#[derive(Default)]
struct Tables {
    courses: HashMap<Uuid, Course>,
    enrollments: HashMap<Uuid, Enrollment>,
    audit_log: Vec<AuditEntry>,
}

/// In-process database standing in for the real persistence layer.
pub struct MemoryDatabase {
    url: String,
    connected: AtomicBool,
    connect_attempts: AtomicUsize,
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connected: AtomicBool::new(false),
            connect_attempts: AtomicUsize::new(0),
            tables: RwLock::new(Tables::default()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    fn ensure_connected(&self) -> Result<(), DatabaseError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DatabaseError::NotConnected)
        }
    }

    pub fn insert_course(&self, course: Course) -> Result<(), DatabaseError> {
        self.ensure_connected()?;
        let mut tables = self.tables.write();

        if tables.courses.values().any(|c| c.code == course.code) {
            return Err(DatabaseError::DuplicateKey {
                table: "courses",
                key: course.code,
            });
        }
        tables.courses.insert(course.id, course);
        Ok(())
    }

    pub fn course(&self, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        self.ensure_connected()?;
        Ok(self.tables.read().courses.get(&id).cloned())
    }

    /// All courses ordered by code.
    pub fn courses(&self) -> Result<Vec<Course>, DatabaseError> {
        self.ensure_connected()?;
        let mut courses: Vec<Course> = self.tables.read().courses.values().cloned().collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    /// Inserts an enrollment unless the student is already enrolled or the
    /// course has no seat left. Both checks and the insert happen under one
    /// write lock.
    pub fn insert_enrollment(&self, enrollment: Enrollment, capacity: u32) -> Result<(), DatabaseError> {
        self.ensure_connected()?;
        let mut tables = self.tables.write();

        let mut taken = 0u32;
        for existing in tables.enrollments.values().filter(|e| e.course_id == enrollment.course_id) {
            if existing.student_email == enrollment.student_email {
                return Err(DatabaseError::DuplicateKey {
                    table: "enrollments",
                    key: format!("{}/{}", enrollment.course_id, enrollment.student_email),
                });
            }
            taken += 1;
        }
        if taken >= capacity {
            return Err(DatabaseError::CapacityReached {
                course_id: enrollment.course_id,
                capacity,
            });
        }

        tables.enrollments.insert(enrollment.id, enrollment);
        Ok(())
    }

    pub fn enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, DatabaseError> {
        self.ensure_connected()?;
        Ok(self.tables.read().enrollments.get(&id).cloned())
    }

    /// Enrollments of one course, oldest first.
    pub fn enrollments_for(&self, course_id: Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
        self.ensure_connected()?;
        let mut enrollments: Vec<Enrollment> = self
            .tables
            .read()
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.student_email.cmp(&b.student_email))
        });
        Ok(enrollments)
    }

    pub fn update_enrollment(&self, enrollment: Enrollment) -> Result<(), DatabaseError> {
        self.ensure_connected()?;
        let mut tables = self.tables.write();

        match tables.enrollments.get_mut(&enrollment.id) {
            Some(row) => {
                *row = enrollment;
                Ok(())
            }
            None => Err(DatabaseError::RowNotFound {
                table: "enrollments",
                key: enrollment.id.to_string(),
            }),
        }
    }

    pub fn append_audit(&self, entries: Vec<AuditEntry>) -> Result<usize, DatabaseError> {
        self.ensure_connected()?;
        let count = entries.len();
        self.tables.write().audit_log.extend(entries);
        Ok(count)
    }

    pub fn audit_log(&self) -> Result<Vec<AuditEntry>, DatabaseError> {
        self.ensure_connected()?;
        Ok(self.tables.read().audit_log.clone())
    }
}

#[async_trait]
impl Connector for MemoryDatabase {
    fn resource_name(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<(), BoxError> {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);

        if !self.url.starts_with(MEMORY_SCHEME) || self.url.len() == MEMORY_SCHEME.len() {
            return Err(Box::new(DatabaseError::UnsupportedUrl(self.url.clone())));
        }
        self.connected.store(true, Ordering::Release);
        tracing::debug!(url = %self.url, "memory database connected");
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        tracing::debug!(url = %self.url, "memory database disconnected");
    }
}
