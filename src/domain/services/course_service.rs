//! 课程服务

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::entities::{Course, NewCourse};
use crate::errors::AppError;
use crate::infrastructure::cache::{MemoryStore, StoreError};
use crate::infrastructure::repositories::CourseRepository;

use super::{AuditTrail, IdGenerator};

pub const COURSE_LIST_CACHE_KEY: &str = "courses:all";

/// Bumped on every course insert. Cached lists are keyed by generation, so a
/// list read before an insert is never served after it.
pub const COURSE_LIST_GENERATION_KEY: &str = "courses:generation";

/// Course catalogue operations for one request.
pub struct CourseService {
    courses: Arc<CourseRepository>,
    cache: Arc<MemoryStore>,
    ids: Arc<IdGenerator>,
    audit: Arc<AuditTrail>,
    config: Arc<AppConfig>,
}

impl CourseService {
    pub fn new(
        courses: Arc<CourseRepository>,
        cache: Arc<MemoryStore>,
        ids: Arc<IdGenerator>,
        audit: Arc<AuditTrail>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            courses,
            cache,
            ids,
            audit,
            config,
        }
    }

    fn cache_ttl(&self) -> Option<Duration> {
        match self.config.cache.default_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    fn list_key(generation: i64) -> String {
        format!("{}:{}", COURSE_LIST_CACHE_KEY, generation)
    }

    fn current_generation(&self) -> Result<i64, AppError> {
        match self.cache.get(COURSE_LIST_GENERATION_KEY) {
            Some(value) => value.parse::<i64>().map_err(|_| {
                AppError::from(StoreError::NotAnInteger(COURSE_LIST_GENERATION_KEY.to_string()))
            }),
            None => Ok(0),
        }
    }

    /// Lists every course, served from the cache while the entry is fresh.
    pub fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let ttl = match self.cache_ttl() {
            Some(ttl) => ttl,
            None => return self.courses.list(),
        };

        // 先读代数再读库，插入后写入的旧列表落在旧代数下
        let key = Self::list_key(self.current_generation()?);
        if let Some(courses) = self.cache.get_json::<Vec<Course>>(&key)? {
            tracing::debug!(count = courses.len(), "course list served from cache");
            return Ok(courses);
        }

        let courses = self.courses.list()?;
        self.cache.set_json(&key, &courses, Some(ttl))?;
        Ok(courses)
    }

    pub fn get_course(&self, id: Uuid) -> Result<Course, AppError> {
        self.courses.get(id)
    }

    pub fn create_course(&self, request: NewCourse) -> Result<Course, AppError> {
        let request = request.validate()?;
        let course = self.courses.create(request.into_course(self.ids.next_id()))?;

        let generation = self.cache.increment(COURSE_LIST_GENERATION_KEY, 1)?;
        self.cache.delete(&Self::list_key(generation - 1));
        self.audit.record("course.create", course.code.clone());
        tracing::info!(course_id = %course.id, code = %course.code, "course created");
        Ok(course)
    }
}
