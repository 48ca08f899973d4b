//! 课程实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

pub const MAX_COURSE_CAPACITY: u32 = 500;
const MAX_CODE_LEN: usize = 16;

/// 课程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
}

/// 创建课程请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub capacity: u32,
}

impl NewCourse {
    /// Trims fields and checks code, title and capacity.
    pub fn validate(self) -> Result<Self, DomainError> {
        let code = self.code.trim().to_uppercase();
        let title = self.title.trim().to_string();

        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return Err(DomainError::Validation(format!(
                "course code must be 1 to {} characters",
                MAX_CODE_LEN
            )));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::Validation(format!(
                "course code '{}' may only contain letters, digits and '-'",
                code
            )));
        }
        if title.is_empty() {
            return Err(DomainError::Validation("course title must not be empty".to_string()));
        }
        if self.capacity == 0 || self.capacity > MAX_COURSE_CAPACITY {
            return Err(DomainError::Validation(format!(
                "capacity must be between 1 and {}",
                MAX_COURSE_CAPACITY
            )));
        }

        Ok(Self {
            code,
            title,
            capacity: self.capacity,
        })
    }

    pub fn into_course(self, id: Uuid) -> Course {
        Course {
            id,
            code: self.code,
            title: self.title,
            capacity: self.capacity,
            created_at: Utc::now(),
        }
    }
}
