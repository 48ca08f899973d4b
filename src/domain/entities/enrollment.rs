//! 选课实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::DomainError;

/// 成绩等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn is_passing(&self) -> bool {
        !matches!(self, Grade::F)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// 选课记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub student_email: String,
    pub grade: Option<Grade>,
    pub enrolled_at: DateTime<Utc>,
}

/// 选课请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub student_email: String,
}

impl NewEnrollment {
    /// Lowercases the email and checks its shape.
    pub fn validate(self) -> Result<Self, DomainError> {
        let email = self.student_email.trim().to_lowercase();

        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
        if !valid {
            return Err(DomainError::Validation(format!(
                "'{}' is not a valid email address",
                self.student_email.trim()
            )));
        }

        Ok(Self { student_email: email })
    }

    pub fn into_enrollment(self, id: Uuid, course_id: Uuid) -> Enrollment {
        Enrollment {
            id,
            course_id,
            student_email: self.student_email,
            grade: None,
            enrolled_at: Utc::now(),
        }
    }
}

/// 评分请求
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GradeUpdate {
    pub grade: Grade,
}
