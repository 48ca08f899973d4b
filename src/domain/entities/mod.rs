//! 领域实体定义
//!
//! 包含核心业务对象和数据结构

pub mod audit;
pub mod course;
pub mod enrollment;

pub use audit::AuditEntry;
pub use course::{Course, NewCourse, MAX_COURSE_CAPACITY};
pub use enrollment::{Enrollment, Grade, GradeUpdate, NewEnrollment};
