//! 领域服务层
//!
//! 提供业务逻辑和领域服务实现

pub mod audit_trail;
pub mod course_service;
pub mod enrollment_service;
pub mod id_generator;

// 重新导出主要服务
pub use audit_trail::AuditTrail;
pub use course_service::{CourseService, COURSE_LIST_CACHE_KEY, COURSE_LIST_GENERATION_KEY};
pub use enrollment_service::EnrollmentService;
pub use id_generator::IdGenerator;
