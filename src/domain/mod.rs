//! 领域层
//!
//! 包含核心业务逻辑和领域模型：
//! - 领域实体（课程、选课、审计记录）
//! - 领域服务（课程目录、选课与评分）

pub mod entities;
pub mod services;
