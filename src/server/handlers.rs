//! HTTP 处理函数

use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::domain::entities::{GradeUpdate, NewCourse, NewEnrollment};
use crate::domain::services::{CourseService, EnrollmentService};
use crate::infrastructure::container::{ContainerStats, Scope, ServiceContainer};

use super::scope::run_in_scope;

#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: ContainerStats,
    cache_hit_rate: f64,
    summary: String,
}

/// 健康检查
pub async fn health(container: ServiceContainer) -> Result<impl Reply, Infallible> {
    let status = if container.is_initialized() { "ok" } else { "starting" };
    Ok(warp::reply::json(&json!({
        "status": status,
        "initialized": container.is_initialized(),
        "registered_services": container.registry().len(),
    })))
}

/// 容器统计信息
pub async fn stats(container: ServiceContainer) -> Result<impl Reply, Infallible> {
    let stats = container.stats();
    let response = StatsResponse {
        cache_hit_rate: stats.cache_hit_rate(),
        summary: stats.performance_summary(),
        stats,
    };
    Ok(warp::reply::json(&response))
}

pub async fn list_courses(scope: Scope) -> Result<impl Reply, Rejection> {
    let courses = run_in_scope(scope, |scope| async move {
        let service = scope.resolve::<CourseService>().await?;
        service.list_courses()
    })
    .await?;

    Ok(warp::reply::json(&courses))
}

pub async fn create_course(body: NewCourse, scope: Scope) -> Result<impl Reply, Rejection> {
    let course = run_in_scope(scope, |scope| async move {
        let service = scope.resolve::<CourseService>().await?;
        service.create_course(body)
    })
    .await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&course),
        StatusCode::CREATED,
    ))
}

pub async fn get_course(id: Uuid, scope: Scope) -> Result<impl Reply, Rejection> {
    let course = run_in_scope(scope, |scope| async move {
        let service = scope.resolve::<CourseService>().await?;
        service.get_course(id)
    })
    .await?;

    Ok(warp::reply::json(&course))
}

pub async fn list_enrollments(course_id: Uuid, scope: Scope) -> Result<impl Reply, Rejection> {
    let enrollments = run_in_scope(scope, |scope| async move {
        let service = scope.resolve::<EnrollmentService>().await?;
        service.list_for_course(course_id)
    })
    .await?;

    Ok(warp::reply::json(&enrollments))
}

pub async fn enroll(
    course_id: Uuid,
    body: NewEnrollment,
    scope: Scope,
) -> Result<impl Reply, Rejection> {
    let enrollment = run_in_scope(scope, |scope| async move {
        let service = scope.resolve::<EnrollmentService>().await?;
        service.enroll(course_id, body)
    })
    .await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&enrollment),
        StatusCode::CREATED,
    ))
}

pub async fn assign_grade(
    enrollment_id: Uuid,
    body: GradeUpdate,
    scope: Scope,
) -> Result<impl Reply, Rejection> {
    let enrollment = run_in_scope(scope, |scope| async move {
        let service = scope.resolve::<EnrollmentService>().await?;
        service.assign_grade(enrollment_id, body.grade)
    })
    .await?;

    Ok(warp::reply::json(&enrollment))
}
