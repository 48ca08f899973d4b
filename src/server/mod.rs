//! HTTP 服务
//!
//! 路由：
//! - `GET  /health`
//! - `GET  /stats`
//! - `GET  /courses`、`POST /courses`、`GET /courses/{id}`
//! - `GET  /courses/{id}/enrollments`、`POST /courses/{id}/enrollments`
//! - `PUT  /enrollments/{id}/grade`

pub mod handlers;
pub mod scope;

use std::convert::Infallible;
use uuid::Uuid;
use warp::{Filter, Reply};

use crate::infrastructure::container::ServiceContainer;

pub use scope::{handle_rejection, run_in_scope, with_container, with_scope, ApiRejection};

const MAX_BODY_BYTES: u64 = 16 * 1024;

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// All SchoolSpace routes, with JSON error handling and request tracing.
pub fn routes(
    container: ServiceContainer,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .and(with_container(container.clone()))
        .and_then(handlers::health);

    let stats = warp::path!("stats")
        .and(warp::get())
        .and(with_container(container.clone()))
        .and_then(handlers::stats);

    let list_courses = warp::path!("courses")
        .and(warp::get())
        .and(with_scope(container.clone()))
        .and_then(handlers::list_courses);

    let create_course = warp::path!("courses")
        .and(warp::post())
        .and(json_body())
        .and(with_scope(container.clone()))
        .and_then(handlers::create_course);

    let get_course = warp::path!("courses" / Uuid)
        .and(warp::get())
        .and(with_scope(container.clone()))
        .and_then(handlers::get_course);

    let list_enrollments = warp::path!("courses" / Uuid / "enrollments")
        .and(warp::get())
        .and(with_scope(container.clone()))
        .and_then(handlers::list_enrollments);

    let enroll = warp::path!("courses" / Uuid / "enrollments")
        .and(warp::post())
        .and(json_body())
        .and(with_scope(container.clone()))
        .and_then(handlers::enroll);

    let assign_grade = warp::path!("enrollments" / Uuid / "grade")
        .and(warp::put())
        .and(json_body())
        .and(with_scope(container))
        .and_then(handlers::assign_grade);

    health
        .or(stats)
        .or(list_courses)
        .or(create_course)
        .or(get_course)
        .or(list_enrollments)
        .or(enroll)
        .or(assign_grade)
        .recover(handle_rejection)
        .with(warp::trace::request())
}
