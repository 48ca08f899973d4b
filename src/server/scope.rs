//! 请求作用域集成
//!
//! 每个请求一个 `Scope`：`with_scope` 负责创建，`run_in_scope` 在处理完成后释放。

use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use tracing::Instrument;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::errors::AppError;
use crate::infrastructure::container::{Scope, ServiceContainer};

/// Error carried through warp's rejection system to `handle_rejection`.
#[derive(Debug)]
pub struct ApiRejection {
    pub status: StatusCode,
    pub message: String,
}

impl warp::reject::Reject for ApiRejection {}

impl From<AppError> for ApiRejection {
    fn from(error: AppError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            tracing::error!("❌ 请求处理失败: {}", error);
            "internal server error".to_string()
        } else {
            error.to_string()
        };

        Self { status, message }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: u16,
    message: String,
}

/// Extracts the container (for routes that need no scope).
pub fn with_container(
    container: ServiceContainer,
) -> impl Filter<Extract = (ServiceContainer,), Error = Infallible> + Clone {
    warp::any().map(move || container.clone())
}

/// Yields a fresh request scope for every request.
pub fn with_scope(
    container: ServiceContainer,
) -> impl Filter<Extract = (Scope,), Error = Infallible> + Clone {
    warp::any().map(move || container.create_scope())
}

/// Runs `work` inside `scope`, then disposes the scope whatever the outcome.
/// Errors become `ApiRejection`s.
pub async fn run_in_scope<T, F, Fut>(scope: Scope, work: F) -> Result<T, Rejection>
where
    F: FnOnce(Scope) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let span = tracing::info_span!("request_scope", scope_id = %scope.id());
    let result = work(scope.clone()).instrument(span).await;

    let disposed = scope.dispose().await;
    tracing::debug!(scope_id = %scope.id(), disposed, "request scope disposed");

    result.map_err(|e| warp::reject::custom(ApiRejection::from(e)))
}

/// Maps rejections to JSON error responses.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(api) = err.find::<ApiRejection>() {
        (api.status, api.message.clone())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("invalid request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        tracing::error!("❌ 未处理的拒绝: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
    };

    let body = ErrorBody {
        error: ErrorDetail {
            code: status.as_u16(),
            message,
        },
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
