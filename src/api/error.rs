use crate::error::AppError;
use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// 接口错误: 上下文描述 + 底层错误
#[derive(Debug)]
pub struct ApiError {
    context: &'static str,
    source: AppError,
}

impl ApiError {
    pub fn new(context: &'static str, source: AppError) -> Self {
        Self { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self.source {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", self.context, self.source);
        }

        let error = match &self.source {
            AppError::NotFound(message) | AppError::BadRequest(message) => message.clone(),
            _ => self.context.to_string(),
        };
        let body = ErrorBody {
            error,
            message: self.source.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// 解析可选查询参数; 存在但无法解析时返回 400
pub fn parse_param<T>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<T>().map(Some).map_err(|e| {
        ApiError::new(
            "Invalid query parameter",
            AppError::BadRequest(format!("invalid value for '{}': {} ({})", name, raw, e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let bad = ApiError::new("x", AppError::BadRequest("nope".into()));
        let missing = ApiError::new("x", AppError::NotFound("Customer not found".into()));
        let upstream = ApiError::new(
            "x",
            AppError::Upstream {
                status: 503,
                body: String::new(),
            },
        );
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param::<u32>("months", None).unwrap(), None);
        assert_eq!(parse_param::<u32>("months", Some("  ")).unwrap(), None);
        assert_eq!(parse_param::<u32>("months", Some("6")).unwrap(), Some(6));

        let err = parse_param::<u32>("months", Some("six")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
