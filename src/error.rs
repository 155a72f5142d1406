use thiserror::Error;

/// 服务层错误
#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("chat service error: {status} {body}")]
    Upstream { status: u16, body: String },

    #[error("chat service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// 导入批次的致命错误 (单条记录的失败只计入跳过数)
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("failed to clear store: {0}")]
    Reset(#[source] sqlx::Error),
}

/// 连接类错误会终止当前调用; 其余错误 (约束冲突、解码失败) 按单条记录处理
pub fn is_connection_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failures_are_fatal() {
        assert!(is_connection_failure(&sqlx::Error::PoolTimedOut));
        assert!(is_connection_failure(&sqlx::Error::PoolClosed));
        assert!(is_connection_failure(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused"
        ))));
    }

    #[test]
    fn test_row_level_errors_are_not_fatal() {
        assert!(!is_connection_failure(&sqlx::Error::RowNotFound));
        assert!(!is_connection_failure(&sqlx::Error::Protocol("conflict".into())));
    }

    #[test]
    fn test_upstream_message_embeds_status() {
        let err = AppError::Upstream {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "chat service error: 502 bad gateway");
    }
}
