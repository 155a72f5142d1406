use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// 超过该耗时的语句记 warn 日志
const SLOW_STATEMENT: Duration = Duration::from_secs(5);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// 按数据库配置建立连接池 (立即建立首个连接)
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(&config.url)?
        .log_slow_statements(tracing::log::LevelFilter::Warn, SLOW_STATEMENT);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;
    tracing::debug!(
        "连接池就绪: max_connections = {}, acquire_timeout = {:?}",
        config.max_connections,
        ACQUIRE_TIMEOUT
    );
    Ok(pool)
}

/// 执行 migrations/ 下的建表脚本
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_url_fails_before_connecting() {
        let config = DatabaseConfig {
            url: "not a database url".to_string(),
            max_connections: 2,
        };
        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::Configuration(_)), "{err}");
    }
}
