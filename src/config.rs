use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_CONFIG_FILE: &str = "config/default";

/// 旧部署使用的环境变量, 最后覆盖
const LEGACY_ENV: [(&str, &str); 4] = [
    ("DATABASE_URL", "database.url"),
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("VANNA_SERVICE_URL", "chat.base_url"),
];

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// NL-to-SQL 服务地址
    pub base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/invoice_analytics".to_string(),
                max_connections: 20,
            },
            chat: ChatConfig {
                base_url: "http://localhost:8000".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 从 `config/default.toml` (可选) 和环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// 指定配置文件时该文件必须存在
    pub fn load(file: Option<&str>) -> Result<Self, ConfigError> {
        Self::build(file, None)
    }

    /// `env` 为 None 时读取进程环境变量
    fn build(file: Option<&str>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let file_source = match file {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let lookup = |key: &str| match &env {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        };

        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default("chat.base_url", defaults.chat.base_url)?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env.clone()),
            );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(key, lookup(var).filter(|v| !v.is_empty()))?;
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = AppConfig::build(None, vars(&[])).unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.chat.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_prefixed_env_overrides_defaults() {
        let config = AppConfig::build(
            None,
            vars(&[("APP_SERVER__PORT", "9000"), ("APP_DATABASE__MAX_CONNECTIONS", "5")]),
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_legacy_env_wins() {
        let config = AppConfig::build(
            None,
            vars(&[
                ("APP_DATABASE__URL", "postgres://prefixed/db"),
                ("DATABASE_URL", "postgres://legacy/db"),
                ("SERVER_PORT", "4000"),
                ("VANNA_SERVICE_URL", "http://vanna:8000"),
            ]),
        )
        .unwrap();
        assert_eq!(config.database.url, "postgres://legacy/db");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.chat.base_url, "http://vanna:8000");
    }

    #[test]
    fn test_explicit_file_must_exist() {
        assert!(AppConfig::build(Some("config/does-not-exist"), vars(&[])).is_err());
    }
}
