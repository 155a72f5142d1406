use crate::error::{AppError, Result};
use reqwest::Client;
use serde_json::{json, Value};

/// 自然语言查询代理, 转发到外部 NL-to-SQL 服务
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 转发 `{query}`, 原样返回上游 JSON; 不重试
    pub async fn ask(&self, query: &str) -> Result<Value> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::BadRequest("Query is required".to_string()));
        }

        tracing::info!("Forwarding chat query: {}", query);

        let res = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await?;
            tracing::error!("Chat service error: {} {}", status.as_u16(), body);
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = res.json().await?;
        let rows = data
            .get("data")
            .and_then(serde_json::Value::as_array)
            .map_or(0, |rows| rows.len());
        tracing::debug!(
            "Chat response: data rows = {}, chart = {}",
            rows,
            data.get("chart").is_some()
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use pretty_assertions::assert_eq;

    /// 本地起一个假上游, 返回其地址
    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_before_sending() {
        let client = ChatClient::new("http://127.0.0.1:9");
        let err = client.ask("   ").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_response_is_passed_through() {
        let app = Router::new().route(
            "/chat",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "echo": body["query"], "data": [1, 2] }))
            }),
        );
        let base = spawn_upstream(app).await;

        let client = ChatClient::new(format!("{}/", base));
        let data = client.ask("top vendors").await.unwrap();
        assert_eq!(data, json!({ "echo": "top vendors", "data": [1, 2] }));
    }

    #[tokio::test]
    async fn test_upstream_failure_carries_status_and_body() {
        let app = Router::new().route(
            "/chat",
            post(|| async { (StatusCode::BAD_GATEWAY, "model offline") }),
        );
        let base = spawn_upstream(app).await;

        let err = ChatClient::new(base).ask("anything").await.unwrap_err();
        match err {
            AppError::Upstream { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "model offline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
