pub mod error;
pub mod handlers;

pub use error::{parse_param, ApiError};
pub use handlers::*;

use crate::service::{ChatClient, ReportService};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

/// 组装全部路由: 报表路由与 chat 路由各自持有状态后合并
pub fn router(reports: Arc<ReportService>, chat: Arc<ChatClient>) -> Router {
    let report_routes = Router::new()
        .route("/api/test-db", get(test_db))
        .route("/api/stats", get(stats))
        .route("/api/invoice-trends", get(invoice_trends))
        .route("/api/vendors/top10", get(top_vendors))
        .route("/api/category-spend", get(category_spend))
        .route("/api/cash-outflow", get(cash_outflow))
        .route("/api/invoices", get(invoices))
        .route("/api/customers", get(customers))
        .route("/api/customers/top", get(top_customers))
        .route("/api/customers/:id", get(customer))
        .route("/api/customers/:id/trends", get(customer_trends))
        .with_state(reports);

    let chat_routes = Router::new()
        .route("/api/chat-with-data", post(chat_with_data))
        .with_state(chat);

    Router::new()
        .route("/health", get(health_check))
        .merge(report_routes)
        .merge(chat_routes)
        .layer(ServiceBuilder::new().layer(middleware::from_fn(log_request)))
}
