use crate::api::error::{parse_param, ApiError};
use crate::db::{InvoiceFilter, InvoiceSort, SortOrder};
use crate::error::AppError;
use crate::models::{
    CashOutflowEntry, CategorySpend, CustomerDetail, CustomerWithStats, DashboardStats,
    InvoicePage, InvoiceStatus, MonthlyTrend, TopCustomer, TopVendor,
};
use crate::service::normalize::parse_date;
use crate::service::{ChatClient, InvoiceListQuery, ReportService};
use axum::{
    extract::{Json, Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_MONTHS: u32 = 12;
const DEFAULT_TOP_CUSTOMERS: i64 = 10;
/// 单页 / 排行榜最多返回的行数
pub const MAX_LIMIT: i64 = 1000;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// 请求日志
pub async fn log_request(req: Request, next: Next) -> Response {
    tracing::info!("{} {}", req.method(), req.uri().path());
    next.run(req).await
}

/// 健康检查
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

/// 数据库连通性检查响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDbResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub invoice_count: i64,
    pub vendor_count: i64,
    pub customer_count: i64,
    pub message: &'static str,
}

pub async fn test_db(State(reports): State<Arc<ReportService>>) -> Response {
    match reports.store_counts().await {
        Ok(counts) => {
            let message = if counts.invoice_count == 0 {
                "Database is empty. Run the seed command"
            } else {
                "Database has data"
            };
            Json(TestDbResponse {
                status: "ok",
                database: "connected",
                invoice_count: counts.invoice_count,
                vendor_count: counts.vendor_count,
                customer_count: counts.customer_count,
                message,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!("Database check failed: {}", e);
            let body = json!({
                "status": "error",
                "database": "disconnected",
                "error": e.to_string(),
                "message": "Database connection failed. Check the database url",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

pub async fn stats(State(reports): State<Arc<ReportService>>) -> ApiResult<DashboardStats> {
    reports
        .stats()
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch stats", e))
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthsParams {
    pub months: Option<String>,
}

pub async fn invoice_trends(
    State(reports): State<Arc<ReportService>>,
    Query(params): Query<MonthsParams>,
) -> ApiResult<Vec<MonthlyTrend>> {
    let months = parse_param("months", params.months.as_deref())?.unwrap_or(DEFAULT_MONTHS);
    reports
        .invoice_trends(months)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch invoice trends", e))
}

pub async fn top_vendors(State(reports): State<Arc<ReportService>>) -> ApiResult<Vec<TopVendor>> {
    reports
        .top_vendors()
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch top vendors", e))
}

pub async fn category_spend(
    State(reports): State<Arc<ReportService>>,
) -> ApiResult<Vec<CategorySpend>> {
    reports
        .category_spend()
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch category spend", e))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutflowParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn date_param(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    parse_date(Some(raw)).map(Some).ok_or_else(|| {
        ApiError::new(
            "Invalid query parameter",
            AppError::BadRequest(format!("invalid date for '{}': {}", name, raw)),
        )
    })
}

pub async fn cash_outflow(
    State(reports): State<Arc<ReportService>>,
    Query(params): Query<OutflowParams>,
) -> ApiResult<Vec<CashOutflowEntry>> {
    let start = date_param("startDate", params.start_date.as_deref())?;
    let end = date_param("endDate", params.end_date.as_deref())?;
    reports
        .cash_outflow(start, end)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch cash outflow", e))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub vendor_id: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl InvoiceParams {
    fn into_query(self) -> Result<InvoiceListQuery, ApiError> {
        let defaults = InvoiceListQuery::default();
        let page: i64 = parse_param("page", self.page.as_deref())?.unwrap_or(defaults.page);
        let limit: i64 = parse_param("limit", self.limit.as_deref())?.unwrap_or(defaults.limit);
        if page < 1 {
            return Err(ApiError::new(
                "Invalid query parameter",
                AppError::BadRequest("page must be positive".to_string()),
            ));
        }
        let limit = check_limit(limit)?;

        let query = InvoiceListQuery {
            page,
            limit,
            filter: InvoiceFilter {
                search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                status: parse_param::<InvoiceStatus>("status", self.status.as_deref())?,
                vendor_id: parse_param("vendorId", self.vendor_id.as_deref())?,
            },
            sort: parse_param::<InvoiceSort>("sortBy", self.sort_by.as_deref())?
                .unwrap_or(defaults.sort),
            order: parse_param::<SortOrder>("sortOrder", self.sort_order.as_deref())?
                .unwrap_or(defaults.order),
        };
        if query.offset().is_none() {
            return Err(ApiError::new(
                "Invalid query parameter",
                AppError::BadRequest(format!("page {} is out of range", page)),
            ));
        }
        Ok(query)
    }
}

/// limit 必须在 [1, MAX_LIMIT] 内
fn check_limit(limit: i64) -> Result<i64, ApiError> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(ApiError::new(
            "Invalid query parameter",
            AppError::BadRequest(format!("limit must be between 1 and {}", MAX_LIMIT)),
        ))
    }
}

pub async fn invoices(
    State(reports): State<Arc<ReportService>>,
    Query(params): Query<InvoiceParams>,
) -> ApiResult<InvoicePage> {
    let query = params.into_query()?;
    reports
        .invoices(&query)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch invoices", e))
}

pub async fn customers(
    State(reports): State<Arc<ReportService>>,
) -> ApiResult<Vec<CustomerWithStats>> {
    reports
        .customers()
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch customers", e))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

pub async fn top_customers(
    State(reports): State<Arc<ReportService>>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<TopCustomer>> {
    let limit = check_limit(
        parse_param("limit", params.limit.as_deref())?.unwrap_or(DEFAULT_TOP_CUSTOMERS),
    )?;
    reports
        .top_customers(limit)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch top customers", e))
}

fn customer_id(raw: &str) -> Result<i64, ApiError> {
    parse_param::<i64>("id", Some(raw))?.ok_or_else(|| {
        ApiError::new(
            "Invalid path parameter",
            AppError::BadRequest("customer id is required".to_string()),
        )
    })
}

pub async fn customer(
    State(reports): State<Arc<ReportService>>,
    Path(id): Path<String>,
) -> ApiResult<CustomerDetail> {
    let id = customer_id(&id)?;
    reports
        .customer(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch customer", e))
}

pub async fn customer_trends(
    State(reports): State<Arc<ReportService>>,
    Path(id): Path<String>,
    Query(params): Query<MonthsParams>,
) -> ApiResult<Vec<MonthlyTrend>> {
    let id = customer_id(&id)?;
    let months = parse_param("months", params.months.as_deref())?.unwrap_or(DEFAULT_MONTHS);
    reports
        .customer_trends(id, months)
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to fetch customer trends", e))
}

/// 请求体: 自然语言查询
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: Option<String>,
}

pub async fn chat_with_data(
    State(chat): State<Arc<ChatClient>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Value> {
    chat.ask(req.query.as_deref().unwrap_or_default())
        .await
        .map(Json)
        .map_err(|e| ApiError::new("Failed to process chat query", e))
}
