use crate::db::invoices::{self, InvoiceFilter, InvoiceSort, SortOrder};
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{
    CashOutflowEntry, CategorySpend, CustomerDetail, CustomerInvoice, CustomerWithStats,
    DashboardStats, InvoicePage, InvoiceSummary, MonthlyTrend, Pagination, StoreCounts,
    TopCustomer, TopVendor, VendorRef,
};
use crate::service::aggregation::{self, OutflowMode};
use crate::service::normalize::decimal_to_f64;
use chrono::{Local, NaiveDate};
use sqlx::PgPool;

pub const TOP_VENDOR_LIMIT: i64 = 10;

/// 发票列表分页参数
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceListQuery {
    pub page: i64,
    pub limit: i64,
    pub filter: InvoiceFilter,
    pub sort: InvoiceSort,
    pub order: SortOrder,
}

impl Default for InvoiceListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 50,
            filter: InvoiceFilter::default(),
            sort: InvoiceSort::IssueDate,
            order: SortOrder::Desc,
        }
    }
}

impl InvoiceListQuery {
    /// 跳过的行数; 溢出时为 None
    pub fn offset(&self) -> Option<i64> {
        self.page.checked_sub(1)?.max(0).checked_mul(self.limit)
    }
}

/// 总页数 (向上取整)
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 || total <= 0 {
        return 0;
    }
    total / limit + i64::from(total % limit != 0)
}

/// 报表服务: 每次调用都重新读库, 不做缓存
pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// 概览统计: 小数据集用全量, 否则取当年, 当年为 0 时回退全量
    pub async fn stats(&self) -> Result<DashboardStats> {
        let all = queries::stat_invoices(&self.pool, None, None).await?;
        tracing::info!("Total invoices in database: {}", all.cnt);

        let scoped = if aggregation::needs_year_scope(&all) {
            let (start, end) = aggregation::year_bounds(Self::today());
            tracing::info!("Using YTD filter ({} .. {})", start, end);
            Some(queries::stat_invoices(&self.pool, Some(start), Some(end)).await?)
        } else {
            tracing::info!("Using all-time data (few invoices)");
            None
        };

        Ok(aggregation::combine_stats(&all, scoped.as_ref()))
    }

    /// 月度趋势, 带窗口逐级放宽
    pub async fn invoice_trends(&self, months: u32) -> Result<Vec<MonthlyTrend>> {
        let all = queries::list_invoice_figures(&self.pool).await?;
        let selected = aggregation::select_trend_window(&all, Self::today(), months);
        let trends = aggregation::group_by_month(selected);
        tracing::info!("Returning {} monthly trends from {} invoices", trends.len(), all.len());
        Ok(trends)
    }

    pub async fn top_vendors(&self) -> Result<Vec<TopVendor>> {
        let rows = queries::top_vendor_totals(&self.pool, TOP_VENDOR_LIMIT).await?;
        Ok(aggregation::rank_vendors(rows, TOP_VENDOR_LIMIT as usize))
    }

    pub async fn top_customers(&self, limit: i64) -> Result<Vec<TopCustomer>> {
        let rows = queries::top_customer_totals(&self.pool, limit).await?;
        Ok(aggregation::rank_customers(rows, limit.max(0) as usize))
    }

    pub async fn category_spend(&self) -> Result<Vec<CategorySpend>> {
        let rows = queries::list_categorized_amounts(&self.pool).await?;
        Ok(aggregation::sum_by_category(&rows))
    }

    /// 现金流出预测
    ///
    /// 未指定区间时取今天起 90 天; 该窗口为空则回退到所有有到期日的发票。
    pub async fn cash_outflow(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CashOutflowEntry>> {
        let (from, to) = aggregation::outflow_bounds(Self::today(), start, end);
        let candidates = queries::list_outflow_candidates(&self.pool, from, to).await?;
        let mut entries = aggregation::forecast_outflow(&candidates, OutflowMode::Window);

        if aggregation::needs_outflow_fallback(&entries, start, end) {
            tracing::info!("No cash outflow in default window, using all invoices with due dates");
            let all = queries::list_outflow_candidates(&self.pool, None, None).await?;
            entries = aggregation::forecast_outflow(&all, OutflowMode::All);
        }

        tracing::info!("Returning {} cash outflow entries", entries.len());
        Ok(entries)
    }

    /// 分页发票列表; 列表与总数并发查询
    pub async fn invoices(&self, query: &InvoiceListQuery) -> Result<InvoicePage> {
        let offset = query
            .offset()
            .ok_or_else(|| AppError::BadRequest("page is out of range".to_string()))?;
        let (rows, total) = futures::try_join!(
            invoices::list_invoices(
                &self.pool,
                &query.filter,
                query.sort,
                query.order,
                query.limit,
                offset
            ),
            invoices::count_invoices(&self.pool, &query.filter),
        )?;

        let data = rows
            .into_iter()
            .map(|row| InvoiceSummary {
                outstanding: decimal_to_f64(&aggregation::outstanding(&row.total, &row.paid)),
                amount: decimal_to_f64(&row.total),
                id: row.id,
                invoice_number: row.invoice_number,
                vendor: row.vendor_name,
                vendor_id: row.vendor_id,
                customer: row.customer_name,
                issue_date: row.issue_date.to_string(),
                due_date: row.due_date.map(|d| d.to_string()),
                status: row.status,
                currency: row.currency,
            })
            .collect();

        Ok(InvoicePage {
            data,
            pagination: Pagination {
                page: query.page,
                limit: query.limit,
                total,
                total_pages: total_pages(total, query.limit),
            },
        })
    }

    pub async fn customers(&self) -> Result<Vec<CustomerWithStats>> {
        let rows = queries::list_customers_with_stats(&self.pool).await?;
        tracing::info!("Found {} customers", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| CustomerWithStats {
                total_value: decimal_to_f64(&row.total_value),
                id: row.id,
                name: row.name,
                email: row.email,
                phone: row.phone,
                address: row.address,
                tax_id: row.tax_id,
                total_invoices: row.total_invoices,
                paid_invoices: row.paid_invoices,
                pending_invoices: row.pending_invoices,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    pub async fn customer(&self, customer_id: i64) -> Result<CustomerDetail> {
        let customer = queries::get_customer(&self.pool, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;
        let invoices = queries::list_customer_invoices(&self.pool, customer_id)
            .await?
            .into_iter()
            .map(|row| CustomerInvoice {
                id: row.id,
                invoice_number: row.invoice_number,
                vendor: VendorRef {
                    id: row.vendor_id,
                    name: row.vendor_name,
                },
                issue_date: row.issue_date.to_string(),
                due_date: row.due_date.map(|d| d.to_string()),
                status: row.status,
                subtotal: decimal_to_f64(&row.subtotal),
                tax: decimal_to_f64(&row.tax),
                total: decimal_to_f64(&row.total),
                currency: row.currency,
            })
            .collect();

        Ok(CustomerDetail { customer, invoices })
    }

    /// 单个客户的月度趋势 (固定回看窗口, 不放宽)
    pub async fn customer_trends(&self, customer_id: i64, months: u32) -> Result<Vec<MonthlyTrend>> {
        let since = aggregation::lookback_start(Self::today(), months);
        let figures = queries::list_customer_figures(&self.pool, customer_id, since).await?;
        Ok(aggregation::group_by_month(&figures))
    }

    pub async fn store_counts(&self) -> Result<StoreCounts> {
        Ok(queries::count_rows(&self.pool).await?)
    }
}
