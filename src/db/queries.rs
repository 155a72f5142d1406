use crate::models::{
    CategoryAmount, Customer, CustomerInvoiceRow, CustomerSummaryRow, InvoiceFigure, InvoiceStat,
    OutflowCandidate, PartyTotal, StoreCounts,
};
use chrono::NaiveDate;
use sqlx::PgPool;

/// 发票数量、合计、平均值 (可选的开票日期区间)
pub async fn stat_invoices(
    pool: &PgPool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<InvoiceStat, sqlx::Error> {
    sqlx::query_as::<_, InvoiceStat>(
        r#"
        SELECT count(*) AS cnt,
               coalesce(sum(total), 0) AS sum_total,
               avg(total) AS avg_total
        FROM invoices
        WHERE ($1::date IS NULL OR issue_date >= $1)
          AND ($2::date IS NULL OR issue_date <= $2)
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}

/// 全部发票的开票日期和总额 (按开票日期升序)
pub async fn list_invoice_figures(pool: &PgPool) -> Result<Vec<InvoiceFigure>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceFigure>(
        r#"
        SELECT issue_date, total
        FROM invoices
        ORDER BY issue_date ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// 某客户自指定日期起的发票
pub async fn list_customer_figures(
    pool: &PgPool,
    customer_id: i64,
    since: NaiveDate,
) -> Result<Vec<InvoiceFigure>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceFigure>(
        r#"
        SELECT issue_date, total
        FROM invoices
        WHERE customer_id = $1
          AND issue_date >= $2
        ORDER BY issue_date ASC
        "#,
    )
    .bind(customer_id)
    .bind(since)
    .fetch_all(pool)
    .await
}

/// 按供应商汇总 (合计降序)
pub async fn top_vendor_totals(pool: &PgPool, limit: i64) -> Result<Vec<PartyTotal>, sqlx::Error> {
    sqlx::query_as::<_, PartyTotal>(
        r#"
        SELECT i.vendor_id AS party_id,
               v.name AS party_name,
               coalesce(sum(i.total), 0) AS total_spend,
               count(i.id) AS invoice_count
        FROM invoices i
        LEFT JOIN vendors v ON v.id = i.vendor_id
        GROUP BY i.vendor_id, v.name
        ORDER BY total_spend DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// 按客户汇总 (仅有客户的发票, 合计降序)
pub async fn top_customer_totals(pool: &PgPool, limit: i64) -> Result<Vec<PartyTotal>, sqlx::Error> {
    sqlx::query_as::<_, PartyTotal>(
        r#"
        SELECT i.customer_id AS party_id,
               c.name AS party_name,
               coalesce(sum(i.total), 0) AS total_spend,
               count(i.id) AS invoice_count
        FROM invoices i
        LEFT JOIN customers c ON c.id = i.customer_id
        WHERE i.customer_id IS NOT NULL
        GROUP BY i.customer_id, c.name
        ORDER BY total_spend DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// 已分类的明细金额
pub async fn list_categorized_amounts(pool: &PgPool) -> Result<Vec<CategoryAmount>, sqlx::Error> {
    sqlx::query_as::<_, CategoryAmount>(
        r#"
        SELECT category, amount
        FROM line_items
        WHERE category IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await
}

/// 有到期日的发票及已付合计 (可选的到期日区间)
pub async fn list_outflow_candidates(
    pool: &PgPool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<OutflowCandidate>, sqlx::Error> {
    sqlx::query_as::<_, OutflowCandidate>(
        r#"
        SELECT i.id AS invoice_id,
               i.due_date,
               i.total,
               i.status,
               coalesce(p.paid, 0) AS paid
        FROM invoices i
        LEFT JOIN (
            SELECT invoice_id, sum(amount) AS paid
            FROM payments
            GROUP BY invoice_id
        ) p ON p.invoice_id = i.id
        WHERE i.due_date IS NOT NULL
          AND ($1::date IS NULL OR i.due_date >= $1)
          AND ($2::date IS NULL OR i.due_date <= $2)
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// 客户列表及发票统计 (最新创建的在前)
pub async fn list_customers_with_stats(pool: &PgPool) -> Result<Vec<CustomerSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, CustomerSummaryRow>(
        r#"
        SELECT c.id, c.name, c.email, c.phone, c.address, c.tax_id,
               c.created_at, c.updated_at,
               count(i.id) AS total_invoices,
               coalesce(sum(i.total), 0) AS total_value,
               count(i.id) FILTER (WHERE i.status = 'PAID') AS paid_invoices,
               count(i.id) FILTER (WHERE i.status = 'PENDING') AS pending_invoices
        FROM customers c
        LEFT JOIN invoices i ON i.customer_id = c.id
        GROUP BY c.id
        ORDER BY c.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_customer(pool: &PgPool, customer_id: i64) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, address, tax_id, created_at, updated_at
        FROM customers
        WHERE id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await
}

/// 客户的全部发票 (开票日期降序)
pub async fn list_customer_invoices(
    pool: &PgPool,
    customer_id: i64,
) -> Result<Vec<CustomerInvoiceRow>, sqlx::Error> {
    sqlx::query_as::<_, CustomerInvoiceRow>(
        r#"
        SELECT i.id, i.invoice_number, i.vendor_id, v.name AS vendor_name,
               i.issue_date, i.due_date, i.status,
               i.subtotal, i.tax, i.total, i.currency
        FROM invoices i
        INNER JOIN vendors v ON v.id = i.vendor_id
        WHERE i.customer_id = $1
        ORDER BY i.issue_date DESC
        "#,
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

/// 各表行数 (连通性检查用)
pub async fn count_rows(pool: &PgPool) -> Result<StoreCounts, sqlx::Error> {
    sqlx::query_as::<_, StoreCounts>(
        r#"
        SELECT (SELECT count(*) FROM invoices) AS invoice_count,
               (SELECT count(*) FROM vendors) AS vendor_count,
               (SELECT count(*) FROM customers) AS customer_count
        "#,
    )
    .fetch_one(pool)
    .await
}
