use crate::models::{InvoiceListRow, InvoiceStatus};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::str::FromStr;

/// 发票列表过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceFilter {
    /// 发票号或供应商名称的模糊匹配 (不区分大小写)
    pub search: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub vendor_id: Option<i64>,
}

/// 可排序字段 (白名单)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceSort {
    IssueDate,
    DueDate,
    InvoiceNumber,
    Status,
    Total,
    Currency,
    CreatedAt,
}

impl InvoiceSort {
    fn column(self) -> &'static str {
        match self {
            InvoiceSort::IssueDate => "i.issue_date",
            InvoiceSort::DueDate => "i.due_date",
            InvoiceSort::InvoiceNumber => "i.invoice_number",
            InvoiceSort::Status => "i.status",
            InvoiceSort::Total => "i.total",
            InvoiceSort::Currency => "i.currency",
            InvoiceSort::CreatedAt => "i.created_at",
        }
    }
}

impl FromStr for InvoiceSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issueDate" => Ok(InvoiceSort::IssueDate),
            "dueDate" => Ok(InvoiceSort::DueDate),
            "invoiceNumber" => Ok(InvoiceSort::InvoiceNumber),
            "status" => Ok(InvoiceSort::Status),
            "total" | "amount" => Ok(InvoiceSort::Total),
            "currency" => Ok(InvoiceSort::Currency),
            "createdAt" => Ok(InvoiceSort::CreatedAt),
            other => Err(format!("cannot sort by '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order '{}'", other)),
        }
    }
}

/// 转义 LIKE 通配符
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &InvoiceFilter) {
    qb.push(" WHERE TRUE");

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (i.invoice_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR v.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND i.status = ").push_bind(status);
    }
    if let Some(vendor_id) = filter.vendor_id {
        qb.push(" AND i.vendor_id = ").push_bind(vendor_id);
    }
}

/// 分页查询发票列表, 附带已付合计
pub async fn list_invoices(
    pool: &PgPool,
    filter: &InvoiceFilter,
    sort: InvoiceSort,
    order: SortOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<InvoiceListRow>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT i.id, i.invoice_number, i.vendor_id, v.name AS vendor_name,
                c.name AS customer_name, i.issue_date, i.due_date, i.status,
                i.total, coalesce(p.paid, 0) AS paid, i.currency
         FROM invoices i
         INNER JOIN vendors v ON v.id = i.vendor_id
         LEFT JOIN customers c ON c.id = i.customer_id
         LEFT JOIN (
             SELECT invoice_id, sum(amount) AS paid
             FROM payments
             GROUP BY invoice_id
         ) p ON p.invoice_id = i.id",
    );
    push_filters(&mut qb, filter);

    // 排序列来自白名单, 可直接拼接
    qb.push(format!(
        " ORDER BY {col} {dir}, i.id {dir}",
        col = sort.column(),
        dir = order.keyword()
    ));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    qb.build_query_as::<InvoiceListRow>().fetch_all(pool).await
}

/// 过滤条件下的发票总数
pub async fn count_invoices(pool: &PgPool, filter: &InvoiceFilter) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT count(*)
         FROM invoices i
         INNER JOIN vendors v ON v.id = i.vendor_id",
    );
    push_filters(&mut qb, filter);

    qb.build_query_scalar::<i64>().fetch_one(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_whitelist() {
        assert_eq!("issueDate".parse::<InvoiceSort>(), Ok(InvoiceSort::IssueDate));
        assert_eq!("amount".parse::<InvoiceSort>(), Ok(InvoiceSort::Total));
        assert!("vendor_id; DROP TABLE invoices".parse::<InvoiceSort>().is_err());
        assert_eq!(InvoiceSort::DueDate.column(), "i.due_date");
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("DESC".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("INV_10%"), "INV\\_10\\%");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_filters_render_placeholders() {
        let filter = InvoiceFilter {
            search: Some("acme".to_string()),
            status: Some(InvoiceStatus::Overdue),
            vendor_id: Some(4),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM invoices i");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM invoices i WHERE TRUE AND (i.invoice_number ILIKE $1 OR v.name ILIKE $2) AND i.status = $3 AND i.vendor_id = $4"
        );
    }
}
