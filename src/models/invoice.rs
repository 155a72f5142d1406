use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// 发票状态 (Postgres 枚举 invoice_status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
    Partial,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::Partial => "PARTIAL",
        }
    }

    /// 未结清状态: 现金流预测中即使计算出的未付金额 <= 0 也纳入
    pub fn is_open(self) -> bool {
        matches!(
            self,
            InvoiceStatus::Pending | InvoiceStatus::Overdue | InvoiceStatus::Partial
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PAID" => Ok(InvoiceStatus::Paid),
            "OVERDUE" => Ok(InvoiceStatus::Overdue),
            "CANCELLED" => Ok(InvoiceStatus::Cancelled),
            "PARTIAL" => Ok(InvoiceStatus::Partial),
            other => Err(format!("unknown invoice status '{}'", other)),
        }
    }
}

/// 待 upsert 的发票头 (invoice_number 为自然键)
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub vendor_id: i64,
    pub customer_id: Option<i64>,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub currency: String,
}

/// 待插入的发票明细
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemDraft {
    pub description: String,
    pub category: Option<String>,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub amount: BigDecimal,
}

/// 一条记录归一化后的结果: 发票头 + 明细
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedInvoice {
    pub invoice: InvoiceDraft,
    pub line_items: Vec<LineItemDraft>,
}

/// 发票金额统计 (count / sum / avg)
#[derive(Debug, Clone, Default, FromRow)]
pub struct InvoiceStat {
    pub cnt: i64,
    pub sum_total: BigDecimal,
    pub avg_total: Option<BigDecimal>,
}

/// 趋势计算所需的最小发票投影
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct InvoiceFigure {
    pub issue_date: NaiveDate,
    pub total: BigDecimal,
}

/// 现金流预测候选: 有到期日的发票及其已付金额
#[derive(Debug, Clone, FromRow)]
pub struct OutflowCandidate {
    pub invoice_id: i64,
    pub due_date: NaiveDate,
    pub total: BigDecimal,
    pub status: InvoiceStatus,
    pub paid: BigDecimal,
}

/// 已分类的明细金额
#[derive(Debug, Clone, FromRow)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: BigDecimal,
}

/// 按供应商 / 客户分组的汇总
#[derive(Debug, Clone, FromRow)]
pub struct PartyTotal {
    pub party_id: i64,
    pub party_name: Option<String>,
    pub total_spend: BigDecimal,
    pub invoice_count: i64,
}

/// 发票列表行
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceListRow {
    pub id: i64,
    pub invoice_number: String,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub customer_name: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub total: BigDecimal,
    pub paid: BigDecimal,
    pub currency: String,
}

/// 客户详情中的发票行
#[derive(Debug, Clone, FromRow)]
pub struct CustomerInvoiceRow {
    pub id: i64,
    pub invoice_number: String,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total: BigDecimal,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("paid".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Paid));
        assert_eq!(" Overdue ".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Overdue));
        assert!("settled".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_open_statuses() {
        assert!(InvoiceStatus::Pending.is_open());
        assert!(InvoiceStatus::Overdue.is_open());
        assert!(InvoiceStatus::Partial.is_open());
        assert!(!InvoiceStatus::Paid.is_open());
        assert!(!InvoiceStatus::Cancelled.is_open());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&InvoiceStatus::Cancelled).unwrap(), "\"CANCELLED\"");
    }
}
