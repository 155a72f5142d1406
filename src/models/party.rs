use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 供应商 / 客户的类别 (结构相同, 分表存储)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyKind {
    Vendor,
    Customer,
}

impl PartyKind {
    pub fn table(self) -> &'static str {
        match self {
            PartyKind::Vendor => "vendors",
            PartyKind::Customer => "customers",
        }
    }
}

/// 待写入的供应商 / 客户字段 (名称为自然键)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyFields {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
}

/// 客户表 (customers)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 客户列表行, 附带发票统计
#[derive(Debug, Clone, FromRow)]
pub struct CustomerSummaryRow {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_invoices: i64,
    pub total_value: bigdecimal::BigDecimal,
    pub paid_invoices: i64,
    pub pending_invoices: i64,
}

/// 库内各表行数
#[derive(Debug, Clone, FromRow)]
pub struct StoreCounts {
    pub invoice_count: i64,
    pub vendor_count: i64,
    pub customer_count: i64,
}
