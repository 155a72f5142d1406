use serde::{Deserialize, Serialize};

/// 仪表盘概览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_spend: f64,
    pub total_invoices_processed: i64,
    pub documents_uploaded: i64,
    pub average_invoice_value: f64,
}

/// 月度趋势 (month = "YYYY-MM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    pub month: String,
    pub invoice_count: i64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopVendor {
    pub vendor_id: i64,
    pub vendor_name: String,
    pub total_spend: f64,
    pub invoice_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub customer_id: i64,
    pub customer_name: String,
    pub total_value: f64,
    pub invoice_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpend {
    pub category: String,
    pub total: f64,
}

/// 现金流出预测 (date = "YYYY-MM-DD")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashOutflowEntry {
    pub date: String,
    pub amount: f64,
}

/// 发票列表项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub id: i64,
    pub invoice_number: String,
    pub vendor: String,
    pub vendor_id: i64,
    pub customer: Option<String>,
    pub issue_date: String,
    pub due_date: Option<String>,
    pub status: crate::models::InvoiceStatus,
    pub amount: f64,
    pub outstanding: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePage {
    pub data: Vec<InvoiceSummary>,
    pub pagination: Pagination,
}

/// 客户列表项 (含发票统计)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerWithStats {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub total_invoices: i64,
    pub total_value: f64,
    pub paid_invoices: i64,
    pub pending_invoices: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInvoice {
    pub id: i64,
    pub invoice_number: String,
    pub vendor: VendorRef,
    pub issue_date: String,
    pub due_date: Option<String>,
    pub status: crate::models::InvoiceStatus,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub currency: String,
}

/// 客户详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: crate::models::Customer,
    pub invoices: Vec<CustomerInvoice>,
}
