use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 记录被跳过的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("record has no extracted data")]
    MissingPayload,
    #[error("missing invoice number")]
    MissingInvoiceNumber,
    #[error("missing vendor name")]
    MissingVendorName,
    #[error("vendor '{0}' could not be resolved")]
    UnresolvedVendor(String),
    #[error("missing or unparseable issue date")]
    InvalidIssueDate,
    #[error("persistence failed: {0}")]
    Persistence(String),
}

/// 导入过程中的单条问题 (跳过的记录或写入失败的供应商/客户)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadIssue {
    /// 批次内的记录下标; 供应商/客户写入失败时为空
    pub index: Option<usize>,
    /// 发票号或供应商/客户名称
    pub key: Option<String>,
    pub reason: String,
}

/// 一次导入的统计结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub vendors_created: usize,
    pub customers_created: usize,
    pub invoices_created: usize,
    pub line_items_created: usize,
    pub skipped: usize,
    pub errors: Vec<LoadIssue>,
}

impl LoadStats {
    /// 记录一条被跳过的发票记录
    pub fn skip(&mut self, index: usize, key: Option<String>, reason: &SkipReason) {
        self.skipped += 1;
        self.errors.push(LoadIssue {
            index: Some(index),
            key,
            reason: reason.to_string(),
        });
    }
}
