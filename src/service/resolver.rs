use crate::error::is_connection_failure;
use crate::models::extraction::leaf_text;
use crate::models::{ExtractionRecord, LoadIssue, PartyFields, PartyKind};
use crate::service::loader::LoadStore;
use indexmap::IndexMap;
use std::collections::HashMap;

/// 一个批次内去重后的供应商 / 客户 (按首次出现顺序)
#[derive(Debug, Clone, Default)]
pub struct PartyBatch {
    pub vendors: IndexMap<String, PartyFields>,
    pub customers: IndexMap<String, PartyFields>,
}

/// 名称 -> 主键映射, 每次导入单独构建并显式传给 materializer
#[derive(Debug, Clone, Default)]
pub struct ResolvedParties {
    pub vendors: HashMap<String, i64>,
    pub customers: HashMap<String, i64>,
}

impl ResolvedParties {
    pub fn vendor_id(&self, name: &str) -> Option<i64> {
        self.vendors.get(name).copied()
    }

    pub fn customer_id(&self, name: &str) -> Option<i64> {
        self.customers.get(name).copied()
    }
}

/// 第一遍扫描: 收集供应商和客户, 同名记录只保留首次出现的联系信息
pub fn collect_parties(records: &[ExtractionRecord]) -> PartyBatch {
    let mut batch = PartyBatch::default();

    for record in records {
        let Some(llm) = record.llm_data() else {
            continue;
        };

        if let (Some(vendor), Some(name)) = (llm.vendor(), llm.vendor_name()) {
            batch
                .vendors
                .entry(name.clone())
                .or_insert_with(|| PartyFields {
                    name,
                    email: leaf_text(&vendor.vendor_email),
                    phone: leaf_text(&vendor.vendor_phone),
                    address: leaf_text(&vendor.vendor_address),
                    tax_id: leaf_text(&vendor.vendor_tax_id),
                });
        }

        if let (Some(customer), Some(name)) = (llm.customer(), llm.customer_name()) {
            batch
                .customers
                .entry(name.clone())
                .or_insert_with(|| PartyFields {
                    name,
                    email: leaf_text(&customer.customer_email),
                    phone: leaf_text(&customer.customer_phone),
                    address: leaf_text(&customer.customer_address),
                    tax_id: leaf_text(&customer.customer_tax_id),
                });
        }
    }

    batch
}

/// upsert 所有供应商和客户
///
/// 单个写入失败只记录日志并从映射中缺席 (引用它的发票随后被跳过);
/// 连接类错误直接返回。
pub async fn resolve_parties<S: LoadStore>(
    store: &S,
    batch: &PartyBatch,
) -> Result<(ResolvedParties, Vec<LoadIssue>), sqlx::Error> {
    let mut resolved = ResolvedParties::default();
    let mut issues = Vec::new();

    for (kind, parties, target) in [
        (PartyKind::Vendor, &batch.vendors, &mut resolved.vendors),
        (PartyKind::Customer, &batch.customers, &mut resolved.customers),
    ] {
        for (name, fields) in parties {
            match store.upsert_party(kind, fields).await {
                Ok(id) => {
                    target.insert(name.clone(), id);
                }
                Err(e) if is_connection_failure(&e) => return Err(e),
                Err(e) => {
                    tracing::warn!("[Seed] {:?} '{}' upsert failed: {}", kind, name, e);
                    issues.push(LoadIssue {
                        index: None,
                        key: Some(name.clone()),
                        reason: format!("{:?} upsert failed: {}", kind, e),
                    });
                }
            }
        }
    }

    tracing::info!(
        "[Seed] 已写入 {} 个供应商, {} 个客户",
        resolved.vendors.len(),
        resolved.customers.len()
    );

    Ok((resolved, issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(vendor: &str, email: &str, customer: Option<&str>) -> ExtractionRecord {
        let mut llm = json!({
            "vendor": { "value": {
                "vendorName": { "value": vendor },
                "vendorEmail": { "value": email }
            }}
        });
        if let Some(c) = customer {
            llm["customer"] = json!({ "value": { "customerName": { "value": c } } });
        }
        serde_json::from_value(json!({ "extractedData": { "llmData": llm } })).unwrap()
    }

    #[test]
    fn test_first_seen_fields_win() {
        let records = vec![
            record("Acme ", "first@acme.test", None),
            record(" Acme", "second@acme.test", Some("Globex")),
            record("Initech", "", Some("Globex ")),
        ];

        let batch = collect_parties(&records);
        assert_eq!(batch.vendors.len(), 2);
        assert_eq!(
            batch.vendors["Acme"].email.as_deref(),
            Some("first@acme.test")
        );
        assert_eq!(batch.vendors["Initech"].email, None);
        assert_eq!(batch.customers.len(), 1);
        assert!(batch.customers.contains_key("Globex"));
    }

    #[test]
    fn test_order_of_first_appearance_is_kept() {
        let records = vec![
            record("Zeta", "", None),
            record("Alpha", "", None),
            record("Zeta", "", None),
        ];
        let names: Vec<_> = collect_parties(&records).vendors.keys().cloned().collect();
        assert_eq!(names, vec!["Zeta".to_string(), "Alpha".to_string()]);
    }

    #[test]
    fn test_records_without_payload_are_ignored() {
        let records = vec![ExtractionRecord::default(), record("   ", "", None)];
        let batch = collect_parties(&records);
        assert!(batch.vendors.is_empty());
        assert!(batch.customers.is_empty());
    }
}
