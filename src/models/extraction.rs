use serde::Deserialize;

/// 抽取结果中的原始叶子值 (文本或数字)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// 转为文本; 整数形式的数字不带小数部分
    pub fn to_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Other(_) => None,
        }
    }

    /// 空字符串视为缺失
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Text(s) => s.is_empty(),
            RawValue::Number(_) => false,
            RawValue::Other(v) => v.is_null(),
        }
    }
}

/// `{ "value": ... }` 包装
#[derive(Debug, Clone, Deserialize)]
pub struct Field<T = RawValue> {
    pub value: Option<T>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

/// 取叶子值
pub fn leaf(field: &Option<Field>) -> Option<&RawValue> {
    field.as_ref().and_then(|f| f.value.as_ref())
}

/// 取叶子文本 (已去除首尾空白, 空串视为缺失)
pub fn leaf_text(field: &Option<Field>) -> Option<String> {
    leaf(field)
        .and_then(RawValue::to_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 单条抽取记录 (上游文档抽取流水线的输出)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    pub extracted_data: Option<ExtractedData>,
}

impl ExtractionRecord {
    pub fn llm_data(&self) -> Option<&LlmData> {
        self.extracted_data.as_ref()?.llm_data.as_ref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub llm_data: Option<LlmData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmData {
    pub invoice: Option<Field<InvoiceFields>>,
    pub vendor: Option<Field<VendorFields>>,
    pub customer: Option<Field<CustomerFields>>,
    pub line_items: Option<Field<LineItemsBlock>>,
    pub payment: Option<Field<PaymentFields>>,
}

impl LlmData {
    pub fn invoice(&self) -> Option<&InvoiceFields> {
        self.invoice.as_ref()?.value.as_ref()
    }

    pub fn vendor(&self) -> Option<&VendorFields> {
        self.vendor.as_ref()?.value.as_ref()
    }

    pub fn customer(&self) -> Option<&CustomerFields> {
        self.customer.as_ref()?.value.as_ref()
    }

    pub fn payment(&self) -> Option<&PaymentFields> {
        self.payment.as_ref()?.value.as_ref()
    }

    pub fn line_items(&self) -> &[RawLineItem] {
        self.line_items
            .as_ref()
            .and_then(|f| f.value.as_ref())
            .and_then(|block| block.items.as_ref())
            .and_then(|f| f.value.as_deref())
            .unwrap_or(&[])
    }

    /// 去除首尾空白后的供应商名称
    pub fn vendor_name(&self) -> Option<String> {
        leaf_text(&self.vendor()?.vendor_name)
    }

    /// 去除首尾空白后的客户名称
    pub fn customer_name(&self) -> Option<String> {
        leaf_text(&self.customer()?.customer_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFields {
    pub invoice_id: Option<Field>,
    pub invoice_date: Option<Field>,
    pub due_date: Option<Field>,
    pub total_amount: Option<Field>,
    pub subtotal: Option<Field>,
    pub tax: Option<Field>,
    pub currency: Option<Field>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorFields {
    pub vendor_name: Option<Field>,
    pub vendor_address: Option<Field>,
    pub vendor_tax_id: Option<Field>,
    pub vendor_email: Option<Field>,
    pub vendor_phone: Option<Field>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFields {
    pub customer_name: Option<Field>,
    pub customer_address: Option<Field>,
    pub customer_email: Option<Field>,
    pub customer_phone: Option<Field>,
    pub customer_tax_id: Option<Field>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItemsBlock {
    pub items: Option<Field<Vec<RawLineItem>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub description: Option<Field>,
    pub quantity: Option<Field>,
    pub unit_price: Option<Field>,
    pub total_price: Option<Field>,
    pub amount: Option<Field>,
    pub category: Option<Field>,
    /// 德国会计科目字段, category 缺失时作为分类
    #[serde(rename = "Sachkonto")]
    pub sachkonto: Option<Field>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFields {
    pub due_date: Option<Field>,
    pub payment_terms: Option<Field>,
    pub payment_status: Option<Field>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_nested_record() {
        let record: ExtractionRecord = serde_json::from_value(json!({
            "extractedData": { "llmData": {
                "invoice": { "value": {
                    "invoiceId": { "value": " INV-7 " },
                    "totalAmount": { "value": 120.5 }
                }},
                "vendor": { "value": { "vendorName": { "value": "Acme GmbH " } } },
                "lineItems": { "value": { "items": { "value": [
                    { "description": { "value": "Paper" }, "Sachkonto": { "value": "4930" } }
                ]}}}
            }}
        }))
        .unwrap();

        let llm = record.llm_data().unwrap();
        assert_eq!(leaf_text(&llm.invoice().unwrap().invoice_id).as_deref(), Some("INV-7"));
        assert_eq!(llm.vendor_name().as_deref(), Some("Acme GmbH"));
        assert_eq!(leaf(&llm.invoice().unwrap().total_amount), Some(&RawValue::Number(120.5)));
        assert_eq!(llm.line_items().len(), 1);
        assert_eq!(leaf_text(&llm.line_items()[0].sachkonto).as_deref(), Some("4930"));
        assert!(llm.customer_name().is_none());
    }

    #[test]
    fn test_missing_payload_and_null_values() {
        let record: ExtractionRecord = serde_json::from_value(json!({})).unwrap();
        assert!(record.llm_data().is_none());

        let record: ExtractionRecord = serde_json::from_value(json!({
            "extractedData": { "llmData": { "invoice": { "value": { "invoiceId": { "value": null } } } } }
        }))
        .unwrap();
        let llm = record.llm_data().unwrap();
        assert!(leaf_text(&llm.invoice().unwrap().invoice_id).is_none());
        assert!(llm.line_items().is_empty());
    }

    #[test]
    fn test_numeric_text_rendering() {
        assert_eq!(RawValue::Number(1042.0).to_text().as_deref(), Some("1042"));
        assert_eq!(RawValue::Number(3.25).to_text().as_deref(), Some("3.25"));
        assert!(RawValue::Text(String::new()).is_blank());
    }
}
