use crate::models::extraction::{leaf, leaf_text};
use crate::models::{
    ExtractionRecord, InvoiceDraft, InvoiceStatus, LineItemDraft, MaterializedInvoice, RawLineItem,
    SkipReason,
};
use crate::service::normalize::{first_non_empty, parse_amount, parse_date, parse_quantity, zero};
use crate::service::resolver::ResolvedParties;
use bigdecimal::{BigDecimal, One, Zero};

const DEFAULT_CURRENCY: &str = "EUR";

/// 付款状态关键字规则, 按顺序匹配, 首个命中生效
const STATUS_RULES: [(&str, InvoiceStatus); 4] = [
    ("PAID", InvoiceStatus::Paid),
    ("OVERDUE", InvoiceStatus::Overdue),
    ("CANCELLED", InvoiceStatus::Cancelled),
    ("PARTIAL", InvoiceStatus::Partial),
];

/// 从自由文本付款状态推导发票状态 (不区分大小写的子串匹配)
pub fn derive_status(payment_status: Option<&str>) -> InvoiceStatus {
    let Some(text) = payment_status else {
        return InvoiceStatus::Pending;
    };
    let upper = text.to_uppercase();
    STATUS_RULES
        .iter()
        .find(|(keyword, _)| upper.contains(keyword))
        .map(|(_, status)| *status)
        .unwrap_or(InvoiceStatus::Pending)
}

/// 第二遍: 将单条记录归一化为发票头 + 明细
pub fn materialize(
    record: &ExtractionRecord,
    parties: &ResolvedParties,
) -> Result<MaterializedInvoice, SkipReason> {
    let llm = record.llm_data().ok_or(SkipReason::MissingPayload)?;
    let header = llm.invoice();

    let invoice_number = header
        .and_then(|h| leaf_text(&h.invoice_id))
        .ok_or(SkipReason::MissingInvoiceNumber)?;
    let vendor_name = llm.vendor_name().ok_or(SkipReason::MissingVendorName)?;
    let vendor_id = parties
        .vendor_id(&vendor_name)
        .ok_or_else(|| SkipReason::UnresolvedVendor(vendor_name.clone()))?;

    let customer_id = llm
        .customer_name()
        .and_then(|name| parties.customer_id(&name));

    let issue_date = header
        .and_then(|h| leaf_text(&h.invoice_date))
        .and_then(|d| parse_date(Some(&d)))
        .ok_or(SkipReason::InvalidIssueDate)?;

    let payment = llm.payment();
    let due_date = first_non_empty(
        header.and_then(|h| leaf(&h.due_date)),
        payment.and_then(|p| leaf(&p.due_date)),
    )
    .and_then(|raw| raw.to_text())
    .and_then(|d| parse_date(Some(&d)));

    let total_raw = header.and_then(|h| leaf(&h.total_amount));
    let subtotal = parse_amount(
        first_non_empty(header.and_then(|h| leaf(&h.subtotal)), total_raw),
        zero(),
    );
    let tax = parse_amount(header.and_then(|h| leaf(&h.tax)), zero());
    let declared_total = parse_amount(total_raw, zero());
    let total = if declared_total.is_zero() {
        &subtotal + &tax
    } else {
        declared_total
    };

    let currency = header
        .and_then(|h| leaf_text(&h.currency))
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let status = derive_status(
        payment
            .and_then(|p| leaf_text(&p.payment_status))
            .as_deref(),
    );

    let line_items = llm.line_items().iter().filter_map(line_item).collect();

    Ok(MaterializedInvoice {
        invoice: InvoiceDraft {
            invoice_number,
            vendor_id,
            customer_id,
            issue_date,
            due_date,
            status,
            subtotal,
            tax,
            total,
            currency,
        },
        line_items,
    })
}

/// 明细归一化; 描述为空的明细丢弃
///
/// 单价与金额取绝对值 (贷项通知单的负数按正数计入汇总),
/// 缺失的一方由 `金额 = 单价 × 数量` 推导。
pub fn line_item(raw: &RawLineItem) -> Option<LineItemDraft> {
    let description = leaf(&raw.description)
        .and_then(|v| v.to_text())
        .filter(|d| !d.is_empty())?;

    let quantity = parse_quantity(leaf(&raw.quantity));
    let unit_price = parse_amount(leaf(&raw.unit_price), zero()).abs();
    let amount = parse_amount(
        first_non_empty(leaf(&raw.total_price), leaf(&raw.amount)),
        zero(),
    )
    .abs();

    let category = leaf_text(&raw.category).or_else(|| leaf_text(&raw.sachkonto));

    let unit_price = if unit_price.is_zero() {
        let divisor = if quantity.is_zero() {
            BigDecimal::one()
        } else {
            quantity.clone()
        };
        &amount / &divisor
    } else {
        unit_price
    };
    let amount = if amount.is_zero() {
        &unit_price * &quantity
    } else {
        amount
    };

    Some(LineItemDraft {
        description,
        category,
        quantity,
        unit_price,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn parties() -> ResolvedParties {
        let mut p = ResolvedParties::default();
        p.vendors.insert("Acme".to_string(), 1);
        p.customers.insert("Globex".to_string(), 7);
        p
    }

    fn record(llm: Value) -> ExtractionRecord {
        serde_json::from_value(json!({ "extractedData": { "llmData": llm } })).unwrap()
    }

    fn base_llm() -> Value {
        json!({
            "invoice": { "value": {
                "invoiceId": { "value": "INV-1" },
                "invoiceDate": { "value": "2024-05-02" },
                "subtotal": { "value": "100.00" },
                "tax": { "value": "19.00" },
                "totalAmount": { "value": "119.00" }
            }},
            "vendor": { "value": { "vendorName": { "value": "Acme" } } },
            "customer": { "value": { "customerName": { "value": "Globex" } } }
        })
    }

    #[test]
    fn test_materialize_complete_record() {
        let result = materialize(&record(base_llm()), &parties()).unwrap();
        let invoice = result.invoice;
        assert_eq!(invoice.invoice_number, "INV-1");
        assert_eq!(invoice.vendor_id, 1);
        assert_eq!(invoice.customer_id, Some(7));
        assert_eq!(invoice.issue_date.to_string(), "2024-05-02");
        assert_eq!(invoice.total, dec("119"));
        assert_eq!(invoice.currency, "EUR");
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert!(result.line_items.is_empty());
    }

    #[test]
    fn test_total_falls_back_to_subtotal_plus_tax() {
        let mut llm = base_llm();
        llm["invoice"]["value"]["totalAmount"] = json!({ "value": "" });
        let invoice = materialize(&record(llm), &parties()).unwrap().invoice;
        assert_eq!(invoice.total, dec("119"));
    }

    #[test]
    fn test_subtotal_falls_back_to_total() {
        let mut llm = base_llm();
        llm["invoice"]["value"]["subtotal"] = json!({ "value": null });
        llm["invoice"]["value"]["tax"] = json!({ "value": "n/a" });
        let invoice = materialize(&record(llm), &parties()).unwrap().invoice;
        assert_eq!(invoice.subtotal, dec("119"));
        assert_eq!(invoice.tax, dec("0"));
        assert_eq!(invoice.total, dec("119"));
    }

    #[test]
    fn test_missing_invoice_number_is_skipped() {
        let mut llm = base_llm();
        llm["invoice"]["value"]["invoiceId"] = json!({});
        assert_eq!(
            materialize(&record(llm), &parties()),
            Err(SkipReason::MissingInvoiceNumber)
        );
    }

    #[test]
    fn test_unresolved_vendor_is_skipped() {
        let mut llm = base_llm();
        llm["vendor"]["value"]["vendorName"] = json!({ "value": "Umbrella" });
        assert_eq!(
            materialize(&record(llm), &parties()),
            Err(SkipReason::UnresolvedVendor("Umbrella".to_string()))
        );
    }

    #[test]
    fn test_unparseable_issue_date_is_skipped() {
        let mut llm = base_llm();
        llm["invoice"]["value"]["invoiceDate"] = json!({ "value": "sometime in May" });
        assert_eq!(
            materialize(&record(llm), &parties()),
            Err(SkipReason::InvalidIssueDate)
        );
        assert_eq!(
            materialize(&ExtractionRecord::default(), &parties()),
            Err(SkipReason::MissingPayload)
        );
    }

    #[test]
    fn test_unknown_customer_is_not_an_error() {
        let mut llm = base_llm();
        llm["customer"]["value"]["customerName"] = json!({ "value": "Nobody" });
        let invoice = materialize(&record(llm), &parties()).unwrap().invoice;
        assert_eq!(invoice.customer_id, None);
    }

    #[test]
    fn test_due_date_from_payment_block() {
        let mut llm = base_llm();
        llm["payment"] = json!({ "value": { "dueDate": { "value": "2024-06-01" } } });
        let invoice = materialize(&record(llm), &parties()).unwrap().invoice;
        assert_eq!(invoice.due_date.map(|d| d.to_string()).as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn test_status_keyword_priority() {
        assert_eq!(derive_status(Some("Marked PAID by accounting")), InvoiceStatus::Paid);
        assert_eq!(derive_status(Some("overdue since May")), InvoiceStatus::Overdue);
        assert_eq!(derive_status(Some("Cancelled")), InvoiceStatus::Cancelled);
        assert_eq!(derive_status(Some("partial payment")), InvoiceStatus::Partial);
        // PAID 优先于 PARTIAL
        assert_eq!(derive_status(Some("partially paid")), InvoiceStatus::Paid);
        assert_eq!(derive_status(Some("awaiting transfer")), InvoiceStatus::Pending);
        assert_eq!(derive_status(None), InvoiceStatus::Pending);
    }

    #[test]
    fn test_line_item_amount_from_unit_price() {
        let raw: RawLineItem = serde_json::from_value(json!({
            "description": { "value": "Consulting" },
            "unitPrice": { "value": 10 },
            "quantity": { "value": 3 }
        }))
        .unwrap();
        let item = line_item(&raw).unwrap();
        assert_eq!(item.amount, dec("30"));
        assert_eq!(item.unit_price, dec("10"));
    }

    #[test]
    fn test_line_item_unit_price_from_amount() {
        let raw: RawLineItem = serde_json::from_value(json!({
            "description": { "value": "Licenses" },
            "quantity": { "value": "4" },
            "totalPrice": { "value": "-200.00 €" },
            "Sachkonto": { "value": " 6815 " }
        }))
        .unwrap();
        let item = line_item(&raw).unwrap();
        assert_eq!(item.amount, dec("200"));
        assert_eq!(item.unit_price, dec("50"));
        assert_eq!(item.category.as_deref(), Some("6815"));
    }

    #[test]
    fn test_line_item_without_description_is_dropped() {
        let raw: RawLineItem = serde_json::from_value(json!({
            "description": { "value": "" },
            "amount": { "value": 5 }
        }))
        .unwrap();
        assert!(line_item(&raw).is_none());
    }

    #[test]
    fn test_line_item_zero_quantity_divides_by_one() {
        let raw: RawLineItem = serde_json::from_value(json!({
            "description": { "value": "Freight" },
            "quantity": { "value": 0 },
            "amount": { "value": 12.5 }
        }))
        .unwrap();
        let item = line_item(&raw).unwrap();
        assert_eq!(item.quantity, dec("0"));
        assert_eq!(item.unit_price, dec("12.5"));
        assert_eq!(item.amount, dec("12.5"));
    }
}
