use crate::models::{InvoiceDraft, LineItemDraft, MaterializedInvoice, PartyFields, PartyKind};
use crate::service::loader::LoadStore;
use sqlx::{PgConnection, PgPool};

/// 基于 Postgres 的导入存储, 依赖唯一约束实现 upsert
#[derive(Clone)]
pub struct PgLoadStore {
    pool: PgPool,
}

impl PgLoadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl LoadStore for PgLoadStore {
    async fn upsert_party(&self, kind: PartyKind, fields: &PartyFields) -> Result<i64, sqlx::Error> {
        // 未提供的联系字段不覆盖已有值
        let sql = format!(
            r#"
            INSERT INTO {table} (name, email, phone, address, tax_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET
                email = coalesce(EXCLUDED.email, {table}.email),
                phone = coalesce(EXCLUDED.phone, {table}.phone),
                address = coalesce(EXCLUDED.address, {table}.address),
                tax_id = coalesce(EXCLUDED.tax_id, {table}.tax_id),
                updated_at = now()
            RETURNING id
            "#,
            table = kind.table()
        );

        sqlx::query_scalar::<_, i64>(&sql)
            .bind(&fields.name)
            .bind(&fields.email)
            .bind(&fields.phone)
            .bind(&fields.address)
            .bind(&fields.tax_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_invoice(&self, invoice: &MaterializedInvoice) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let invoice_id = upsert_invoice(&mut *tx, &invoice.invoice).await?;
        let items = insert_line_items(&mut *tx, invoice_id, &invoice.line_items).await?;
        tx.commit().await?;
        Ok(items)
    }

    async fn clear(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for table in ["payments", "line_items", "invoices", "customers", "vendors"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }
}

/// 按发票号 upsert 发票头, 返回主键
async fn upsert_invoice(conn: &mut PgConnection, draft: &InvoiceDraft) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO invoices (
            invoice_number, vendor_id, customer_id, issue_date, due_date,
            status, subtotal, tax, total, currency
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (invoice_number) DO UPDATE SET
            vendor_id = EXCLUDED.vendor_id,
            customer_id = coalesce(EXCLUDED.customer_id, invoices.customer_id),
            issue_date = EXCLUDED.issue_date,
            due_date = EXCLUDED.due_date,
            status = EXCLUDED.status,
            subtotal = EXCLUDED.subtotal,
            tax = EXCLUDED.tax,
            total = EXCLUDED.total,
            currency = EXCLUDED.currency,
            updated_at = now()
        RETURNING id
        "#,
    )
    .bind(&draft.invoice_number)
    .bind(draft.vendor_id)
    .bind(draft.customer_id)
    .bind(draft.issue_date)
    .bind(draft.due_date)
    .bind(draft.status)
    .bind(&draft.subtotal)
    .bind(&draft.tax)
    .bind(&draft.total)
    .bind(&draft.currency)
    .fetch_one(conn)
    .await
}

/// 插入明细 (不去重)
async fn insert_line_items(
    conn: &mut PgConnection,
    invoice_id: i64,
    items: &[LineItemDraft],
) -> Result<u64, sqlx::Error> {
    if items.is_empty() {
        return Ok(0);
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO line_items (invoice_id, description, category, quantity, unit_price, amount) ",
    );
    query_builder.push_values(items, |mut b, item| {
        b.push_bind(invoice_id)
            .push_bind(&item.description)
            .push_bind(&item.category)
            .push_bind(item.quantity.clone())
            .push_bind(item.unit_price.clone())
            .push_bind(item.amount.clone());
    });

    let result = query_builder.build().execute(conn).await?;
    tracing::debug!("INSERT line_items 影响 {} 行", result.rows_affected());
    Ok(result.rows_affected())
}
