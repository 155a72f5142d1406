use crate::error::{is_connection_failure, LoadError};
use crate::models::extraction::leaf_text;
use crate::models::{
    ExtractionRecord, LoadIssue, LoadStats, MaterializedInvoice, PartyFields, PartyKind,
    SkipReason,
};
use crate::service::materializer::materialize;
use crate::service::resolver::{collect_parties, resolve_parties};
use rayon::prelude::*;

/// 导入路径所需的存储操作 (按自然键 upsert)
#[allow(async_fn_in_trait)]
pub trait LoadStore {
    /// 按名称 upsert 供应商 / 客户, 返回主键
    async fn upsert_party(&self, kind: PartyKind, fields: &PartyFields) -> Result<i64, sqlx::Error>;

    /// 按发票号 upsert 发票头并追加明细, 二者同成同败; 返回写入的明细行数
    async fn save_invoice(&self, invoice: &MaterializedInvoice) -> Result<u64, sqlx::Error>;

    /// 清空付款、明细、发票、客户、供应商
    async fn clear(&self) -> Result<(), sqlx::Error>;
}

/// 批量导入服务
pub struct Loader<S> {
    store: S,
}

impl<S: LoadStore> Loader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 清空库, 重新导入前调用以避免明细重复
    pub async fn reset(&self) -> Result<(), LoadError> {
        tracing::info!("[Seed] Clearing existing data...");
        self.store.clear().await.map_err(LoadError::Reset)
    }

    /// 两遍导入: 先解析供应商/客户, 再逐条写入发票和明细
    ///
    /// 单条记录的失败计入 `skipped` 并继续; 只有连接类错误终止批次。
    pub async fn load(&self, records: &[ExtractionRecord]) -> Result<LoadStats, LoadError> {
        tracing::info!("[Seed] 开始导入 {} 条记录", records.len());
        let start_time = std::time::Instant::now();

        // Pass 1: 供应商 / 客户
        let batch = collect_parties(records);
        tracing::info!(
            "[Seed] Found {} unique vendors, {} unique customers",
            batch.vendors.len(),
            batch.customers.len()
        );
        let (parties, issues) = resolve_parties(&self.store, &batch)
            .await
            .map_err(LoadError::StoreUnavailable)?;

        let mut stats = LoadStats {
            vendors_created: parties.vendors.len(),
            customers_created: parties.customers.len(),
            errors: issues,
            ..LoadStats::default()
        };

        // Pass 2: 归一化为纯计算, 并行执行; 写入按输入顺序串行
        let drafts: Vec<_> = records
            .par_iter()
            .map(|record| materialize(record, &parties))
            .collect();

        for (index, (record, draft)) in records.iter().zip(drafts).enumerate() {
            let materialized = match draft {
                Ok(m) => m,
                Err(reason) => {
                    let key = record
                        .llm_data()
                        .and_then(|llm| llm.invoice())
                        .and_then(|h| leaf_text(&h.invoice_id));
                    tracing::debug!("[Seed] Record {} skipped: {}", index, reason);
                    stats.skip(index, key, &reason);
                    continue;
                }
            };

            let invoice_number = materialized.invoice.invoice_number.clone();
            match self.store.save_invoice(&materialized).await {
                Ok(items) => {
                    stats.invoices_created += 1;
                    stats.line_items_created += items as usize;
                }
                Err(e) if is_connection_failure(&e) => {
                    tracing::error!("[Seed] ✗ Store unavailable at record {}: {}", index, e);
                    return Err(LoadError::StoreUnavailable(e));
                }
                Err(e) => {
                    tracing::warn!("[Seed] Error creating invoice {}: {}", invoice_number, e);
                    stats.skip(
                        index,
                        Some(invoice_number),
                        &SkipReason::Persistence(e.to_string()),
                    );
                }
            }

            let done = index + 1;
            if done % 100 == 0 {
                tracing::info!("[Seed] 进度: {}/{}, 已写入发票: {}", done, records.len(), stats.invoices_created);
            }
        }

        tracing::info!(
            "[Seed] 导入完成 - 供应商: {}, 客户: {}, 发票: {}, 明细: {}, 跳过: {}, 耗时: {:?}",
            stats.vendors_created,
            stats.customers_created,
            stats.invoices_created,
            stats.line_items_created,
            stats.skipped,
            start_time.elapsed()
        );

        Ok(stats)
    }
}

/// 导出跳过的记录到 CSV (index, invoice_number, reason)
pub fn write_skip_report<W: std::io::Write>(issues: &[LoadIssue], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["index", "invoice_number", "reason"])?;

    for issue in issues {
        writer.write_record(&[
            issue.index.map(|i| i.to_string()).unwrap_or_default(),
            issue.key.clone().unwrap_or_default(),
            issue.reason.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
