//! 报表聚合 (纯函数)
//!
//! `ReportService` 从库中读取行, 这里负责分组、排序和回退窗口的选择。
//! 所有函数只依赖入参, "今天" 由调用方传入。

use crate::models::{
    CashOutflowEntry, CategoryAmount, CategorySpend, DashboardStats, InvoiceFigure, InvoiceStat,
    MonthlyTrend, OutflowCandidate, PartyTotal, TopCustomer, TopVendor,
};
use crate::service::normalize::decimal_to_f64;
use bigdecimal::{BigDecimal, Zero};
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// 发票数超过该值时才按时间窗口过滤
pub const SMALL_DATASET_THRESHOLD: i64 = 10;
/// 趋势图第二级回退窗口 (月)
pub const WIDENED_TREND_MONTHS: u32 = 24;
/// 现金流默认预测天数
pub const OUTFLOW_HORIZON_DAYS: i64 = 90;
pub const UNKNOWN_NAME: &str = "Unknown";

/// 未付金额 = 总额 - 已付合计
pub fn outstanding(total: &BigDecimal, paid: &BigDecimal) -> BigDecimal {
    total - paid
}

/// 当前自然年 [1月1日, 12月31日]
pub fn year_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let year = today.year();
    (
        NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today),
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today),
    )
}

/// N 个月前所在月份的 1 号
pub fn month_window_start(today: NaiveDate, months: u32) -> NaiveDate {
    let back = lookback_start(today, months);
    back.with_day(1).unwrap_or(back)
}

/// N 个月前的同一天 (月末自动截断)
pub fn lookback_start(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// 是否需要读取当年统计 (小数据集直接使用全部数据)
pub fn needs_year_scope(all: &InvoiceStat) -> bool {
    all.cnt > SMALL_DATASET_THRESHOLD
}

/// 合并全量统计与当年统计
///
/// 合计与平均值各自独立回退: 当年值为 0 且库中有数据时使用全量值。
pub fn combine_stats(all: &InvoiceStat, scoped: Option<&InvoiceStat>) -> DashboardStats {
    let effective = scoped.unwrap_or(all);

    let mut total_spend = effective.sum_total.clone();
    if total_spend.is_zero() && all.cnt > 0 {
        total_spend = all.sum_total.clone();
    }

    let mut average = effective.avg_total.clone().unwrap_or_else(BigDecimal::zero);
    if average.is_zero() && all.cnt > 0 {
        average = all.avg_total.clone().unwrap_or_else(BigDecimal::zero);
    }

    DashboardStats {
        total_spend: decimal_to_f64(&total_spend),
        total_invoices_processed: effective.cnt,
        documents_uploaded: all.cnt,
        average_invoice_value: decimal_to_f64(&average),
    }
}

/// 趋势窗口的逐级放宽: N 个月 -> 24 个月 -> 全部
///
/// 只要有任何发票, 返回结果就不为空。
pub fn select_trend_window(
    all: &[InvoiceFigure],
    today: NaiveDate,
    months: u32,
) -> Vec<&InvoiceFigure> {
    let since = |start: NaiveDate| -> Vec<&InvoiceFigure> {
        all.iter().filter(|f| f.issue_date >= start).collect()
    };

    let mut selected: Vec<&InvoiceFigure> = if all.len() as i64 > SMALL_DATASET_THRESHOLD {
        since(month_window_start(today, months))
    } else {
        all.iter().collect()
    };

    if selected.is_empty() && !all.is_empty() {
        tracing::debug!("No invoices in last {} months, widening to {}", months, WIDENED_TREND_MONTHS);
        selected = since(month_window_start(today, WIDENED_TREND_MONTHS));
    }

    if selected.is_empty() && !all.is_empty() {
        tracing::debug!("No invoices in last {} months, using all", WIDENED_TREND_MONTHS);
        selected = all.iter().collect();
    }

    selected
}

/// 按 YYYY-MM 分组, 月份升序
pub fn group_by_month<'a, I>(figures: I) -> Vec<MonthlyTrend>
where
    I: IntoIterator<Item = &'a InvoiceFigure>,
{
    let mut months: BTreeMap<String, (i64, BigDecimal)> = BTreeMap::new();
    for figure in figures {
        let entry = months
            .entry(figure.issue_date.format("%Y-%m").to_string())
            .or_insert_with(|| (0, BigDecimal::zero()));
        entry.0 += 1;
        entry.1 += &figure.total;
    }

    months
        .into_iter()
        .map(|(month, (count, value))| MonthlyTrend {
            month,
            invoice_count: count,
            total_value: decimal_to_f64(&value),
        })
        .collect()
}

/// 按合计降序稳定排序 (并列时保持库返回的顺序)
fn sort_by_total_desc(rows: &mut [PartyTotal]) {
    rows.sort_by(|a, b| {
        b.total_spend
            .partial_cmp(&a.total_spend)
            .unwrap_or(Ordering::Equal)
    });
}

pub fn rank_vendors(mut rows: Vec<PartyTotal>, limit: usize) -> Vec<TopVendor> {
    sort_by_total_desc(&mut rows);
    rows.into_iter()
        .take(limit)
        .map(|row| TopVendor {
            vendor_id: row.party_id,
            vendor_name: row.party_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            total_spend: decimal_to_f64(&row.total_spend),
            invoice_count: row.invoice_count,
        })
        .collect()
}

pub fn rank_customers(mut rows: Vec<PartyTotal>, limit: usize) -> Vec<TopCustomer> {
    sort_by_total_desc(&mut rows);
    rows.into_iter()
        .take(limit)
        .map(|row| TopCustomer {
            customer_id: row.party_id,
            customer_name: row.party_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            total_value: decimal_to_f64(&row.total_spend),
            invoice_count: row.invoice_count,
        })
        .collect()
}

/// 按分类汇总明细金额, 降序
pub fn sum_by_category(rows: &[CategoryAmount]) -> Vec<CategorySpend> {
    let mut totals: HashMap<&str, BigDecimal> = HashMap::new();
    for row in rows {
        *totals
            .entry(row.category.as_str())
            .or_insert_with(BigDecimal::zero) += &row.amount;
    }

    let mut result: Vec<(&str, BigDecimal)> = totals.into_iter().collect();
    result.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    result
        .into_iter()
        .map(|(category, total)| CategorySpend {
            category: category.to_string(),
            total: decimal_to_f64(&total),
        })
        .collect()
}

/// 默认预测窗口: 今天起 90 天 (含两端)
pub fn default_outflow_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, today + Duration::days(OUTFLOW_HORIZON_DAYS))
}

/// 预测区间: 指定了任一端点时原样使用, 否则为默认窗口
pub fn outflow_bounds(
    today: NaiveDate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    if start.is_some() || end.is_some() {
        (start, end)
    } else {
        let (from, to) = default_outflow_window(today);
        (Some(from), Some(to))
    }
}

/// 仅在未指定区间且默认窗口内没有结果时回退到全部发票
pub fn needs_outflow_fallback(
    window: &[CashOutflowEntry],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> bool {
    window.is_empty() && start.is_none() && end.is_none()
}

/// 现金流候选的纳入规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutflowMode {
    /// 窗口内: 未付金额 > 0 或状态未结清
    Window,
    /// 回退: 所有有到期日的发票
    All,
}

/// 单张发票的预测金额: 未付金额为正时取未付金额, 否则取总额
pub fn forecast_amount(candidate: &OutflowCandidate) -> BigDecimal {
    let open = outstanding(&candidate.total, &candidate.paid);
    if open > BigDecimal::zero() {
        open
    } else {
        candidate.total.clone()
    }
}

/// 按到期日 (YYYY-MM-DD) 汇总预测金额, 日期升序; 负数金额不计入
pub fn forecast_outflow(candidates: &[OutflowCandidate], mode: OutflowMode) -> Vec<CashOutflowEntry> {
    let mut days: BTreeMap<NaiveDate, BigDecimal> = BTreeMap::new();

    for candidate in candidates {
        let open = outstanding(&candidate.total, &candidate.paid);
        let include = match mode {
            OutflowMode::Window => open > BigDecimal::zero() || candidate.status.is_open(),
            OutflowMode::All => true,
        };
        if !include {
            continue;
        }

        let amount = forecast_amount(candidate);
        if amount < BigDecimal::zero() {
            tracing::debug!(
                "Invoice {} has negative forecast amount {}, ignored",
                candidate.invoice_id,
                amount
            );
            continue;
        }

        *days
            .entry(candidate.due_date)
            .or_insert_with(BigDecimal::zero) += amount;
    }

    days.into_iter()
        .map(|(date, amount)| CashOutflowEntry {
            date: date.format("%Y-%m-%d").to_string(),
            amount: decimal_to_f64(&amount),
        })
        .collect()
}
