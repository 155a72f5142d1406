//! 抽取值归一化: 金额、数量、日期
//!
//! 所有函数都不会失败, 无法解析时返回约定的默认值。

use crate::models::RawValue;
use bigdecimal::{BigDecimal, One, ToPrimitive, Zero};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::str::FromStr;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// 金额文本允许的最大十进制指数
const MAX_EXPONENT: i64 = 20;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 解析金额: 去除货币符号、千分位逗号和空白, 取最长的前导数字字面量
pub fn parse_amount(raw: Option<&RawValue>, default: BigDecimal) -> BigDecimal {
    match raw {
        Some(RawValue::Number(n)) => BigDecimal::from_str(&n.to_string()).unwrap_or(default),
        Some(RawValue::Text(text)) => parse_amount_text(text).unwrap_or(default),
        _ => default,
    }
}

fn parse_amount_text(text: &str) -> Option<BigDecimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | ',') && !c.is_whitespace())
        .collect();
    let literal = leading_decimal(&cleaned)?;
    BigDecimal::from_str(&literal).ok()
}

/// 提取前导十进制字面量并规范化 (".5" -> "0.5", "7." -> "7")
fn leading_decimal(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut out = String::new();

    if let Some(&sign @ (b'+' | b'-')) = bytes.first() {
        if sign == b'-' {
            out.push('-');
        }
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_part = &s[int_start..i];

    let mut frac_part = "";
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_part = &s[frac_start..j];
        if !int_part.is_empty() || !frac_part.is_empty() {
            i = j;
        }
    }

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    out.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_digits = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits {
            // 超出范围的指数视为无法解析
            let exp = s[i + 1..j].parse::<i64>().ok()?;
            if exp.abs() > MAX_EXPONENT {
                return None;
            }
            out.push('e');
            out.push_str(&s[i + 1..j]);
        }
    }

    Some(out)
}

/// 解析数量: 数字原样返回, 文本解析失败或缺失时为 1
pub fn parse_quantity(raw: Option<&RawValue>) -> BigDecimal {
    match raw {
        Some(RawValue::Number(_)) => parse_amount(raw, BigDecimal::one()),
        Some(RawValue::Text(text)) if !text.is_empty() => {
            parse_amount_text(text).unwrap_or_else(BigDecimal::one)
        }
        _ => BigDecimal::one(),
    }
}

/// 解析日期, 时间部分丢弃; 失败返回 None
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// 取第一个非空值 (空字符串和数字 0 视为缺失)
pub fn first_non_empty<'a>(
    primary: Option<&'a RawValue>,
    fallback: Option<&'a RawValue>,
) -> Option<&'a RawValue> {
    let present = |v: &&RawValue| !v.is_blank() && **v != RawValue::Number(0.0);
    primary.filter(present).or(fallback)
}

/// 金额转 JSON 数值
pub fn decimal_to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

pub fn zero() -> BigDecimal {
    BigDecimal::zero()
}
