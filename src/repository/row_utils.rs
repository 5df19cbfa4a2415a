// ==========================================
// 工数管理系统 - 行映射工具
// ==========================================
// Decimal 以 TEXT 存储, 日期以 ISO 字符串存储, 枚举以 snake_case 存储
// 解析失败统一转为 FromSqlConversionFailure, 由 RepositoryError 映射
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub fn get_decimal(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| conversion_error(idx, format!("无效的数值 '{}': {}", raw, e)))
}

pub fn get_opt_decimal(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.trim().is_empty() => Decimal::from_str(raw.trim())
            .map(Some)
            .map_err(|e| conversion_error(idx, format!("无效的数值 '{}': {}", raw, e))),
        _ => Ok(None),
    }
}

pub fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| conversion_error(idx, format!("无效的日期 '{}': {}", raw, e)))
}

pub fn get_opt_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(Some)
            .map_err(|e| conversion_error(idx, format!("无效的日期 '{}': {}", raw, e))),
        _ => Ok(None),
    }
}

pub fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| conversion_error(idx, format!("无效的时间 '{}'", raw)))
}

pub fn get_opt_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.is_empty() => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("无效的时间 '{}'", raw))),
        _ => Ok(None),
    }
}

/// 兼容 "YYYY-mm-dd HH:MM:SS" 与 "YYYY-mm-ddTHH:MM:SS(.f)"
fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// 解析枚举列
pub fn get_enum<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("无效的枚举值 '{}'", raw)))
}

pub fn get_opt_enum<T>(
    row: &Row,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.is_empty() => parse(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("无效的枚举值 '{}'", raw))),
        _ => Ok(None),
    }
}

/// 解析年月列
pub fn get_year_month(row: &Row, idx: usize) -> rusqlite::Result<crate::domain::YearMonth> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion_error(idx, e))
}

// ===== 写入侧 =====

pub fn dec_to_sql(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn opt_dec_to_sql(value: Option<Decimal>) -> Option<String> {
    value.map(dec_to_sql)
}

pub fn date_to_sql(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn opt_date_to_sql(value: Option<NaiveDate>) -> Option<String> {
    value.map(date_to_sql)
}

pub fn datetime_to_sql(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub fn opt_datetime_to_sql(value: Option<NaiveDateTime>) -> Option<String> {
    value.map(datetime_to_sql)
}

/// 生成 "?N, ?N+1, ..." 占位符
pub fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
