// ==========================================
// 行映射辅助: 时间/枚举的 TEXT 编解码
// ==========================================
// 存储格式:
// - 时刻: %Y-%m-%d %H:%M:%S (工厂本地时间)
// - 日期: %Y-%m-%d
// - 时间: %H:%M
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use std::str::FromStr;

pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn fmt_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TS_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

/// 兼容 HH:MM 与 HH:MM:SS
pub fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| conversion_error(idx, e))
}

/// 解析领域枚举 (Priority / UrgencyDirective / 状态)
pub fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}
