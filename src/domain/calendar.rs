// ==========================================
// 预制构件模具排产系统 - 工作日历领域模型
// ==========================================
// 对齐: work_calendar 表 (按日期覆写班次 / 标记节假日)
// ==========================================

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// CalendarDay - 日历日覆写
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
    pub shift_start: Option<NaiveTime>, // None → 使用默认班次
    pub shift_end: Option<NaiveTime>,
}

impl CalendarDay {
    /// 节假日
    pub fn holiday(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            is_holiday: true,
            holiday_name: Some(name.into()),
            shift_start: None,
            shift_end: None,
        }
    }

    /// 班次覆写
    pub fn shift(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            date,
            is_holiday: false,
            holiday_name: None,
            shift_start: Some(start),
            shift_end: Some(end),
        }
    }
}
