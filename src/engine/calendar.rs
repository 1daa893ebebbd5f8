// ==========================================
// 预制构件模具排产系统 - 工作日历引擎
// ==========================================
// 职责: 判断工作时刻 / 按工作分钟推进时间
// 规则:
// - 周末(可配置)与节假日为非工作日
// - 其他日期班次窗口 [shift_start, shift_end),可按日期覆写
// - 推进时只消耗班次窗口内的时间,余量顺延到下一窗口
// 红线: 搜索下一工作窗口最多扫描 max_scan_days 天,超出报 CalendarExhausted
// ==========================================

use crate::domain::calendar::CalendarDay;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::BTreeMap;

/// 默认班次开始 07:00
pub const DEFAULT_SHIFT_START: (u32, u32) = (7, 0);
/// 默认班次结束 17:00
pub const DEFAULT_SHIFT_END: (u32, u32) = (17, 0);
/// 默认日历扫描上限(天)
pub const DEFAULT_MAX_SCAN_DAYS: u32 = 365;

// ==========================================
// CalendarSettings - 日历默认参数
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSettings {
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub weekend_days: Vec<Weekday>,
    pub max_scan_days: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            shift_start: NaiveTime::from_hms_opt(DEFAULT_SHIFT_START.0, DEFAULT_SHIFT_START.1, 0)
                .unwrap_or(NaiveTime::MIN),
            shift_end: NaiveTime::from_hms_opt(DEFAULT_SHIFT_END.0, DEFAULT_SHIFT_END.1, 0)
                .unwrap_or(NaiveTime::MIN),
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            max_scan_days: DEFAULT_MAX_SCAN_DAYS,
        }
    }
}

// ==========================================
// WorkCalendar - 工作日历
// ==========================================
#[derive(Debug, Clone)]
pub struct WorkCalendar {
    settings: CalendarSettings,
    overrides: BTreeMap<NaiveDate, CalendarDay>,
}

impl WorkCalendar {
    pub fn new(settings: CalendarSettings) -> Self {
        Self {
            settings,
            overrides: BTreeMap::new(),
        }
    }

    /// 追加按日期覆写（同日期后者覆盖前者）
    pub fn with_overrides(mut self, days: impl IntoIterator<Item = CalendarDay>) -> Self {
        for day in days {
            self.overrides.insert(day.date, day);
        }
        self
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 某日的班次窗口 [start, end)
    ///
    /// # 返回
    /// - Some((start, end)): 工作日
    /// - None: 周末 / 节假日 / 覆写窗口为空
    pub fn shift_window(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if self.settings.weekend_days.contains(&date.weekday()) {
            return None;
        }

        let (start, end) = match self.overrides.get(&date) {
            Some(day) if day.is_holiday => return None,
            Some(day) => (
                day.shift_start.unwrap_or(self.settings.shift_start),
                day.shift_end.unwrap_or(self.settings.shift_end),
            ),
            None => (self.settings.shift_start, self.settings.shift_end),
        };

        if end <= start {
            return None;
        }
        Some((date.and_time(start), date.and_time(end)))
    }

    /// 是否处于工作时刻
    pub fn is_working_instant(&self, t: NaiveDateTime) -> bool {
        match self.shift_window(t.date()) {
            Some((start, end)) => t >= start && t < end,
            None => false,
        }
    }

    /// 是否恰好是某个班次窗口的收班时刻
    pub fn is_shift_close(&self, t: NaiveDateTime) -> bool {
        matches!(self.shift_window(t.date()), Some((_, end)) if end == t)
    }

    /// 对齐到 t 当时或之后的第一个工作时刻
    pub fn next_working_instant(&self, t: NaiveDateTime) -> EngineResult<NaiveDateTime> {
        let mut date = t.date();

        for offset in 0..=self.settings.max_scan_days {
            if let Some((start, end)) = self.shift_window(date) {
                if offset > 0 || t < start {
                    return Ok(start);
                }
                if t < end {
                    return Ok(t);
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Err(EngineError::CalendarExhausted {
            from: t,
            scanned_days: self.settings.max_scan_days,
        })
    }

    /// 从 from 起推进 minutes 个工作分钟
    ///
    /// - 起点不在工作时段时先跳到下一窗口开始
    /// - 窗口耗尽时余量顺延到下一窗口
    /// - minutes <= 0 时返回对齐后的起点
    pub fn advance_working_minutes(
        &self,
        from: NaiveDateTime,
        minutes: i64,
    ) -> EngineResult<NaiveDateTime> {
        let mut remaining_secs = minutes.max(0).saturating_mul(60);
        let mut cursor = self.next_working_instant(from)?;

        loop {
            let window_end = match self.shift_window(cursor.date()) {
                Some((_, end)) => end,
                None => {
                    cursor = self.next_working_instant(cursor)?;
                    continue;
                }
            };

            let available_secs = (window_end - cursor).num_seconds();
            if remaining_secs <= available_secs {
                return Ok(cursor + Duration::seconds(remaining_secs));
            }

            remaining_secs -= available_secs;
            cursor = self.next_working_instant(window_end)?;
        }
    }
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::new(CalendarSettings::default())
    }
}
