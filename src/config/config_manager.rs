// ==========================================
// 预制构件模具排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (scope_id = 'global')
// 规则: 缺失键使用默认值; 格式错误 → ValidationError
// ==========================================

use crate::engine::availability::DEFAULT_ALTERNATIVES;
use crate::engine::calendar::{CalendarSettings, DEFAULT_MAX_SCAN_DAYS};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveTime, Weekday};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// SchedulerConfig - 排程配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub calendar: CalendarSettings,
    pub suggestion_alternatives: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            calendar: CalendarSettings::default(),
            suggestion_alternatives: DEFAULT_ALTERNATIVES,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    // ===== 排程配置 =====

    /// 读取排程配置快照
    pub fn load_scheduler_config(&self) -> RepositoryResult<SchedulerConfig> {
        let defaults = SchedulerConfig::default();

        let shift_start = match self.get_global_config_value(config_keys::SHIFT_START)? {
            Some(raw) => parse_hhmm(config_keys::SHIFT_START, &raw)?,
            None => defaults.calendar.shift_start,
        };
        let shift_end = match self.get_global_config_value(config_keys::SHIFT_END)? {
            Some(raw) => parse_hhmm(config_keys::SHIFT_END, &raw)?,
            None => defaults.calendar.shift_end,
        };
        if shift_end <= shift_start {
            return Err(RepositoryError::ValidationError(format!(
                "班次结束时间必须晚于开始时间: {} - {}",
                shift_start, shift_end
            )));
        }

        let weekend_days = match self.get_global_config_value(config_keys::WEEKEND_DAYS)? {
            Some(raw) => parse_weekdays(&raw)?,
            None => defaults.calendar.weekend_days,
        };

        let max_scan_days: u32 =
            self.get_parsed_or(config_keys::CALENDAR_MAX_SCAN_DAYS, DEFAULT_MAX_SCAN_DAYS)?;
        if max_scan_days == 0 {
            return Err(RepositoryError::ValidationError(format!(
                "{} 必须 >= 1",
                config_keys::CALENDAR_MAX_SCAN_DAYS
            )));
        }

        let suggestion_alternatives =
            self.get_parsed_or(config_keys::SUGGESTION_ALTERNATIVES, DEFAULT_ALTERNATIVES)?;

        Ok(SchedulerConfig {
            calendar: CalendarSettings {
                shift_start,
                shift_end,
                weekend_days,
                max_scan_days,
            },
            suggestion_alternatives,
        })
    }

    fn get_parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> RepositoryResult<T> {
        match self.get_global_config_value(key)? {
            Some(raw) => raw.trim().parse::<T>().map_err(|_| {
                RepositoryError::ValidationError(format!("配置格式错误: {}='{}'", key, raw))
            }),
            None => Ok(default),
        }
    }
}

fn parse_hhmm(key: &str, raw: &str) -> RepositoryResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| RepositoryError::ValidationError(format!("配置格式错误: {}='{}'", key, raw)))
}

/// ISO 星期编号 (1=周一 … 7=周日), 逗号分隔; 空串表示无周末
fn parse_weekdays(raw: &str) -> RepositoryResult<Vec<Weekday>> {
    let mut days = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day = match part {
            "1" => Weekday::Mon,
            "2" => Weekday::Tue,
            "3" => Weekday::Wed,
            "4" => Weekday::Thu,
            "5" => Weekday::Fri,
            "6" => Weekday::Sat,
            "7" => Weekday::Sun,
            other => {
                return Err(RepositoryError::ValidationError(format!(
                    "配置格式错误: {}='{}' (无效星期 {})",
                    config_keys::WEEKEND_DAYS,
                    raw,
                    other
                )))
            }
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 工作日历
    pub const SHIFT_START: &str = "shift_start"; // HH:MM
    pub const SHIFT_END: &str = "shift_end"; // HH:MM
    pub const WEEKEND_DAYS: &str = "weekend_days"; // 例如 "6,7"
    pub const CALENDAR_MAX_SCAN_DAYS: &str = "calendar_max_scan_days";

    // 交期预估
    pub const SUGGESTION_ALTERNATIVES: &str = "suggestion_alternatives";
}
