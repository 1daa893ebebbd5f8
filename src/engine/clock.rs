// ==========================================
// 预制构件模具排产系统 - 时钟
// ==========================================
// 职责: 为排程提供"当前时刻"(工厂本地时间)
// 说明: 引擎不直接读系统时间,便于测试固定时刻
// ==========================================

use chrono::NaiveDateTime;

/// 时钟 trait
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// 系统本地时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// 固定时钟（测试/回放）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
