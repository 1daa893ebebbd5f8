// ==========================================
// 预制构件模具排产系统 - 配置层
// ==========================================
// 职责: 排程配置读取 (班次 / 周末 / 日历扫描上限 / 备选数量)
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, SchedulerConfig};
