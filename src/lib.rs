// ==========================================
// 预制构件模具排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 模具批次排程 (装箱 / 排队 / FS 链排程 / 延误级联 / 交期预估)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排产规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, Priority, UrgencyDirective, WorkOrderStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Batch, CalendarDay, PackedBatch, PieceEnvelope, PieceRequest, Resource,
    WorkOrder,
};

// 引擎
pub use engine::{
    AvailabilityEstimator, CapacityPacker, DelayPropagator, QueueBuilder, RescheduleOrchestrator,
    ResourceScheduler, WorkCalendar,
};

// API
pub use api::{ApiError, ScheduleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "预制构件模具排产系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
