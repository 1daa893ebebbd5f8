// ==========================================
// 预制构件模具排产系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 每个错误都有稳定的 SCREAMING_SNAKE 代码,用于运行摘要
// ==========================================

use chrono::NaiveDateTime;
use thiserror::Error;

/// 排程引擎错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 装箱错误 (单需求局部恢复) =====
    #[error("无兼容模具: request_id={request_id}, piece={height_cm}x{width_cm}x{length_cm}cm")]
    NoCompatibleResource {
        request_id: String,
        height_cm: f64,
        width_cm: f64,
        length_cm: f64,
    },

    #[error("兼容模具有效容量均小于1: request_id={request_id}, piece_length={length_cm}cm")]
    NoUsableCapacity { request_id: String, length_cm: f64 },

    #[error("构件需求无效: request_id={request_id}, reason={reason}")]
    InvalidPieceRequest { request_id: String, reason: String },

    // ===== 排程错误 =====
    #[error("引用的模具不存在: resource_id={resource_id}, referenced_by={referenced_by}")]
    DanglingResourceReference {
        resource_id: String,
        referenced_by: String,
    },

    #[error("工作日历耗尽: 从 {from} 起 {scanned_days} 天内无工作时段")]
    CalendarExhausted {
        from: NaiveDateTime,
        scanned_days: u32,
    },

    // ===== 延误错误 =====
    #[error("批次未找到: batch_id={batch_id}")]
    BatchNotFound { batch_id: String },

    #[error("延误时长无效: {delay_minutes} 分钟 (必须 > 0)")]
    InvalidDelay { delay_minutes: i64 },
}

impl EngineError {
    /// 运行摘要中使用的稳定错误代码
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NoCompatibleResource { .. } => "NO_COMPATIBLE_RESOURCE",
            EngineError::NoUsableCapacity { .. } => "NO_USABLE_CAPACITY",
            EngineError::InvalidPieceRequest { .. } => "INVALID_PIECE_REQUEST",
            EngineError::DanglingResourceReference { .. } => "DANGLING_RESOURCE_REFERENCE",
            EngineError::CalendarExhausted { .. } => "CALENDAR_EXHAUSTED",
            EngineError::BatchNotFound { .. } => "BATCH_NOT_FOUND",
            EngineError::InvalidDelay { .. } => "INVALID_DELAY",
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
