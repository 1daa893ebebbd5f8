// ==========================================
// 预制构件模具排产系统 - API层错误类型
// ==========================================
// 职责: 将 Engine / Repository 错误转换为调用方可见的错误
// 约定: 每个错误都有稳定的 SCREAMING_SNAKE 代码 (code())
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 排程错误
    // ==========================================
    #[error("无兼容模具: {0}")]
    NoCompatibleResource(String),

    #[error("模具有效容量不足: {0}")]
    NoUsableCapacity(String),

    #[error("引用的模具不存在: {0}")]
    DanglingResourceReference(String),

    #[error("工作日历耗尽: {0}")]
    CalendarExhausted(String),

    #[error("批次未找到: batch_id={batch_id}")]
    BatchNotFound { batch_id: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("排程已被并发修改: expected_revision={expected}, actual_revision={actual}")]
    ConcurrentRescheduleConflict { expected: i64, actual: i64 },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误代码 (CLI / 调用方分支用)
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoCompatibleResource(_) => "NO_COMPATIBLE_RESOURCE",
            ApiError::NoUsableCapacity(_) => "NO_USABLE_CAPACITY",
            ApiError::DanglingResourceReference(_) => "DANGLING_RESOURCE_REFERENCE",
            ApiError::CalendarExhausted(_) => "CALENDAR_EXHAUSTED",
            ApiError::BatchNotFound { .. } => "BATCH_NOT_FOUND",
            ApiError::ConcurrentRescheduleConflict { .. } => "CONCURRENT_RESCHEDULE_CONFLICT",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::NoCompatibleResource { .. } => ApiError::NoCompatibleResource(message),
            EngineError::NoUsableCapacity { .. } => ApiError::NoUsableCapacity(message),
            EngineError::DanglingResourceReference { .. } => {
                ApiError::DanglingResourceReference(message)
            }
            EngineError::CalendarExhausted { .. } => ApiError::CalendarExhausted(message),
            EngineError::BatchNotFound { batch_id } => ApiError::BatchNotFound { batch_id },
            EngineError::InvalidPieceRequest { .. } | EngineError::InvalidDelay { .. } => {
                ApiError::InvalidInput(message)
            }
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure { expected, actual } => {
                ApiError::ConcurrentRescheduleConflict { expected, actual }
            }

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
