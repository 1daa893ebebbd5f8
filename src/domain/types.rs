// ==========================================
// 预制构件模具排产系统 - 领域类型定义
// ==========================================
// 红线: 紧急指令是封闭枚举,只在存储边界解析一次
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 优先级 (Priority)
// ==========================================
// 顺序: Low < Medium < High < Critical (派生 Ord,降序即高优先)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,      // 低
    Medium,   // 中
    High,     // 高
    Critical, // 关键
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for Priority {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(ParseTypeError::new("priority", other)),
        }
    }
}

// ==========================================
// 紧急指令 (Urgency Directive)
// ==========================================
// 存储格式:
// - pass_to_front
// - normal
// - send_to_back
// - insert_after_resource:<resource_id>
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "resource_id", rename_all = "snake_case")]
pub enum UrgencyDirective {
    PassToFront,                 // 插队到最前
    Normal,                      // 正常排队
    InsertAfterResource(String), // 排在指定模具最后一个批次之后
    SendToBack,                  // 排到队尾
}

const INSERT_AFTER_RESOURCE_PREFIX: &str = "insert_after_resource:";

impl Default for UrgencyDirective {
    fn default() -> Self {
        UrgencyDirective::Normal
    }
}

impl fmt::Display for UrgencyDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrgencyDirective::PassToFront => write!(f, "pass_to_front"),
            UrgencyDirective::Normal => write!(f, "normal"),
            UrgencyDirective::InsertAfterResource(resource_id) => {
                write!(f, "{}{}", INSERT_AFTER_RESOURCE_PREFIX, resource_id)
            }
            UrgencyDirective::SendToBack => write!(f, "send_to_back"),
        }
    }
}

impl FromStr for UrgencyDirective {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if let Some(resource_id) = raw.strip_prefix(INSERT_AFTER_RESOURCE_PREFIX) {
            let resource_id = resource_id.trim();
            if resource_id.is_empty() {
                return Err(ParseTypeError::new("urgency", raw));
            }
            return Ok(UrgencyDirective::InsertAfterResource(resource_id.to_string()));
        }

        match raw.to_lowercase().as_str() {
            "pass_to_front" => Ok(UrgencyDirective::PassToFront),
            "normal" | "" => Ok(UrgencyDirective::Normal),
            "send_to_back" => Ok(UrgencyDirective::SendToBack),
            other => Err(ParseTypeError::new("urgency", other)),
        }
    }
}

// ==========================================
// 工单状态 (Work Order Status)
// ==========================================
// 只有 Active 工单参与排产
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Active,    // 进行中
    Paused,    // 暂停
    Completed, // 已完成
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkOrderStatus::Active => write!(f, "ACTIVE"),
            WorkOrderStatus::Paused => write!(f, "PAUSED"),
            WorkOrderStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl FromStr for WorkOrderStatus {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(WorkOrderStatus::Active),
            "PAUSED" => Ok(WorkOrderStatus::Paused),
            "COMPLETED" => Ok(WorkOrderStatus::Completed),
            other => Err(ParseTypeError::new("work_order_status", other)),
        }
    }
}

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Scheduled, // 已排程
    Delayed,   // 人工延误
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Scheduled => write!(f, "SCHEDULED"),
            BatchStatus::Delayed => write!(f, "DELAYED"),
        }
    }
}

impl FromStr for BatchStatus {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SCHEDULED" => Ok(BatchStatus::Scheduled),
            "DELAYED" => Ok(BatchStatus::Delayed),
            other => Err(ParseTypeError::new("batch_status", other)),
        }
    }
}

// ==========================================
// 解析错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("无法解析 {field}: '{value}'")]
pub struct ParseTypeError {
    pub field: &'static str,
    pub value: String,
}

impl ParseTypeError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}
