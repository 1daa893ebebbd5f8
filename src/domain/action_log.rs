// ==========================================
// 预制构件模具排产系统 - 操作日志领域模型
// ==========================================
// 红线: 所有排程写入必须记录
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,              // 日志ID (uuid)
    pub action_type: ActionType,        // 操作类型
    pub action_ts: NaiveDateTime,       // 操作时间
    pub actor: String,                  // 操作人
    pub schedule_revision: i64,         // 写入后的排程版本号
    pub payload_json: Option<JsonValue>, // 操作参数与影响摘要
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Reschedule, // 全量重排
    ApplyDelay, // 人工延误
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Reschedule => write!(f, "RESCHEDULE"),
            ActionType::ApplyDelay => write!(f, "APPLY_DELAY"),
        }
    }
}

impl ActionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RESCHEDULE" => Some(ActionType::Reschedule),
            "APPLY_DELAY" => Some(ActionType::ApplyDelay),
            _ => None,
        }
    }
}
