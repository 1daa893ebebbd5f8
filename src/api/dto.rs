// ==========================================
// 预制构件模具排产系统 - API 数据传输对象
// ==========================================
// 职责: 四个对外操作的请求/响应结构 (serde 序列化)
// ==========================================

use crate::domain::batch::Batch;
use crate::engine::availability::{BatchWindow, ResourceProjection};
use crate::engine::orchestrator::SkippedItem;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 默认操作人
pub const DEFAULT_ACTOR: &str = "system";

// ==========================================
// Reschedule
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleResponse {
    pub run_id: String,
    pub revision: i64,
    pub batch_count: usize,
    pub committed_batches: Vec<Batch>,
    /// 跳过项 (单个需求/批次失败,不影响整次运行)
    pub skipped: Vec<SkippedItem>,
}

// ==========================================
// SuggestDate
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSuggestion {
    pub resource: ResourceRef,
    pub window: TimeWindow,
    pub effective_capacity: u32,
    pub num_batches: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestDateResponse {
    pub window: TimeWindow,
    pub selected_resource: ResourceRef,
    pub effective_capacity: u32,
    pub num_batches: u32,
    pub setup_applied: bool,
    pub batch_windows: Vec<BatchWindow>,
    pub alternatives: Vec<AlternativeSuggestion>,
}

impl SuggestDateResponse {
    pub fn from_projections(selected: ResourceProjection, alternatives: Vec<ResourceProjection>) -> Self {
        Self {
            window: TimeWindow {
                start: selected.start,
                end: selected.end,
            },
            selected_resource: resource_ref(&selected),
            effective_capacity: selected.effective_capacity,
            num_batches: selected.num_batches,
            setup_applied: selected.setup_applied,
            alternatives: alternatives
                .iter()
                .map(|p| AlternativeSuggestion {
                    resource: resource_ref(p),
                    window: TimeWindow {
                        start: p.start,
                        end: p.end,
                    },
                    effective_capacity: p.effective_capacity,
                    num_batches: p.num_batches,
                })
                .collect(),
            batch_windows: selected.batch_windows,
        }
    }
}

fn resource_ref(p: &ResourceProjection) -> ResourceRef {
    ResourceRef {
        resource_id: p.resource_id.clone(),
        code: p.resource_code.clone(),
        name: p.resource_name.clone(),
    }
}

// ==========================================
// ApplyDelay
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyDelayRequest {
    pub batch_id: String,
    pub delay_minutes: i64,
    /// 延误原因 (例如 "material", "equipment"),写入操作日志
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyDelayResponse {
    pub batch_id: String,
    pub resource_id: String,
    pub delay_minutes: i64,
    pub revision: i64,
    pub affected_batch_count: usize,
    pub affected_batch_ids: Vec<String>,
}

// ==========================================
// GetSchedule
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchedule {
    pub resource_id: String,
    /// 模具已从目录删除时为 None
    pub resource_code: Option<String>,
    pub resource_name: Option<String>,
    /// FS 链顺序
    pub batches: Vec<Batch>,
}
