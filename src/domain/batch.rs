// ==========================================
// 预制构件模具排产系统 - 批次领域模型
// ==========================================
// PackedBatch: 装箱结果 (未排程,无起止时间)
// Batch: 已提交排程 (FS 链上的一个节点)
// ==========================================
// 红线: 同一模具 FS 链上 b.start >= predecessor.end
// ==========================================

use crate::domain::types::{BatchStatus, Priority};
use crate::domain::work_order::PieceGroup;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 批次ID: `<request_id>#<split_index>`
///
/// 确定性ID,保证相同输入重排产得到相同批次集合
pub fn batch_id_for(request_id: &str, split_index: u32) -> String {
    format!("{}#{}", request_id, split_index)
}

// ==========================================
// PackedBatch - 待排程批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedBatch {
    pub batch_id: String,
    pub request_id: String,
    pub work_order_id: String,
    pub resource_id: String,
    pub group: PieceGroup,
    pub quantity: u32,
    pub unit_time_minutes: i64,
    pub request_priority: Priority,
    pub split_index: u32,         // 需求内拆分序号 (1-based)
    pub queue_position: u32,      // 全局队列位置 (1-based, QueueBuilder 赋值; 0 = 未入队)
}

impl PackedBatch {
    /// 生产工时(工作分钟)
    pub fn production_minutes(&self) -> i64 {
        self.quantity as i64 * self.unit_time_minutes
    }
}

// ==========================================
// Batch - 已排程批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    // ===== 主键与归属 =====
    pub batch_id: String,
    pub request_id: String,
    pub work_order_id: String,
    pub resource_id: String,
    pub group: PieceGroup,

    // ===== 数量与工时 =====
    pub quantity: u32,
    pub unit_time_minutes: i64,
    pub split_index: u32,

    // ===== 时间窗 =====
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub setup_applied: bool,
    pub delay_minutes: i64, // 累计延误(分钟)

    // ===== FS 链 =====
    pub sequence_no: u32,               // 模具内序号 (1-based, 严格递增)
    pub predecessor_id: Option<String>, // 同模具前序批次
    pub queue_position: u32,            // 全局队列位置

    pub status: BatchStatus,
}

impl Batch {
    /// 由待排程批次 + 排程结果组装
    pub fn from_packed(
        packed: PackedBatch,
        start: NaiveDateTime,
        end: NaiveDateTime,
        setup_applied: bool,
        sequence_no: u32,
        predecessor_id: Option<String>,
    ) -> Self {
        Self {
            batch_id: packed.batch_id,
            request_id: packed.request_id,
            work_order_id: packed.work_order_id,
            resource_id: packed.resource_id,
            group: packed.group,
            quantity: packed.quantity,
            unit_time_minutes: packed.unit_time_minutes,
            split_index: packed.split_index,
            start,
            end,
            setup_applied,
            delay_minutes: 0,
            sequence_no,
            predecessor_id,
            queue_position: packed.queue_position,
            status: BatchStatus::Scheduled,
        }
    }

    pub fn production_minutes(&self) -> i64 {
        self.quantity as i64 * self.unit_time_minutes
    }
}
