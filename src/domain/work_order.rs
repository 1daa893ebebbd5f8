// ==========================================
// 预制构件模具排产系统 - 工单与构件需求领域模型
// ==========================================
// 职责: WorkOrder / PieceRequest / PieceEnvelope / PieceGroup
// 红线: 构件需求对排产器只读
// ==========================================

use crate::domain::types::{Priority, UrgencyDirective, WorkOrderStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// WorkOrder - 工单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub work_order_id: String,
    pub code: String,
    pub name: String,
    pub priority: Priority,          // 主排序键
    pub urgency: UrgencyDirective,   // 紧急指令
    pub urgency_marked_at: Option<NaiveDateTime>, // 指令最后设置时间 (pass_to_front 前插顺序)
    pub deadline: NaiveDate,         // 交期 (仅作为同级排序键,不是硬约束)
    pub status: WorkOrderStatus,
}

// ==========================================
// PieceEnvelope - 构件尺寸包络 (cm)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieceEnvelope {
    pub height_cm: f64,
    pub width_cm: f64,
    pub length_cm: f64,
}

impl PieceEnvelope {
    pub fn new(height_cm: f64, width_cm: f64, length_cm: f64) -> Self {
        Self {
            height_cm,
            width_cm,
            length_cm,
        }
    }

    /// 三个尺寸均为有限正数
    pub fn is_valid(&self) -> bool {
        [self.height_cm, self.width_cm, self.length_cm]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    /// 换型分组键（高 × 宽,毫米精度）
    pub fn group(&self) -> PieceGroup {
        PieceGroup {
            height_mm: (self.height_cm * 10.0).round() as i64,
            width_mm: (self.width_cm * 10.0).round() as i64,
        }
    }
}

// ==========================================
// PieceGroup - 换型分组
// ==========================================
// 同一模具上相邻批次分组不同 → 计入换型时间
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PieceGroup {
    pub height_mm: i64,
    pub width_mm: i64,
}

impl std::fmt::Display for PieceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}mm", self.height_mm, self.width_mm)
    }
}

// ==========================================
// PieceRequest - 构件需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceRequest {
    pub request_id: String,
    pub work_order_id: String,
    pub envelope: PieceEnvelope,
    pub quantity: u32,
    pub unit_time_minutes: i64,               // 单件生产时间(分钟)
    pub priority: Priority,                   // 工单内次级排序键
    pub pinned_resource_id: Option<String>,   // 人工指定模具
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_uses_height_and_width_only() {
        let a = PieceEnvelope::new(20.0, 30.0, 150.0);
        let b = PieceEnvelope::new(20.0, 30.0, 400.0);
        let c = PieceEnvelope::new(20.0, 35.0, 150.0);
        assert_eq!(a.group(), b.group());
        assert_ne!(a.group(), c.group());
    }

    #[test]
    fn test_group_millimetre_resolution() {
        let a = PieceEnvelope::new(20.04, 30.0, 150.0);
        let b = PieceEnvelope::new(20.0, 30.0, 150.0);
        assert_eq!(a.group(), b.group());
        assert_eq!(a.group().to_string(), "200x300mm");
    }

    #[test]
    fn test_envelope_validity() {
        assert!(PieceEnvelope::new(1.0, 1.0, 1.0).is_valid());
        assert!(!PieceEnvelope::new(0.0, 1.0, 1.0).is_valid());
        assert!(!PieceEnvelope::new(1.0, f64::NAN, 1.0).is_valid());
        assert!(!PieceEnvelope::new(1.0, 1.0, -5.0).is_valid());
    }
}
