// ==========================================
// 预制构件模具排产系统 - 引擎编排器
// ==========================================
// 用途: 协调重排产主流程 装箱 → 全局队列 → 模具排程
// 红线: 纯内存计算,不访问存储; 单个需求失败只记录跳过,不中断整次运行
// ==========================================

use crate::domain::batch::{Batch, PackedBatch};
use crate::domain::resource::Resource;
use crate::domain::types::WorkOrderStatus;
use crate::domain::work_order::{PieceRequest, WorkOrder};
use crate::engine::calendar::WorkCalendar;
use crate::engine::capacity_packer::CapacityPacker;
use crate::engine::error::EngineError;
use crate::engine::queue_builder::QueueBuilder;
use crate::engine::resource_scheduler::ResourceScheduler;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 需求所属工单不存在时的跳过代码
pub const UNKNOWN_WORK_ORDER: &str = "UNKNOWN_WORK_ORDER";

// ==========================================
// SkippedItem - 运行摘要中的跳过项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub subject_id: String, // request_id 或 batch_id
    pub code: String,
    pub reason: String,
}

impl SkippedItem {
    fn from_error(subject_id: &str, err: &EngineError) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            code: err.code().to_string(),
            reason: err.to_string(),
        }
    }
}

// ==========================================
// RescheduleInput / RescheduleOutcome
// ==========================================
pub struct RescheduleInput<'a> {
    pub work_orders: &'a [WorkOrder],
    pub requests: &'a [PieceRequest],
    pub resources: &'a [Resource],
    pub calendar: &'a WorkCalendar,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct RescheduleOutcome {
    /// 已排程批次 (全局队列顺序)
    pub batches: Vec<Batch>,
    pub skipped: Vec<SkippedItem>,
}

// ==========================================
// RescheduleOrchestrator - 引擎编排器
// ==========================================
pub struct RescheduleOrchestrator {
    packer: CapacityPacker,
    queue_builder: QueueBuilder,
}

impl RescheduleOrchestrator {
    pub fn new() -> Self {
        Self {
            packer: CapacityPacker::new(),
            queue_builder: QueueBuilder::new(),
        }
    }

    /// 执行全量重排产 (不含已提交批次,所有模具从空游标开始)
    pub fn run(&self, input: &RescheduleInput<'_>) -> RescheduleOutcome {
        info!(
            work_orders = input.work_orders.len(),
            requests = input.requests.len(),
            resources = input.resources.len(),
            now = %input.now,
            "开始执行重排产流程"
        );

        let mut skipped = Vec::new();

        // ==========================================
        // 步骤1: 筛选生效工单
        // ==========================================
        let statuses: HashMap<&str, WorkOrderStatus> = input
            .work_orders
            .iter()
            .map(|wo| (wo.work_order_id.as_str(), wo.status))
            .collect();
        let active: Vec<WorkOrder> = input
            .work_orders
            .iter()
            .filter(|wo| wo.status == WorkOrderStatus::Active)
            .cloned()
            .collect();
        debug!(active = active.len(), "步骤1: 生效工单筛选完成");

        // ==========================================
        // 步骤2: 装箱
        // ==========================================
        let mut packed: Vec<PackedBatch> = Vec::new();
        for request in input.requests {
            match statuses.get(request.work_order_id.as_str()) {
                Some(WorkOrderStatus::Active) => {}
                Some(status) => {
                    debug!(
                        request_id = %request.request_id,
                        status = %status,
                        "工单未生效,不参与排产"
                    );
                    continue;
                }
                None => {
                    warn!(
                        request_id = %request.request_id,
                        work_order_id = %request.work_order_id,
                        "需求所属工单不存在,跳过"
                    );
                    skipped.push(SkippedItem {
                        subject_id: request.request_id.clone(),
                        code: UNKNOWN_WORK_ORDER.to_string(),
                        reason: format!("工单不存在: {}", request.work_order_id),
                    });
                    continue;
                }
            }

            match self.packer.pack(request, input.resources) {
                Ok(result) => packed.extend(result.batches),
                Err(err) => {
                    warn!(
                        request_id = %request.request_id,
                        code = err.code(),
                        error = %err,
                        "装箱失败,跳过需求"
                    );
                    skipped.push(SkippedItem::from_error(&request.request_id, &err));
                }
            }
        }
        debug!(packed = packed.len(), "步骤2: 装箱完成");

        // ==========================================
        // 步骤3: 全局队列
        // ==========================================
        let queue = self.queue_builder.build(&active, packed);
        for orphan in &queue.orphaned {
            skipped.push(SkippedItem {
                subject_id: orphan.batch_id.clone(),
                code: UNKNOWN_WORK_ORDER.to_string(),
                reason: format!("工单不存在: {}", orphan.work_order_id),
            });
        }
        debug!(queue_len = queue.queue.len(), "步骤3: 全局队列构建完成");

        // ==========================================
        // 步骤4: 模具排程
        // ==========================================
        let mut scheduler = ResourceScheduler::new(input.calendar, input.resources, input.now);
        let scheduled = scheduler.schedule_all(queue.queue);
        for (batch, err) in &scheduled.skipped {
            skipped.push(SkippedItem::from_error(&batch.batch_id, err));
        }

        info!(
            batches = scheduled.batches.len(),
            skipped = skipped.len(),
            "重排产流程完成"
        );

        RescheduleOutcome {
            batches: scheduled.batches,
            skipped,
        }
    }
}

impl Default for RescheduleOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Priority, UrgencyDirective};
    use crate::domain::work_order::PieceEnvelope;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    fn mold(id: &str, length: f64) -> Resource {
        Resource {
            resource_id: id.to_string(),
            code: id.to_string(),
            name: id.to_string(),
            max_height_cm: 60.0,
            max_width_cm: 40.0,
            max_length_cm: length,
            declared_capacity: 8,
            setup_minutes: 30,
            available: true,
        }
    }

    fn work_order(id: &str, status: WorkOrderStatus) -> WorkOrder {
        WorkOrder {
            work_order_id: id.to_string(),
            code: id.to_string(),
            name: id.to_string(),
            priority: Priority::Medium,
            urgency: UrgencyDirective::Normal,
            urgency_marked_at: None,
            deadline: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            status,
        }
    }

    fn request(id: &str, work_order_id: &str, length: f64, quantity: u32) -> PieceRequest {
        PieceRequest {
            request_id: id.to_string(),
            work_order_id: work_order_id.to_string(),
            envelope: PieceEnvelope::new(50.0, 30.0, length),
            quantity,
            unit_time_minutes: 20,
            priority: Priority::Medium,
            pinned_resource_id: None,
        }
    }

    #[test]
    fn test_run_packs_queues_and_schedules() {
        let orchestrator = RescheduleOrchestrator::new();
        let work_orders = vec![work_order("WO1", WorkOrderStatus::Active)];
        let requests = vec![request("R1", "WO1", 150.0, 20)];
        let resources = vec![mold("M", 400.0)];
        let calendar = WorkCalendar::default();

        let outcome = orchestrator.run(&RescheduleInput {
            work_orders: &work_orders,
            requests: &requests,
            resources: &resources,
            calendar: &calendar,
            now: now(),
        });

        assert_eq!(outcome.batches.len(), 10);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.batches.iter().map(|b| b.quantity).sum::<u32>(), 20);
        assert_eq!(outcome.batches[0].queue_position, 1);
    }

    #[test]
    fn test_failed_requests_reported_without_aborting() {
        let orchestrator = RescheduleOrchestrator::new();
        let work_orders = vec![
            work_order("WO1", WorkOrderStatus::Active),
            work_order("WO2", WorkOrderStatus::Paused),
        ];
        let requests = vec![
            request("OK", "WO1", 100.0, 4),
            request("TOO_LONG", "WO1", 900.0, 4),
            request("PAUSED", "WO2", 100.0, 4),
            request("ORPHAN", "WO9", 100.0, 4),
        ];
        let resources = vec![mold("M", 400.0)];
        let calendar = WorkCalendar::default();

        let outcome = orchestrator.run(&RescheduleInput {
            work_orders: &work_orders,
            requests: &requests,
            resources: &resources,
            calendar: &calendar,
            now: now(),
        });

        assert_eq!(outcome.batches.len(), 1);
        let codes: Vec<(&str, &str)> = outcome
            .skipped
            .iter()
            .map(|s| (s.subject_id.as_str(), s.code.as_str()))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("TOO_LONG", "NO_USABLE_CAPACITY"),
                ("ORPHAN", UNKNOWN_WORK_ORDER)
            ]
        );
    }

    #[test]
    fn test_run_is_deterministic() {
        let orchestrator = RescheduleOrchestrator::new();
        let work_orders = vec![
            work_order("WO1", WorkOrderStatus::Active),
            work_order("WO2", WorkOrderStatus::Active),
        ];
        let requests = vec![
            request("R1", "WO1", 150.0, 7),
            request("R2", "WO2", 120.0, 5),
        ];
        let resources = vec![mold("M", 400.0), mold("N", 300.0)];
        let calendar = WorkCalendar::default();
        let input = RescheduleInput {
            work_orders: &work_orders,
            requests: &requests,
            resources: &resources,
            calendar: &calendar,
            now: now(),
        };

        let first = orchestrator.run(&input);
        let second = orchestrator.run(&input);
        assert_eq!(first.batches, second.batches);
    }
}
