// ==========================================
// 预制构件模具排产系统 - 全局队列构建器
// ==========================================
// 职责: 将所有工单的待排程批次合并为一条全局优先序列
// 输入: 工单列表 + 装箱批次
// 输出: 有序批次列表 (queue_position 从 1 开始)
// ==========================================
// 组装规则:
// 1) 按紧急指令分桶: 前插 / 默认(正常 + 插入模具之后) / 置后
// 2) 桶内: 优先级降序 → 交期升序 → 工单ID升序
// 3) 工单内: 需求优先级降序,保持拆分顺序
// 4) 前插工单逐个前插(最近标记者最前) → 正常追加 → 置后追加
// 5) 插入模具之后: 定位模具 X 上最后一个批次并拼接其后,无则追加末尾
// ==========================================
// 红线: 纯函数,相同输入得到完全相同的输出顺序
// ==========================================

use crate::domain::batch::PackedBatch;
use crate::domain::types::UrgencyDirective;
use crate::domain::work_order::WorkOrder;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

// ==========================================
// QueueOutcome - 队列构建结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueOutcome {
    /// 全局有序序列
    pub queue: Vec<PackedBatch>,
    /// 所属工单不在输入中的批次(被丢弃)
    pub orphaned: Vec<PackedBatch>,
}

// ==========================================
// QueueBuilder - 全局队列构建器
// ==========================================
pub struct QueueBuilder {
    // 无状态引擎，不需要注入依赖
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self {}
    }

    /// 构建全局队列
    ///
    /// # 参数
    /// - `work_orders`: 参与排产的工单
    /// - `batches`: 装箱输出的待排程批次(任意顺序)
    #[instrument(skip(self, work_orders, batches), fields(
        work_orders_count = work_orders.len(),
        batches_count = batches.len()
    ))]
    pub fn build(&self, work_orders: &[WorkOrder], batches: Vec<PackedBatch>) -> QueueOutcome {
        // ===== 步骤0: 批次按工单归组 =====
        let known: BTreeMap<&str, &WorkOrder> = work_orders
            .iter()
            .map(|wo| (wo.work_order_id.as_str(), wo))
            .collect();

        let mut by_work_order: BTreeMap<String, Vec<PackedBatch>> = BTreeMap::new();
        let mut orphaned = Vec::new();
        for batch in batches {
            if known.contains_key(batch.work_order_id.as_str()) {
                by_work_order
                    .entry(batch.work_order_id.clone())
                    .or_default()
                    .push(batch);
            } else {
                warn!(
                    batch_id = %batch.batch_id,
                    work_order_id = %batch.work_order_id,
                    "批次所属工单不存在,丢弃"
                );
                orphaned.push(batch);
            }
        }

        // ===== 步骤1-2: 工单排序 (排序后下标即为名次) =====
        let mut ordered: Vec<&WorkOrder> = known.values().copied().collect();
        ordered.sort_by(|a, b| compare_work_orders(a, b));

        // ===== 步骤3: 工单内批次排序 =====
        let mut take_batches = |wo: &WorkOrder| -> Vec<PackedBatch> {
            let mut list = by_work_order.remove(&wo.work_order_id).unwrap_or_default();
            list.sort_by(|a, b| {
                b.request_priority
                    .cmp(&a.request_priority)
                    .then_with(|| a.request_id.cmp(&b.request_id))
                    .then_with(|| a.split_index.cmp(&b.split_index))
            });
            list
        };

        let mut pass_to_front: Vec<(usize, &WorkOrder, Vec<PackedBatch>)> = Vec::new();
        let mut normal: Vec<PackedBatch> = Vec::new();
        let mut insert_after: Vec<(&str, &WorkOrder, Vec<PackedBatch>)> = Vec::new();
        let mut send_to_back: Vec<PackedBatch> = Vec::new();

        for (rank, wo) in ordered.iter().copied().enumerate() {
            let list = take_batches(wo);
            match &wo.urgency {
                UrgencyDirective::PassToFront => pass_to_front.push((rank, wo, list)),
                UrgencyDirective::Normal => normal.extend(list),
                UrgencyDirective::InsertAfterResource(resource_id) => {
                    insert_after.push((resource_id.as_str(), wo, list))
                }
                UrgencyDirective::SendToBack => send_to_back.extend(list),
            }
        }

        // ===== 步骤4: 组装 =====
        // 前插处理顺序: 标记时间升序(未标记最早),同标记时名次靠后者先处理;
        // 每个工单前插到队首,因此最后处理者位于最前
        pass_to_front.sort_by_key(|(rank, wo, _)| (wo.urgency_marked_at, Reverse(*rank)));

        let mut queue: Vec<PackedBatch> = Vec::new();
        for (_, wo, list) in pass_to_front {
            debug!(work_order_id = %wo.work_order_id, batches = list.len(), "前插工单");
            queue.splice(0..0, list);
        }
        queue.extend(normal);
        queue.extend(send_to_back);

        // ===== 步骤5: 插入指定模具之后 =====
        for (resource_id, wo, list) in insert_after {
            let anchor = queue.iter().rposition(|b| b.resource_id == resource_id);
            match anchor {
                Some(index) => {
                    debug!(
                        work_order_id = %wo.work_order_id,
                        resource_id,
                        after_position = index + 1,
                        "插入模具之后"
                    );
                    queue.splice(index + 1..index + 1, list);
                }
                None => {
                    debug!(
                        work_order_id = %wo.work_order_id,
                        resource_id,
                        "目标模具暂无批次,追加到末尾"
                    );
                    queue.extend(list);
                }
            }
        }

        for (index, batch) in queue.iter_mut().enumerate() {
            batch.queue_position = index as u32 + 1;
        }

        QueueOutcome { queue, orphaned }
    }
}

impl Default for QueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 工单排序: 优先级降序 → 交期升序 → 工单ID升序
fn compare_work_orders(a: &WorkOrder, b: &WorkOrder) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.deadline.cmp(&b.deadline))
        .then_with(|| a.work_order_id.cmp(&b.work_order_id))
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Priority, WorkOrderStatus};
    use crate::domain::work_order::PieceGroup;
    use chrono::{NaiveDate, NaiveDateTime};

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn work_order(id: &str, priority: Priority, urgency: UrgencyDirective) -> WorkOrder {
        WorkOrder {
            work_order_id: id.to_string(),
            code: id.to_string(),
            name: format!("Obra {}", id),
            priority,
            urgency,
            urgency_marked_at: None,
            deadline: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            status: WorkOrderStatus::Active,
        }
    }

    fn batches(work_order_id: &str, resource_id: &str, count: u32) -> Vec<PackedBatch> {
        (1..=count)
            .map(|i| PackedBatch {
                batch_id: format!("{}-R#{}", work_order_id, i),
                request_id: format!("{}-R", work_order_id),
                work_order_id: work_order_id.to_string(),
                resource_id: resource_id.to_string(),
                group: PieceGroup {
                    height_mm: 200,
                    width_mm: 300,
                },
                quantity: 2,
                unit_time_minutes: 30,
                request_priority: Priority::Medium,
                split_index: i,
                queue_position: 0,
            })
            .collect()
    }

    fn order_of(outcome: &QueueOutcome) -> Vec<String> {
        outcome.queue.iter().map(|b| b.batch_id.clone()).collect()
    }

    fn marked(h: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, 0, 0)
    }

    // ==========================================
    // 排序测试
    // ==========================================

    #[test]
    fn test_priority_then_deadline_then_id() {
        let builder = QueueBuilder::new();
        let mut late = work_order("A", Priority::High, UrgencyDirective::Normal);
        late.deadline = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let orders = vec![
            work_order("C", Priority::Low, UrgencyDirective::Normal),
            late,
            work_order("B", Priority::High, UrgencyDirective::Normal),
        ];
        let mut input = batches("A", "M1", 1);
        input.extend(batches("B", "M1", 1));
        input.extend(batches("C", "M1", 1));

        let outcome = builder.build(&orders, input);
        assert_eq!(order_of(&outcome), vec!["B-R#1", "A-R#1", "C-R#1"]);
        let positions: Vec<u32> = outcome.queue.iter().map(|b| b.queue_position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_request_priority_orders_batches_within_work_order() {
        let builder = QueueBuilder::new();
        let orders = vec![work_order("A", Priority::Medium, UrgencyDirective::Normal)];
        let mut low = batches("A", "M1", 2);
        for b in low.iter_mut() {
            b.request_id = "A-LOW".to_string();
            b.batch_id = format!("A-LOW#{}", b.split_index);
            b.request_priority = Priority::Low;
        }
        let mut input = low;
        input.extend(batches("A", "M1", 2));

        let outcome = builder.build(&orders, input);
        assert_eq!(
            order_of(&outcome),
            vec!["A-R#1", "A-R#2", "A-LOW#1", "A-LOW#2"]
        );
    }

    #[test]
    fn test_pass_to_front_precedes_normal() {
        // 场景: B(正常) 已在队列中, A(前插) 后提交
        let builder = QueueBuilder::new();
        let orders = vec![
            work_order("B", Priority::Critical, UrgencyDirective::Normal),
            work_order("A", Priority::Low, UrgencyDirective::PassToFront),
        ];
        let mut input = batches("B", "M1", 3);
        input.extend(batches("A", "M2", 2));

        let outcome = builder.build(&orders, input);
        assert_eq!(
            order_of(&outcome),
            vec!["A-R#1", "A-R#2", "B-R#1", "B-R#2", "B-R#3"]
        );
    }

    #[test]
    fn test_most_recently_marked_pass_to_front_is_frontmost() {
        let builder = QueueBuilder::new();
        let mut first = work_order("P1", Priority::Critical, UrgencyDirective::PassToFront);
        first.urgency_marked_at = marked(8);
        let mut second = work_order("P2", Priority::Low, UrgencyDirective::PassToFront);
        second.urgency_marked_at = marked(10);
        let orders = vec![first, second];
        let mut input = batches("P1", "M1", 1);
        input.extend(batches("P2", "M1", 1));

        let outcome = builder.build(&orders, input);
        assert_eq!(order_of(&outcome), vec!["P2-R#1", "P1-R#1"]);
    }

    #[test]
    fn test_unmarked_pass_to_front_keeps_priority_order() {
        let builder = QueueBuilder::new();
        let orders = vec![
            work_order("P1", Priority::Low, UrgencyDirective::PassToFront),
            work_order("P2", Priority::High, UrgencyDirective::PassToFront),
        ];
        let mut input = batches("P1", "M1", 1);
        input.extend(batches("P2", "M1", 1));

        let outcome = builder.build(&orders, input);
        assert_eq!(order_of(&outcome), vec!["P2-R#1", "P1-R#1"]);
    }

    #[test]
    fn test_send_to_back_goes_last() {
        let builder = QueueBuilder::new();
        let orders = vec![
            work_order("Z", Priority::Critical, UrgencyDirective::SendToBack),
            work_order("N", Priority::Low, UrgencyDirective::Normal),
        ];
        let mut input = batches("Z", "M1", 1);
        input.extend(batches("N", "M1", 1));

        let outcome = builder.build(&orders, input);
        assert_eq!(order_of(&outcome), vec!["N-R#1", "Z-R#1"]);
    }

    #[test]
    fn test_insert_after_resource_splices_after_last_batch_on_resource() {
        let builder = QueueBuilder::new();
        let orders = vec![
            work_order("A", Priority::Critical, UrgencyDirective::Normal),
            work_order("B", Priority::High, UrgencyDirective::Normal),
            work_order(
                "C",
                Priority::Critical,
                UrgencyDirective::InsertAfterResource("M".to_string()),
            ),
        ];
        let mut input = batches("A", "M", 2);
        input.extend(batches("B", "OTHER", 2));
        input.extend(batches("C", "M2", 2));

        let outcome = builder.build(&orders, input);
        let order = order_of(&outcome);
        assert_eq!(
            order,
            vec!["A-R#1", "A-R#2", "C-R#1", "C-R#2", "B-R#1", "B-R#2"]
        );
        let last_m = outcome
            .queue
            .iter()
            .rposition(|b| b.resource_id == "M")
            .unwrap();
        assert_eq!(outcome.queue[last_m + 1].batch_id, "C-R#1");
    }

    #[test]
    fn test_insert_after_missing_resource_appends() {
        let builder = QueueBuilder::new();
        let orders = vec![
            work_order("A", Priority::Low, UrgencyDirective::SendToBack),
            work_order(
                "C",
                Priority::Critical,
                UrgencyDirective::InsertAfterResource("NOPE".to_string()),
            ),
        ];
        let mut input = batches("A", "M1", 1);
        input.extend(batches("C", "M1", 1));

        let outcome = builder.build(&orders, input);
        assert_eq!(order_of(&outcome), vec!["A-R#1", "C-R#1"]);
    }

    #[test]
    fn test_orphaned_batches_dropped() {
        let builder = QueueBuilder::new();
        let orders = vec![work_order("A", Priority::Low, UrgencyDirective::Normal)];
        let mut input = batches("A", "M1", 1);
        input.extend(batches("GHOST", "M1", 2));

        let outcome = builder.build(&orders, input);
        assert_eq!(outcome.queue.len(), 1);
        assert_eq!(outcome.orphaned.len(), 2);
    }

    #[test]
    fn test_build_is_deterministic_regardless_of_input_order() {
        let builder = QueueBuilder::new();
        let orders = vec![
            work_order("A", Priority::High, UrgencyDirective::Normal),
            work_order("B", Priority::High, UrgencyDirective::PassToFront),
            work_order(
                "C",
                Priority::Medium,
                UrgencyDirective::InsertAfterResource("M1".to_string()),
            ),
        ];
        let mut input = batches("A", "M1", 3);
        input.extend(batches("B", "M2", 2));
        input.extend(batches("C", "M3", 2));

        let mut reversed_orders = orders.clone();
        reversed_orders.reverse();
        let mut reversed_input = input.clone();
        reversed_input.reverse();

        let first = builder.build(&orders, input);
        let second = builder.build(&reversed_orders, reversed_input);
        assert_eq!(first, second);
    }
}
