// ==========================================
// 预制构件模具排产系统 - 交期预估引擎
// ==========================================
// 职责: 预估假设构件的最早交付窗口 (只读,不修改已提交排程)
// 输入: 构件尺寸 + 数量 + 单件工时 (+ 可选指定模具)
// 输出: 选中模具的窗口 + 逐批次窗口 + 备选模具窗口
// ==========================================
// 规则:
// - 复用装箱引擎的候选排序选择模具与有效容量
// - 起点: 该模具已提交批次的最晚结束时间与对齐后当前时刻取较晚者,未使用则取对齐后的当前时刻
// - 模具最后批次分组不同 → 先推进换型分钟
// - 备选模具按相同数量独立投影
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::resource::Resource;
use crate::domain::work_order::PieceEnvelope;
use crate::engine::calendar::WorkCalendar;
use crate::engine::capacity_packer::{batch_count, CandidateResource, CapacityPacker};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// 默认备选模具数量
pub const DEFAULT_ALTERNATIVES: usize = 2;

// ==========================================
// SuggestionRequest - 预估请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub envelope: PieceEnvelope,
    pub quantity: u32,
    pub unit_time_minutes: i64,
    pub resource_id: Option<String>,
}

// ==========================================
// 预估结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchWindow {
    pub index: u32,
    pub quantity: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProjection {
    pub resource_id: String,
    pub resource_code: String,
    pub resource_name: String,
    pub effective_capacity: u32,
    pub num_batches: u32,
    pub setup_applied: bool,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub batch_windows: Vec<BatchWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityEstimate {
    pub selected: ResourceProjection,
    pub alternatives: Vec<ResourceProjection>,
}

// ==========================================
// AvailabilityEstimator - 交期预估引擎
// ==========================================
pub struct AvailabilityEstimator {
    packer: CapacityPacker,
    alternatives: usize,
}

impl AvailabilityEstimator {
    pub fn new(alternatives: usize) -> Self {
        Self {
            packer: CapacityPacker::new(),
            alternatives,
        }
    }

    /// 预估交付窗口
    ///
    /// # 参数
    /// - `request`: 假设构件
    /// - `resources`: 模具目录
    /// - `committed`: 已提交批次 (只读)
    /// - `calendar`: 工作日历
    /// - `now`: 当前时刻
    #[instrument(skip(self, resources, committed, calendar), fields(
        quantity = request.quantity,
        pinned = ?request.resource_id,
        committed_count = committed.len()
    ))]
    pub fn estimate(
        &self,
        request: &SuggestionRequest,
        resources: &[Resource],
        committed: &[Batch],
        calendar: &WorkCalendar,
        now: NaiveDateTime,
    ) -> EngineResult<AvailabilityEstimate> {
        if !request.envelope.is_valid() || request.quantity == 0 || request.unit_time_minutes < 0 {
            return Err(EngineError::InvalidPieceRequest {
                request_id: SUGGESTION_ID.to_string(),
                reason: "dimensions, quantity and unit time must be positive".to_string(),
            });
        }

        let (selected, alternatives) = match request.resource_id.as_deref() {
            Some(resource_id) => {
                let pinned = self.packer.pinned_candidate(
                    SUGGESTION_ID,
                    &request.envelope,
                    resource_id,
                    resources,
                )?;
                // 指定模具时,备选取排序中的其他模具(无兼容模具时为空)
                let others: Vec<CandidateResource<'_>> = self
                    .packer
                    .rank_candidates(SUGGESTION_ID, &request.envelope, resources)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|c| c.resource.resource_id != resource_id)
                    .collect();
                (pinned, others)
            }
            None => {
                let mut ranked = self
                    .packer
                    .rank_candidates(SUGGESTION_ID, &request.envelope, resources)?
                    .into_iter();
                let first = ranked.next().ok_or_else(|| EngineError::NoCompatibleResource {
                    request_id: SUGGESTION_ID.to_string(),
                    height_cm: request.envelope.height_cm,
                    width_cm: request.envelope.width_cm,
                    length_cm: request.envelope.length_cm,
                })?;
                (first, ranked.collect())
            }
        };

        let selected = self.project(&selected, request, committed, calendar, now)?;
        let alternatives = alternatives
            .iter()
            .take(self.alternatives)
            .map(|candidate| self.project(candidate, request, committed, calendar, now))
            .collect::<EngineResult<Vec<_>>>()?;

        debug!(
            resource_id = %selected.resource_id,
            start = %selected.start,
            end = %selected.end,
            num_batches = selected.num_batches,
            alternatives = alternatives.len(),
            "交期预估完成"
        );

        Ok(AvailabilityEstimate {
            selected,
            alternatives,
        })
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 在指定模具上投影全部批次
    fn project(
        &self,
        candidate: &CandidateResource<'_>,
        request: &SuggestionRequest,
        committed: &[Batch],
        calendar: &WorkCalendar,
        now: NaiveDateTime,
    ) -> EngineResult<ResourceProjection> {
        let resource = candidate.resource;
        let capacity = candidate.effective_capacity;
        let group = request.envelope.group();

        let tail = committed
            .iter()
            .filter(|b| b.resource_id == resource.resource_id)
            .max_by(|a, b| a.end.cmp(&b.end).then(a.sequence_no.cmp(&b.sequence_no)));

        // 旧排程的尾批可能早于当前时刻,起点不早于 now
        let snapped_now = calendar.next_working_instant(now)?;
        let mut cursor = match tail {
            Some(last) => last.end.max(snapped_now),
            None => snapped_now,
        };

        let setup_applied = matches!(tail, Some(last) if last.group != group);
        if setup_applied {
            cursor = calendar.advance_working_minutes(cursor, resource.setup_minutes)?;
        }

        let num_batches = batch_count(request.quantity, capacity);
        let mut remaining = request.quantity;
        let mut batch_windows = Vec::with_capacity(num_batches as usize);
        for index in 1..=num_batches {
            let quantity = remaining.min(capacity);
            let start = calendar.next_working_instant(cursor)?;
            let end =
                calendar.advance_working_minutes(start, quantity as i64 * request.unit_time_minutes)?;
            batch_windows.push(BatchWindow {
                index,
                quantity,
                start,
                end,
            });
            remaining -= quantity;
            cursor = end;
        }

        let start = batch_windows.first().map(|w| w.start).unwrap_or(cursor);
        let end = batch_windows.last().map(|w| w.end).unwrap_or(cursor);

        Ok(ResourceProjection {
            resource_id: resource.resource_id.clone(),
            resource_code: resource.code.clone(),
            resource_name: resource.name.clone(),
            effective_capacity: capacity,
            num_batches,
            setup_applied,
            start,
            end,
            batch_windows,
        })
    }
}

impl Default for AvailabilityEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ALTERNATIVES)
    }
}

/// 错误信息中代表假设构件的标识
const SUGGESTION_ID: &str = "suggestion";
