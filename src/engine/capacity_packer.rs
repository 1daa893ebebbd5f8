// ==========================================
// 预制构件模具排产系统 - 容量装箱引擎
// ==========================================
// 职责: 为构件需求选择模具,并按有效容量拆分批次
// 输入: 单个 PieceRequest + 模具目录
// 输出: 待排程批次列表 (PackedBatch,无起止时间)
// ==========================================
// 选择规则:
// 1) 仅保留可用且截面(高/宽)覆盖构件的模具
// 2) 有效容量 = min(额定容量, floor(模具长度 / 构件长度))
// 3) 有效容量降序 → 模具长度升序(最贴合) → 模具ID升序
// ==========================================

use crate::domain::batch::{batch_id_for, PackedBatch};
use crate::domain::resource::Resource;
use crate::domain::work_order::{PieceEnvelope, PieceRequest};
use crate::engine::error::{EngineError, EngineResult};
use std::cmp::Ordering;
use tracing::{debug, instrument};

// ==========================================
// CandidateResource - 候选模具
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResource<'a> {
    pub resource: &'a Resource,
    pub effective_capacity: u32,
}

// ==========================================
// PackResult - 装箱结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PackResult {
    pub resource_id: String,
    pub effective_capacity: u32,
    pub batches: Vec<PackedBatch>,
}

// ==========================================
// CapacityPacker - 容量装箱引擎
// ==========================================
pub struct CapacityPacker {
    // 无状态引擎，不需要注入依赖
}

impl CapacityPacker {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 对构件尺寸排序所有可用候选模具
    ///
    /// # 参数
    /// - `request_id`: 用于错误信息的需求标识
    /// - `envelope`: 构件尺寸
    /// - `resources`: 模具目录
    ///
    /// # 返回
    /// - Ok: 按选择规则排序的候选列表(有效容量均 >= 1)
    /// - Err(NoCompatibleResource): 无可用且截面兼容的模具
    /// - Err(NoUsableCapacity): 兼容模具有效容量均 < 1
    pub fn rank_candidates<'a>(
        &self,
        request_id: &str,
        envelope: &PieceEnvelope,
        resources: &'a [Resource],
    ) -> EngineResult<Vec<CandidateResource<'a>>> {
        let compatible: Vec<&Resource> = resources
            .iter()
            .filter(|r| r.available && r.fits(envelope))
            .collect();

        if compatible.is_empty() {
            return Err(no_compatible(request_id, envelope));
        }

        let mut candidates: Vec<CandidateResource<'a>> = compatible
            .into_iter()
            .map(|resource| CandidateResource {
                effective_capacity: resource.effective_capacity(envelope),
                resource,
            })
            .filter(|c| c.effective_capacity >= 1)
            .collect();

        if candidates.is_empty() {
            return Err(EngineError::NoUsableCapacity {
                request_id: request_id.to_string(),
                length_cm: envelope.length_cm,
            });
        }

        candidates.sort_by(compare_candidates);
        Ok(candidates)
    }

    /// 指定模具时的候选（不做排序,只校验）
    pub fn pinned_candidate<'a>(
        &self,
        request_id: &str,
        envelope: &PieceEnvelope,
        resource_id: &str,
        resources: &'a [Resource],
    ) -> EngineResult<CandidateResource<'a>> {
        let resource = resources
            .iter()
            .find(|r| r.resource_id == resource_id)
            .ok_or_else(|| EngineError::DanglingResourceReference {
                resource_id: resource_id.to_string(),
                referenced_by: request_id.to_string(),
            })?;

        if !resource.available || !resource.fits(envelope) {
            return Err(no_compatible(request_id, envelope));
        }

        let effective_capacity = resource.effective_capacity(envelope);
        if effective_capacity < 1 {
            return Err(EngineError::NoUsableCapacity {
                request_id: request_id.to_string(),
                length_cm: envelope.length_cm,
            });
        }

        Ok(CandidateResource {
            resource,
            effective_capacity,
        })
    }

    /// 装箱单个构件需求
    ///
    /// 拆分: ceil(quantity / effective_capacity) 个批次,
    /// 除最后一个外均满容量,split_index 从 1 递增
    #[instrument(skip(self, request, resources), fields(
        request_id = %request.request_id,
        quantity = request.quantity,
        resources_count = resources.len()
    ))]
    pub fn pack(&self, request: &PieceRequest, resources: &[Resource]) -> EngineResult<PackResult> {
        self.validate(request)?;

        let selected = match request.pinned_resource_id.as_deref() {
            Some(resource_id) => self.pinned_candidate(
                &request.request_id,
                &request.envelope,
                resource_id,
                resources,
            )?,
            None => self
                .rank_candidates(&request.request_id, &request.envelope, resources)?
                .into_iter()
                .next()
                .ok_or_else(|| no_compatible(&request.request_id, &request.envelope))?,
        };

        let batches = self.split(request, &selected);

        debug!(
            resource_id = %selected.resource.resource_id,
            effective_capacity = selected.effective_capacity,
            batch_count = batches.len(),
            "装箱完成"
        );

        Ok(PackResult {
            resource_id: selected.resource.resource_id.clone(),
            effective_capacity: selected.effective_capacity,
            batches,
        })
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn validate(&self, request: &PieceRequest) -> EngineResult<()> {
        let reason = if !request.envelope.is_valid() {
            Some("piece dimensions must be positive")
        } else if request.quantity == 0 {
            Some("quantity must be > 0")
        } else if request.unit_time_minutes < 0 {
            Some("unit time must be >= 0")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(EngineError::InvalidPieceRequest {
                request_id: request.request_id.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn split(&self, request: &PieceRequest, selected: &CandidateResource<'_>) -> Vec<PackedBatch> {
        let capacity = selected.effective_capacity;
        let group = request.envelope.group();
        let mut batches = Vec::with_capacity(batch_count(request.quantity, capacity) as usize);
        let mut remaining = request.quantity;
        let mut split_index = 1;

        while remaining > 0 {
            let quantity = remaining.min(capacity);
            batches.push(PackedBatch {
                batch_id: batch_id_for(&request.request_id, split_index),
                request_id: request.request_id.clone(),
                work_order_id: request.work_order_id.clone(),
                resource_id: selected.resource.resource_id.clone(),
                group,
                quantity,
                unit_time_minutes: request.unit_time_minutes,
                request_priority: request.priority,
                split_index,
                queue_position: 0,
            });
            remaining -= quantity;
            split_index += 1;
        }

        batches
    }
}

impl Default for CapacityPacker {
    fn default() -> Self {
        Self::new()
    }
}

/// 批次数 = ceil(quantity / capacity)
pub fn batch_count(quantity: u32, capacity: u32) -> u32 {
    if capacity == 0 {
        return 0;
    }
    quantity.div_ceil(capacity)
}

fn compare_candidates(a: &CandidateResource<'_>, b: &CandidateResource<'_>) -> Ordering {
    b.effective_capacity
        .cmp(&a.effective_capacity)
        .then_with(|| {
            a.resource
                .max_length_cm
                .partial_cmp(&b.resource.max_length_cm)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.resource.resource_id.cmp(&b.resource.resource_id))
}

fn no_compatible(request_id: &str, envelope: &PieceEnvelope) -> EngineError {
    EngineError::NoCompatibleResource {
        request_id: request_id.to_string(),
        height_cm: envelope.height_cm,
        width_cm: envelope.width_cm,
        length_cm: envelope.length_cm,
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Priority;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn mold(id: &str, height: f64, width: f64, length: f64, capacity: u32) -> Resource {
        Resource {
            resource_id: id.to_string(),
            code: format!("FRM-{}", id),
            name: format!("Mold {}", id),
            max_height_cm: height,
            max_width_cm: width,
            max_length_cm: length,
            declared_capacity: capacity,
            setup_minutes: 30,
            available: true,
        }
    }

    fn request(id: &str, quantity: u32, envelope: PieceEnvelope) -> PieceRequest {
        PieceRequest {
            request_id: id.to_string(),
            work_order_id: "WO-1".to_string(),
            envelope,
            quantity,
            unit_time_minutes: 15,
            priority: Priority::Medium,
            pinned_resource_id: None,
        }
    }

    // ==========================================
    // 基础功能测试
    // ==========================================

    #[test]
    fn test_pack_splits_by_length_bounded_capacity() {
        // 模具 M: 额定 8 件, 长 400cm; 构件长 150cm → 有效容量 2
        let packer = CapacityPacker::new();
        let resources = vec![mold("M", 60.0, 40.0, 400.0, 8)];
        let req = request("R1", 20, PieceEnvelope::new(50.0, 30.0, 150.0));

        let result = packer.pack(&req, &resources).unwrap();

        assert_eq!(result.resource_id, "M");
        assert_eq!(result.effective_capacity, 2);
        assert_eq!(result.batches.len(), 10);
        assert!(result.batches.iter().all(|b| b.quantity == 2));
        assert_eq!(result.batches[0].batch_id, "R1#1");
        assert_eq!(result.batches[9].split_index, 10);
    }

    #[test]
    fn test_pack_last_batch_is_remainder() {
        let packer = CapacityPacker::new();
        let resources = vec![mold("M", 60.0, 40.0, 1000.0, 4)];
        let req = request("R1", 10, PieceEnvelope::new(50.0, 30.0, 100.0));

        let result = packer.pack(&req, &resources).unwrap();

        let quantities: Vec<u32> = result.batches.iter().map(|b| b.quantity).collect();
        assert_eq!(quantities, vec![4, 4, 2]);
        assert_eq!(quantities.iter().sum::<u32>(), 10);
    }

    #[test]
    fn test_highest_capacity_wins_then_shortest_length() {
        let packer = CapacityPacker::new();
        let resources = vec![
            mold("LONG", 60.0, 40.0, 900.0, 4), // 容量 4
            mold("TIGHT", 60.0, 40.0, 800.0, 4), // 容量 4, 更短
            mold("SMALL", 60.0, 40.0, 300.0, 8), // 容量 3
        ];
        let envelope = PieceEnvelope::new(50.0, 30.0, 100.0);

        let ranked = packer.rank_candidates("R1", &envelope, &resources).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|c| c.resource.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["TIGHT", "LONG", "SMALL"]);
    }

    #[test]
    fn test_unavailable_and_undersized_molds_filtered() {
        let packer = CapacityPacker::new();
        let mut down = mold("DOWN", 60.0, 40.0, 400.0, 8);
        down.available = false;
        let resources = vec![down, mold("NARROW", 60.0, 20.0, 400.0, 8)];
        let req = request("R1", 4, PieceEnvelope::new(50.0, 30.0, 100.0));

        let err = packer.pack(&req, &resources).unwrap_err();
        assert_eq!(err.code(), "NO_COMPATIBLE_RESOURCE");
    }

    #[test]
    fn test_no_usable_capacity_when_piece_too_long() {
        let packer = CapacityPacker::new();
        let resources = vec![mold("M", 60.0, 40.0, 200.0, 8)];
        let req = request("R1", 4, PieceEnvelope::new(50.0, 30.0, 250.0));

        let err = packer.pack(&req, &resources).unwrap_err();
        assert_eq!(err.code(), "NO_USABLE_CAPACITY");
    }

    #[test]
    fn test_pinned_resource_is_used_even_if_not_best() {
        let packer = CapacityPacker::new();
        let resources = vec![
            mold("BEST", 60.0, 40.0, 800.0, 8),
            mold("PINNED", 60.0, 40.0, 300.0, 8),
        ];
        let mut req = request("R1", 6, PieceEnvelope::new(50.0, 30.0, 100.0));
        req.pinned_resource_id = Some("PINNED".to_string());

        let result = packer.pack(&req, &resources).unwrap();
        assert_eq!(result.resource_id, "PINNED");
        assert_eq!(result.effective_capacity, 3);
        assert_eq!(result.batches.len(), 2);
    }

    #[test]
    fn test_pinned_resource_missing_is_dangling() {
        let packer = CapacityPacker::new();
        let resources = vec![mold("M", 60.0, 40.0, 800.0, 8)];
        let mut req = request("R1", 6, PieceEnvelope::new(50.0, 30.0, 100.0));
        req.pinned_resource_id = Some("GONE".to_string());

        let err = packer.pack(&req, &resources).unwrap_err();
        assert_eq!(err.code(), "DANGLING_RESOURCE_REFERENCE");
    }

    #[test]
    fn test_invalid_request_rejected() {
        let packer = CapacityPacker::new();
        let resources = vec![mold("M", 60.0, 40.0, 800.0, 8)];

        let zero_qty = request("R1", 0, PieceEnvelope::new(50.0, 30.0, 100.0));
        assert_eq!(
            packer.pack(&zero_qty, &resources).unwrap_err().code(),
            "INVALID_PIECE_REQUEST"
        );

        let no_length = request("R2", 3, PieceEnvelope::new(50.0, 30.0, 0.0));
        assert_eq!(
            packer.pack(&no_length, &resources).unwrap_err().code(),
            "INVALID_PIECE_REQUEST"
        );
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(20, 2), 10);
        assert_eq!(batch_count(21, 2), 11);
        assert_eq!(batch_count(1, 8), 1);
        assert_eq!(batch_count(5, 0), 0);
    }
}
