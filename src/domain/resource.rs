// ==========================================
// 预制构件模具排产系统 - 模具(资源)领域模型
// ==========================================
// 红线: 排产运行期间模具只读(可用标志除外)
// 用途: 容量计算,换型(setup)成本
// ==========================================

use crate::domain::work_order::PieceEnvelope;
use serde::{Deserialize, Serialize};

// ==========================================
// Resource - 模具
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    // ===== 主键 =====
    pub resource_id: String, // 模具ID
    pub code: String,        // 模具编码
    pub name: String,        // 模具名称

    // ===== 尺寸包络 (cm) =====
    pub max_height_cm: f64, // 最大高度
    pub max_width_cm: f64,  // 最大宽度
    pub max_length_cm: f64, // 最大长度

    // ===== 产能参数 =====
    pub declared_capacity: u32, // 每周期额定件数
    pub setup_minutes: i64,     // 换型时间(分钟)

    // ===== 状态 =====
    pub available: bool, // 是否可用
}

impl Resource {
    /// 尺寸包络是否覆盖构件截面（高/宽）
    ///
    /// 长度不在此处判断,由有效容量决定（floor(长度比) < 1 即无可用容量）
    pub fn fits(&self, envelope: &PieceEnvelope) -> bool {
        self.max_height_cm >= envelope.height_cm && self.max_width_cm >= envelope.width_cm
    }

    /// 有效容量 = min(额定容量, floor(模具长度 / 构件长度))
    pub fn effective_capacity(&self, envelope: &PieceEnvelope) -> u32 {
        if !(envelope.length_cm > 0.0) || !envelope.length_cm.is_finite() {
            return 0;
        }
        let by_length = (self.max_length_cm / envelope.length_cm).floor();
        if !(by_length >= 1.0) {
            return 0;
        }
        let by_length = if by_length >= u32::MAX as f64 {
            u32::MAX
        } else {
            by_length as u32
        };
        self.declared_capacity.min(by_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mold(length: f64, capacity: u32) -> Resource {
        Resource {
            resource_id: "M".to_string(),
            code: "FRM-M".to_string(),
            name: "Mold M".to_string(),
            max_height_cm: 60.0,
            max_width_cm: 40.0,
            max_length_cm: length,
            declared_capacity: capacity,
            setup_minutes: 30,
            available: true,
        }
    }

    #[test]
    fn test_effective_capacity_bounded_by_length() {
        let m = mold(400.0, 8);
        let piece = PieceEnvelope::new(50.0, 30.0, 150.0);
        assert_eq!(m.effective_capacity(&piece), 2); // min(8, floor(400/150)=2)
    }

    #[test]
    fn test_effective_capacity_bounded_by_declared() {
        let m = mold(1200.0, 4);
        let piece = PieceEnvelope::new(50.0, 30.0, 100.0);
        assert_eq!(m.effective_capacity(&piece), 4);
    }

    #[test]
    fn test_piece_longer_than_mold_has_no_capacity() {
        let m = mold(300.0, 8);
        let piece = PieceEnvelope::new(50.0, 30.0, 301.0);
        assert_eq!(m.effective_capacity(&piece), 0);
    }

    #[test]
    fn test_fits_checks_height_and_width_only() {
        let m = mold(300.0, 8);
        assert!(m.fits(&PieceEnvelope::new(60.0, 40.0, 900.0)));
        assert!(!m.fits(&PieceEnvelope::new(60.5, 40.0, 100.0)));
        assert!(!m.fits(&PieceEnvelope::new(60.0, 41.0, 100.0)));
    }
}
