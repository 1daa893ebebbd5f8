// ==========================================
// 预制构件模具排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod batch;
pub mod calendar;
pub mod resource;
pub mod types;
pub mod work_order;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use batch::{batch_id_for, Batch, PackedBatch};
pub use calendar::CalendarDay;
pub use resource::Resource;
pub use types::{BatchStatus, ParseTypeError, Priority, UrgencyDirective, WorkOrderStatus};
pub use work_order::{PieceEnvelope, PieceGroup, PieceRequest, WorkOrder};
