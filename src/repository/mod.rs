// ==========================================
// 预制构件模具排产系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod batch_repo;
pub mod calendar_repo;
pub mod error;
pub mod resource_repo;
pub mod row_codec;
pub mod work_order_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use batch_repo::BatchRepository;
pub use calendar_repo::CalendarRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use resource_repo::ResourceRepository;
pub use work_order_repo::{PieceRequestRepository, WorkOrderRepository};
