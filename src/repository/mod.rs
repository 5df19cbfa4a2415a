// ==========================================
// 工数管理系统 - 数据仓储层
// ==========================================
// 职责: 数据访问, 参数化 SQL, 共享 Arc<Mutex<Connection>>
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod aggregation_repo;
pub mod cost_master_repo;
pub mod error;
pub mod holiday_repo;
pub mod organization_repo;
pub mod outsourcing_repo;
pub mod project_repo;
pub mod report_export_repo;
pub mod row_utils;
pub mod workload_repo;

pub use aggregation_repo::{AggregationFilter, AggregationRepository};
pub use cost_master_repo::CostMasterRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use holiday_repo::HolidayRepository;
pub use organization_repo::OrganizationRepository;
pub use outsourcing_repo::OutsourcingRepository;
pub use project_repo::ProjectRepository;
pub use report_export_repo::ReportExportRepository;
pub use workload_repo::WorkloadRepository;
