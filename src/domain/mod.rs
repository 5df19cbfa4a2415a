// ==========================================
// 工数管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、派生计算与校验规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod aggregation;
pub mod cost_master;
pub mod organization;
pub mod outsourcing;
pub mod project;
pub mod report_export;
pub mod types;
pub mod units;
pub mod workload;

// 重导出核心类型
pub use aggregation::{AggregationLimits, AggregationTotals, FieldError, WorkloadAggregation};
pub use cost_master::{CostMaster, NormalizedRates, RateSet};
pub use organization::{AccessScope, Department, Employee, Section, Viewer};
pub use outsourcing::{BusinessPartner, OutsourcingCost, OutsourcingCostSummary};
pub use project::{Project, ProjectTicket};
pub use report_export::{InvalidTransition, ReportExport};
pub use types::{
    AggregationStatus, BillingType, CaseClassification, ContractType, EmployeeLevel, ExportFormat,
    ExportStatus, ExportType, OutsourcingStatus,
};
pub use workload::{Workload, WorkloadError, YearMonth};
