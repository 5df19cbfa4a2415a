// ==========================================
// 工数管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + axum
// 系统定位: 工数登记 / 成本单价 / 请求额 / 利润汇总
// ==========================================

// 初始化国际化系统（默认日语）
rust_i18n::i18n!("locales", fallback = "ja");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 工数一括导入
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态 / HTTP
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AggregationStatus, BillingType, CaseClassification, ContractType, EmployeeLevel, ExportFormat,
    ExportStatus, ExportType, OutsourcingStatus,
};

// 领域实体
pub use domain::{
    BusinessPartner, CostMaster, Department, Employee, OutsourcingCost, Project, ProjectTicket,
    ReportExport, Section, Viewer, Workload, WorkloadAggregation, YearMonth,
};

// 引擎
pub use engine::{
    BillingEngine, BusinessCalendar, CostResolver, DashboardEngine, JapaneseHolidayCalendar,
    OutsourcingEngine, ProjectSummaryEngine, WorkdayCalculator,
};

// API
pub use api::{
    AggregationApi, ApiError, ApiResult, CostMasterApi, DashboardApi, OrganizationApi,
    OutsourcingApi, ReportExportApi, WorkloadApi,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工数管理系统";

// 数据库版本
pub const DB_VERSION: &str = "v1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
