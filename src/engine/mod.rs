// ==========================================
// 工数管理系统 - 引擎层
// ==========================================
// 职责: 工数 → 金额的业务计算, 日历, 驾驶舱, 报表输出
// 红线: Engine 不拼 SQL
// ==========================================

pub mod billing;
pub mod calendar;
pub mod cost_resolver;
pub mod dashboard;
pub mod export;
pub mod outsourcing;
pub mod project_summary;
pub mod workday_calculator;

// 重导出核心引擎
pub use billing::{BillingEngine, HourBreakdown, WorkloadFinancials};
pub use calendar::{BusinessCalendar, DayInfo, DayKind, HolidayCalendar, JapaneseHolidayCalendar};
pub use cost_resolver::CostResolver;
pub use dashboard::{CompanyDashboard, DashboardEngine, DashboardInput, HomeStats};
pub use export::{ExportError, ExportLookup, ExportRunner, ExportTable};
pub use outsourcing::{MonthlyOutsourcingReport, OutsourcingEngine};
pub use project_summary::{ProjectSummary, ProjectSummaryEngine};
pub use workday_calculator::{WorkdayCalculation, WorkdayCalculator, WorkdayWindow};
