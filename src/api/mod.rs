// ==========================================
// 工数管理系统 - API层
// ==========================================
// 职责: 组合 Repository 与 Engine, 实施权限/输入校验, 统一错误类型
// ==========================================

pub mod aggregation_api;
pub mod cost_master_api;
pub mod dashboard_api;
pub mod error;
pub mod organization_api;
pub mod outsourcing_api;
pub mod report_export_api;
pub mod workload_api;

pub use aggregation_api::{AggregationApi, AggregationDetail, AggregationInput, AggregationList};
pub use cost_master_api::{CostMasterApi, CostMasterInput};
pub use dashboard_api::DashboardApi;
pub use error::{ApiError, ApiResult};
pub use organization_api::{DropdownOption, OrganizationApi};
pub use outsourcing_api::{OutsourcingApi, OutsourcingCostInput, PartnerInput};
pub use report_export_api::{DownloadPayload, ExportFilter, ExportRequest, ReportExportApi};
pub use workload_api::{CellUpdateResult, CreateWorkloadRequest, WorkloadApi, WorkloadMonthView};

use crate::engine::calendar::{BusinessCalendar, JapaneseHolidayCalendar};
use crate::repository::HolidayRepository;

/// 营业日历（国民祝日 + 公司休日）
pub(crate) fn load_business_calendar(holiday_repo: &HolidayRepository) -> ApiResult<BusinessCalendar> {
    let company_holidays = holiday_repo.list_all()?;
    Ok(BusinessCalendar::new(
        JapaneseHolidayCalendar::with_company_holidays(company_holidays),
    ))
}
