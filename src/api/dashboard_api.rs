// ==========================================
// 工数管理系统 - 驾驶舱 API
// ==========================================
// 职责: 管理驾驶舱 (领导/管理员), 首页统计, 项目别收益汇总
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::api::load_business_calendar;
use crate::config::ConfigManager;
use crate::domain::aggregation::WorkloadAggregation;
use crate::domain::organization::{AccessScope, Employee, Viewer};
use crate::domain::workload::YearMonth;
use crate::engine::dashboard::{CompanyDashboard, DashboardEngine, DashboardInput, HomeStats};
use crate::engine::project_summary::{ProjectSummary, ProjectSummaryEngine};
use crate::repository::{
    AggregationRepository, CostMasterRepository, HolidayRepository, OrganizationRepository,
    OutsourcingRepository, ProjectRepository, WorkloadRepository,
};

pub struct DashboardApi {
    aggregation_repo: Arc<AggregationRepository>,
    workload_repo: Arc<WorkloadRepository>,
    organization_repo: Arc<OrganizationRepository>,
    project_repo: Arc<ProjectRepository>,
    cost_master_repo: Arc<CostMasterRepository>,
    outsourcing_repo: Arc<OutsourcingRepository>,
    holiday_repo: Arc<HolidayRepository>,
    config_manager: Arc<ConfigManager>,
    engine: DashboardEngine,
    summary_engine: ProjectSummaryEngine,
}

impl DashboardApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aggregation_repo: Arc<AggregationRepository>,
        workload_repo: Arc<WorkloadRepository>,
        organization_repo: Arc<OrganizationRepository>,
        project_repo: Arc<ProjectRepository>,
        cost_master_repo: Arc<CostMasterRepository>,
        outsourcing_repo: Arc<OutsourcingRepository>,
        holiday_repo: Arc<HolidayRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            aggregation_repo,
            workload_repo,
            organization_repo,
            project_repo,
            cost_master_repo,
            outsourcing_repo,
            holiday_repo,
            config_manager,
            engine: DashboardEngine::new(),
            summary_engine: ProjectSummaryEngine::new(),
        }
    }

    /// 管理驾驶舱
    ///
    /// # 错误
    /// - PermissionDenied: 非领导且非管理员
    #[instrument(skip(self, viewer), fields(viewer = %viewer.employee_id))]
    pub fn company_dashboard(&self, viewer: &Viewer, today: NaiveDate) -> ApiResult<CompanyDashboard> {
        if !viewer.can_view_admin_dashboard() {
            return Err(ApiError::PermissionDenied(
                "仅领导或管理员可查看管理驾驶舱".to_string(),
            ));
        }

        let this_month = YearMonth::from_date(today);
        let aggregations = self.aggregation_repo.list_all()?;
        let workloads = self
            .workload_repo
            .list_by_year_months(&[this_month.previous(), this_month])?;
        let (project_names, ticket_titles) = self.names_for(&aggregations)?;
        let settings = self.config_manager.get_business_settings()?;
        let calendar = load_business_calendar(&self.holiday_repo)?;

        let input = DashboardInput {
            today,
            aggregations: &aggregations,
            workloads: &workloads,
            workload_count: self.workload_repo.count()?,
            project_names: &project_names,
            ticket_titles: &ticket_titles,
            daily_target_person_days: settings.daily_target_person_days,
            deadline_warning_days: settings.deadline_warning_days,
        };
        Ok(self.engine.company_dashboard(&input, &calendar))
    }

    /// 首页统计（管理员: 全社; 其他: 本人）
    pub fn home_stats(&self, viewer: &Viewer, today: NaiveDate) -> ApiResult<HomeStats> {
        let year_month = YearMonth::from_date(today);
        let scope = if viewer.is_admin {
            AccessScope::All
        } else {
            AccessScope::SelfOnly(viewer.employee_id.clone())
        };
        let workloads = self
            .workload_repo
            .list_by_year_month_in_scope(year_month, &scope)?;
        let total_departments = self.organization_repo.list_active_departments()?.len();
        let total_projects = self.project_repo.list_active_projects()?.len();
        Ok(self
            .engine
            .home_stats(year_month, &workloads, total_departments, total_projects))
    }

    /// 项目别收益汇总（汇总行 + 计价后的工数 + 外注费）
    #[instrument(skip(self))]
    pub fn project_summary(&self, project_id: &str) -> ApiResult<ProjectSummary> {
        let project = self
            .project_repo
            .find_project(project_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Project(id={})不存在", project_id)))?;
        let aggregations = self.aggregation_repo.list_by_project(project_id)?;

        let mut employees: HashMap<String, Option<Employee>> = HashMap::new();
        let mut workloads = Vec::new();
        for w in self.workload_repo.list_by_project(project_id)? {
            if !employees.contains_key(&w.employee_id) {
                let employee = self.organization_repo.find_employee(&w.employee_id)?;
                employees.insert(w.employee_id.clone(), employee);
            }
            if let Some(Some(employee)) = employees.get(&w.employee_id) {
                workloads.push((w, employee.clone()));
            }
        }

        let cost_masters = self.cost_master_repo.list_active()?;
        let outsourcing = self.outsourcing_repo.list_costs_by_project(project_id)?;
        let calendar = load_business_calendar(&self.holiday_repo)?;
        Ok(self.summary_engine.summarize(
            &project,
            &aggregations,
            &workloads,
            &cost_masters,
            &outsourcing,
            &calendar,
        ))
    }

    /// 活跃项目的汇总
    pub fn active_project_summaries(&self) -> ApiResult<Vec<ProjectSummary>> {
        self.project_repo
            .list_active_projects()?
            .iter()
            .map(|p| self.project_summary(&p.project_id))
            .collect()
    }

    /// 汇总行涉及的项目名/工单名
    fn names_for(
        &self,
        aggregations: &[WorkloadAggregation],
    ) -> ApiResult<(HashMap<String, String>, HashMap<String, String>)> {
        let mut project_names = HashMap::new();
        let mut ticket_titles = HashMap::new();
        for a in aggregations {
            if !project_names.contains_key(&a.project_id) {
                if let Some(p) = self.project_repo.find_project(&a.project_id)? {
                    project_names.insert(a.project_id.clone(), p.name);
                }
            }
            if let Some(ticket_id) = &a.ticket_id {
                if !ticket_titles.contains_key(ticket_id) {
                    if let Some(t) = self.project_repo.find_ticket(ticket_id)? {
                        ticket_titles.insert(ticket_id.clone(), t.title);
                    }
                }
            }
        }
        Ok((project_names, ticket_titles))
    }
}
