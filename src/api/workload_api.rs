// ==========================================
// 工数管理系统 - 工数 API
// ==========================================
// 职责: 月历画面数据, 工数行新增/删除, 单元格保存
// 权限: Viewer::can_edit_workload_of (管理员 / 本人 / 同课 / 同部)
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::load_business_calendar;
use crate::domain::organization::{Employee, Viewer};
use crate::domain::workload::{Workload, WorkloadError, YearMonth};
use crate::engine::calendar::DayInfo;
use crate::i18n::{t, t_with_args};
use crate::repository::{
    HolidayRepository, OrganizationRepository, ProjectRepository, WorkloadRepository,
};

/// 新增工数行请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkloadRequest {
    /// 省略时为调用者本人
    pub employee_id: Option<String>,
    pub project_id: String,
    pub ticket_id: Option<String>,
    pub year_month: YearMonth,
}

/// 画面行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadRowView {
    pub workload: Workload,
    pub employee_name: String,
    pub project_name: String,
    pub ticket_title: Option<String>,
    pub total_hours: Decimal,
    pub total_days: Decimal,
    pub can_edit: bool,
}

/// 月历画面
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadMonthView {
    pub year_month: YearMonth,
    pub previous_month: YearMonth,
    pub next_month: YearMonth,
    pub days: Vec<DayInfo>,
    pub rows: Vec<WorkloadRowView>,
    pub total_hours: Decimal,
}

/// 单元格保存结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellUpdateResult {
    pub workload_id: String,
    pub day: u32,
    pub hours: Decimal,
    pub total_hours: Decimal,
    pub total_days: Decimal,
}

pub struct WorkloadApi {
    workload_repo: Arc<WorkloadRepository>,
    organization_repo: Arc<OrganizationRepository>,
    project_repo: Arc<ProjectRepository>,
    holiday_repo: Arc<HolidayRepository>,
}

impl WorkloadApi {
    pub fn new(
        workload_repo: Arc<WorkloadRepository>,
        organization_repo: Arc<OrganizationRepository>,
        project_repo: Arc<ProjectRepository>,
        holiday_repo: Arc<HolidayRepository>,
    ) -> Self {
        Self {
            workload_repo,
            organization_repo,
            project_repo,
            holiday_repo,
        }
    }

    /// 当月的日历信息（曜日 / 土日 / 祝日）
    pub fn calendar(&self, year_month: YearMonth) -> ApiResult<Vec<DayInfo>> {
        let calendar = load_business_calendar(&self.holiday_repo)?;
        Ok(calendar.month_calendar(year_month))
    }

    /// 月历画面: 可见范围内的工数行 + 日历
    pub fn month_view(&self, viewer: &Viewer, year_month: YearMonth) -> ApiResult<WorkloadMonthView> {
        let scope = viewer.scope();
        let workloads = self
            .workload_repo
            .list_by_year_month_in_scope(year_month, &scope)?;
        let employees: HashMap<String, Employee> = self
            .organization_repo
            .list_employees_in_scope(&scope)?
            .into_iter()
            .map(|e| (e.employee_id.clone(), e))
            .collect();

        let mut project_names: HashMap<String, String> = HashMap::new();
        let mut ticket_titles: HashMap<String, String> = HashMap::new();
        let mut rows = Vec::with_capacity(workloads.len());
        for w in workloads {
            if !project_names.contains_key(&w.project_id) {
                let name = self
                    .project_repo
                    .find_project(&w.project_id)?
                    .map(|p| p.name)
                    .unwrap_or_default();
                project_names.insert(w.project_id.clone(), name);
            }
            let ticket_title = match &w.ticket_id {
                Some(id) => {
                    if !ticket_titles.contains_key(id) {
                        let title = self
                            .project_repo
                            .find_ticket(id)?
                            .map(|t| t.title)
                            .unwrap_or_default();
                        ticket_titles.insert(id.clone(), title);
                    }
                    ticket_titles.get(id).cloned()
                }
                None => None,
            };

            // 停用社员不在 employees 中, 其行只读
            let owner = employees.get(&w.employee_id);
            rows.push(WorkloadRowView {
                employee_name: owner.map(|e| e.full_name.clone()).unwrap_or_default(),
                project_name: project_names.get(&w.project_id).cloned().unwrap_or_default(),
                ticket_title,
                total_hours: w.total_hours(),
                total_days: w.total_days(),
                can_edit: owner.map(|e| viewer.can_edit_workload_of(e)).unwrap_or(false),
                workload: w,
            });
        }

        let total_hours = rows.iter().map(|r| r.total_hours).sum();
        Ok(WorkloadMonthView {
            year_month,
            previous_month: year_month.previous(),
            next_month: year_month.next(),
            days: self.calendar(year_month)?,
            rows,
            total_hours,
        })
    }

    /// 新增空工数行
    ///
    /// # 错误
    /// - PermissionDenied: 无编辑权限
    /// - BusinessRuleViolation: 同一 (社员, 项目, 工单, 年月) 已存在
    pub fn create_row(&self, viewer: &Viewer, request: CreateWorkloadRequest) -> ApiResult<Workload> {
        let employee_id = request
            .employee_id
            .unwrap_or_else(|| viewer.employee_id.clone());
        let owner = self.find_owner(&employee_id)?;
        if !viewer.can_edit_workload_of(&owner) {
            return Err(ApiError::PermissionDenied(t("workload.permission_denied")));
        }

        let project = self
            .project_repo
            .find_project(&request.project_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Project(id={})不存在", request.project_id)))?;
        if !project.is_active {
            return Err(ApiError::InvalidInput(t_with_args(
                "workload.project_inactive",
                &[("name", project.name.as_str())],
            )));
        }
        if let Some(ticket_id) = request.ticket_id.as_deref() {
            let ticket = self
                .project_repo
                .find_ticket(ticket_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Ticket(id={})不存在", ticket_id)))?;
            if ticket.project_id != project.project_id {
                return Err(ApiError::InvalidInput(format!(
                    "工单 {} 不属于项目 {}",
                    ticket_id, project.project_id
                )));
            }
        }

        if self
            .workload_repo
            .find_by_key(
                &employee_id,
                &request.project_id,
                request.ticket_id.as_deref(),
                request.year_month,
            )?
            .is_some()
        {
            return Err(ApiError::BusinessRuleViolation(t("workload.duplicate_row")));
        }

        let workload = Workload::new(
            employee_id,
            request.project_id,
            request.ticket_id,
            request.year_month,
        );
        self.workload_repo.insert(&workload)?;
        info!(
            workload_id = %workload.workload_id,
            employee_id = %workload.employee_id,
            year_month = %workload.year_month,
            operator = %viewer.employee_id,
            "新增工数行"
        );
        Ok(workload)
    }

    /// 保存单元格（单日工数）
    pub fn update_cell(
        &self,
        viewer: &Viewer,
        workload_id: &str,
        day: u32,
        hours: Decimal,
    ) -> ApiResult<CellUpdateResult> {
        let mut workload = self.find_workload(workload_id)?;
        let owner = self.find_owner(&workload.employee_id)?;
        if !viewer.can_edit_workload_of(&owner) {
            return Err(ApiError::PermissionDenied(t("workload.permission_denied")));
        }

        workload.set_day_value(day, hours).map_err(|e| {
            let key = match e {
                WorkloadError::HoursOutOfRange(_) => "workload.hours_out_of_range",
                WorkloadError::InvalidDay(_) | WorkloadError::DayNotInMonth { .. } => {
                    "workload.invalid_day"
                }
            };
            ApiError::InvalidInput(t(key))
        })?;
        self.workload_repo
            .update_day(workload_id, day, hours, workload.updated_at)?;

        Ok(CellUpdateResult {
            workload_id: workload.workload_id.clone(),
            day,
            hours,
            total_hours: workload.total_hours(),
            total_days: workload.total_days(),
        })
    }

    /// 删除工数行（权限同编辑）
    ///
    /// # 返回
    /// - 删除完成消息
    pub fn delete_row(&self, viewer: &Viewer, workload_id: &str) -> ApiResult<String> {
        let workload = self.find_workload(workload_id)?;
        let owner = self.find_owner(&workload.employee_id)?;
        if !viewer.can_edit_workload_of(&owner) {
            return Err(ApiError::PermissionDenied(t("workload.permission_denied")));
        }
        self.workload_repo.delete(workload_id)?;

        let label = match workload.ticket_id.as_deref() {
            Some(id) => self.project_repo.find_ticket(id)?.map(|t| t.title),
            None => self.project_repo.find_project(&workload.project_id)?.map(|p| p.name),
        }
        .unwrap_or_default();
        info!(workload_id, operator = %viewer.employee_id, "删除工数行");
        Ok(t_with_args(
            "workload.deleted",
            &[("user", owner.full_name.as_str()), ("ticket", label.as_str())],
        ))
    }

    /// 工数行（无权限校验, 读取用）
    pub fn get_row(&self, workload_id: &str) -> ApiResult<Workload> {
        self.find_workload(workload_id)
    }

    fn find_workload(&self, workload_id: &str) -> ApiResult<Workload> {
        self.workload_repo
            .find_by_id(workload_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Workload(id={})不存在", workload_id)))
    }

    fn find_owner(&self, employee_id: &str) -> ApiResult<Employee> {
        self.organization_repo
            .find_employee(employee_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Employee(id={})不存在", employee_id)))
    }
}

/// 今日所在年月
pub fn current_year_month() -> YearMonth {
    YearMonth::from_date(Local::now().date_naive())
}
