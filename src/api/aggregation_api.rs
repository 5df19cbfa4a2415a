// ==========================================
// 工数管理系统 - 工数汇总 API
// ==========================================
// 职责: 汇总行登记/更新/删除, 过滤一览 + 合计, 工单工数自动计算
// 校验阈值与默认单价来自 ConfigManager
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::aggregation::{AggregationTotals, WorkloadAggregation};
use crate::domain::organization::Viewer;
use crate::domain::types::{AggregationStatus, CaseClassification, EmployeeLevel};
use crate::domain::workload::{Workload, YearMonth};
use crate::engine::workday_calculator::{WorkdayCalculation, WorkdayCalculator, WorkdayWindow};
use crate::repository::{
    AggregationFilter, AggregationRepository, OrganizationRepository, ProjectRepository,
    WorkloadRepository,
};

/// 登记/更新输入
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationInput {
    pub project_id: String,
    pub ticket_id: Option<String>,
    pub department_id: Option<String>,
    pub section_id: Option<String>,
    pub year_month: Option<YearMonth>,
    pub status: Option<AggregationStatus>,
    pub case_classification: Option<CaseClassification>,

    pub estimate_date: Option<NaiveDate>,
    pub order_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub inspection_date: Option<NaiveDate>,

    #[serde(default)]
    pub available_amount: Decimal,
    #[serde(default)]
    pub billing_amount_excluding_tax: Decimal,
    #[serde(default)]
    pub outsourcing_cost_excluding_tax: Decimal,

    #[serde(default)]
    pub estimated_workdays: Decimal,
    #[serde(default)]
    pub used_workdays: Decimal,
    #[serde(default)]
    pub newbie_workdays: Decimal,

    /// 省略时取配置默认值
    pub unit_cost_per_month: Option<Decimal>,
    pub billing_unit_cost_per_month: Option<Decimal>,

    pub billing_destination: Option<String>,
    pub billing_contact: Option<String>,
    pub mub_manager_id: Option<String>,
    pub remarks: Option<String>,

    /// true 时以工单工数覆盖 used/newbie workdays
    #[serde(default)]
    pub auto_calculate: bool,
}

/// 派生值（画面显示用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationDerived {
    pub total_used_workdays: Decimal,
    pub remaining_workdays: Decimal,
    pub daily_billing_rate: Decimal,
    pub daily_cost_rate: Decimal,
    pub remaining_amount: Decimal,
    pub labor_cost: Decimal,
    pub profit_rate: Decimal,
    pub wip_amount: Decimal,
    pub suggested_available_amount: Decimal,
    pub suggested_estimated_workdays: Decimal,
    pub is_overdue: bool,
    pub days_until_deadline: Option<i64>,
}

impl AggregationDerived {
    pub fn of(a: &WorkloadAggregation, today: NaiveDate) -> Self {
        Self {
            total_used_workdays: a.total_used_workdays(),
            remaining_workdays: a.remaining_workdays(),
            daily_billing_rate: a.daily_billing_rate(),
            daily_cost_rate: a.daily_cost_rate(),
            remaining_amount: a.remaining_amount(),
            labor_cost: a.labor_cost(),
            profit_rate: a.profit_rate().round_dp(1),
            wip_amount: a.wip_amount(),
            suggested_available_amount: a.suggested_available_amount(),
            suggested_estimated_workdays: a.suggested_estimated_workdays(),
            is_overdue: a.is_overdue(today),
            days_until_deadline: a.days_until_deadline(today),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationDetail {
    pub aggregation: WorkloadAggregation,
    pub derived: AggregationDerived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationList {
    pub rows: Vec<AggregationDetail>,
    pub totals: AggregationTotals,
}

pub struct AggregationApi {
    aggregation_repo: Arc<AggregationRepository>,
    workload_repo: Arc<WorkloadRepository>,
    organization_repo: Arc<OrganizationRepository>,
    project_repo: Arc<ProjectRepository>,
    config_manager: Arc<ConfigManager>,
    calculator: WorkdayCalculator,
}

impl AggregationApi {
    pub fn new(
        aggregation_repo: Arc<AggregationRepository>,
        workload_repo: Arc<WorkloadRepository>,
        organization_repo: Arc<OrganizationRepository>,
        project_repo: Arc<ProjectRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            aggregation_repo,
            workload_repo,
            organization_repo,
            project_repo,
            config_manager,
            calculator: WorkdayCalculator::new(),
        }
    }

    /// 登记汇总行
    ///
    /// # 错误
    /// - FieldValidation: 日期顺序/超出阈值/负数
    /// - BusinessRuleViolation: 同一 (项目, 工单, 年月) 已存在
    pub fn create(&self, viewer: &Viewer, input: AggregationInput) -> ApiResult<WorkloadAggregation> {
        let now = Local::now().naive_local();
        let mut aggregation = WorkloadAggregation {
            aggregation_id: uuid::Uuid::new_v4().to_string(),
            project_id: String::new(),
            ticket_id: None,
            department_id: None,
            section_id: None,
            year_month: YearMonth::from_date(now.date()),
            status: AggregationStatus::Planning,
            case_classification: CaseClassification::Development,
            estimate_date: None,
            order_date: None,
            planned_end_date: None,
            actual_end_date: None,
            inspection_date: None,
            available_amount: Decimal::ZERO,
            billing_amount_excluding_tax: Decimal::ZERO,
            outsourcing_cost_excluding_tax: Decimal::ZERO,
            estimated_workdays: Decimal::ZERO,
            used_workdays: Decimal::ZERO,
            newbie_workdays: Decimal::ZERO,
            unit_cost_per_month: Decimal::ZERO,
            billing_unit_cost_per_month: Decimal::ZERO,
            billing_destination: None,
            billing_contact: None,
            mub_manager_id: None,
            remarks: None,
            created_by: Some(viewer.employee_id.clone()),
            created_at: now,
            updated_at: now,
        };
        self.fill(&mut aggregation, input, now.date())?;
        self.aggregation_repo.insert(&aggregation).map_err(duplicate_as_rule)?;
        info!(
            aggregation_id = %aggregation.aggregation_id,
            project_id = %aggregation.project_id,
            year_month = %aggregation.year_month,
            operator = %viewer.employee_id,
            "登记工数汇总"
        );
        Ok(aggregation)
    }

    pub fn update(&self, aggregation_id: &str, input: AggregationInput) -> ApiResult<WorkloadAggregation> {
        let mut aggregation = self.find(aggregation_id)?;
        let now = Local::now().naive_local();
        self.fill(&mut aggregation, input, now.date())?;
        aggregation.updated_at = now;
        self.aggregation_repo.update(&aggregation).map_err(duplicate_as_rule)?;
        Ok(aggregation)
    }

    pub fn get(&self, aggregation_id: &str) -> ApiResult<AggregationDetail> {
        let aggregation = self.find(aggregation_id)?;
        let today = Local::now().date_naive();
        Ok(AggregationDetail {
            derived: AggregationDerived::of(&aggregation, today),
            aggregation,
        })
    }

    /// 过滤一览 + 合计
    pub fn list(&self, filter: &AggregationFilter) -> ApiResult<AggregationList> {
        let rows = self.aggregation_repo.list(filter)?;
        let totals = AggregationTotals::from_rows(&rows);
        let today = Local::now().date_naive();
        Ok(AggregationList {
            rows: rows
                .into_iter()
                .map(|a| AggregationDetail {
                    derived: AggregationDerived::of(&a, today),
                    aggregation: a,
                })
                .collect(),
            totals,
        })
    }

    pub fn delete(&self, aggregation_id: &str) -> ApiResult<()> {
        self.aggregation_repo.delete(aggregation_id)?;
        info!(aggregation_id, "删除工数汇总");
        Ok(())
    }

    /// 工单工数自动计算
    ///
    /// 窗口: 受注日(默认当月1日) .. 终了日实绩(默认今天)
    pub fn auto_calculate(
        &self,
        ticket_id: &str,
        order_date: Option<NaiveDate>,
        actual_end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ApiResult<WorkdayCalculation> {
        let ticket = self
            .project_repo
            .find_ticket(ticket_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Ticket(id={})不存在", ticket_id)))?;
        let window = WorkdayWindow::resolve(order_date, actual_end_date, today);
        let workloads = self.workload_repo.list_by_ticket(&ticket.ticket_id)?;
        let rows = self.with_levels(workloads)?;
        Ok(self.calculator.calculate(&rows, window))
    }

    fn with_levels(&self, workloads: Vec<Workload>) -> ApiResult<Vec<(Workload, Option<EmployeeLevel>)>> {
        let mut levels: HashMap<String, Option<EmployeeLevel>> = HashMap::new();
        let mut rows = Vec::with_capacity(workloads.len());
        for w in workloads {
            let level = match levels.get(&w.employee_id) {
                Some(level) => *level,
                None => {
                    let level = self
                        .organization_repo
                        .find_employee(&w.employee_id)?
                        .and_then(|e| e.employee_level);
                    levels.insert(w.employee_id.clone(), level);
                    level
                }
            };
            rows.push((w, level));
        }
        Ok(rows)
    }

    /// 输入 → 实体, 含默认值/自动计算/校验
    fn fill(&self, a: &mut WorkloadAggregation, input: AggregationInput, today: NaiveDate) -> ApiResult<()> {
        let project = self
            .project_repo
            .find_project(&input.project_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Project(id={})不存在", input.project_id)))?;
        if let Some(ticket_id) = input.ticket_id.as_deref() {
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

        a.project_id = project.project_id.clone();
        a.ticket_id = input.ticket_id;
        a.department_id = input.department_id.or(Some(project.department_id));
        a.section_id = input.section_id;
        if let Some(ym) = input.year_month {
            a.year_month = ym;
        }
        if let Some(status) = input.status {
            a.status = status;
        }
        if let Some(cls) = input.case_classification {
            a.case_classification = cls;
        }
        a.estimate_date = input.estimate_date;
        a.order_date = input.order_date;
        a.planned_end_date = input.planned_end_date;
        a.actual_end_date = input.actual_end_date;
        a.inspection_date = input.inspection_date;
        a.available_amount = input.available_amount;
        a.billing_amount_excluding_tax = input.billing_amount_excluding_tax;
        a.outsourcing_cost_excluding_tax = input.outsourcing_cost_excluding_tax;
        a.estimated_workdays = input.estimated_workdays;
        a.used_workdays = input.used_workdays;
        a.newbie_workdays = input.newbie_workdays;
        a.unit_cost_per_month = match input.unit_cost_per_month {
            Some(v) => v,
            None => self.config_manager.get_default_unit_cost()?,
        };
        a.billing_unit_cost_per_month = match input.billing_unit_cost_per_month {
            Some(v) => v,
            None => self.config_manager.get_default_billing_unit_cost()?,
        };
        a.billing_destination = input.billing_destination;
        a.billing_contact = input.billing_contact;
        a.mub_manager_id = input.mub_manager_id;
        a.remarks = input.remarks;

        if input.auto_calculate {
            match a.ticket_id.clone() {
                Some(ticket_id) => {
                    let calc = self.auto_calculate(&ticket_id, a.order_date, a.actual_end_date, today)?;
                    a.used_workdays = calc.used_workdays;
                    a.newbie_workdays = calc.newbie_workdays;
                }
                None => warn!(project_id = %a.project_id, "未指定工单, 跳过自动计算"),
            }
        }

        let limits = self.config_manager.get_aggregation_limits()?;
        let errors = a.validate(&limits);
        if !errors.is_empty() {
            return Err(ApiError::FieldValidation(errors));
        }
        Ok(())
    }

    fn find(&self, aggregation_id: &str) -> ApiResult<WorkloadAggregation> {
        self.aggregation_repo
            .find_by_id(aggregation_id)?
            .ok_or_else(|| ApiError::NotFound(format!("WorkloadAggregation(id={})不存在", aggregation_id)))
    }
}

fn duplicate_as_rule(err: crate::repository::RepositoryError) -> ApiError {
    match err {
        crate::repository::RepositoryError::UniqueConstraintViolation(_) => {
            ApiError::BusinessRuleViolation("该项目/工单/年月的汇总已存在".to_string())
        }
        other => other.into(),
    }
}
