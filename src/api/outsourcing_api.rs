// ==========================================
// 工数管理系统 - 外注费 API
// ==========================================
// 职责: BP 登记/一览, 外注费登记/更新/逻辑删除, 月次汇总
// ==========================================

use std::sync::Arc;

use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::organization::Viewer;
use crate::domain::outsourcing::{BusinessPartner, OutsourcingCost};
use crate::domain::types::{CaseClassification, OutsourcingStatus};
use crate::domain::units::{range_violation, MAX_UNIT_PRICE};
use crate::domain::workload::YearMonth;
use crate::engine::outsourcing::{MonthlyOutsourcingReport, OutsourcingEngine};
use crate::repository::{OutsourcingRepository, ProjectRepository, RepositoryError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub hourly_rate: Decimal,
    #[serde(default)]
    pub project_ids: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutsourcingCostInput {
    pub year_month: YearMonth,
    pub partner_id: String,
    pub project_id: String,
    pub ticket_id: String,
    pub status: OutsourcingStatus,
    pub case_classification: CaseClassification,
    pub work_hours: Decimal,
    pub notes: Option<String>,
}

pub struct OutsourcingApi {
    outsourcing_repo: Arc<OutsourcingRepository>,
    project_repo: Arc<ProjectRepository>,
    engine: OutsourcingEngine,
}

impl OutsourcingApi {
    pub fn new(outsourcing_repo: Arc<OutsourcingRepository>, project_repo: Arc<ProjectRepository>) -> Self {
        Self {
            outsourcing_repo,
            project_repo,
            engine: OutsourcingEngine::new(),
        }
    }

    // ==========================================
    // BP
    // ==========================================

    pub fn create_partner(&self, viewer: &Viewer, input: PartnerInput) -> ApiResult<BusinessPartner> {
        if input.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("BP名称不能为空".to_string()));
        }
        if let Some(message) = range_violation("hourly_rate", input.hourly_rate, MAX_UNIT_PRICE) {
            return Err(ApiError::InvalidInput(message));
        }
        for project_id in &input.project_ids {
            if self.project_repo.find_project(project_id)?.is_none() {
                return Err(ApiError::NotFound(format!("Project(id={})不存在", project_id)));
            }
        }

        let now = Local::now().naive_local();
        let partner = BusinessPartner {
            partner_id: uuid::Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            email: input.email,
            phone: input.phone,
            company: input.company,
            hourly_rate: input.hourly_rate,
            project_ids: input.project_ids,
            notes: input.notes,
            is_active: true,
            created_by: Some(viewer.employee_id.clone()),
            created_at: now,
            updated_at: now,
        };
        self.outsourcing_repo.insert_partner(&partner)?;
        info!(partner_id = %partner.partner_id, name = %partner.name, "登记BP");
        Ok(partner)
    }

    pub fn get_partner(&self, partner_id: &str) -> ApiResult<BusinessPartner> {
        self.outsourcing_repo
            .find_partner(partner_id)?
            .ok_or_else(|| ApiError::NotFound(format!("BusinessPartner(id={})不存在", partner_id)))
    }

    pub fn list_partners(&self) -> ApiResult<Vec<BusinessPartner>> {
        Ok(self.outsourcing_repo.list_active_partners()?)
    }

    // ==========================================
    // 外注费
    // ==========================================

    /// 登记外注费（单价从 BP 复制）
    pub fn create_cost(&self, viewer: &Viewer, input: OutsourcingCostInput) -> ApiResult<OutsourcingCost> {
        let now = Local::now().naive_local();
        let mut cost = OutsourcingCost {
            outsourcing_id: uuid::Uuid::new_v4().to_string(),
            year_month: input.year_month,
            partner_id: String::new(),
            project_id: String::new(),
            ticket_id: String::new(),
            status: input.status,
            case_classification: input.case_classification,
            work_hours: Decimal::ZERO,
            hourly_rate: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            notes: None,
            is_active: true,
            created_by: Some(viewer.employee_id.clone()),
            created_at: now,
            updated_at: now,
        };
        self.fill(&mut cost, input)?;
        self.outsourcing_repo.insert_cost(&cost).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => ApiError::BusinessRuleViolation(
                "同一年月/BP/项目/工单的外注费已存在".to_string(),
            ),
            other => other.into(),
        })?;
        info!(
            outsourcing_id = %cost.outsourcing_id,
            year_month = %cost.year_month,
            total_cost = %cost.total_cost,
            "登记外注费"
        );
        Ok(cost)
    }

    pub fn update_cost(&self, outsourcing_id: &str, input: OutsourcingCostInput) -> ApiResult<OutsourcingCost> {
        let mut cost = self.get_cost(outsourcing_id)?;
        self.fill(&mut cost, input)?;
        cost.updated_at = Local::now().naive_local();
        self.outsourcing_repo.update_cost(&cost)?;
        Ok(cost)
    }

    /// 逻辑删除
    pub fn delete_cost(&self, outsourcing_id: &str) -> ApiResult<()> {
        let mut cost = self.get_cost(outsourcing_id)?;
        cost.soft_delete();
        cost.updated_at = Local::now().naive_local();
        self.outsourcing_repo.update_cost(&cost)?;
        info!(outsourcing_id, "外注费逻辑删除");
        Ok(())
    }

    pub fn get_cost(&self, outsourcing_id: &str) -> ApiResult<OutsourcingCost> {
        self.outsourcing_repo
            .find_cost(outsourcing_id)?
            .ok_or_else(|| ApiError::NotFound(format!("OutsourcingCost(id={})不存在", outsourcing_id)))
    }

    pub fn list_costs(&self, year_month: YearMonth) -> ApiResult<Vec<OutsourcingCost>> {
        Ok(self.outsourcing_repo.list_costs_by_year_month(year_month)?)
    }

    /// 月次汇总 + 项目别内訳
    pub fn monthly_summary(&self, year_month: YearMonth) -> ApiResult<MonthlyOutsourcingReport> {
        let costs = self.outsourcing_repo.list_costs_by_year_month(year_month)?;
        Ok(self.engine.monthly_report(year_month, &costs))
    }

    fn fill(&self, cost: &mut OutsourcingCost, input: OutsourcingCostInput) -> ApiResult<()> {
        let ticket = self
            .project_repo
            .find_ticket(&input.ticket_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Ticket(id={})不存在", input.ticket_id)))?;
        if ticket.project_id != input.project_id {
            return Err(ApiError::InvalidInput(format!(
                "工单 {} 不属于项目 {}",
                input.ticket_id, input.project_id
            )));
        }
        let partner = self.get_partner(&input.partner_id)?;

        cost.year_month = input.year_month;
        cost.partner_id = input.partner_id;
        cost.project_id = input.project_id;
        cost.ticket_id = input.ticket_id;
        cost.status = input.status;
        cost.case_classification = input.case_classification;
        cost.work_hours = input.work_hours;
        cost.notes = input.notes;

        let errors = self.engine.prepare(cost, &partner);
        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors.join("; ")));
        }
        Ok(())
    }
}
