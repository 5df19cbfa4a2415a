// ==========================================
// 工数管理系统 - 成本主数据 API
// ==========================================
// 职责: 单价登记/更新 (含校验), 有效单价查询, 启用/停用
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::cost_master::{CostMaster, RateSet, DEFAULT_HOLIDAY_RATE, DEFAULT_OVERTIME_RATE};
use crate::domain::types::{BillingType, ContractType, EmployeeLevel};
use crate::engine::cost_resolver::CostResolver;
use crate::repository::{CostMasterRepository, OrganizationRepository};

/// 登记/更新输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMasterInput {
    pub department_id: String,
    pub employee_level: Option<EmployeeLevel>,
    pub billing_type: BillingType,
    #[serde(default)]
    pub cost: RateSet,
    #[serde(default)]
    pub billing: RateSet,
    pub overtime_rate: Option<Decimal>,
    pub holiday_rate: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
    pub minimum_billing_amount: Option<Decimal>,
    pub client_name: Option<String>,
    pub contract_type: Option<ContractType>,
    pub payment_terms: Option<String>,
    pub special_conditions: Option<String>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl CostMasterInput {
    fn apply_to(self, m: &mut CostMaster) {
        m.department_id = self.department_id;
        m.employee_level = self.employee_level;
        m.billing_type = self.billing_type;
        m.cost = self.cost;
        m.billing = self.billing;
        m.overtime_rate = self.overtime_rate.unwrap_or(DEFAULT_OVERTIME_RATE);
        m.holiday_rate = self.holiday_rate.unwrap_or(DEFAULT_HOLIDAY_RATE);
        m.discount_rate = self.discount_rate.unwrap_or(Decimal::ZERO);
        m.minimum_billing_amount = self.minimum_billing_amount;
        m.client_name = self.client_name;
        m.contract_type = self.contract_type.unwrap_or(ContractType::QuasiMandate);
        m.payment_terms = self.payment_terms;
        m.special_conditions = self.special_conditions;
        m.effective_from = self.effective_from;
        m.effective_to = self.effective_to;
    }
}

pub struct CostMasterApi {
    cost_master_repo: Arc<CostMasterRepository>,
    organization_repo: Arc<OrganizationRepository>,
    resolver: CostResolver,
}

impl CostMasterApi {
    pub fn new(
        cost_master_repo: Arc<CostMasterRepository>,
        organization_repo: Arc<OrganizationRepository>,
    ) -> Self {
        Self {
            cost_master_repo,
            organization_repo,
            resolver: CostResolver::new(),
        }
    }

    pub fn create(&self, input: CostMasterInput) -> ApiResult<CostMaster> {
        let now = Local::now().naive_local();
        let mut master = CostMaster {
            cost_master_id: uuid::Uuid::new_v4().to_string(),
            department_id: String::new(),
            employee_level: None,
            billing_type: input.billing_type,
            cost: RateSet::default(),
            billing: RateSet::default(),
            overtime_rate: DEFAULT_OVERTIME_RATE,
            holiday_rate: DEFAULT_HOLIDAY_RATE,
            discount_rate: Decimal::ZERO,
            minimum_billing_amount: None,
            client_name: None,
            contract_type: ContractType::QuasiMandate,
            payment_terms: None,
            special_conditions: None,
            effective_from: input.effective_from,
            effective_to: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        input.apply_to(&mut master);
        self.check(&master)?;

        self.cost_master_repo.insert(&master)?;
        info!(
            cost_master_id = %master.cost_master_id,
            department_id = %master.department_id,
            billing_type = %master.billing_type,
            "登记成本主数据"
        );
        Ok(master)
    }

    pub fn update(&self, cost_master_id: &str, input: CostMasterInput) -> ApiResult<CostMaster> {
        let mut master = self.get(cost_master_id)?;
        input.apply_to(&mut master);
        master.updated_at = Local::now().naive_local();
        self.check(&master)?;
        self.cost_master_repo.update(&master)?;
        Ok(master)
    }

    pub fn get(&self, cost_master_id: &str) -> ApiResult<CostMaster> {
        self.cost_master_repo
            .find_by_id(cost_master_id)?
            .ok_or_else(|| ApiError::NotFound(format!("CostMaster(id={})不存在", cost_master_id)))
    }

    pub fn list_by_department(&self, department_id: &str) -> ApiResult<Vec<CostMaster>> {
        Ok(self.cost_master_repo.list_by_department(department_id)?)
    }

    /// 指定日有效的单价（等级一致优先于通用行）
    pub fn find_effective(
        &self,
        department_id: &str,
        employee_level: Option<EmployeeLevel>,
        date: NaiveDate,
    ) -> ApiResult<Option<CostMaster>> {
        let candidates = self
            .cost_master_repo
            .list_effective_candidates(department_id, date)?;
        Ok(self
            .resolver
            .resolve(&candidates, department_id, employee_level, date)
            .cloned())
    }

    pub fn activate(&self, cost_master_id: &str) -> ApiResult<()> {
        self.cost_master_repo.set_active(cost_master_id, true)?;
        info!(cost_master_id, "启用成本主数据");
        Ok(())
    }

    pub fn deactivate(&self, cost_master_id: &str) -> ApiResult<()> {
        self.cost_master_repo.set_active(cost_master_id, false)?;
        info!(cost_master_id, "停用成本主数据");
        Ok(())
    }

    fn check(&self, master: &CostMaster) -> ApiResult<()> {
        let errors = master.validate();
        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors.join("; ")));
        }
        if self
            .organization_repo
            .find_department(&master.department_id)?
            .is_none()
        {
            return Err(ApiError::NotFound(format!(
                "Department(id={})不存在",
                master.department_id
            )));
        }
        Ok(())
    }
}
