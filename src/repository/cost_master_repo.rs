// ==========================================
// 工数管理系统 - 成本主数据仓储
// ==========================================
// 表: cost_master
// 单价列按 (cost|billing)_(monthly|daily|hourly|fixed) 展开
// ==========================================

use crate::domain::cost_master::{CostMaster, RateSet};
use crate::domain::types::{BillingType, ContractType, EmployeeLevel};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    date_to_sql, datetime_to_sql, dec_to_sql, get_date, get_datetime, get_decimal, get_enum,
    get_opt_date, get_opt_decimal, get_opt_enum, opt_date_to_sql, opt_dec_to_sql,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const COLUMNS: &str = "cost_master_id, department_id, employee_level, billing_type, \
     monthly_cost, daily_cost, hourly_cost, fixed_cost, \
     monthly_billing, daily_billing, hourly_billing, fixed_billing, \
     overtime_rate, holiday_rate, discount_rate, minimum_billing_amount, \
     client_name, contract_type, payment_terms, special_conditions, \
     effective_from, effective_to, is_active, created_at, updated_at";

pub struct CostMasterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CostMasterRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, m: &CostMaster) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                r#"INSERT INTO cost_master ({}) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
                )"#,
                COLUMNS
            ),
            params![
                m.cost_master_id,
                m.department_id,
                m.employee_level.map(|l| l.as_str()),
                m.billing_type.as_str(),
                opt_dec_to_sql(m.cost.monthly),
                opt_dec_to_sql(m.cost.daily),
                opt_dec_to_sql(m.cost.hourly),
                opt_dec_to_sql(m.cost.fixed),
                opt_dec_to_sql(m.billing.monthly),
                opt_dec_to_sql(m.billing.daily),
                opt_dec_to_sql(m.billing.hourly),
                opt_dec_to_sql(m.billing.fixed),
                dec_to_sql(m.overtime_rate),
                dec_to_sql(m.holiday_rate),
                dec_to_sql(m.discount_rate),
                opt_dec_to_sql(m.minimum_billing_amount),
                m.client_name,
                m.contract_type.as_str(),
                m.payment_terms,
                m.special_conditions,
                date_to_sql(m.effective_from),
                opt_date_to_sql(m.effective_to),
                m.is_active,
                datetime_to_sql(m.created_at),
                datetime_to_sql(m.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 全字段更新（主键不变）
    pub fn update(&self, m: &CostMaster) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE cost_master SET
                department_id = ?2, employee_level = ?3, billing_type = ?4,
                monthly_cost = ?5, daily_cost = ?6, hourly_cost = ?7, fixed_cost = ?8,
                monthly_billing = ?9, daily_billing = ?10, hourly_billing = ?11, fixed_billing = ?12,
                overtime_rate = ?13, holiday_rate = ?14, discount_rate = ?15,
                minimum_billing_amount = ?16, client_name = ?17, contract_type = ?18,
                payment_terms = ?19, special_conditions = ?20,
                effective_from = ?21, effective_to = ?22, is_active = ?23, updated_at = ?24
            WHERE cost_master_id = ?1
            "#,
            params![
                m.cost_master_id,
                m.department_id,
                m.employee_level.map(|l| l.as_str()),
                m.billing_type.as_str(),
                opt_dec_to_sql(m.cost.monthly),
                opt_dec_to_sql(m.cost.daily),
                opt_dec_to_sql(m.cost.hourly),
                opt_dec_to_sql(m.cost.fixed),
                opt_dec_to_sql(m.billing.monthly),
                opt_dec_to_sql(m.billing.daily),
                opt_dec_to_sql(m.billing.hourly),
                opt_dec_to_sql(m.billing.fixed),
                dec_to_sql(m.overtime_rate),
                dec_to_sql(m.holiday_rate),
                dec_to_sql(m.discount_rate),
                opt_dec_to_sql(m.minimum_billing_amount),
                m.client_name,
                m.contract_type.as_str(),
                m.payment_terms,
                m.special_conditions,
                date_to_sql(m.effective_from),
                opt_date_to_sql(m.effective_to),
                m.is_active,
                datetime_to_sql(m.updated_at),
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("CostMaster", &m.cost_master_id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, cost_master_id: &str) -> RepositoryResult<Option<CostMaster>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM cost_master WHERE cost_master_id = ?1", COLUMNS),
                params![cost_master_id],
                map_cost_master,
            )
            .optional()?;
        Ok(result)
    }

    /// 启用/停用
    pub fn set_active(&self, cost_master_id: &str, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE cost_master SET is_active = ?2, updated_at = datetime('now') WHERE cost_master_id = ?1",
            params![cost_master_id, is_active],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("CostMaster", cost_master_id));
        }
        Ok(())
    }

    /// 部的全部成本主数据（生效开始日降序）
    pub fn list_by_department(&self, department_id: &str) -> RepositoryResult<Vec<CostMaster>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cost_master WHERE department_id = ?1 ORDER BY effective_from DESC",
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![department_id], map_cost_master)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 指定日有效的候选（部一致、有效、期间覆盖）
    pub fn list_effective_candidates(
        &self,
        department_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<CostMaster>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM cost_master
            WHERE department_id = ?1
              AND is_active = 1
              AND effective_from <= ?2
              AND (effective_to IS NULL OR effective_to >= ?2)
            ORDER BY effective_from DESC
            "#,
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![department_id, date_to_sql(date)], map_cost_master)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 全部有效的成本主数据
    pub fn list_active(&self) -> RepositoryResult<Vec<CostMaster>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cost_master WHERE is_active = 1 ORDER BY department_id, effective_from DESC",
            COLUMNS
        ))?;
        let rows = stmt.query_map([], map_cost_master)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn map_cost_master(row: &Row) -> rusqlite::Result<CostMaster> {
    Ok(CostMaster {
        cost_master_id: row.get(0)?,
        department_id: row.get(1)?,
        employee_level: get_opt_enum(row, 2, EmployeeLevel::parse)?,
        billing_type: get_enum(row, 3, BillingType::parse)?,
        cost: RateSet {
            monthly: get_opt_decimal(row, 4)?,
            daily: get_opt_decimal(row, 5)?,
            hourly: get_opt_decimal(row, 6)?,
            fixed: get_opt_decimal(row, 7)?,
        },
        billing: RateSet {
            monthly: get_opt_decimal(row, 8)?,
            daily: get_opt_decimal(row, 9)?,
            hourly: get_opt_decimal(row, 10)?,
            fixed: get_opt_decimal(row, 11)?,
        },
        overtime_rate: get_decimal(row, 12)?,
        holiday_rate: get_decimal(row, 13)?,
        discount_rate: get_decimal(row, 14)?,
        minimum_billing_amount: get_opt_decimal(row, 15)?,
        client_name: row.get(16)?,
        contract_type: get_enum(row, 17, ContractType::parse)?,
        payment_terms: row.get(18)?,
        special_conditions: row.get(19)?,
        effective_from: get_date(row, 20)?,
        effective_to: get_opt_date(row, 21)?,
        is_active: row.get(22)?,
        created_at: get_datetime(row, 23)?,
        updated_at: get_datetime(row, 24)?,
    })
}
