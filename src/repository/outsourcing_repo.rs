// ==========================================
// 工数管理系统 - 外包数据仓储
// ==========================================
// 表: business_partner / business_partner_project / outsourcing_cost
// ==========================================

use crate::domain::outsourcing::{BusinessPartner, OutsourcingCost};
use crate::domain::types::{CaseClassification, OutsourcingStatus};
use crate::domain::workload::YearMonth;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    datetime_to_sql, dec_to_sql, get_datetime, get_decimal, get_enum, get_year_month,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const PARTNER_COLUMNS: &str = "partner_id, name, email, phone, company, hourly_rate, notes, \
     is_active, created_by, created_at, updated_at";

const COST_COLUMNS: &str = "outsourcing_id, year_month, partner_id, project_id, ticket_id, \
     status, case_classification, work_hours, hourly_rate, total_cost, notes, \
     is_active, created_by, created_at, updated_at";

pub struct OutsourcingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OutsourcingRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // BusinessPartner
    // ==========================================

    /// 新增 BP 及其参加项目（同一事务）
    pub fn insert_partner(&self, p: &BusinessPartner) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO business_partner ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                PARTNER_COLUMNS
            ),
            params![
                p.partner_id,
                p.name,
                p.email,
                p.phone,
                p.company,
                dec_to_sql(p.hourly_rate),
                p.notes,
                p.is_active,
                p.created_by,
                datetime_to_sql(p.created_at),
                datetime_to_sql(p.updated_at),
            ],
        )?;
        for project_id in &p.project_ids {
            tx.execute(
                "INSERT OR IGNORE INTO business_partner_project (partner_id, project_id) VALUES (?1, ?2)",
                params![p.partner_id, project_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn find_partner(&self, partner_id: &str) -> RepositoryResult<Option<BusinessPartner>> {
        let conn = self.get_conn()?;
        let partner = conn
            .query_row(
                &format!("SELECT {} FROM business_partner WHERE partner_id = ?1", PARTNER_COLUMNS),
                params![partner_id],
                map_partner,
            )
            .optional()?;
        let Some(mut partner) = partner else {
            return Ok(None);
        };
        partner.project_ids = load_partner_projects(&conn, partner_id)?;
        Ok(Some(partner))
    }

    pub fn list_active_partners(&self) -> RepositoryResult<Vec<BusinessPartner>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM business_partner WHERE is_active = 1 ORDER BY name",
            PARTNER_COLUMNS
        ))?;
        let mut partners = stmt
            .query_map([], map_partner)?
            .collect::<Result<Vec<_>, _>>()?;
        for partner in partners.iter_mut() {
            partner.project_ids = load_partner_projects(&conn, &partner.partner_id)?;
        }
        Ok(partners)
    }

    // ==========================================
    // OutsourcingCost
    // ==========================================

    pub fn insert_cost(&self, c: &OutsourcingCost) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                r#"INSERT INTO outsourcing_cost ({}) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15
                )"#,
                COST_COLUMNS
            ),
            params![
                c.outsourcing_id,
                c.year_month.to_string(),
                c.partner_id,
                c.project_id,
                c.ticket_id,
                c.status.as_str(),
                c.case_classification.as_str(),
                dec_to_sql(c.work_hours),
                dec_to_sql(c.hourly_rate),
                dec_to_sql(c.total_cost),
                c.notes,
                c.is_active,
                c.created_by,
                datetime_to_sql(c.created_at),
                datetime_to_sql(c.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_cost(&self, c: &OutsourcingCost) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE outsourcing_cost SET
                status = ?2, case_classification = ?3, work_hours = ?4,
                hourly_rate = ?5, total_cost = ?6, notes = ?7, is_active = ?8, updated_at = ?9
            WHERE outsourcing_id = ?1
            "#,
            params![
                c.outsourcing_id,
                c.status.as_str(),
                c.case_classification.as_str(),
                dec_to_sql(c.work_hours),
                dec_to_sql(c.hourly_rate),
                dec_to_sql(c.total_cost),
                c.notes,
                c.is_active,
                datetime_to_sql(c.updated_at),
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("OutsourcingCost", &c.outsourcing_id));
        }
        Ok(())
    }

    pub fn find_cost(&self, outsourcing_id: &str) -> RepositoryResult<Option<OutsourcingCost>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM outsourcing_cost WHERE outsourcing_id = ?1", COST_COLUMNS),
                params![outsourcing_id],
                map_cost,
            )
            .optional()?;
        Ok(result)
    }

    /// 指定年月的有效外注费
    pub fn list_costs_by_year_month(&self, year_month: YearMonth) -> RepositoryResult<Vec<OutsourcingCost>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM outsourcing_cost
            WHERE year_month = ?1 AND is_active = 1
            ORDER BY partner_id, project_id
            "#,
            COST_COLUMNS
        ))?;
        let rows = stmt.query_map(params![year_month.to_string()], map_cost)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 指定项目的有效外注费
    pub fn list_costs_by_project(&self, project_id: &str) -> RepositoryResult<Vec<OutsourcingCost>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM outsourcing_cost
            WHERE project_id = ?1 AND is_active = 1
            ORDER BY year_month
            "#,
            COST_COLUMNS
        ))?;
        let rows = stmt.query_map(params![project_id], map_cost)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn load_partner_projects(conn: &Connection, partner_id: &str) -> RepositoryResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT project_id FROM business_partner_project WHERE partner_id = ?1 ORDER BY project_id",
    )?;
    let rows = stmt.query_map(params![partner_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn map_partner(row: &Row) -> rusqlite::Result<BusinessPartner> {
    Ok(BusinessPartner {
        partner_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        company: row.get(4)?,
        hourly_rate: get_decimal(row, 5)?,
        project_ids: Vec::new(),
        notes: row.get(6)?,
        is_active: row.get(7)?,
        created_by: row.get(8)?,
        created_at: get_datetime(row, 9)?,
        updated_at: get_datetime(row, 10)?,
    })
}

fn map_cost(row: &Row) -> rusqlite::Result<OutsourcingCost> {
    Ok(OutsourcingCost {
        outsourcing_id: row.get(0)?,
        year_month: get_year_month(row, 1)?,
        partner_id: row.get(2)?,
        project_id: row.get(3)?,
        ticket_id: row.get(4)?,
        status: get_enum(row, 5, OutsourcingStatus::parse)?,
        case_classification: get_enum(row, 6, CaseClassification::parse)?,
        work_hours: get_decimal(row, 7)?,
        hourly_rate: get_decimal(row, 8)?,
        total_cost: get_decimal(row, 9)?,
        notes: row.get(10)?,
        is_active: row.get(11)?,
        created_by: row.get(12)?,
        created_at: get_datetime(row, 13)?,
        updated_at: get_datetime(row, 14)?,
    })
}
