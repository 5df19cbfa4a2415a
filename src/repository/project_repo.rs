// ==========================================
// 工数管理系统 - 项目数据仓储
// ==========================================
// 表: project / project_ticket
// ==========================================

use crate::domain::project::{Project, ProjectTicket};
use crate::domain::types::CaseClassification;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    datetime_to_sql, get_datetime, get_enum, get_opt_date, get_opt_decimal, opt_date_to_sql,
    opt_dec_to_sql,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const PROJECT_COLUMNS: &str = "project_id, name, department_id, status, classification, \
     client_name, order_date, planned_end_date, actual_end_date, budget_amount, is_active, created_at";

const TICKET_COLUMNS: &str =
    "ticket_id, project_id, title, case_classification, is_active, created_at";

pub struct ProjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert_project(&self, p: &Project) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO project ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                PROJECT_COLUMNS
            ),
            params![
                p.project_id,
                p.name,
                p.department_id,
                p.status,
                p.classification,
                p.client_name,
                opt_date_to_sql(p.order_date),
                opt_date_to_sql(p.planned_end_date),
                opt_date_to_sql(p.actual_end_date),
                opt_dec_to_sql(p.budget_amount),
                p.is_active,
                datetime_to_sql(p.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_project(&self, project_id: &str) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM project WHERE project_id = ?1", PROJECT_COLUMNS),
                params![project_id],
                map_project,
            )
            .optional()?;
        Ok(result)
    }

    pub fn list_active_projects(&self) -> RepositoryResult<Vec<Project>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM project WHERE is_active = 1 ORDER BY name",
            PROJECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_project)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_ticket(&self, t: &ProjectTicket) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO project_ticket ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                TICKET_COLUMNS
            ),
            params![
                t.ticket_id,
                t.project_id,
                t.title,
                t.case_classification.as_str(),
                t.is_active,
                datetime_to_sql(t.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_ticket(&self, ticket_id: &str) -> RepositoryResult<Option<ProjectTicket>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM project_ticket WHERE ticket_id = ?1", TICKET_COLUMNS),
                params![ticket_id],
                map_ticket,
            )
            .optional()?;
        Ok(result)
    }

    /// 项目下的有效工单（下拉联动用）
    pub fn list_tickets_by_project(&self, project_id: &str) -> RepositoryResult<Vec<ProjectTicket>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM project_ticket WHERE project_id = ?1 AND is_active = 1 ORDER BY title",
            TICKET_COLUMNS
        ))?;
        let rows = stmt.query_map(params![project_id], map_ticket)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn map_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        project_id: row.get(0)?,
        name: row.get(1)?,
        department_id: row.get(2)?,
        status: row.get(3)?,
        classification: row.get(4)?,
        client_name: row.get(5)?,
        order_date: get_opt_date(row, 6)?,
        planned_end_date: get_opt_date(row, 7)?,
        actual_end_date: get_opt_date(row, 8)?,
        budget_amount: get_opt_decimal(row, 9)?,
        is_active: row.get(10)?,
        created_at: get_datetime(row, 11)?,
    })
}

fn map_ticket(row: &Row) -> rusqlite::Result<ProjectTicket> {
    Ok(ProjectTicket {
        ticket_id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        case_classification: get_enum(row, 3, CaseClassification::parse)?,
        is_active: row.get(4)?,
        created_at: get_datetime(row, 5)?,
    })
}
