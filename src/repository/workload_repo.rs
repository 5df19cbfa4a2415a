// ==========================================
// 工数管理系统 - 工数数据仓储
// ==========================================
// 表: workload (day_01..day_31)
// 唯一键: (employee_id, project_id, ticket_id, year_month)
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::day_column_names;
use crate::domain::organization::AccessScope;
use crate::domain::workload::{Workload, YearMonth, DAY_COLUMNS};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::organization_repo::scope_clause;
use crate::repository::row_utils::{
    datetime_to_sql, dec_to_sql, get_datetime, get_decimal, get_year_month, placeholders,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

/// SELECT 列 (带表别名 w)
fn select_columns() -> String {
    let days = day_column_names()
        .iter()
        .map(|c| format!("w.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "w.workload_id, w.employee_id, w.project_id, w.ticket_id, w.year_month, {}, w.created_at, w.updated_at",
        days
    )
}

pub struct WorkloadRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkloadRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增工数行
    pub fn insert(&self, w: &Workload) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_row(&conn, w)
    }

    pub fn find_by_id(&self, workload_id: &str) -> RepositoryResult<Option<Workload>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM workload w WHERE w.workload_id = ?1", select_columns());
        let result = conn
            .query_row(&sql, params![workload_id], map_workload)
            .optional()?;
        Ok(result)
    }

    /// 按唯一键查询
    pub fn find_by_key(
        &self,
        employee_id: &str,
        project_id: &str,
        ticket_id: Option<&str>,
        year_month: YearMonth,
    ) -> RepositoryResult<Option<Workload>> {
        let conn = self.get_conn()?;
        find_by_key_with(&conn, employee_id, project_id, ticket_id, year_month)
    }

    /// 更新单日工数
    ///
    /// # 参数
    /// - day: 1..=31 (调用方已校验)
    pub fn update_day(
        &self,
        workload_id: &str,
        day: u32,
        hours: Decimal,
        updated_at: chrono::NaiveDateTime,
    ) -> RepositoryResult<()> {
        if !(1..=DAY_COLUMNS as u32).contains(&day) {
            return Err(RepositoryError::DayOutOfRange(day));
        }
        let conn = self.get_conn()?;
        let sql = format!(
            "UPDATE workload SET day_{:02} = ?1, updated_at = ?2 WHERE workload_id = ?3",
            day
        );
        let affected = conn.execute(
            &sql,
            params![dec_to_sql(hours), datetime_to_sql(updated_at), workload_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Workload", workload_id));
        }
        Ok(())
    }

    /// 按唯一键 upsert 全部日列（导入用）
    ///
    /// # 返回
    /// - true: 新增; false: 更新已有行
    pub fn upsert_days(&self, w: &Workload) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let existing = find_by_key_with(
            &conn,
            &w.employee_id,
            &w.project_id,
            w.ticket_id.as_deref(),
            w.year_month,
        )?;
        match existing {
            None => {
                insert_row(&conn, w)?;
                Ok(true)
            }
            Some(current) => {
                let assignments = day_column_names()
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{} = ?{}", c, i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE workload SET {}, updated_at = ?{} WHERE workload_id = ?{}",
                    assignments,
                    DAY_COLUMNS + 1,
                    DAY_COLUMNS + 2
                );
                let mut values: Vec<Value> =
                    w.days.iter().map(|d| Value::Text(dec_to_sql(*d))).collect();
                values.push(Value::Text(datetime_to_sql(w.updated_at)));
                values.push(Value::Text(current.workload_id));
                conn.execute(&sql, params_from_iter(values))?;
                Ok(false)
            }
        }
    }

    pub fn delete(&self, workload_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM workload WHERE workload_id = ?1", params![workload_id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Workload", workload_id));
        }
        Ok(())
    }

    /// 指定年月、访问范围内的工数行
    ///
    /// 排序: 部 / 课 / 社员 / 项目 / 工单
    pub fn list_by_year_month_in_scope(
        &self,
        year_month: YearMonth,
        scope: &AccessScope,
    ) -> RepositoryResult<Vec<Workload>> {
        let (clause, arg) = scope_clause(scope, "e");
        let year_month_param = if arg.is_some() { "?2" } else { "?1" };
        let sql = format!(
            r#"
            SELECT {}
            FROM workload w
            JOIN employee e ON e.employee_id = w.employee_id
            LEFT JOIN department d ON d.department_id = e.department_id
            LEFT JOIN section s ON s.section_id = e.section_id
            JOIN project p ON p.project_id = w.project_id
            LEFT JOIN project_ticket t ON t.ticket_id = w.ticket_id
            WHERE {} AND w.year_month = {}
            ORDER BY d.name, s.name, e.username, p.name, t.title
            "#,
            select_columns(),
            clause,
            year_month_param
        );
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let ym = year_month.to_string();
        let rows = match arg {
            Some(id) => stmt
                .query_map(params![id, ym], map_workload)?
                .collect::<Result<Vec<_>, _>>(),
            None => stmt
                .query_map(params![ym], map_workload)?
                .collect::<Result<Vec<_>, _>>(),
        };
        Ok(rows?)
    }

    /// 指定工单的全部工数行
    pub fn list_by_ticket(&self, ticket_id: &str) -> RepositoryResult<Vec<Workload>> {
        self.query_list(
            "w.ticket_id = ?1 ORDER BY w.year_month, w.employee_id",
            vec![Value::Text(ticket_id.to_string())],
        )
    }

    /// 指定项目的全部工数行
    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<Workload>> {
        self.query_list(
            "w.project_id = ?1 ORDER BY w.year_month, w.employee_id",
            vec![Value::Text(project_id.to_string())],
        )
    }

    /// 指定社员的全部工数行
    pub fn list_by_employee(&self, employee_id: &str) -> RepositoryResult<Vec<Workload>> {
        self.query_list(
            "w.employee_id = ?1 ORDER BY w.year_month, w.project_id",
            vec![Value::Text(employee_id.to_string())],
        )
    }

    /// 多个年月的工数行
    pub fn list_by_year_months(&self, months: &[YearMonth]) -> RepositoryResult<Vec<Workload>> {
        if months.is_empty() {
            return Ok(Vec::new());
        }
        let clause = format!(
            "w.year_month IN ({}) ORDER BY w.year_month, w.employee_id",
            placeholders(1, months.len())
        );
        let values = months.iter().map(|m| Value::Text(m.to_string())).collect();
        self.query_list(&clause, values)
    }

    /// 最近更新的工数行
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<Workload>> {
        self.query_list(
            "1 = 1 ORDER BY w.updated_at DESC LIMIT ?1",
            vec![Value::Integer(limit as i64)],
        )
    }

    /// 工数行总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM workload", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn query_list(&self, where_and_order: &str, values: Vec<Value>) -> RepositoryResult<Vec<Workload>> {
        let sql = format!(
            "SELECT {} FROM workload w WHERE {}",
            select_columns(),
            where_and_order
        );
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), map_workload)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn insert_row(conn: &Connection, w: &Workload) -> RepositoryResult<()> {
    let columns = format!(
        "workload_id, employee_id, project_id, ticket_id, year_month, {}, created_at, updated_at",
        day_column_names().join(", ")
    );
    let sql = format!(
        "INSERT INTO workload ({}) VALUES ({})",
        columns,
        placeholders(1, DAY_COLUMNS + 7)
    );
    let mut values: Vec<Value> = vec![
        Value::Text(w.workload_id.clone()),
        Value::Text(w.employee_id.clone()),
        Value::Text(w.project_id.clone()),
        w.ticket_id.clone().map(Value::Text).unwrap_or(Value::Null),
        Value::Text(w.year_month.to_string()),
    ];
    values.extend(w.days.iter().map(|d| Value::Text(dec_to_sql(*d))));
    values.push(Value::Text(datetime_to_sql(w.created_at)));
    values.push(Value::Text(datetime_to_sql(w.updated_at)));
    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

fn find_by_key_with(
    conn: &Connection,
    employee_id: &str,
    project_id: &str,
    ticket_id: Option<&str>,
    year_month: YearMonth,
) -> RepositoryResult<Option<Workload>> {
    let sql = format!(
        r#"
        SELECT {} FROM workload w
        WHERE w.employee_id = ?1 AND w.project_id = ?2
          AND IFNULL(w.ticket_id, '') = IFNULL(?3, '')
          AND w.year_month = ?4
        "#,
        select_columns()
    );
    let result = conn
        .query_row(
            &sql,
            params![employee_id, project_id, ticket_id, year_month.to_string()],
            map_workload,
        )
        .optional()?;
    Ok(result)
}

fn map_workload(row: &Row) -> rusqlite::Result<Workload> {
    let mut days = [Decimal::ZERO; DAY_COLUMNS];
    for (i, slot) in days.iter_mut().enumerate() {
        *slot = get_decimal(row, 5 + i)?;
    }
    Ok(Workload {
        workload_id: row.get(0)?,
        employee_id: row.get(1)?,
        project_id: row.get(2)?,
        ticket_id: row.get(3)?,
        year_month: get_year_month(row, 4)?,
        days,
        created_at: get_datetime(row, 5 + DAY_COLUMNS)?,
        updated_at: get_datetime(row, 6 + DAY_COLUMNS)?,
    })
}
