// ==========================================
// 工数管理系统 - 工数汇总仓储
// ==========================================
// 表: workload_aggregation
// 唯一键: (project_id, ticket_id, year_month)
// ==========================================

use crate::domain::aggregation::WorkloadAggregation;
use crate::domain::types::{AggregationStatus, CaseClassification};
use crate::domain::workload::YearMonth;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    datetime_to_sql, dec_to_sql, get_datetime, get_decimal, get_enum, get_opt_date,
    get_year_month, opt_date_to_sql,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const COLUMNS: &str = "a.aggregation_id, a.project_id, a.ticket_id, a.department_id, a.section_id, \
     a.year_month, a.status, a.case_classification, \
     a.estimate_date, a.order_date, a.planned_end_date, a.actual_end_date, a.inspection_date, \
     a.available_amount, a.billing_amount_excluding_tax, a.outsourcing_cost_excluding_tax, \
     a.estimated_workdays, a.used_workdays, a.newbie_workdays, \
     a.unit_cost_per_month, a.billing_unit_cost_per_month, \
     a.billing_destination, a.billing_contact, a.mub_manager_id, a.remarks, \
     a.created_by, a.created_at, a.updated_at";

/// 一览过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationFilter {
    pub project_name: Option<String>, // 部分一致
    pub ticket_id: Option<String>,
    pub section_id: Option<String>,
    pub status: Option<AggregationStatus>,
    pub case_classification: Option<CaseClassification>,
    pub mub_manager_id: Option<String>,
    pub year_month: Option<YearMonth>,
    pub search: Option<String>, // 项目名 / 工单名 / 备注
}

pub struct AggregationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AggregationRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, a: &WorkloadAggregation) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let columns = COLUMNS.replace("a.", "");
        conn.execute(
            &format!(
                r#"INSERT INTO workload_aggregation ({}) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28
                )"#,
                columns
            ),
            params_from_iter(to_values(a)),
        )?;
        Ok(())
    }

    /// 全字段更新
    pub fn update(&self, a: &WorkloadAggregation) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let assignments = COLUMNS
            .replace("a.", "")
            .split(',')
            .map(str::trim)
            .enumerate()
            .skip(1)
            .filter(|(_, c)| *c != "created_by" && *c != "created_at")
            .map(|(i, c)| format!("{} = ?{}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let affected = conn.execute(
            &format!(
                "UPDATE workload_aggregation SET {} WHERE aggregation_id = ?1",
                assignments
            ),
            params_from_iter(to_values(a)),
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("WorkloadAggregation", &a.aggregation_id));
        }
        Ok(())
    }

    pub fn delete(&self, aggregation_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM workload_aggregation WHERE aggregation_id = ?1",
            params![aggregation_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("WorkloadAggregation", aggregation_id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, aggregation_id: &str) -> RepositoryResult<Option<WorkloadAggregation>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM workload_aggregation a WHERE a.aggregation_id = ?1",
                    COLUMNS
                ),
                params![aggregation_id],
                map_aggregation,
            )
            .optional()?;
        Ok(result)
    }

    /// 过滤一览（受注日降序, 创建时间降序）
    pub fn list(&self, filter: &AggregationFilter) -> RepositoryResult<Vec<WorkloadAggregation>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        let mut push = |cond: &str, value: String| {
            values.push(Value::Text(value));
            conditions.push(cond.replace("{}", &format!("?{}", values.len())));
        };

        if let Some(name) = filter.project_name.as_deref().filter(|s| !s.trim().is_empty()) {
            push("p.name LIKE {}", format!("%{}%", name.trim()));
        }
        if let Some(ticket_id) = &filter.ticket_id {
            push("a.ticket_id = {}", ticket_id.clone());
        }
        if let Some(section_id) = &filter.section_id {
            push("a.section_id = {}", section_id.clone());
        }
        if let Some(status) = filter.status {
            push("a.status = {}", status.as_str().to_string());
        }
        if let Some(cls) = filter.case_classification {
            push("a.case_classification = {}", cls.as_str().to_string());
        }
        if let Some(manager) = &filter.mub_manager_id {
            push("a.mub_manager_id = {}", manager.clone());
        }
        if let Some(ym) = filter.year_month {
            push("a.year_month = {}", ym.to_string());
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let like = format!("%{}%", term.trim());
            values.push(Value::Text(like));
            let n = values.len();
            conditions.push(format!(
                "(p.name LIKE ?{n} OR IFNULL(t.title, '') LIKE ?{n} OR IFNULL(a.remarks, '') LIKE ?{n})"
            ));
        }

        let where_clause = if conditions.is_empty() {
            "1 = 1".to_string()
        } else {
            conditions.join(" AND ")
        };
        let sql = format!(
            r#"
            SELECT {}
            FROM workload_aggregation a
            JOIN project p ON p.project_id = a.project_id
            LEFT JOIN project_ticket t ON t.ticket_id = a.ticket_id
            WHERE {}
            ORDER BY a.order_date IS NULL, a.order_date DESC, a.created_at DESC
            "#,
            COLUMNS, where_clause
        );
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), map_aggregation)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<WorkloadAggregation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM workload_aggregation a WHERE a.project_id = ?1 ORDER BY a.year_month",
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![project_id], map_aggregation)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<WorkloadAggregation>> {
        self.list(&AggregationFilter::default())
    }

    /// 最近更新的汇总行
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<WorkloadAggregation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM workload_aggregation a ORDER BY a.updated_at DESC LIMIT ?1",
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], map_aggregation)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn to_values(a: &WorkloadAggregation) -> Vec<Value> {
    let text = |s: &Option<String>| s.clone().map(Value::Text).unwrap_or(Value::Null);
    let date = |d| opt_date_to_sql(d).map(Value::Text).unwrap_or(Value::Null);
    vec![
        Value::Text(a.aggregation_id.clone()),
        Value::Text(a.project_id.clone()),
        text(&a.ticket_id),
        text(&a.department_id),
        text(&a.section_id),
        Value::Text(a.year_month.to_string()),
        Value::Text(a.status.as_str().to_string()),
        Value::Text(a.case_classification.as_str().to_string()),
        date(a.estimate_date),
        date(a.order_date),
        date(a.planned_end_date),
        date(a.actual_end_date),
        date(a.inspection_date),
        Value::Text(dec_to_sql(a.available_amount)),
        Value::Text(dec_to_sql(a.billing_amount_excluding_tax)),
        Value::Text(dec_to_sql(a.outsourcing_cost_excluding_tax)),
        Value::Text(dec_to_sql(a.estimated_workdays)),
        Value::Text(dec_to_sql(a.used_workdays)),
        Value::Text(dec_to_sql(a.newbie_workdays)),
        Value::Text(dec_to_sql(a.unit_cost_per_month)),
        Value::Text(dec_to_sql(a.billing_unit_cost_per_month)),
        text(&a.billing_destination),
        text(&a.billing_contact),
        text(&a.mub_manager_id),
        text(&a.remarks),
        text(&a.created_by),
        Value::Text(datetime_to_sql(a.created_at)),
        Value::Text(datetime_to_sql(a.updated_at)),
    ]
}

fn map_aggregation(row: &Row) -> rusqlite::Result<WorkloadAggregation> {
    Ok(WorkloadAggregation {
        aggregation_id: row.get(0)?,
        project_id: row.get(1)?,
        ticket_id: row.get(2)?,
        department_id: row.get(3)?,
        section_id: row.get(4)?,
        year_month: get_year_month(row, 5)?,
        status: get_enum(row, 6, AggregationStatus::parse)?,
        case_classification: get_enum(row, 7, CaseClassification::parse)?,
        estimate_date: get_opt_date(row, 8)?,
        order_date: get_opt_date(row, 9)?,
        planned_end_date: get_opt_date(row, 10)?,
        actual_end_date: get_opt_date(row, 11)?,
        inspection_date: get_opt_date(row, 12)?,
        available_amount: get_decimal(row, 13)?,
        billing_amount_excluding_tax: get_decimal(row, 14)?,
        outsourcing_cost_excluding_tax: get_decimal(row, 15)?,
        estimated_workdays: get_decimal(row, 16)?,
        used_workdays: get_decimal(row, 17)?,
        newbie_workdays: get_decimal(row, 18)?,
        unit_cost_per_month: get_decimal(row, 19)?,
        billing_unit_cost_per_month: get_decimal(row, 20)?,
        billing_destination: row.get(21)?,
        billing_contact: row.get(22)?,
        mub_manager_id: row.get(23)?,
        remarks: row.get(24)?,
        created_by: row.get(25)?,
        created_at: get_datetime(row, 26)?,
        updated_at: get_datetime(row, 27)?,
    })
}
