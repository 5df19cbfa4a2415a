// ==========================================
// 工数管理系统 - 组织数据仓储
// ==========================================
// 表: department / section / employee
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::organization::{AccessScope, Department, Employee, Section};
use crate::domain::types::EmployeeLevel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{datetime_to_sql, get_datetime, get_opt_enum};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const EMPLOYEE_COLUMNS: &str = "employee_id, username, full_name, email, department_id, \
     section_id, employee_level, is_leader, is_staff, is_active, created_at";

// ==========================================
// OrganizationRepository
// ==========================================
pub struct OrganizationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrganizationRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 部
    // ==========================================

    pub fn insert_department(&self, d: &Department) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO department (
                department_id, name, description, manager_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                d.department_id,
                d.name,
                d.description,
                d.manager_id,
                d.is_active,
                datetime_to_sql(d.created_at),
                datetime_to_sql(d.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_department(&self, department_id: &str) -> RepositoryResult<Option<Department>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                r#"
                SELECT department_id, name, description, manager_id, is_active, created_at, updated_at
                FROM department WHERE department_id = ?1
                "#,
                params![department_id],
                map_department,
            )
            .optional()?;
        Ok(result)
    }

    pub fn list_active_departments(&self) -> RepositoryResult<Vec<Department>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT department_id, name, description, manager_id, is_active, created_at, updated_at
            FROM department WHERE is_active = 1 ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], map_department)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 课
    // ==========================================

    pub fn insert_section(&self, s: &Section) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO section (
                section_id, department_id, name, description, manager_id,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                s.section_id,
                s.department_id,
                s.name,
                s.description,
                s.manager_id,
                s.is_active,
                datetime_to_sql(s.created_at),
                datetime_to_sql(s.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_section(&self, section_id: &str) -> RepositoryResult<Option<Section>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                r#"
                SELECT section_id, department_id, name, description, manager_id,
                       is_active, created_at, updated_at
                FROM section WHERE section_id = ?1
                "#,
                params![section_id],
                map_section,
            )
            .optional()?;
        Ok(result)
    }

    /// 部下属的有效课（下拉联动用）
    pub fn list_sections_by_department(&self, department_id: &str) -> RepositoryResult<Vec<Section>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT section_id, department_id, name, description, manager_id,
                   is_active, created_at, updated_at
            FROM section
            WHERE department_id = ?1 AND is_active = 1
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map(params![department_id], map_section)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 社员
    // ==========================================

    pub fn insert_employee(&self, e: &Employee) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO employee ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                EMPLOYEE_COLUMNS
            ),
            params![
                e.employee_id,
                e.username,
                e.full_name,
                e.email,
                e.department_id,
                e.section_id,
                e.employee_level.map(|l| l.as_str()),
                e.is_leader,
                e.is_staff,
                e.is_active,
                datetime_to_sql(e.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_employee(&self, employee_id: &str) -> RepositoryResult<Option<Employee>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM employee WHERE employee_id = ?1", EMPLOYEE_COLUMNS),
                params![employee_id],
                map_employee,
            )
            .optional()?;
        Ok(result)
    }

    /// 按访问范围列出有效社员
    pub fn list_employees_in_scope(&self, scope: &AccessScope) -> RepositoryResult<Vec<Employee>> {
        let (clause, arg) = scope_clause(scope, "employee");
        let sql = format!(
            "SELECT {} FROM employee WHERE is_active = 1 AND {} ORDER BY username",
            EMPLOYEE_COLUMNS, clause
        );
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
            Some(id) => stmt.query_map(params![id], map_employee)?.collect::<Result<Vec<_>, _>>(),
            None => stmt.query_map([], map_employee)?.collect::<Result<Vec<_>, _>>(),
        };
        Ok(rows?)
    }
}

/// 访问范围 → SQL 条件 (以 employee 表别名为准)
///
/// # 返回
/// - (条件片段, 绑定参数 ?1)
pub fn scope_clause(scope: &AccessScope, alias: &str) -> (String, Option<String>) {
    match scope {
        AccessScope::All => ("1 = 1".to_string(), None),
        AccessScope::Department(id) => (format!("{}.department_id = ?1", alias), Some(id.clone())),
        AccessScope::Section(id) => (format!("{}.section_id = ?1", alias), Some(id.clone())),
        AccessScope::SelfOnly(id) => (format!("{}.employee_id = ?1", alias), Some(id.clone())),
    }
}

fn map_department(row: &Row) -> rusqlite::Result<Department> {
    Ok(Department {
        department_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        manager_id: row.get(3)?,
        is_active: row.get(4)?,
        created_at: get_datetime(row, 5)?,
        updated_at: get_datetime(row, 6)?,
    })
}

fn map_section(row: &Row) -> rusqlite::Result<Section> {
    Ok(Section {
        section_id: row.get(0)?,
        department_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        manager_id: row.get(4)?,
        is_active: row.get(5)?,
        created_at: get_datetime(row, 6)?,
        updated_at: get_datetime(row, 7)?,
    })
}

fn map_employee(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        employee_id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        department_id: row.get(4)?,
        section_id: row.get(5)?,
        employee_level: get_opt_enum(row, 6, EmployeeLevel::parse)?,
        is_leader: row.get(7)?,
        is_staff: row.get(8)?,
        is_active: row.get(9)?,
        created_at: get_datetime(row, 10)?,
    })
}
