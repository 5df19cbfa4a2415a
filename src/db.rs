// ==========================================
// 工数管理系统 - SQLite 连接初始化 / Schema
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表语句集中管理 (金额/工数以 TEXT 存储 Decimal, 日期以 ISO 字符串存储)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 工数日列名 day_01..day_31
pub fn day_column_names() -> Vec<String> {
    (1..=31).map(|d| format!("day_{:02}", d)).collect()
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 已存在的表不会被修改; 首次建库时写入 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(BASE_SCHEMA)?;

    let day_columns = day_column_names()
        .iter()
        .map(|c| format!("{} TEXT NOT NULL DEFAULT '0'", c))
        .collect::<Vec<_>>()
        .join(",\n            ");
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS workload (
            workload_id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL REFERENCES employee(employee_id) ON DELETE CASCADE,
            project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
            ticket_id TEXT REFERENCES project_ticket(ticket_id) ON DELETE SET NULL,
            year_month TEXT NOT NULL,
            {day_columns},
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS ux_workload_row
            ON workload(employee_id, project_id, IFNULL(ticket_id, ''), year_month);
        CREATE INDEX IF NOT EXISTS ix_workload_year_month ON workload(year_month);
        "#
    ))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    let version = read_schema_version(conn)?;
    if version != Some(CURRENT_SCHEMA_VERSION) {
        tracing::warn!(
            expected = CURRENT_SCHEMA_VERSION,
            actual = ?version,
            "schema_version 与代码不一致"
        );
    }
    Ok(())
}

const BASE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

-- ===== 组织 =====
CREATE TABLE IF NOT EXISTS department (
    department_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    manager_id TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS section (
    section_id TEXT PRIMARY KEY,
    department_id TEXT NOT NULL REFERENCES department(department_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    manager_id TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (department_id, name)
);

CREATE TABLE IF NOT EXISTS employee (
    employee_id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    email TEXT,
    department_id TEXT REFERENCES department(department_id) ON DELETE SET NULL,
    section_id TEXT REFERENCES section(section_id) ON DELETE SET NULL,
    employee_level TEXT,
    is_leader INTEGER NOT NULL DEFAULT 0,
    is_staff INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

-- ===== 项目 =====
CREATE TABLE IF NOT EXISTS project (
    project_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    department_id TEXT NOT NULL REFERENCES department(department_id),
    status TEXT NOT NULL DEFAULT '',
    classification TEXT NOT NULL DEFAULT '',
    client_name TEXT,
    order_date TEXT,
    planned_end_date TEXT,
    actual_end_date TEXT,
    budget_amount TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_ticket (
    ticket_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    case_classification TEXT NOT NULL DEFAULT 'development',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

-- ===== 成本主数据 =====
CREATE TABLE IF NOT EXISTS cost_master (
    cost_master_id TEXT PRIMARY KEY,
    department_id TEXT NOT NULL REFERENCES department(department_id) ON DELETE CASCADE,
    employee_level TEXT,
    billing_type TEXT NOT NULL,
    monthly_cost TEXT,
    daily_cost TEXT,
    hourly_cost TEXT,
    fixed_cost TEXT,
    monthly_billing TEXT,
    daily_billing TEXT,
    hourly_billing TEXT,
    fixed_billing TEXT,
    overtime_rate TEXT NOT NULL DEFAULT '1.25',
    holiday_rate TEXT NOT NULL DEFAULT '1.35',
    discount_rate TEXT NOT NULL DEFAULT '0',
    minimum_billing_amount TEXT,
    client_name TEXT,
    contract_type TEXT NOT NULL DEFAULT 'quasi_mandate',
    payment_terms TEXT,
    special_conditions TEXT,
    effective_from TEXT NOT NULL,
    effective_to TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_cost_master_key
    ON cost_master(department_id, IFNULL(employee_level, ''), billing_type, effective_from);

-- ===== 工数汇总 =====
CREATE TABLE IF NOT EXISTS workload_aggregation (
    aggregation_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
    ticket_id TEXT REFERENCES project_ticket(ticket_id) ON DELETE SET NULL,
    department_id TEXT,
    section_id TEXT,
    year_month TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'planning',
    case_classification TEXT NOT NULL DEFAULT 'development',
    estimate_date TEXT,
    order_date TEXT,
    planned_end_date TEXT,
    actual_end_date TEXT,
    inspection_date TEXT,
    available_amount TEXT NOT NULL DEFAULT '0',
    billing_amount_excluding_tax TEXT NOT NULL DEFAULT '0',
    outsourcing_cost_excluding_tax TEXT NOT NULL DEFAULT '0',
    estimated_workdays TEXT NOT NULL DEFAULT '0',
    used_workdays TEXT NOT NULL DEFAULT '0',
    newbie_workdays TEXT NOT NULL DEFAULT '0',
    unit_cost_per_month TEXT NOT NULL DEFAULT '75',
    billing_unit_cost_per_month TEXT NOT NULL DEFAULT '90',
    billing_destination TEXT,
    billing_contact TEXT,
    mub_manager_id TEXT,
    remarks TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_aggregation_row
    ON workload_aggregation(project_id, IFNULL(ticket_id, ''), year_month);

-- ===== 外包 =====
CREATE TABLE IF NOT EXISTS business_partner (
    partner_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    company TEXT,
    hourly_rate TEXT NOT NULL,
    notes TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS business_partner_project (
    partner_id TEXT NOT NULL REFERENCES business_partner(partner_id) ON DELETE CASCADE,
    project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
    PRIMARY KEY (partner_id, project_id)
);

CREATE TABLE IF NOT EXISTS outsourcing_cost (
    outsourcing_id TEXT PRIMARY KEY,
    year_month TEXT NOT NULL,
    partner_id TEXT NOT NULL REFERENCES business_partner(partner_id) ON DELETE CASCADE,
    project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
    ticket_id TEXT NOT NULL REFERENCES project_ticket(ticket_id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'not_started',
    case_classification TEXT NOT NULL DEFAULT 'development',
    work_hours TEXT NOT NULL DEFAULT '0',
    hourly_rate TEXT NOT NULL DEFAULT '0',
    total_cost TEXT NOT NULL DEFAULT '0',
    notes TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (year_month, partner_id, project_id, ticket_id)
);

-- ===== 报表导出 =====
CREATE TABLE IF NOT EXISTS report_export (
    export_id TEXT PRIMARY KEY,
    export_type TEXT NOT NULL,
    export_format TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    description TEXT,
    requested_by TEXT NOT NULL,
    requested_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    file_name TEXT NOT NULL,
    file_path TEXT,
    file_size INTEGER,
    filter_json TEXT NOT NULL DEFAULT '{}',
    error_message TEXT,
    is_public INTEGER NOT NULL DEFAULT 0,
    download_count INTEGER NOT NULL DEFAULT 0,
    expires_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_report_export_requested_by ON report_export(requested_by);

-- ===== 公司休日 =====
CREATE TABLE IF NOT EXISTS company_holiday (
    holiday_date TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let cols: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('workload') WHERE name LIKE 'day_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(cols, 31);
    }

    #[test]
    fn test_schema_version_absent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
