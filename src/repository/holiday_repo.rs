// ==========================================
// 工数管理系统 - 公司休日仓储
// ==========================================
// 表: company_holiday (国民祝日由日历引擎按规则计算)
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{date_to_sql, get_date};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct HolidayRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HolidayRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记公司休日（已存在则更新名称）
    pub fn upsert(&self, date: NaiveDate, name: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO company_holiday (holiday_date, name) VALUES (?1, ?2)
            ON CONFLICT(holiday_date) DO UPDATE SET name = excluded.name
            "#,
            params![date_to_sql(date), name],
        )?;
        Ok(())
    }

    pub fn delete(&self, date: NaiveDate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM company_holiday WHERE holiday_date = ?1",
            params![date_to_sql(date)],
        )?;
        Ok(())
    }

    /// 全部公司休日
    pub fn list_all(&self) -> RepositoryResult<Vec<(NaiveDate, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT holiday_date, name FROM company_holiday ORDER BY holiday_date")?;
        let rows = stmt.query_map([], |row| Ok((get_date(row, 0)?, row.get::<_, String>(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
