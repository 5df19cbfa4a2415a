// ==========================================
// 工数管理系统 - 报表导出任务仓储
// ==========================================
// 表: report_export
// ==========================================

use crate::domain::report_export::ReportExport;
use crate::domain::types::{ExportFormat, ExportStatus, ExportType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    datetime_to_sql, get_datetime, get_enum, get_opt_datetime, opt_datetime_to_sql,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const COLUMNS: &str = "export_id, export_type, export_format, status, description, \
     requested_by, requested_at, started_at, completed_at, \
     file_name, file_path, file_size, filter_json, error_message, \
     is_public, download_count, expires_at";

pub struct ReportExportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReportExportRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, e: &ReportExport) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                r#"INSERT INTO report_export ({}) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17
                )"#,
                COLUMNS
            ),
            params![
                e.export_id,
                e.export_type.as_str(),
                e.export_format.as_str(),
                e.status.as_str(),
                e.description,
                e.requested_by,
                datetime_to_sql(e.requested_at),
                opt_datetime_to_sql(e.started_at),
                opt_datetime_to_sql(e.completed_at),
                e.file_name,
                e.file_path,
                e.file_size,
                e.filter_json.to_string(),
                e.error_message,
                e.is_public,
                e.download_count,
                datetime_to_sql(e.expires_at),
            ],
        )?;
        Ok(())
    }

    /// 保存状态迁移结果
    ///
    /// expected_status: 迁移前状态, 不一致时视为并发冲突
    pub fn save_transition(
        &self,
        e: &ReportExport,
        expected_status: ExportStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE report_export SET
                status = ?2, started_at = ?3, completed_at = ?4,
                file_path = ?5, file_size = ?6, error_message = ?7
            WHERE export_id = ?1 AND status = ?8
            "#,
            params![
                e.export_id,
                e.status.as_str(),
                opt_datetime_to_sql(e.started_at),
                opt_datetime_to_sql(e.completed_at),
                e.file_path,
                e.file_size,
                e.error_message,
                expected_status.as_str(),
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::StatusConflict {
                entity: "ReportExport",
                id: e.export_id.clone(),
                expected: expected_status.as_str().to_string(),
            });
        }
        Ok(())
    }

    pub fn increment_download_count(&self, export_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE report_export SET download_count = download_count + 1 WHERE export_id = ?1",
            params![export_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ReportExport", export_id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, export_id: &str) -> RepositoryResult<Option<ReportExport>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM report_export WHERE export_id = ?1", COLUMNS),
                params![export_id],
                map_export,
            )
            .optional()?;
        Ok(result)
    }

    /// 请求者的导出历史（新→旧）; requested_by 为 None 时返回全部
    pub fn list_by_requester(&self, requested_by: Option<&str>) -> RepositoryResult<Vec<ReportExport>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM report_export
            WHERE (?1 IS NULL OR requested_by = ?1)
            ORDER BY requested_at DESC
            "#,
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![requested_by], map_export)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn map_export(row: &Row) -> rusqlite::Result<ReportExport> {
    let filter_raw: String = row.get(12)?;
    let filter_json = serde_json::from_str(&filter_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ReportExport {
        export_id: row.get(0)?,
        export_type: get_enum(row, 1, ExportType::parse)?,
        export_format: get_enum(row, 2, ExportFormat::parse)?,
        status: get_enum(row, 3, ExportStatus::parse)?,
        description: row.get(4)?,
        requested_by: row.get(5)?,
        requested_at: get_datetime(row, 6)?,
        started_at: get_opt_datetime(row, 7)?,
        completed_at: get_opt_datetime(row, 8)?,
        file_name: row.get(9)?,
        file_path: row.get(10)?,
        file_size: row.get(11)?,
        filter_json,
        error_message: row.get(13)?,
        is_public: row.get(14)?,
        download_count: row.get(15)?,
        expires_at: get_datetime(row, 16)?,
    })
}
