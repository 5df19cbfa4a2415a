// ==========================================
// 工数管理系统 - 报表导出任务
// ==========================================
// 状态机: pending → processing → completed | failed
// 文件名: {type}_{YYYYmmdd_HHMMSS}.{ext}, 有效期 7 天
// ==========================================

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{ExportFormat, ExportStatus, ExportType};

/// 默认保留天数
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportExport {
    pub export_id: String,
    pub export_type: ExportType,
    pub export_format: ExportFormat,
    pub status: ExportStatus,
    pub description: Option<String>,

    pub requested_by: String,
    pub requested_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,

    pub file_name: String,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub filter_json: serde_json::Value,
    pub error_message: Option<String>,

    pub is_public: bool,
    pub download_count: i64,
    pub expires_at: NaiveDateTime,
}

/// 状态转换错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("无效的状态转换: from={from} to={to}")]
pub struct InvalidTransition {
    pub from: ExportStatus,
    pub to: ExportStatus,
}

impl ReportExport {
    /// 新建导出请求 (pending)
    pub fn new(
        export_type: ExportType,
        export_format: ExportFormat,
        requested_by: impl Into<String>,
        filter_json: serde_json::Value,
        now: NaiveDateTime,
        retention_days: i64,
    ) -> Self {
        Self {
            export_id: uuid::Uuid::new_v4().to_string(),
            export_type,
            export_format,
            status: ExportStatus::Pending,
            description: None,
            requested_by: requested_by.into(),
            requested_at: now,
            started_at: None,
            completed_at: None,
            file_name: Self::build_file_name(export_type, export_format, now),
            file_path: None,
            file_size: None,
            filter_json,
            error_message: None,
            is_public: false,
            download_count: 0,
            expires_at: now + Duration::days(retention_days),
        }
    }

    /// 文件名: {type}_{YYYYmmdd_HHMMSS}.{ext}
    pub fn build_file_name(
        export_type: ExportType,
        export_format: ExportFormat,
        at: NaiveDateTime,
    ) -> String {
        format!(
            "{}_{}.{}",
            export_type.as_str(),
            at.format("%Y%m%d_%H%M%S"),
            export_format.extension()
        )
    }

    fn transition(&mut self, to: ExportStatus) -> Result<(), InvalidTransition> {
        let allowed = matches!(
            (self.status, to),
            (ExportStatus::Pending, ExportStatus::Processing)
                | (ExportStatus::Processing, ExportStatus::Completed)
                | (ExportStatus::Processing, ExportStatus::Failed)
        );
        if !allowed {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self, now: NaiveDateTime) -> Result<(), InvalidTransition> {
        self.transition(ExportStatus::Processing)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn complete(
        &mut self,
        file_path: String,
        file_size: i64,
        now: NaiveDateTime,
    ) -> Result<(), InvalidTransition> {
        self.transition(ExportStatus::Completed)?;
        self.file_path = Some(file_path);
        self.file_size = Some(file_size);
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, message: String, now: NaiveDateTime) -> Result<(), InvalidTransition> {
        self.transition(ExportStatus::Failed)?;
        self.error_message = Some(message);
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }

    /// 可下载: 已完成、有文件、未过期
    pub fn is_downloadable(&self, now: NaiveDateTime) -> bool {
        self.status == ExportStatus::Completed && self.file_path.is_some() && !self.is_expired(now)
    }

    /// 下载权限: 公开 / 本人 / 管理员
    pub fn can_download(&self, employee_id: &str, is_admin: bool) -> bool {
        self.is_public || is_admin || self.requested_by == employee_id
    }

    /// 处理耗时（秒）
    pub fn processing_seconds(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(s), Some(c)) => Some((c - s).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_new_export_file_name_and_expiry() {
        let e = ReportExport::new(
            ExportType::WorkloadAggregation,
            ExportFormat::Csv,
            "U1",
            json!({}),
            at(9, 30, 5),
            DEFAULT_RETENTION_DAYS,
        );
        assert_eq!(e.status, ExportStatus::Pending);
        assert_eq!(e.file_name, "workload_aggregation_20250415_093005.csv");
        assert_eq!(e.expires_at, at(9, 30, 5) + Duration::days(7));
    }

    #[test]
    fn test_state_machine() {
        let mut e = ReportExport::new(
            ExportType::UserWorkload,
            ExportFormat::Json,
            "U1",
            json!({}),
            at(9, 0, 0),
            DEFAULT_RETENTION_DAYS,
        );
        assert!(e.complete("x".into(), 1, at(9, 0, 1)).is_err());
        e.start(at(9, 0, 1)).unwrap();
        assert!(e.start(at(9, 0, 2)).is_err());
        e.complete("/tmp/x.json".into(), 10, at(9, 0, 4)).unwrap();
        assert_eq!(e.processing_seconds(), Some(3));
        assert!(e.fail("late".into(), at(9, 0, 5)).is_err());
        assert!(e.is_downloadable(at(10, 0, 0)));
        assert!(!e.is_downloadable(at(10, 0, 0) + Duration::days(8)));
    }

    #[test]
    fn test_can_download() {
        let e = ReportExport::new(
            ExportType::UserWorkload,
            ExportFormat::Csv,
            "U1",
            json!({}),
            at(9, 0, 0),
            DEFAULT_RETENTION_DAYS,
        );
        assert!(e.can_download("U1", false));
        assert!(!e.can_download("U2", false));
        assert!(e.can_download("U2", true));
    }
}
