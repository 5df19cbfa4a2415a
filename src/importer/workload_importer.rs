// ==========================================
// 工数管理系统 - 工数一括导入
// ==========================================
// 列: employee_id, project_id, ticket_id, year_month, day_01..day_31
// 流程: 解析 → 行校验 (社员/项目/工单/权限/工数) → 按唯一键 upsert
// 行错误收集后继续处理, 不中断整个文件
// ==========================================

use crate::domain::organization::Viewer;
use crate::domain::workload::{Workload, YearMonth, DAY_COLUMNS};
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use crate::repository::{OrganizationRepository, ProjectRepository, WorkloadRepository};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 必需列
pub const REQUIRED_COLUMNS: [&str; 3] = ["employee_id", "project_id", "year_month"];

/// 行级错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// 导入结果摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub total_rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
    pub elapsed_ms: u64,
}

pub struct WorkloadImporter {
    organization_repo: Arc<OrganizationRepository>,
    project_repo: Arc<ProjectRepository>,
    workload_repo: Arc<WorkloadRepository>,
    parser: UniversalFileParser,
}

impl WorkloadImporter {
    pub fn new(
        organization_repo: Arc<OrganizationRepository>,
        project_repo: Arc<ProjectRepository>,
        workload_repo: Arc<WorkloadRepository>,
    ) -> Self {
        Self {
            organization_repo,
            project_repo,
            workload_repo,
            parser: UniversalFileParser,
        }
    }

    /// 从文件导入（.csv / .xlsx）
    #[instrument(skip(self, file_path, viewer), fields(viewer = %viewer.employee_id))]
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P, viewer: &Viewer) -> ImportResult<ImportSummary> {
        let path = file_path.as_ref();
        info!(file_path = %path.display(), "开始导入工数数据");
        let records = self.parser.parse(path)?;
        self.import_records(&records, viewer)
    }

    /// 导入已解析的行
    ///
    /// # 返回
    /// - 文件级错误（缺列、数据库故障）返回 Err
    /// - 行级错误记录在 ImportSummary.errors 中
    pub fn import_records(&self, records: &[RawRecord], viewer: &Viewer) -> ImportResult<ImportSummary> {
        let start = Instant::now();
        let batch_id = Uuid::new_v4().to_string();

        if let Some(first) = records.first() {
            for column in REQUIRED_COLUMNS {
                if !first.fields.contains_key(column) {
                    return Err(ImportError::MissingColumn(column.to_string()));
                }
            }
        }

        let mut summary = ImportSummary {
            batch_id: batch_id.clone(),
            total_rows: records.len(),
            inserted: 0,
            updated: 0,
            skipped: 0,
            errors: Vec::new(),
            elapsed_ms: 0,
        };

        for record in records {
            match self.build_row(record, viewer)? {
                Ok(workload) => {
                    // 同一文件内重复键: 后出现的行覆盖先出现的行
                    if self.workload_repo.upsert_days(&workload)? {
                        summary.inserted += 1;
                    } else {
                        summary.updated += 1;
                    }
                }
                Err(message) => {
                    debug!(line = record.line, %message, "跳过无效行");
                    summary.skipped += 1;
                    summary.errors.push(RowError {
                        line: record.line,
                        message,
                    });
                }
            }
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        if summary.errors.is_empty() {
            info!(
                batch_id = %batch_id,
                inserted = summary.inserted,
                updated = summary.updated,
                "工数导入完成"
            );
        } else {
            warn!(
                batch_id = %batch_id,
                inserted = summary.inserted,
                updated = summary.updated,
                skipped = summary.skipped,
                "工数导入完成 (含错误行)"
            );
        }
        Ok(summary)
    }

    /// 单行校验并构建 Workload
    ///
    /// 外层 Result 为数据库错误, 内层为行错误消息
    fn build_row(&self, record: &RawRecord, viewer: &Viewer) -> ImportResult<Result<Workload, String>> {
        let employee_id = match required(record, "employee_id") {
            Ok(v) => v,
            Err(msg) => return Ok(Err(msg)),
        };
        let project_id = match required(record, "project_id") {
            Ok(v) => v,
            Err(msg) => return Ok(Err(msg)),
        };
        let year_month_raw = match required(record, "year_month") {
            Ok(v) => v,
            Err(msg) => return Ok(Err(msg)),
        };
        let Ok(year_month) = YearMonth::from_str(year_month_raw) else {
            return Ok(Err(t_with_args(
                "import.invalid_year_month",
                &[("value", year_month_raw)],
            )));
        };

        let Some(employee) = self.organization_repo.find_employee(employee_id)? else {
            return Ok(Err(t_with_args("import.employee_not_found", &[("id", employee_id)])));
        };
        if !viewer.can_edit_workload_of(&employee) {
            return Ok(Err(t("workload.permission_denied")));
        }
        let Some(project) = self.project_repo.find_project(project_id)? else {
            return Ok(Err(t_with_args("import.project_not_found", &[("id", project_id)])));
        };
        if !project.is_active {
            return Ok(Err(t_with_args(
                "workload.project_inactive",
                &[("name", project.name.as_str())],
            )));
        }

        let ticket_id = record.get("ticket_id");
        if let Some(ticket_id) = ticket_id {
            match self.project_repo.find_ticket(ticket_id)? {
                None => {
                    return Ok(Err(t_with_args("import.ticket_not_found", &[("id", ticket_id)])));
                }
                Some(ticket) if ticket.project_id != project_id => {
                    return Ok(Err(t_with_args(
                        "import.ticket_mismatch",
                        &[("ticket", ticket_id), ("project", project_id)],
                    )));
                }
                Some(_) => {}
            }
        }

        let mut workload = Workload::new(
            employee_id,
            project_id,
            ticket_id.map(str::to_string),
            year_month,
        );
        for day in 1..=DAY_COLUMNS as u32 {
            let column = format!("day_{:02}", day);
            let hours = match parse_hours(record.get(&column)) {
                Ok(h) => h,
                Err(raw) => {
                    return Ok(Err(t_with_args(
                        "import.invalid_hours",
                        &[("column", column.as_str()), ("value", raw.as_str())],
                    )));
                }
            };
            if let Err(e) = workload.set_day_value(day, hours) {
                return Ok(Err(format!("{}: {}", column, e)));
            }
        }
        Ok(Ok(workload))
    }
}

fn required<'a>(record: &'a RawRecord, field: &str) -> Result<&'a str, String> {
    record
        .get(field)
        .ok_or_else(|| t_with_args("import.missing_field", &[("field", field)]))
}

/// 空值视为 0
fn parse_hours(raw: Option<&str>) -> Result<Decimal, String> {
    match raw {
        None => Ok(Decimal::ZERO),
        Some(v) => Decimal::from_str(v)
            .or_else(|_| Decimal::from_scientific(v))
            .map_err(|_| v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_hours(None), Ok(Decimal::ZERO));
        assert_eq!(parse_hours(Some("7.5")), Ok(dec!(7.5)));
        assert_eq!(parse_hours(Some("8")), Ok(dec!(8)));
        assert_eq!(parse_hours(Some("abc")), Err("abc".to_string()));
    }
}
