// ==========================================
// 工数管理系统 - 报表导出引擎
// ==========================================
// 职责: 报表表格构建 + CSV(UTF-8 BOM)/JSON 输出 + 导出任务状态推进
// 状态: pending → processing → completed | failed
// ==========================================

use crate::domain::aggregation::WorkloadAggregation;
use crate::domain::report_export::{InvalidTransition, ReportExport};
use crate::domain::types::{ExportFormat, ExportStatus};
use crate::domain::units::hours_to_person_days;
use crate::domain::workload::Workload;
use crate::engine::project_summary::ProjectSummary;
use crate::repository::error::RepositoryError;
use crate::repository::report_export_repo::ReportExportRepository;
use crate::i18n;
use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV 输出失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON 输出失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("文件写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("数据读取失败: {0}")]
    Load(String),
}

// ==========================================
// ExportTable - 表格数据
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn render(&self, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => self.to_json(),
        }
    }

    /// CSV (UTF-8 BOM 付き, Excel 直接打开)
    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }

    /// JSON: 以表头为键的对象数组
    pub fn to_json(&self) -> Result<Vec<u8>, ExportError> {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .headers
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| Value::String(v.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect::<Vec<_>>();
        Ok(serde_json::to_vec_pretty(&records)?)
    }
}

/// 名称查找表 (id → 显示名)
#[derive(Debug, Clone, Default)]
pub struct ExportLookup {
    pub project_names: HashMap<String, String>,
    pub ticket_titles: HashMap<String, String>,
    pub section_names: HashMap<String, String>,
    pub employee_names: HashMap<String, String>,
}

impl ExportLookup {
    fn name(map: &HashMap<String, String>, id: Option<&str>) -> String {
        id.and_then(|id| map.get(id)).cloned().unwrap_or_default()
    }
}

fn fmt_dec(value: Decimal) -> String {
    value.normalize().to_string()
}

fn fmt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

// ==========================================
// 表格构建
// ==========================================

/// 工数集计报表
pub fn aggregation_table(rows: &[WorkloadAggregation], lookup: &ExportLookup) -> ExportTable {
    let mut table = ExportTable::new(&[
        "プロジェクト名", "案件名", "課名", "ステータス", "案件分類", "見積日", "受注日",
        "終了日（予定）", "終了日実績", "検収日", "使用可能金額（税別）", "請求金額（税別）",
        "外注費（税別）", "見積工数（人日）", "使用工数（人日）", "新入社員使用工数（人日）",
        "使用工数合計", "残工数", "残金額", "利益率", "仕掛中金額", "請求先", "MUB担当者", "作成日時",
    ]);
    for a in rows {
        table.rows.push(vec![
            ExportLookup::name(&lookup.project_names, Some(&a.project_id)),
            ExportLookup::name(&lookup.ticket_titles, a.ticket_id.as_deref()),
            ExportLookup::name(&lookup.section_names, a.section_id.as_deref()),
            a.status.display_name(),
            a.case_classification.display_name(),
            fmt_date(a.estimate_date),
            fmt_date(a.order_date),
            fmt_date(a.planned_end_date),
            fmt_date(a.actual_end_date),
            fmt_date(a.inspection_date),
            fmt_dec(a.available_amount),
            fmt_dec(a.billing_amount_excluding_tax),
            fmt_dec(a.outsourcing_cost_excluding_tax),
            fmt_dec(a.estimated_workdays),
            fmt_dec(a.used_workdays),
            fmt_dec(a.newbie_workdays),
            fmt_dec(a.total_used_workdays()),
            fmt_dec(a.remaining_workdays()),
            fmt_dec(a.remaining_amount().round_dp(0)),
            fmt_dec(a.profit_rate().round_dp(1)),
            fmt_dec(a.wip_amount().round_dp(0)),
            a.billing_destination.clone().unwrap_or_default(),
            ExportLookup::name(&lookup.employee_names, a.mub_manager_id.as_deref()),
            a.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}

/// 工数明细报表 (日别)
pub fn workload_detail_table(rows: &[Workload], lookup: &ExportLookup) -> ExportTable {
    let mut headers = vec!["年月".to_string(), "社員".into(), "プロジェクト".into(), "チケット".into()];
    headers.extend((1..=31).map(|d| format!("{}日", d)));
    headers.push("合計時間".into());
    headers.push("人日".into());

    let mut table = ExportTable {
        headers,
        rows: Vec::new(),
    };
    for w in rows {
        let mut row = vec![
            w.year_month.to_string(),
            ExportLookup::name(&lookup.employee_names, Some(&w.employee_id)),
            ExportLookup::name(&lookup.project_names, Some(&w.project_id)),
            ExportLookup::name(&lookup.ticket_titles, w.ticket_id.as_deref()),
        ];
        row.extend(w.days.iter().map(|h| fmt_dec(*h)));
        row.push(fmt_dec(w.total_hours()));
        row.push(fmt_dec(w.total_days()));
        table.rows.push(row);
    }
    table
}

/// 社员别工数报表 (社员 × 年月)
pub fn user_workload_table(rows: &[Workload], lookup: &ExportLookup) -> ExportTable {
    let mut table = ExportTable::new(&["社員", "年月", "合計時間", "人日", "チケット数"]);
    let mut grouped: BTreeMap<(String, String), (Decimal, HashSet<&str>)> = BTreeMap::new();
    for w in rows {
        let name = ExportLookup::name(&lookup.employee_names, Some(&w.employee_id));
        let entry = grouped.entry((name, w.year_month.to_string())).or_default();
        entry.0 += w.total_hours();
        if let Some(ticket) = w.ticket_id.as_deref() {
            entry.1.insert(ticket);
        }
    }
    for ((name, year_month), (hours, tickets)) in grouped {
        table.rows.push(vec![
            name,
            year_month,
            fmt_dec(hours),
            fmt_dec(hours_to_person_days(hours)),
            tickets.len().to_string(),
        ]);
    }
    table
}

/// 项目汇总报表 (项目 × 年月)
pub fn project_summary_table(summaries: &[ProjectSummary]) -> ExportTable {
    let mut table = ExportTable::new(&[
        "プロジェクト", "年月", "工数（時間）", "人日", "原価", "請求額", "外注費", "利益", "利益率",
    ]);
    for s in summaries {
        for m in s.months.iter().chain(std::iter::once(&s.totals)) {
            table.rows.push(vec![
                s.project_name.clone(),
                m.year_month.clone(),
                fmt_dec(m.total_hours),
                fmt_dec(m.person_days),
                fmt_dec(m.cost_yen),
                fmt_dec(m.billing_yen),
                fmt_dec(m.outsourcing_cost_yen),
                fmt_dec(m.profit_yen),
                fmt_dec(m.profit_rate),
            ]);
        }
    }
    table
}

// ==========================================
// ExportRunner - 导出任务执行器
// ==========================================
pub struct ExportRunner {
    repo: Arc<ReportExportRepository>,
    output_dir: PathBuf,
}

impl ExportRunner {
    pub fn new(repo: Arc<ReportExportRepository>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 执行导出任务
    ///
    /// load: 按任务内容读取表格数据
    /// 读取或写入失败时任务转为 failed 并返回最终状态
    #[instrument(skip(self, job, load), fields(export_id = %job.export_id))]
    pub fn run<F>(&self, mut job: ReportExport, load: F) -> Result<ReportExport, ExportError>
    where
        F: FnOnce(&ReportExport) -> Result<ExportTable, ExportError>,
    {
        job.start(now())?;
        self.repo.save_transition(&job, ExportStatus::Pending)?;
        tracing::info!(export_type = %job.export_type, "导出开始");

        match self.produce(&job, load) {
            Ok((path, size)) => {
                job.complete(path, size, now())?;
                self.repo.save_transition(&job, ExportStatus::Processing)?;
                tracing::info!(
                    file = %job.file_name,
                    size,
                    seconds = job.processing_seconds().unwrap_or(0),
                    "导出完成"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "导出失败");
                job.fail(e.to_string(), now())?;
                self.repo.save_transition(&job, ExportStatus::Processing)?;
            }
        }
        Ok(job)
    }

    fn produce<F>(&self, job: &ReportExport, load: F) -> Result<(String, i64), ExportError>
    where
        F: FnOnce(&ReportExport) -> Result<ExportTable, ExportError>,
    {
        let table = load(job)?;
        let bytes = table.render(job.export_format)?;
        std::fs::create_dir_all(&self.output_dir)?;
        // 同一秒内的同类导出文件名相同, 磁盘上以 export_id 区分
        let path = self
            .output_dir
            .join(format!("{}_{}", job.export_id, job.file_name));
        std::fs::write(&path, &bytes)?;
        Ok((path.to_string_lossy().into_owned(), bytes.len() as i64))
    }

    /// 读取已完成的导出文件
    pub fn read_file(&self, job: &ReportExport) -> Result<Vec<u8>, ExportError> {
        let path = job.file_path.as_deref().ok_or_else(|| {
            ExportError::Load(i18n::t("export.not_downloadable"))
        })?;
        Ok(std::fs::read(path)?)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
