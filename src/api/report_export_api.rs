// ==========================================
// 工数管理系统 - 报表导出 API
// ==========================================
// 职责: 导出请求登记 (pending), 任务执行, 历史一览, 文件下载
// 下载权限: 公开 / 请求者本人 / 管理员
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::dashboard_api::DashboardApi;
use crate::api::error::{ApiError, ApiResult};
use crate::api::workload_api::current_year_month;
use crate::config::ConfigManager;
use crate::domain::organization::{AccessScope, Viewer};
use crate::domain::report_export::ReportExport;
use crate::domain::types::{ExportFormat, ExportType};
use crate::engine::export::{
    aggregation_table, project_summary_table, user_workload_table, workload_detail_table,
    ExportError, ExportLookup, ExportRunner, ExportTable,
};
use crate::i18n::t;
use crate::repository::{
    AggregationFilter, AggregationRepository, OrganizationRepository, ProjectRepository,
    ReportExportRepository, WorkloadRepository,
};

/// 导出条件（随任务以 JSON 保存）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportFilter {
    #[serde(flatten)]
    pub aggregation: AggregationFilter,
    pub project_id: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub export_type: ExportType,
    #[serde(default = "default_format")]
    pub export_format: ExportFormat,
    #[serde(default)]
    pub filter: ExportFilter,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

fn default_format() -> ExportFormat {
    ExportFormat::Csv
}

/// 下载内容
#[derive(Debug, Clone)]
pub struct DownloadPayload {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct ReportExportApi {
    report_export_repo: Arc<ReportExportRepository>,
    aggregation_repo: Arc<AggregationRepository>,
    workload_repo: Arc<WorkloadRepository>,
    organization_repo: Arc<OrganizationRepository>,
    project_repo: Arc<ProjectRepository>,
    dashboard_api: Arc<DashboardApi>,
    config_manager: Arc<ConfigManager>,
    runner: ExportRunner,
}

impl ReportExportApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        report_export_repo: Arc<ReportExportRepository>,
        aggregation_repo: Arc<AggregationRepository>,
        workload_repo: Arc<WorkloadRepository>,
        organization_repo: Arc<OrganizationRepository>,
        project_repo: Arc<ProjectRepository>,
        dashboard_api: Arc<DashboardApi>,
        config_manager: Arc<ConfigManager>,
    ) -> ApiResult<Self> {
        let output_dir = config_manager.get_export_dir()?;
        Ok(Self {
            runner: ExportRunner::new(report_export_repo.clone(), output_dir),
            report_export_repo,
            aggregation_repo,
            workload_repo,
            organization_repo,
            project_repo,
            dashboard_api,
            config_manager,
        })
    }

    /// 登记导出请求（pending）
    pub fn request(&self, viewer: &Viewer, request: ExportRequest) -> ApiResult<ReportExport> {
        let retention_days = self.config_manager.get_export_retention_days()?;
        let filter_json = serde_json::to_value(&request.filter)
            .map_err(|e| ApiError::InternalError(format!("导出条件序列化失败: {}", e)))?;
        let mut job = ReportExport::new(
            request.export_type,
            request.export_format,
            viewer.employee_id.clone(),
            filter_json,
            now(),
            retention_days,
        );
        job.description = request.description;
        job.is_public = request.is_public;

        self.report_export_repo.insert(&job)?;
        info!(
            export_id = %job.export_id,
            export_type = %job.export_type,
            requested_by = %job.requested_by,
            "{}",
            t("export.accepted")
        );
        Ok(job)
    }

    /// 执行导出任务（pending → processing → completed | failed）
    ///
    /// 数据读取失败不返回 Err, 记录在任务的 error_message 中
    pub fn process(&self, export_id: &str) -> ApiResult<ReportExport> {
        let job = self.find(export_id)?;
        let finished = self.runner.run(job, |job| {
            self.load_table(job)
                .map_err(|e| ExportError::Load(e.to_string()))
        })?;
        Ok(finished)
    }

    pub fn get(&self, viewer: &Viewer, export_id: &str) -> ApiResult<ReportExport> {
        let job = self.find(export_id)?;
        if !job.can_download(&viewer.employee_id, viewer.is_admin) {
            return Err(ApiError::PermissionDenied(t("export.forbidden")));
        }
        Ok(job)
    }

    /// 导出历史（管理员: 全部; 其他: 本人）
    pub fn list(&self, viewer: &Viewer) -> ApiResult<Vec<ReportExport>> {
        let requester = if viewer.is_admin {
            None
        } else {
            Some(viewer.employee_id.as_str())
        };
        Ok(self.report_export_repo.list_by_requester(requester)?)
    }

    /// 下载导出文件
    ///
    /// # 错误
    /// - PermissionDenied: 非公开且非本人/管理员
    /// - BusinessRuleViolation: 已过期或未完成
    pub fn download(&self, viewer: &Viewer, export_id: &str, now: NaiveDateTime) -> ApiResult<DownloadPayload> {
        let job = self.get(viewer, export_id)?;
        if job.is_expired(now) {
            return Err(ApiError::BusinessRuleViolation(t("export.expired")));
        }
        if !job.is_downloadable(now) {
            return Err(ApiError::BusinessRuleViolation(t("export.not_downloadable")));
        }
        let bytes = self.runner.read_file(&job)?;
        self.report_export_repo.increment_download_count(export_id)?;
        Ok(DownloadPayload {
            file_name: job.file_name,
            content_type: job.export_format.content_type(),
            bytes,
        })
    }

    fn find(&self, export_id: &str) -> ApiResult<ReportExport> {
        self.report_export_repo
            .find_by_id(export_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ReportExport(id={})不存在", export_id)))
    }

    /// 按导出类型读取数据（以请求者的可见范围为准）
    fn load_table(&self, job: &ReportExport) -> ApiResult<ExportTable> {
        let filter: ExportFilter = serde_json::from_value(job.filter_json.clone())
            .map_err(|e| ApiError::InvalidInput(format!("导出条件解析失败: {}", e)))?;
        let requester = self
            .organization_repo
            .find_employee(&job.requested_by)?
            .ok_or_else(|| ApiError::Unauthorized(job.requested_by.clone()))?
            .as_viewer();
        let lookup = self.build_lookup()?;

        let table = match job.export_type {
            ExportType::WorkloadAggregation => {
                let mut rows = self.aggregation_repo.list(&filter.aggregation)?;
                if let Some(project_id) = &filter.project_id {
                    rows.retain(|a| &a.project_id == project_id);
                }
                aggregation_table(&rows, &lookup)
            }
            ExportType::WorkloadDetail => {
                let year_month = filter
                    .aggregation
                    .year_month
                    .unwrap_or_else(current_year_month);
                let mut rows = self
                    .workload_repo
                    .list_by_year_month_in_scope(year_month, &requester.scope())?;
                if let Some(project_id) = &filter.project_id {
                    rows.retain(|w| &w.project_id == project_id);
                }
                if let Some(employee_id) = &filter.employee_id {
                    rows.retain(|w| &w.employee_id == employee_id);
                }
                workload_detail_table(&rows, &lookup)
            }
            ExportType::UserWorkload => {
                let employee_id = filter
                    .employee_id
                    .clone()
                    .unwrap_or_else(|| requester.employee_id.clone());
                let owner = self
                    .organization_repo
                    .find_employee(&employee_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("Employee(id={})不存在", employee_id)))?;
                let scope = requester.scope();
                if scope != AccessScope::All && !scope.contains(&owner) {
                    return Err(ApiError::PermissionDenied(t("workload.permission_denied")));
                }
                let mut rows = self.workload_repo.list_by_employee(&employee_id)?;
                if let Some(year_month) = filter.aggregation.year_month {
                    rows.retain(|w| w.year_month == year_month);
                }
                user_workload_table(&rows, &lookup)
            }
            ExportType::ProjectSummary => {
                let summaries = match &filter.project_id {
                    Some(project_id) => vec![self.dashboard_api.project_summary(project_id)?],
                    None => self.dashboard_api.active_project_summaries()?,
                };
                project_summary_table(&summaries)
            }
        };
        Ok(table)
    }

    fn build_lookup(&self) -> ApiResult<ExportLookup> {
        let mut lookup = ExportLookup::default();
        for project in self.project_repo.list_active_projects()? {
            for ticket in self.project_repo.list_tickets_by_project(&project.project_id)? {
                lookup.ticket_titles.insert(ticket.ticket_id, ticket.title);
            }
            lookup.project_names.insert(project.project_id, project.name);
        }
        for department in self.organization_repo.list_active_departments()? {
            for section in self
                .organization_repo
                .list_sections_by_department(&department.department_id)?
            {
                lookup.section_names.insert(section.section_id, section.name);
            }
        }
        for employee in self.organization_repo.list_employees_in_scope(&AccessScope::All)? {
            lookup.employee_names.insert(employee.employee_id, employee.full_name);
        }
        Ok(lookup)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
