// ==========================================
// 工数管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 所有 Repository 共享同一个 Arc<Mutex<Connection>>
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{
    AggregationApi, CostMasterApi, DashboardApi, OrganizationApi, OutsourcingApi, ReportExportApi,
    WorkloadApi,
};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::WorkloadImporter;
use crate::repository::{
    AggregationRepository, CostMasterRepository, HolidayRepository, OrganizationRepository,
    OutsourcingRepository, ProjectRepository, ReportExportRepository, WorkloadRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub config_manager: Arc<ConfigManager>,

    pub organization_api: Arc<OrganizationApi>,
    pub workload_api: Arc<WorkloadApi>,
    pub cost_master_api: Arc<CostMasterApi>,
    pub aggregation_api: Arc<AggregationApi>,
    pub dashboard_api: Arc<DashboardApi>,
    pub outsourcing_api: Arc<OutsourcingApi>,
    pub report_export_api: Arc<ReportExportApi>,

    /// 工数一括导入
    pub workload_importer: Arc<WorkloadImporter>,

    /// 公司休日仓储（日历维护用）
    pub holiday_repo: Arc<HolidayRepository>,
}

impl AppState {
    /// 打开数据库并初始化全部组件
    ///
    /// # 返回
    /// - Err(String): 数据库打开/建表/初始化失败
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 基于已有连接组装（测试用内存库也走此路径）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let organization_repo = Arc::new(OrganizationRepository::from_connection(conn.clone()));
        let project_repo = Arc::new(ProjectRepository::from_connection(conn.clone()));
        let workload_repo = Arc::new(WorkloadRepository::from_connection(conn.clone()));
        let cost_master_repo = Arc::new(CostMasterRepository::from_connection(conn.clone()));
        let aggregation_repo = Arc::new(AggregationRepository::from_connection(conn.clone()));
        let outsourcing_repo = Arc::new(OutsourcingRepository::from_connection(conn.clone()));
        let report_export_repo = Arc::new(ReportExportRepository::from_connection(conn.clone()));
        let holiday_repo = Arc::new(HolidayRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let organization_api = Arc::new(OrganizationApi::new(
            organization_repo.clone(),
            project_repo.clone(),
        ));
        let workload_api = Arc::new(WorkloadApi::new(
            workload_repo.clone(),
            organization_repo.clone(),
            project_repo.clone(),
            holiday_repo.clone(),
        ));
        let cost_master_api = Arc::new(CostMasterApi::new(
            cost_master_repo.clone(),
            organization_repo.clone(),
        ));
        let aggregation_api = Arc::new(AggregationApi::new(
            aggregation_repo.clone(),
            workload_repo.clone(),
            organization_repo.clone(),
            project_repo.clone(),
            config_manager.clone(),
        ));
        let dashboard_api = Arc::new(DashboardApi::new(
            aggregation_repo.clone(),
            workload_repo.clone(),
            organization_repo.clone(),
            project_repo.clone(),
            cost_master_repo,
            outsourcing_repo.clone(),
            holiday_repo.clone(),
            config_manager.clone(),
        ));
        let outsourcing_api = Arc::new(OutsourcingApi::new(outsourcing_repo, project_repo.clone()));
        let report_export_api = Arc::new(
            ReportExportApi::new(
                report_export_repo,
                aggregation_repo,
                workload_repo.clone(),
                organization_repo.clone(),
                project_repo.clone(),
                dashboard_api.clone(),
                config_manager.clone(),
            )
            .map_err(|e| format!("无法创建ReportExportApi: {}", e))?,
        );
        let workload_importer = Arc::new(WorkloadImporter::new(
            organization_repo,
            project_repo,
            workload_repo,
        ));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            config_manager,
            organization_api,
            workload_api,
            cost_master_api,
            aggregation_api,
            dashboard_api,
            outsourcing_api,
            report_export_api,
            workload_importer,
            holiday_repo,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 KOUSU_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("KOUSU_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./kousu_management.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("kousu-management");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("kousu_management.db");
        }
    }
    path.to_string_lossy().into_owned()
}
