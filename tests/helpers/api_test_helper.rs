// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 临时数据库 + 完整 AppState + 标准测试组织
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tempfile::{NamedTempFile, TempDir};

use kousu_management::app::AppState;
use kousu_management::config::{config_keys, ConfigManager};
use kousu_management::db::{init_schema, open_sqlite_connection};
use kousu_management::domain::Viewer;
use kousu_management::repository::{
    HolidayRepository, OrganizationRepository, ProjectRepository, WorkloadRepository,
};

use super::test_data_builder::{seed_standard_data, SeedIds};

/// API测试环境
///
/// 临时文件随环境一起释放
pub struct ApiTestEnv {
    pub state: Arc<AppState>,
    pub conn: Arc<Mutex<Connection>>,
    pub ids: SeedIds,
    pub db_path: String,
    _db_file: NamedTempFile,
    pub export_dir: TempDir,
}

impl ApiTestEnv {
    /// 创建测试环境并写入标准测试组织/项目/单价
    pub fn new() -> Result<Self, Box<dyn Error>> {
        kousu_management::logging::init_test();

        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_string_lossy().into_owned();
        let export_dir = TempDir::new()?;

        let conn = open_sqlite_connection(&db_path)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        ConfigManager::from_connection(conn.clone()).set_global_config_value(
            config_keys::EXPORT_DIR,
            &export_dir.path().to_string_lossy(),
        )?;

        let state = AppState::from_connection(db_path.clone(), conn.clone())?;
        let ids = seed_standard_data(&conn, &state)?;

        Ok(Self {
            state: Arc::new(state),
            conn,
            ids,
            db_path,
            _db_file: db_file,
            export_dir,
        })
    }

    pub fn viewer(&self, employee_id: &str) -> Viewer {
        self.state
            .organization_api
            .resolve_viewer(employee_id)
            .expect("测试社员不存在")
    }

    pub fn admin(&self) -> Viewer {
        self.viewer(&self.ids.admin)
    }

    pub fn leader(&self) -> Viewer {
        self.viewer(&self.ids.leader)
    }

    pub fn member(&self) -> Viewer {
        self.viewer(&self.ids.member)
    }

    pub fn sales(&self) -> Viewer {
        self.viewer(&self.ids.sales)
    }

    pub fn organization_repo(&self) -> OrganizationRepository {
        OrganizationRepository::from_connection(self.conn.clone())
    }

    pub fn project_repo(&self) -> ProjectRepository {
        ProjectRepository::from_connection(self.conn.clone())
    }

    pub fn workload_repo(&self) -> WorkloadRepository {
        WorkloadRepository::from_connection(self.conn.clone())
    }

    pub fn holiday_repo(&self) -> HolidayRepository {
        HolidayRepository::from_connection(self.conn.clone())
    }
}
