// ==========================================
// 工数管理系统 - 应用层
// ==========================================
// 职责: 组装共享状态, 对外提供 HTTP 接口
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::{router, EMPLOYEE_HEADER};
pub use state::{get_default_db_path, AppState};
