// ==========================================
// 工数管理系统 - 配置层
// ==========================================
// 职责: 业务配置读取与覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, BusinessSettings, ConfigManager};
