// ==========================================
// 工数管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::domain::aggregation::AggregationLimits;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 解析失败时回退默认值并记录告警
    fn get_parsed_or_default<T: FromStr>(&self, key: &str, default: &str) -> RepositoryResult<T> {
        let raw = self.get_config_or_default(key, default)?;
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(key, value = %raw, "配置值无法解析，使用默认值");
                default
                    .parse::<T>()
                    .map_err(|_| RepositoryError::InvalidConfigDefault {
                        key: key.to_string(),
                        value: default.to_string(),
                    })
            }
        }
    }

    /// 写入 global scope 配置（已存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now = Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string();
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, ?3)
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, now],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        Ok(rows.collect::<Result<BTreeMap<_, _>, _>>()?)
    }

    // ==========================================
    // 业务配置项
    // ==========================================

    /// 每人每营业日的目标人日
    pub fn get_daily_target_person_days(&self) -> RepositoryResult<Decimal> {
        self.get_parsed_or_default(config_keys::DAILY_TARGET_PERSON_DAYS, "0.8")
    }

    /// 默认原价单价 (万円/人月)
    pub fn get_default_unit_cost(&self) -> RepositoryResult<Decimal> {
        self.get_parsed_or_default(config_keys::DEFAULT_UNIT_COST, "75")
    }

    /// 默认请求单价 (万円/人月)
    pub fn get_default_billing_unit_cost(&self) -> RepositoryResult<Decimal> {
        self.get_parsed_or_default(config_keys::DEFAULT_BILLING_UNIT_COST, "90")
    }

    pub fn get_aggregation_limits(&self) -> RepositoryResult<AggregationLimits> {
        Ok(AggregationLimits {
            workdays_overrun_ratio: self
                .get_parsed_or_default(config_keys::WORKDAYS_OVERRUN_RATIO, "1.5")?,
            billing_overrun_ratio: self
                .get_parsed_or_default(config_keys::BILLING_OVERRUN_RATIO, "1.2")?,
        })
    }

    /// 截止日临近告警天数
    pub fn get_deadline_warning_days(&self) -> RepositoryResult<i64> {
        self.get_parsed_or_default(config_keys::DEADLINE_WARNING_DAYS, "3")
    }

    pub fn get_export_retention_days(&self) -> RepositoryResult<i64> {
        self.get_parsed_or_default(config_keys::EXPORT_RETENTION_DAYS, "7")
    }

    /// 导出文件目录（未配置时为系统临时目录下的 kousu_exports）
    pub fn get_export_dir(&self) -> RepositoryResult<String> {
        let fallback = std::env::temp_dir().join("kousu_exports");
        self.get_config_or_default(config_keys::EXPORT_DIR, &fallback.to_string_lossy())
    }

    /// 汇总业务配置（供状态接口展示）
    pub fn get_business_settings(&self) -> RepositoryResult<BusinessSettings> {
        let limits = self.get_aggregation_limits()?;
        Ok(BusinessSettings {
            daily_target_person_days: self.get_daily_target_person_days()?,
            default_unit_cost: self.get_default_unit_cost()?,
            default_billing_unit_cost: self.get_default_billing_unit_cost()?,
            workdays_overrun_ratio: limits.workdays_overrun_ratio,
            billing_overrun_ratio: limits.billing_overrun_ratio,
            deadline_warning_days: self.get_deadline_warning_days()?,
            export_retention_days: self.get_export_retention_days()?,
            export_dir: self.get_export_dir()?,
        })
    }
}

/// 业务配置快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSettings {
    pub daily_target_person_days: Decimal,
    pub default_unit_cost: Decimal,
    pub default_billing_unit_cost: Decimal,
    pub workdays_overrun_ratio: Decimal,
    pub billing_overrun_ratio: Decimal,
    pub deadline_warning_days: i64,
    pub export_retention_days: i64,
    pub export_dir: String,
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 驾驶舱目标
    pub const DAILY_TARGET_PERSON_DAYS: &str = "daily_target_person_days";

    // 工数汇总单价 (万円/人月)
    pub const DEFAULT_UNIT_COST: &str = "default_unit_cost";
    pub const DEFAULT_BILLING_UNIT_COST: &str = "default_billing_unit_cost";

    // 超支校验
    pub const WORKDAYS_OVERRUN_RATIO: &str = "workdays_overrun_ratio";
    pub const BILLING_OVERRUN_RATIO: &str = "billing_overrun_ratio";

    pub const DEADLINE_WARNING_DAYS: &str = "deadline_warning_days";

    // 报表导出
    pub const EXPORT_RETENTION_DAYS: &str = "export_retention_days";
    pub const EXPORT_DIR: &str = "export_dir";
}
