// ==========================================
// 工数管理系统 - 仓储层错误类型
// ==========================================
// rusqlite 错误按约束类型细分, 便于 API 层映射为业务错误
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    /// 唯一键重复 (工数行 / 汇总行 / 外注费行 / 课名)
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    /// 条件更新未命中: 行的当前状态已不是 expected
    #[error("{entity}(id={id}) 状态已变更, 期望 {expected}")]
    StatusConflict {
        entity: &'static str,
        id: String,
        expected: String,
    },

    /// TEXT 列无法解析为 Decimal / 日期 / 枚举
    #[error("列值无法解析 (column#{column}): {message}")]
    ColumnDecode { column: usize, message: String },

    #[error("日列超出范围: day={0}")]
    DayOutOfRange(u32),

    #[error("默认配置值无效: {key}={value}")]
    InvalidConfigDefault { key: String, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                RepositoryError::UniqueConstraintViolation(msg)
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("FOREIGN KEY") => {
                RepositoryError::ForeignKeyViolation(msg)
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::not_found("Unknown", "Unknown"),
            rusqlite::Error::FromSqlConversionFailure(column, _, cause) => {
                RepositoryError::ColumnDecode {
                    column,
                    message: cause.to_string(),
                }
            }
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
