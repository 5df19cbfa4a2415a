// ==========================================
// 工数管理系统 - 导入模块错误类型
// ==========================================
// 只包含文件级错误; 行级错误收集在 ImportSummary.errors
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    Read(#[from] std::io::Error),

    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel 解析失败: {0}")]
    Excel(String),

    // ===== 表头 =====
    #[error("必需列缺失: {0}")]
    MissingColumn(String),

    // ===== 写入 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::Excel(err.to_string())
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
