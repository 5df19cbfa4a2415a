// ==========================================
// 工数管理系统 - 导入模块
// ==========================================
// 职责: 工数表 (CSV/XLSX) 一括导入
// ==========================================

pub mod error;
pub mod file_parser;
pub mod workload_importer;

pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use workload_importer::{ImportSummary, RowError, WorkloadImporter};
