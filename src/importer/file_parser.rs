// ==========================================
// 工数管理系统 - 文件解析器
// ==========================================
// 支持: Excel (.xlsx) / CSV (.csv)
// 输出: 表头 → 值 的行记录（保留原始行号）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 原始行记录
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 文件中的行号（1 起算, 与 Excel/编辑器显示一致）
    pub line: usize,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

pub trait FileParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

/// 行数据转换为记录（全空行返回 None）
fn build_record(line: usize, headers: &[String], values: impl Iterator<Item = String>) -> Option<RawRecord> {
    let fields: HashMap<String, String> = headers
        .iter()
        .cloned()
        .zip(values.map(|v| v.trim().to_string()))
        .collect();
    if fields.values().all(|v| v.is_empty()) {
        return None;
    }
    Some(RawRecord { line, fields })
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;
        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 去除 Excel 输出的 BOM
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            if let Some(r) = build_record(idx + 2, &headers, record.iter().map(str::to_string)) {
                records.push(r);
            }
        }
        Ok(records)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let mut workbook: Xlsx<_> = open_workbook(file_path)?;

        // 只读取第一个工作表
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::Excel("工作表为空".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // range 从第一个非空单元格开始, 表头不一定在第 1 行
        let header_line = range.start().map_or(1, |(row, _)| row as usize + 1);

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (idx, data_row) in rows.enumerate() {
            let line = header_line + idx + 1;
            if let Some(r) = build_record(line, &headers, data_row.iter().map(|c| c.to_string())) {
                records.push(r);
            }
        }
        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<RawRecord>> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_raw_records(path),
            "xlsx" => ExcelParser.parse_to_raw_records(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_parser_skips_blank_rows_and_keeps_line_numbers() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        write!(temp_file, "\u{feff}employee_id,project_id,day_01\n").unwrap();
        writeln!(temp_file, "E1,P1,8").unwrap();
        writeln!(temp_file, ",,").unwrap();
        writeln!(temp_file, "E2,P1,").unwrap();
        temp_file.flush().unwrap();

        let records = UniversalFileParser.parse(temp_file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[0].get("employee_id"), Some("E1"));
        assert_eq!(records[1].line, 4);
        assert_eq!(records[1].get("day_01"), None);
    }

    #[test]
    fn test_excel_parser_line_numbers_follow_sheet_rows() {
        let temp_file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        // 第 1-2 行为标题区, 表头位于第 3 行
        for (col, name) in ["employee_id", "project_id", "day_01"].iter().enumerate() {
            sheet.write_string(2, col as u16, *name).unwrap();
        }
        sheet.write_string(3, 0, "E1").unwrap();
        sheet.write_string(3, 1, "P1").unwrap();
        sheet.write_number(3, 2, 7.5).unwrap();
        // 第 5 行空行
        sheet.write_string(5, 0, "E2").unwrap();
        sheet.write_string(5, 1, "P1").unwrap();
        workbook.save(temp_file.path()).unwrap();

        let records = UniversalFileParser.parse(temp_file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 4);
        assert_eq!(records[0].get("employee_id"), Some("E1"));
        assert_eq!(records[0].get("day_01"), Some("7.5"));
        assert_eq!(records[1].line, 6);
        assert_eq!(records[1].get("day_01"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let err = UniversalFileParser.parse(temp_file.path()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(ext) if ext == "txt"));
    }

    #[test]
    fn test_missing_file() {
        let err = CsvParser
            .parse_to_raw_records(Path::new("/nonexistent/workload.csv"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
