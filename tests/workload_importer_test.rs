// ==========================================
// WorkloadImporter 集成测试
// ==========================================
// 测试范围:
// 1. CSV 导入: 新增 / 更新 / 同一文件内重复键
// 2. Excel 导入: 数值单元格, 表头不在第 1 行时的行号
// 3. 行错误: 行号 + 原因, 不中断文件
// 4. 文件级错误: 缺列, 不支持的扩展名, 文件不存在
// ==========================================

mod helpers;

use std::io::Write;

use helpers::api_test_helper::ApiTestEnv;
use helpers::test_data_builder::project;
use kousu_management::domain::YearMonth;
use kousu_management::importer::ImportError;
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

const HEADER: &str = "employee_id,project_id,ticket_id,year_month,day_01,day_02,day_03";

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("无法创建临时文件");
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

/// 从 header_row 行（0 起算）开始写入表头和数据行; 可解析为数值的单元格写成数值
fn write_xlsx(header_row: u32, rows: &[&[&str]]) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".xlsx")
        .tempfile()
        .expect("无法创建临时文件");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, cells) in rows.iter().enumerate() {
        let row = header_row + r as u32;
        for (c, value) in cells.iter().enumerate() {
            let col = c as u16;
            if value.is_empty() {
                continue;
            }
            match value.parse::<f64>() {
                Ok(number) => sheet.write_number(row, col, number).unwrap(),
                Err(_) => sheet.write_string(row, col, *value).unwrap(),
            };
        }
    }
    workbook.save(file.path()).unwrap();
    file
}

fn april() -> YearMonth {
    YearMonth::new(2024, 4).unwrap()
}

#[test]
fn test_import_file_新增更新与行错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = write_csv(&[
        HEADER,
        "E-MEMBER,P-CORE,T-CORE-1,2024-04,8,7.5,",
        "E-NEWBIE,P-CORE,,2024-04,4,,",
        "E-GHOST,P-CORE,T-CORE-1,2024-04,8,,",
        "E-MEMBER,P-CORE,T-CORE-1,2024-13,8,,",
        "E-MEMBER,P-CORE,T-CORE-2,2024-04,abc,,",
        "E-MEMBER,P-CORE,T-MAINT-1,2024-04,1,,",
        "E-SALES,P-MAINT,T-MAINT-1,2024-04,1,,",
        "E-MEMBER,P-CORE,T-CORE-1,2024-04,6,,",
    ]);

    let summary = env
        .state
        .workload_importer
        .import_file(file.path(), &env.leader())
        .unwrap();

    assert_eq!(summary.total_rows, 8);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 5);

    let lines: Vec<usize> = summary.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![4, 5, 6, 7, 8]);
    assert!(summary.errors[0].message.contains("E-GHOST"), "{:?}", summary.errors);
    assert!(summary.errors[1].message.contains("2024-13"), "{:?}", summary.errors);
    assert!(summary.errors[2].message.contains("abc"), "{:?}", summary.errors);
    assert!(summary.errors[3].message.contains("T-MAINT-1"), "{:?}", summary.errors);

    // 后出现的行覆盖整行
    let row = env
        .workload_repo()
        .find_by_key("E-MEMBER", "P-CORE", Some("T-CORE-1"), april())
        .unwrap()
        .unwrap();
    assert_eq!(row.days[0], dec!(6));
    assert_eq!(row.days[1], dec!(0));

    let newbie = env
        .workload_repo()
        .find_by_key("E-NEWBIE", "P-CORE", None, april())
        .unwrap()
        .unwrap();
    assert_eq!(newbie.total_hours(), dec!(4));

    assert!(env
        .workload_repo()
        .find_by_key("E-SALES", "P-MAINT", Some("T-MAINT-1"), april())
        .unwrap()
        .is_none());
}

#[test]
fn test_import_file_再次导入为更新() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = write_csv(&[HEADER, "E-MEMBER,P-CORE,T-CORE-1,2024-04,8,8,8"]);
    let importer = &env.state.workload_importer;

    let first = importer.import_file(file.path(), &env.member()).unwrap();
    assert_eq!(first.inserted, 1);
    assert!(first.errors.is_empty());

    let second = importer.import_file(file.path(), &env.member()).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 1);
    assert_ne!(first.batch_id, second.batch_id);

    let rows = env.workload_repo().list_by_employee("E-MEMBER").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_hours(), dec!(24));
}

#[test]
fn test_import_file_空行跳过且行号保持() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = write_csv(&[
        HEADER,
        ",,,,,,",
        "E-MEMBER,,T-CORE-1,2024-04,8,,",
    ]);

    let summary = env
        .state
        .workload_importer
        .import_file(file.path(), &env.admin())
        .unwrap();
    assert_eq!(summary.total_rows, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].line, 3);
    assert!(summary.errors[0].message.contains("project_id"), "{:?}", summary.errors);
}

#[test]
fn test_import_file_月外日期有值() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = write_csv(&[
        "employee_id,project_id,ticket_id,year_month,day_01,day_31",
        "E-MEMBER,P-CORE,T-CORE-1,2024-04,8,8",
        "E-MEMBER,P-CORE,T-CORE-1,2024-05,8,8",
    ]);

    let summary = env
        .state
        .workload_importer
        .import_file(file.path(), &env.member())
        .unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].line, 2);
    assert!(summary.errors[0].message.starts_with("day_31"), "{:?}", summary.errors);
}

#[test]
fn test_import_file_缺少必需列() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = write_csv(&[
        "employee_id,project_id,ticket_id,day_01",
        "E-MEMBER,P-CORE,T-CORE-1,8",
    ]);

    let err = env
        .state
        .workload_importer
        .import_file(file.path(), &env.member())
        .unwrap_err();
    match err {
        ImportError::MissingColumn(column) => assert_eq!(column, "year_month"),
        other => panic!("期望 MissingColumn, 实际: {:?}", other),
    }
    assert!(env.workload_repo().list_by_employee("E-MEMBER").unwrap().is_empty());
}

#[test]
fn test_import_file_不支持的格式与文件不存在() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();

    let err = env
        .state
        .workload_importer
        .import_file(file.path(), &env.member())
        .unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(_)), "{:?}", err);

    let err = env
        .state
        .workload_importer
        .import_file("/nonexistent/kousu.csv", &env.member())
        .unwrap_err();
    assert!(matches!(err, ImportError::FileNotFound(_)), "{:?}", err);
}

#[test]
fn test_import_xlsx_数值单元格与行号() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let header: &[&str] = &["employee_id", "project_id", "ticket_id", "year_month", "day_01", "day_02", "day_03"];
    let file = write_xlsx(
        1,
        &[
            header,
            &["E-MEMBER", "P-CORE", "T-CORE-1", "2024-04", "8", "7.5", ""],
            &["", "", "", "", "", "", ""],
            &["E-MEMBER", "P-CORE", "T-CORE-2", "2024-04", "25", "", ""],
            &["E-NEWBIE", "P-CORE", "", "2024-04", "", "", "4"],
        ],
    );

    let summary = env
        .state
        .workload_importer
        .import_file(file.path(), &env.leader())
        .unwrap();

    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.skipped, 1);
    // 表头在第 2 行, 空行为第 4 行
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].line, 5);
    assert!(summary.errors[0].message.starts_with("day_01"), "{:?}", summary.errors);

    let row = env
        .workload_repo()
        .find_by_key("E-MEMBER", "P-CORE", Some("T-CORE-1"), april())
        .unwrap()
        .unwrap();
    assert_eq!(row.days[0], dec!(8));
    assert_eq!(row.days[1], dec!(7.5));
    assert_eq!(row.total_hours(), dec!(15.5));

    let newbie = env
        .workload_repo()
        .find_by_key("E-NEWBIE", "P-CORE", None, april())
        .unwrap()
        .unwrap();
    assert_eq!(newbie.days[2], dec!(4));
}

#[test]
fn test_import_file_停用项目为行错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let mut closed = project("P-CLOSED", "旧基盤", "D-DEV");
    closed.is_active = false;
    env.project_repo().insert_project(&closed).unwrap();

    let file = write_csv(&[
        HEADER,
        "E-MEMBER,P-CLOSED,,2024-04,8,,",
        "E-MEMBER,P-CORE,,2024-04,8,,",
    ]);
    let summary = env
        .state
        .workload_importer
        .import_file(file.path(), &env.member())
        .unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].line, 2);
    assert!(summary.errors[0].message.contains("旧基盤"), "{:?}", summary.errors);
    assert!(env
        .workload_repo()
        .find_by_key("E-MEMBER", "P-CLOSED", None, april())
        .unwrap()
        .is_none());
}
