// ==========================================
// ReportExportApi 集成测试
// ==========================================
// 测试范围:
// 1. 请求登记 → 执行 → 下载 (CSV / JSON)
// 2. 下载权限: 公开 / 本人 / 管理员
// 3. 失败任务, 重复执行, 过期
// ==========================================

mod helpers;

use chrono::{Duration, Local};
use helpers::api_test_helper::ApiTestEnv;
use kousu_management::api::{
    AggregationInput, ApiError, CreateWorkloadRequest, ExportFilter, ExportRequest,
};
use kousu_management::domain::{ExportFormat, ExportStatus, ExportType, YearMonth};
use rust_decimal_macros::dec;

fn april() -> YearMonth {
    YearMonth::new(2024, 4).unwrap()
}

fn export_request(export_type: ExportType, format: ExportFormat) -> ExportRequest {
    ExportRequest {
        export_type,
        export_format: format,
        filter: ExportFilter::default(),
        description: None,
        is_public: false,
    }
}

fn seed(env: &ApiTestEnv) {
    env.state
        .aggregation_api
        .create(
            &env.admin(),
            AggregationInput {
                project_id: "P-CORE".to_string(),
                ticket_id: Some("T-CORE-1".to_string()),
                year_month: Some(april()),
                billing_amount_excluding_tax: dec!(500000),
                ..Default::default()
            },
        )
        .unwrap();

    let row = env
        .state
        .workload_api
        .create_row(
            &env.member(),
            CreateWorkloadRequest {
                employee_id: None,
                project_id: "P-CORE".to_string(),
                ticket_id: Some("T-CORE-1".to_string()),
                year_month: april(),
            },
        )
        .unwrap();
    env.state
        .workload_api
        .update_cell(&env.member(), &row.workload_id, 1, dec!(7.5))
        .unwrap();
}

#[test]
fn test_request_process_download_csv() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    seed(&env);
    let api = &env.state.report_export_api;

    let job = api
        .request(
            &env.leader(),
            export_request(ExportType::WorkloadAggregation, ExportFormat::Csv),
        )
        .unwrap();
    assert_eq!(job.status, ExportStatus::Pending);
    assert!(job.file_name.starts_with("workload_aggregation_"));
    assert!(job.file_name.ends_with(".csv"));

    let done = api.process(&job.export_id).unwrap();
    assert_eq!(done.status, ExportStatus::Completed);
    assert!(done.file_size.unwrap_or(0) > 0);
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());

    let payload = api
        .download(&env.leader(), &job.export_id, Local::now().naive_local())
        .unwrap();
    assert_eq!(payload.content_type, "text/csv; charset=utf-8");
    assert_eq!(payload.file_name, job.file_name);
    assert!(payload.bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(payload.bytes).unwrap();
    assert!(text.contains("基幹刷新"), "{}", text);
    assert!(text.contains("要件定義"), "{}", text);

    let stored = api.get(&env.leader(), &job.export_id).unwrap();
    assert_eq!(stored.download_count, 1);
}

#[test]
fn test_workload_detail_json() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    seed(&env);
    let api = &env.state.report_export_api;

    let mut request = export_request(ExportType::WorkloadDetail, ExportFormat::Json);
    request.filter.aggregation.year_month = Some(april());
    let job = api.request(&env.leader(), request).unwrap();
    let done = api.process(&job.export_id).unwrap();
    assert_eq!(done.status, ExportStatus::Completed);

    let payload = api
        .download(&env.leader(), &job.export_id, Local::now().naive_local())
        .unwrap();
    assert_eq!(payload.content_type, "application/json");
    let records: serde_json::Value = serde_json::from_slice(&payload.bytes).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    let text = records[0].to_string();
    assert!(text.contains("開発 一郎"), "{}", text);
}

#[test]
fn test_download_权限() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    seed(&env);
    let api = &env.state.report_export_api;
    let now = Local::now().naive_local();

    let private = api
        .request(
            &env.member(),
            export_request(ExportType::UserWorkload, ExportFormat::Csv),
        )
        .unwrap();
    api.process(&private.export_id).unwrap();

    let err = api.download(&env.sales(), &private.export_id, now).unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)), "{:?}", err);
    api.download(&env.member(), &private.export_id, now)
        .expect("本人可下载");
    api.download(&env.admin(), &private.export_id, now)
        .expect("管理员可下载");

    let mut request = export_request(ExportType::ProjectSummary, ExportFormat::Csv);
    request.is_public = true;
    let public = api.request(&env.member(), request).unwrap();
    api.process(&public.export_id).unwrap();
    api.download(&env.sales(), &public.export_id, now)
        .expect("公开文件任何人可下载");
}

#[test]
fn test_list_管理员全部_本人仅自己() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.report_export_api;
    api.request(
        &env.member(),
        export_request(ExportType::UserWorkload, ExportFormat::Csv),
    )
    .unwrap();
    api.request(
        &env.leader(),
        export_request(ExportType::ProjectSummary, ExportFormat::Json),
    )
    .unwrap();

    assert_eq!(api.list(&env.admin()).unwrap().len(), 2);
    let mine = api.list(&env.member()).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].requested_by, "E-MEMBER");
}

#[test]
fn test_process_范围外社员导出失败() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    seed(&env);
    let api = &env.state.report_export_api;

    let mut request = export_request(ExportType::UserWorkload, ExportFormat::Csv);
    request.filter.employee_id = Some("E-MEMBER".to_string());
    let job = api.request(&env.sales(), request).unwrap();

    let done = api.process(&job.export_id).unwrap();
    assert_eq!(done.status, ExportStatus::Failed);
    assert!(done.error_message.is_some());
    assert!(done.file_path.is_none());

    let err = api
        .download(&env.sales(), &job.export_id, Local::now().naive_local())
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "{:?}", err);
}

#[test]
fn test_process_重复执行() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.report_export_api;
    let job = api
        .request(
            &env.admin(),
            export_request(ExportType::WorkloadAggregation, ExportFormat::Csv),
        )
        .unwrap();
    api.process(&job.export_id).unwrap();

    let err = api.process(&job.export_id).unwrap_err();
    assert!(
        matches!(err, ApiError::InvalidStateTransition { .. }),
        "{:?}",
        err
    );
}

#[test]
fn test_download_过期() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.report_export_api;
    let job = api
        .request(
            &env.admin(),
            export_request(ExportType::WorkloadAggregation, ExportFormat::Csv),
        )
        .unwrap();
    api.process(&job.export_id).unwrap();

    // 默认保存 7 天
    let later = Local::now().naive_local() + Duration::days(8);
    let err = api.download(&env.admin(), &job.export_id, later).unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "{:?}", err);
}

#[test]
fn test_get_不存在() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let err = env
        .state
        .report_export_api
        .get(&env.admin(), "missing")
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "{:?}", err);
}
