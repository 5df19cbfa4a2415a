// ==========================================
// WorkloadApi 集成测试
// ==========================================
// 测试范围:
// 1. 工数行: create_row / update_cell / delete_row
// 2. 月历画面: month_view 的可见范围与合计
// 3. 权限: 同课/同部/管理员可编辑, 其他部不可
// ==========================================

mod helpers;

use helpers::api_test_helper::ApiTestEnv;
use kousu_management::api::{ApiError, CreateWorkloadRequest};
use kousu_management::domain::YearMonth;
use kousu_management::engine::DayKind;
use rust_decimal_macros::dec;

fn april() -> YearMonth {
    YearMonth::new(2024, 4).unwrap()
}

fn request(employee_id: Option<&str>, project_id: &str, ticket_id: Option<&str>) -> CreateWorkloadRequest {
    CreateWorkloadRequest {
        employee_id: employee_id.map(str::to_string),
        project_id: project_id.to_string(),
        ticket_id: ticket_id.map(str::to_string),
        year_month: april(),
    }
}

// ==========================================
// 工数行
// ==========================================

#[test]
fn test_create_row_默认为本人() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let member = env.member();

    let row = env
        .state
        .workload_api
        .create_row(&member, request(None, "P-CORE", Some("T-CORE-1")))
        .expect("新增失败");

    assert_eq!(row.employee_id, "E-MEMBER");
    assert_eq!(row.total_hours(), dec!(0));
    assert_eq!(env.workload_repo().count().unwrap(), 1);
}

#[test]
fn test_create_row_重复行被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let member = env.member();
    let api = &env.state.workload_api;

    api.create_row(&member, request(None, "P-CORE", Some("T-CORE-1")))
        .expect("新增失败");
    let err = api
        .create_row(&member, request(None, "P-CORE", Some("T-CORE-1")))
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "{:?}", err);

    // 无工单行与有工单行是不同的键
    api.create_row(&member, request(None, "P-CORE", None))
        .expect("无工单行应可新增");
}

#[test]
fn test_create_row_工单不属于项目() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let err = env
        .state
        .workload_api
        .create_row(&env.member(), request(None, "P-CORE", Some("T-MAINT-1")))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);
}

#[test]
fn test_create_row_其他部门无权限() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let err = env
        .state
        .workload_api
        .create_row(&env.sales(), request(Some("E-MEMBER"), "P-CORE", None))
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)), "{:?}", err);
}

#[test]
fn test_update_cell_合计更新() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let member = env.member();
    let api = &env.state.workload_api;
    let row = api
        .create_row(&member, request(None, "P-CORE", Some("T-CORE-1")))
        .unwrap();

    api.update_cell(&member, &row.workload_id, 1, dec!(8)).unwrap();
    let result = api
        .update_cell(&member, &row.workload_id, 2, dec!(4.5))
        .unwrap();

    assert_eq!(result.total_hours, dec!(12.5));
    assert_eq!(result.total_days, dec!(12.5) / dec!(8));

    let stored = api.get_row(&row.workload_id).unwrap();
    assert_eq!(stored.day_value(1), dec!(8));
    assert_eq!(stored.day_value(2), dec!(4.5));
}

#[test]
fn test_update_cell_非法输入() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let member = env.member();
    let api = &env.state.workload_api;
    let row = api.create_row(&member, request(None, "P-CORE", None)).unwrap();

    // 4月没有31日
    let err = api
        .update_cell(&member, &row.workload_id, 31, dec!(1))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);

    let err = api
        .update_cell(&member, &row.workload_id, 3, dec!(24.5))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);

    let err = api
        .update_cell(&member, &row.workload_id, 3, dec!(-1))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);
}

#[test]
fn test_update_cell_同课可编辑_他部不可() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.workload_api;
    let row = api
        .create_row(&env.member(), request(None, "P-CORE", None))
        .unwrap();

    api.update_cell(&env.leader(), &row.workload_id, 1, dec!(3))
        .expect("同课领导应可编辑");
    api.update_cell(&env.admin(), &row.workload_id, 2, dec!(3))
        .expect("管理员应可编辑");

    let err = api
        .update_cell(&env.sales(), &row.workload_id, 3, dec!(3))
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)), "{:?}", err);
}

#[test]
fn test_delete_row_返回消息() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let member = env.member();
    let api = &env.state.workload_api;
    let row = api
        .create_row(&member, request(None, "P-CORE", Some("T-CORE-1")))
        .unwrap();

    let err = api.delete_row(&env.sales(), &row.workload_id).unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    let message = api.delete_row(&member, &row.workload_id).unwrap();
    assert!(message.contains("開発 一郎"), "{}", message);
    assert!(message.contains("要件定義"), "{}", message);

    let err = api.get_row(&row.workload_id).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

// ==========================================
// 月历画面
// ==========================================

#[test]
fn test_month_view_可见范围() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.workload_api;

    let member_row = api
        .create_row(&env.member(), request(None, "P-CORE", Some("T-CORE-1")))
        .unwrap();
    api.update_cell(&env.member(), &member_row.workload_id, 1, dec!(8))
        .unwrap();
    let sales_row = api
        .create_row(&env.sales(), request(None, "P-MAINT", None))
        .unwrap();
    api.update_cell(&env.sales(), &sales_row.workload_id, 2, dec!(2))
        .unwrap();

    // 领导: 本课
    let view = api.month_view(&env.leader(), april()).unwrap();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].employee_name, "開発 一郎");
    assert_eq!(view.rows[0].project_name, "基幹刷新");
    assert_eq!(view.rows[0].ticket_title.as_deref(), Some("要件定義"));
    assert!(view.rows[0].can_edit);
    assert_eq!(view.total_hours, dec!(8));

    // 营业: 本部
    let view = api.month_view(&env.sales(), april()).unwrap();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.total_hours, dec!(2));

    // 管理员: 全部
    let view = api.month_view(&env.admin(), april()).unwrap();
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.total_hours, dec!(10));
    assert_eq!(view.previous_month, YearMonth::new(2024, 3).unwrap());
    assert_eq!(view.next_month, YearMonth::new(2024, 5).unwrap());
    assert_eq!(view.days.len(), 30);
}

#[test]
fn test_calendar_祝日与公司休日() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.holiday_repo()
        .upsert(chrono::NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(), "創立記念日")
        .unwrap();

    let days = env.state.workload_api.calendar(april()).unwrap();

    // 4/29 昭和の日
    let showa = &days[28];
    assert!(showa.is_holiday);
    assert_eq!(showa.kind, DayKind::Holiday);

    let company = &days[29];
    assert!(company.is_holiday);
    assert_eq!(company.holiday_name.as_deref(), Some("創立記念日"));

    // 4/6 土曜
    assert_eq!(days[5].kind, DayKind::Saturday);
    // 4/1 月曜
    assert_eq!(days[0].kind, DayKind::Weekday);
}
