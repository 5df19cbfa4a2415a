// ==========================================
// OutsourcingApi 集成测试
// ==========================================
// 测试范围:
// 1. BP 登记校验
// 2. 外注费登记: 单价复制, 未着手不计费, 参加项目校验, 重复键
// 3. 逻辑删除与月次汇总
// ==========================================

mod helpers;

use helpers::api_test_helper::ApiTestEnv;
use kousu_management::api::{ApiError, OutsourcingCostInput, PartnerInput};
use kousu_management::domain::{BusinessPartner, CaseClassification, OutsourcingStatus, YearMonth};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn april() -> YearMonth {
    YearMonth::new(2024, 4).unwrap()
}

fn partner_input(name: &str, rate: Decimal, projects: &[&str]) -> PartnerInput {
    PartnerInput {
        name: name.to_string(),
        email: Some("bp@example.com".to_string()),
        phone: None,
        company: Some("外部株式会社".to_string()),
        hourly_rate: rate,
        project_ids: projects.iter().map(|p| p.to_string()).collect(),
        notes: None,
    }
}

fn cost_input(partner: &BusinessPartner, ticket_id: &str, status: OutsourcingStatus, hours: Decimal) -> OutsourcingCostInput {
    OutsourcingCostInput {
        year_month: april(),
        partner_id: partner.partner_id.clone(),
        project_id: "P-CORE".to_string(),
        ticket_id: ticket_id.to_string(),
        status,
        case_classification: CaseClassification::Development,
        work_hours: hours,
        notes: None,
    }
}

fn yamada(env: &ApiTestEnv) -> BusinessPartner {
    env.state
        .outsourcing_api
        .create_partner(&env.admin(), partner_input("山田", dec!(5000), &["P-CORE"]))
        .unwrap()
}

#[test]
fn test_create_partner_校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.outsourcing_api;

    let err = api
        .create_partner(&env.admin(), partner_input("  ", dec!(5000), &[]))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);

    let err = api
        .create_partner(&env.admin(), partner_input("山田", dec!(-1), &[]))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);

    let err = api
        .create_partner(&env.admin(), partner_input("山田", dec!(5000), &["P-NONE"]))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "{:?}", err);

    let partner = yamada(&env);
    let stored = api.get_partner(&partner.partner_id).unwrap();
    assert_eq!(stored.project_ids, vec!["P-CORE".to_string()]);
    assert_eq!(api.list_partners().unwrap().len(), 1);
}

#[test]
fn test_create_cost_单价复制() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let partner = yamada(&env);

    let cost = env
        .state
        .outsourcing_api
        .create_cost(
            &env.admin(),
            cost_input(&partner, "T-CORE-1", OutsourcingStatus::InProgress, dec!(12.5)),
        )
        .unwrap();
    assert_eq!(cost.hourly_rate, dec!(5000));
    assert_eq!(cost.total_cost, dec!(62500));

    let pending = env
        .state
        .outsourcing_api
        .create_cost(
            &env.admin(),
            cost_input(&partner, "T-CORE-2", OutsourcingStatus::NotStarted, dec!(20)),
        )
        .unwrap();
    assert_eq!(pending.total_cost, dec!(0));
}

#[test]
fn test_create_cost_未参加项目() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let partner = yamada(&env);

    let mut input = cost_input(&partner, "T-MAINT-1", OutsourcingStatus::InProgress, dec!(1));
    input.project_id = "P-MAINT".to_string();
    let err = env
        .state
        .outsourcing_api
        .create_cost(&env.admin(), input)
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)), "{:?}", err);

    // 工单与项目不一致
    let input = cost_input(&partner, "T-MAINT-1", OutsourcingStatus::InProgress, dec!(1));
    let err = env
        .state
        .outsourcing_api
        .create_cost(&env.admin(), input)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)), "{:?}", err);
}

#[test]
fn test_create_cost_重复键() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let partner = yamada(&env);
    let api = &env.state.outsourcing_api;

    api.create_cost(
        &env.admin(),
        cost_input(&partner, "T-CORE-1", OutsourcingStatus::InProgress, dec!(1)),
    )
    .unwrap();
    let err = api
        .create_cost(
            &env.admin(),
            cost_input(&partner, "T-CORE-1", OutsourcingStatus::InProgress, dec!(2)),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)), "{:?}", err);
}

#[test]
fn test_update_cost_状态变更重算() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let partner = yamada(&env);
    let api = &env.state.outsourcing_api;
    let cost = api
        .create_cost(
            &env.admin(),
            cost_input(&partner, "T-CORE-1", OutsourcingStatus::NotStarted, dec!(8)),
        )
        .unwrap();

    let updated = api
        .update_cost(
            &cost.outsourcing_id,
            cost_input(&partner, "T-CORE-1", OutsourcingStatus::InProgress, dec!(8)),
        )
        .unwrap();
    assert_eq!(updated.total_cost, dec!(40000));
    assert_eq!(api.get_cost(&cost.outsourcing_id).unwrap().total_cost, dec!(40000));
}

#[test]
fn test_monthly_summary_逻辑删除不计入() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let partner = yamada(&env);
    let api = &env.state.outsourcing_api;

    api.create_cost(
        &env.admin(),
        cost_input(&partner, "T-CORE-1", OutsourcingStatus::InProgress, dec!(10)),
    )
    .unwrap();
    api.create_cost(
        &env.admin(),
        cost_input(&partner, "T-CORE-2", OutsourcingStatus::NotStarted, dec!(5)),
    )
    .unwrap();

    let report = api.monthly_summary(april()).unwrap();
    assert_eq!(report.summary.total_records, 2);
    assert_eq!(report.summary.in_progress_records, 1);
    assert_eq!(report.summary.not_started_records, 1);
    assert_eq!(report.summary.total_hours, dec!(10));
    assert_eq!(report.summary.total_cost, dec!(50000));
    assert_eq!(report.by_project.len(), 1);
    assert_eq!(report.by_project[0].records, 2);

    let first = api.list_costs(april()).unwrap()[0].outsourcing_id.clone();
    api.delete_cost(&first).unwrap();
    assert_eq!(api.list_costs(april()).unwrap().len(), 1);
    assert!(!api.get_cost(&first).unwrap().is_active);

    let report = api.monthly_summary(april()).unwrap();
    assert_eq!(report.summary.total_records, 1);
}
