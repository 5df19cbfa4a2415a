// ==========================================
// CostMasterApi 集成测试
// ==========================================
// 测试范围:
// 1. 登记校验: 主单价必填, 生效期间, 折扣率
// 2. 有效单价: 等级一致优先, 生效开始日较新者优先
// 3. 启用/停用
// ==========================================

mod helpers;

use helpers::api_test_helper::ApiTestEnv;
use helpers::test_data_builder::{date, monthly_cost_master};
use kousu_management::api::ApiError;
use kousu_management::domain::types::BillingType;
use kousu_management::domain::{EmployeeLevel, RateSet};
use rust_decimal_macros::dec;

#[test]
fn test_create_主单价缺失() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let mut input = monthly_cost_master("D-DEV", None, dec!(60), dec!(80), date(2024, 1, 1));
    input.billing_type = BillingType::Hourly;
    input.billing = RateSet {
        monthly: Some(dec!(80)),
        ..Default::default()
    };

    let err = env.state.cost_master_api.create(input).unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)), "{:?}", err);
}

#[test]
fn test_create_生效期间与折扣率() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let mut input = monthly_cost_master("D-DEV", None, dec!(60), dec!(80), date(2024, 4, 1));
    input.effective_to = Some(date(2024, 3, 31));
    let err = env.state.cost_master_api.create(input).unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)), "{:?}", err);

    let mut input = monthly_cost_master("D-DEV", None, dec!(60), dec!(80), date(2024, 4, 1));
    input.discount_rate = Some(dec!(120));
    let err = env.state.cost_master_api.create(input).unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)), "{:?}", err);
}

#[test]
fn test_create_部门不存在() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let input = monthly_cost_master("D-NONE", None, dec!(60), dec!(80), date(2024, 1, 1));
    let err = env.state.cost_master_api.create(input).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "{:?}", err);
}

#[test]
fn test_create_默认倍率与换算() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let master = env
        .state
        .cost_master_api
        .create(monthly_cost_master(
            "D-SALES",
            Some(EmployeeLevel::Senior),
            dec!(70),
            dec!(100),
            date(2024, 1, 1),
        ))
        .unwrap();

    assert_eq!(master.overtime_rate, dec!(1.25));
    assert_eq!(master.holiday_rate, dec!(1.35));
    // 100万円/月 → 5万円/日 → 6250円/時
    assert_eq!(master.calculated_daily_billing(), Some(dec!(5)));
    assert_eq!(master.calculated_hourly_billing(), Some(dec!(6250)));

    let stored = env.state.cost_master_api.get(&master.cost_master_id).unwrap();
    assert_eq!(stored.billing.monthly, Some(dec!(100)));
    assert_eq!(stored.employee_level, Some(EmployeeLevel::Senior));
}

#[test]
fn test_find_effective_等级优先() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.cost_master_api;
    let senior = api
        .create(monthly_cost_master(
            "D-DEV",
            Some(EmployeeLevel::Senior),
            dec!(70),
            dec!(95),
            date(2022, 1, 1),
        ))
        .unwrap();

    let found = api
        .find_effective("D-DEV", Some(EmployeeLevel::Senior), date(2024, 4, 1))
        .unwrap()
        .unwrap();
    assert_eq!(found.cost_master_id, senior.cost_master_id);

    // 其他等级回落到通用行
    let found = api
        .find_effective("D-DEV", Some(EmployeeLevel::Junior), date(2024, 4, 1))
        .unwrap()
        .unwrap();
    assert_eq!(found.cost_master_id, env.ids.cost_master_dev);
}

#[test]
fn test_find_effective_生效日与停用() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.cost_master_api;
    let newer = api
        .create(monthly_cost_master("D-DEV", None, dec!(65), dec!(85), date(2024, 4, 1)))
        .unwrap();

    let before = api.find_effective("D-DEV", None, date(2024, 3, 31)).unwrap().unwrap();
    assert_eq!(before.cost_master_id, env.ids.cost_master_dev);
    let after = api.find_effective("D-DEV", None, date(2024, 4, 1)).unwrap().unwrap();
    assert_eq!(after.cost_master_id, newer.cost_master_id);

    api.deactivate(&newer.cost_master_id).unwrap();
    let after = api.find_effective("D-DEV", None, date(2024, 4, 1)).unwrap().unwrap();
    assert_eq!(after.cost_master_id, env.ids.cost_master_dev);

    api.activate(&newer.cost_master_id).unwrap();
    let after = api.find_effective("D-DEV", None, date(2024, 4, 1)).unwrap().unwrap();
    assert_eq!(after.cost_master_id, newer.cost_master_id);

    // 无单价的部门
    assert!(api.find_effective("D-SALES", None, date(2024, 4, 1)).unwrap().is_none());
}

#[test]
fn test_update_与一览() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.cost_master_api;

    let mut input = monthly_cost_master("D-DEV", None, dec!(60), dec!(90), date(2020, 1, 1));
    input.discount_rate = Some(dec!(10));
    let updated = api.update(&env.ids.cost_master_dev, input).unwrap();
    assert_eq!(updated.billing.monthly, Some(dec!(90)));
    assert_eq!(updated.discount_rate, dec!(10));

    let list = api.list_by_department("D-DEV").unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].discount_rate, dec!(10));
}
