// ==========================================
// 工数管理系统 - 工数汇总 (WorkloadAggregation)
// ==========================================
// 粒度: 项目 × 工单 × 年月 一行
// 金额: 円 (单价字段为 万円/月)
// 派生: 剩余工数 / 剩余金额 / 人件费 / 利润率 / 仕挂金额
// ==========================================

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::types::{AggregationStatus, CaseClassification};
use crate::domain::units::{
    man_yen_to_yen, monthly_to_daily, percentage, range_violation, MAX_AMOUNT_YEN, MAX_UNIT_PRICE,
    MAX_WORKDAYS,
};
use crate::domain::workload::{YearMonth, MAX_YEAR, MIN_YEAR};
use crate::i18n::{t, t_with_args};

/// 默认单价 (万円/月)
pub const DEFAULT_UNIT_COST_PER_MONTH: Decimal = dec!(75);

/// 默认请求单价 (万円/月)
pub const DEFAULT_BILLING_UNIT_COST_PER_MONTH: Decimal = dec!(90);

/// 使用工数超出阈值 (相对见积工数)
pub const DEFAULT_WORKDAYS_OVERRUN_RATIO: Decimal = dec!(1.5);

/// 请求金额超出阈值 (相对可用金额)
pub const DEFAULT_BILLING_OVERRUN_RATIO: Decimal = dec!(1.2);

// ==========================================
// WorkloadAggregation
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadAggregation {
    pub aggregation_id: String,
    pub project_id: String,
    pub ticket_id: Option<String>,
    pub department_id: Option<String>,
    pub section_id: Option<String>,
    pub year_month: YearMonth,
    pub status: AggregationStatus,
    pub case_classification: CaseClassification,

    // ===== 日期 =====
    pub estimate_date: Option<NaiveDate>,    // 见积日
    pub order_date: Option<NaiveDate>,       // 受注日
    pub planned_end_date: Option<NaiveDate>, // 终了日(预定)
    pub actual_end_date: Option<NaiveDate>,  // 终了日(实绩)
    pub inspection_date: Option<NaiveDate>,  // 检收日

    // ===== 金额 (円, 税别) =====
    pub available_amount: Decimal,
    pub billing_amount_excluding_tax: Decimal,
    pub outsourcing_cost_excluding_tax: Decimal,

    // ===== 工数 (人日) =====
    pub estimated_workdays: Decimal,
    pub used_workdays: Decimal,
    pub newbie_workdays: Decimal,

    // ===== 单价 (万円/月) =====
    pub unit_cost_per_month: Decimal,
    pub billing_unit_cost_per_month: Decimal,

    // ===== 请求/担当 =====
    pub billing_destination: Option<String>,
    pub billing_contact: Option<String>,
    pub mub_manager_id: Option<String>,
    pub remarks: Option<String>,

    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 校验阈值
#[derive(Debug, Clone, Copy)]
pub struct AggregationLimits {
    pub workdays_overrun_ratio: Decimal,
    pub billing_overrun_ratio: Decimal,
}

impl Default for AggregationLimits {
    fn default() -> Self {
        Self {
            workdays_overrun_ratio: DEFAULT_WORKDAYS_OVERRUN_RATIO,
            billing_overrun_ratio: DEFAULT_BILLING_OVERRUN_RATIO,
        }
    }
}

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 0..=max 范围检查
    pub fn check_range(field: &str, value: Decimal, max: Decimal) -> Option<Self> {
        range_violation(field, value, max).map(|message| Self::new(field, message))
    }
}

impl WorkloadAggregation {
    /// 使用工数合计 (一般 + 新人)
    pub fn total_used_workdays(&self) -> Decimal {
        self.used_workdays + self.newbie_workdays
    }

    /// 剩余工数 (不为负)
    pub fn remaining_workdays(&self) -> Decimal {
        (self.estimated_workdays - self.total_used_workdays()).max(Decimal::ZERO)
    }

    /// 日额请求单价 (円/人日)
    pub fn daily_billing_rate(&self) -> Decimal {
        man_yen_to_yen(monthly_to_daily(self.billing_unit_cost_per_month))
    }

    /// 日额成本单价 (円/人日)
    pub fn daily_cost_rate(&self) -> Decimal {
        man_yen_to_yen(monthly_to_daily(self.unit_cost_per_month))
    }

    /// 剩余金额 = 剩余工数 × 日额请求单价
    pub fn remaining_amount(&self) -> Decimal {
        self.remaining_workdays() * self.daily_billing_rate()
    }

    /// 人件费 = 使用工数合计 × 日额成本单价
    pub fn labor_cost(&self) -> Decimal {
        self.total_used_workdays() * self.daily_cost_rate()
    }

    /// 利润率 (%)
    ///
    /// (请求额 - (人件费 + 外包费)) / 请求额 × 100, 请求额为 0 时返回 0
    pub fn profit_rate(&self) -> Decimal {
        let billing = self.billing_amount_excluding_tax;
        let total_cost = self.labor_cost() + self.outsourcing_cost_excluding_tax;
        percentage(billing - total_cost, billing)
    }

    /// 仕挂金额 (仅开发案件)
    pub fn wip_amount(&self) -> Decimal {
        match self.case_classification {
            CaseClassification::Development => {
                self.total_used_workdays() * self.daily_billing_rate()
                    + self.outsourcing_cost_excluding_tax
            }
            CaseClassification::Maintenance => Decimal::ZERO,
        }
    }

    /// 建议可用金额 = max(请求额 - 外包费, 0)
    pub fn suggested_available_amount(&self) -> Decimal {
        (self.billing_amount_excluding_tax - self.outsourcing_cost_excluding_tax).max(Decimal::ZERO)
    }

    /// 建议见积工数 = 建议可用金额 / 日额请求单价 (小数点 1 位)
    pub fn suggested_estimated_workdays(&self) -> Decimal {
        let rate = self.daily_billing_rate();
        if rate.is_zero() {
            return Decimal::ZERO;
        }
        (self.suggested_available_amount() / rate).round_dp(1)
    }

    /// 期限超过: 进行中状态且预定终了日早于今天
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.planned_end_date {
            Some(end) => self.status.is_open() && end < today,
            None => false,
        }
    }

    /// 距预定终了日的天数（负数表示已超过）
    pub fn days_until_deadline(&self, today: NaiveDate) -> Option<i64> {
        self.planned_end_date
            .map(|end| end.signed_duration_since(today).num_days())
    }

    /// 校验
    ///
    /// 先检查各数值字段的范围, 越界时不再做阈值比较
    pub fn validate(&self, limits: &AggregationLimits) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for (field, date) in [
            ("estimate_date", self.estimate_date),
            ("order_date", self.order_date),
            ("planned_end_date", self.planned_end_date),
            ("actual_end_date", self.actual_end_date),
            ("inspection_date", self.inspection_date),
        ] {
            if let Some(date) = date {
                if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                    let (min, max) = (MIN_YEAR.to_string(), MAX_YEAR.to_string());
                    errors.push(FieldError::new(
                        field,
                        t_with_args(
                            "validation.date_out_of_range",
                            &[("field", field), ("min", min.as_str()), ("max", max.as_str())],
                        ),
                    ));
                }
            }
        }

        if let (Some(estimate), Some(order)) = (self.estimate_date, self.order_date) {
            if estimate > order {
                errors.push(FieldError::new("order_date", t("validation.order_before_estimate")));
            }
        }
        if let (Some(order), Some(end)) = (self.order_date, self.planned_end_date) {
            if order > end {
                errors.push(FieldError::new("planned_end_date", t("validation.end_before_order")));
            }
        }
        if let (Some(actual), Some(inspection)) = (self.actual_end_date, self.inspection_date) {
            if actual > inspection {
                errors.push(FieldError::new(
                    "inspection_date",
                    t("validation.inspection_before_actual_end"),
                ));
            }
        }

        let range_errors: Vec<FieldError> = [
            ("available_amount", self.available_amount, MAX_AMOUNT_YEN),
            ("billing_amount_excluding_tax", self.billing_amount_excluding_tax, MAX_AMOUNT_YEN),
            ("outsourcing_cost_excluding_tax", self.outsourcing_cost_excluding_tax, MAX_AMOUNT_YEN),
            ("estimated_workdays", self.estimated_workdays, MAX_WORKDAYS),
            ("used_workdays", self.used_workdays, MAX_WORKDAYS),
            ("newbie_workdays", self.newbie_workdays, MAX_WORKDAYS),
            ("unit_cost_per_month", self.unit_cost_per_month, MAX_UNIT_PRICE),
            ("billing_unit_cost_per_month", self.billing_unit_cost_per_month, MAX_UNIT_PRICE),
        ]
        .into_iter()
        .filter_map(|(field, value, max)| FieldError::check_range(field, value, max))
        .collect();
        if !range_errors.is_empty() {
            errors.extend(range_errors);
            return errors;
        }

        let used_limit = self
            .estimated_workdays
            .checked_mul(limits.workdays_overrun_ratio);
        let used_total = self.used_workdays.checked_add(self.newbie_workdays);
        if self.estimated_workdays > Decimal::ZERO {
            if let (Some(total), Some(limit)) = (used_total, used_limit) {
                if total > limit {
                    errors.push(FieldError::new("used_workdays", t("validation.workdays_overrun")));
                }
            }
        }

        let billing_limit = self
            .available_amount
            .checked_mul(limits.billing_overrun_ratio);
        if self.available_amount > Decimal::ZERO {
            if let Some(limit) = billing_limit {
                if self.billing_amount_excluding_tax > limit {
                    errors.push(FieldError::new(
                        "billing_amount_excluding_tax",
                        t("validation.billing_overrun"),
                    ));
                }
            }
        }

        errors
    }
}

// ==========================================
// AggregationTotals - 一览合计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationTotals {
    pub count: usize,
    pub total_available_amount: Decimal,
    pub total_billing_amount: Decimal,
    pub total_outsourcing: Decimal,
    pub total_estimated_workdays: Decimal,
    pub total_used_workdays: Decimal,
    pub total_newbie_workdays: Decimal,
}

impl AggregationTotals {
    pub fn from_rows(rows: &[WorkloadAggregation]) -> Self {
        rows.iter().fold(
            Self {
                count: rows.len(),
                ..Default::default()
            },
            |mut acc, row| {
                acc.total_available_amount += row.available_amount;
                acc.total_billing_amount += row.billing_amount_excluding_tax;
                acc.total_outsourcing += row.outsourcing_cost_excluding_tax;
                acc.total_estimated_workdays += row.estimated_workdays;
                acc.total_used_workdays += row.used_workdays;
                acc.total_newbie_workdays += row.newbie_workdays;
                acc
            },
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample(year_month: &str) -> WorkloadAggregation {
        let now = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        WorkloadAggregation {
            aggregation_id: "A1".into(),
            project_id: "P1".into(),
            ticket_id: Some("T1".into()),
            department_id: None,
            section_id: None,
            year_month: year_month.parse().unwrap(),
            status: AggregationStatus::InProgress,
            case_classification: CaseClassification::Development,
            estimate_date: None,
            order_date: None,
            planned_end_date: None,
            actual_end_date: None,
            inspection_date: None,
            available_amount: Decimal::ZERO,
            billing_amount_excluding_tax: Decimal::ZERO,
            outsourcing_cost_excluding_tax: Decimal::ZERO,
            estimated_workdays: Decimal::ZERO,
            used_workdays: Decimal::ZERO,
            newbie_workdays: Decimal::ZERO,
            unit_cost_per_month: DEFAULT_UNIT_COST_PER_MONTH,
            billing_unit_cost_per_month: DEFAULT_BILLING_UNIT_COST_PER_MONTH,
            billing_destination: None,
            billing_contact: None,
            mub_manager_id: None,
            remarks: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profit_rate_zero_billing() {
        let mut a = sample("2025-04");
        a.used_workdays = dec!(10);
        assert_eq!(a.profit_rate(), Decimal::ZERO);
    }

    #[test]
    fn test_derived_amounts() {
        let mut a = sample("2025-04");
        a.estimated_workdays = dec!(20);
        a.used_workdays = dec!(8);
        a.newbie_workdays = dec!(2);
        a.billing_amount_excluding_tax = dec!(1000000);
        a.outsourcing_cost_excluding_tax = dec!(100000);

        // 日额请求 90/20 万円 = 45,000 円, 日额成本 75/20 万円 = 37,500 円
        assert_eq!(a.daily_billing_rate(), dec!(45000));
        assert_eq!(a.daily_cost_rate(), dec!(37500));
        assert_eq!(a.remaining_workdays(), dec!(10));
        assert_eq!(a.remaining_amount(), dec!(450000));
        assert_eq!(a.labor_cost(), dec!(375000));
        // (1,000,000 - 475,000) / 1,000,000 = 52.5%
        assert_eq!(a.profit_rate(), dec!(52.5));
        assert_eq!(a.wip_amount(), dec!(550000));
        assert_eq!(a.suggested_available_amount(), dec!(900000));
        assert_eq!(a.suggested_estimated_workdays(), dec!(20.0));

        a.case_classification = CaseClassification::Maintenance;
        assert_eq!(a.wip_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_remaining_never_negative() {
        let mut a = sample("2025-04");
        a.estimated_workdays = dec!(5);
        a.used_workdays = dec!(7);
        assert_eq!(a.remaining_workdays(), Decimal::ZERO);
        assert_eq!(a.remaining_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_overdue_only_for_open_status() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 20).unwrap();
        let mut a = sample("2025-04");
        a.planned_end_date = NaiveDate::from_ymd_opt(2025, 4, 10);
        assert!(a.is_overdue(today));
        assert_eq!(a.days_until_deadline(today), Some(-10));

        a.status = AggregationStatus::Completed;
        assert!(!a.is_overdue(today));
    }

    #[test]
    fn test_validation_rules() {
        let limits = AggregationLimits::default();
        let mut a = sample("2025-04");
        a.estimate_date = NaiveDate::from_ymd_opt(2025, 4, 10);
        a.order_date = NaiveDate::from_ymd_opt(2025, 4, 5);
        a.planned_end_date = NaiveDate::from_ymd_opt(2025, 4, 1);
        a.actual_end_date = NaiveDate::from_ymd_opt(2025, 5, 1);
        a.inspection_date = NaiveDate::from_ymd_opt(2025, 4, 30);
        a.estimated_workdays = dec!(10);
        a.used_workdays = dec!(14);
        a.newbie_workdays = dec!(2);
        a.available_amount = dec!(100);
        a.billing_amount_excluding_tax = dec!(121);

        let fields: Vec<String> = a.validate(&limits).into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "order_date",
                "planned_end_date",
                "inspection_date",
                "used_workdays",
                "billing_amount_excluding_tax"
            ]
        );

        a.used_workdays = dec!(13);
        a.billing_amount_excluding_tax = dec!(120);
        assert_eq!(a.validate(&limits).len(), 3);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let limits = AggregationLimits::default();

        let mut a = sample("2025-04");
        a.used_workdays = Decimal::MAX;
        a.newbie_workdays = Decimal::ONE;
        a.estimated_workdays = Decimal::ONE;
        let fields: Vec<String> = a.validate(&limits).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["used_workdays"]);

        let mut a = sample("2025-04");
        a.available_amount = Decimal::MAX;
        a.billing_amount_excluding_tax = Decimal::ONE;
        let fields: Vec<String> = a.validate(&limits).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["available_amount"]);

        let mut a = sample("2025-04");
        a.available_amount = MAX_AMOUNT_YEN;
        a.billing_amount_excluding_tax = MAX_AMOUNT_YEN;
        a.estimated_workdays = MAX_WORKDAYS;
        a.used_workdays = MAX_WORKDAYS;
        assert!(a.validate(&limits).is_empty());

        a.outsourcing_cost_excluding_tax = dec!(-1);
        a.unit_cost_per_month = MAX_UNIT_PRICE + Decimal::ONE;
        let fields: Vec<String> = a.validate(&limits).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["outsourcing_cost_excluding_tax", "unit_cost_per_month"]);
    }

    #[test]
    fn test_validation_rejects_far_dates() {
        let mut a = sample("2025-04");
        a.order_date = NaiveDate::from_ymd_opt(12_000, 1, 1);
        let errors = a.validate(&AggregationLimits::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "order_date");
    }
}
