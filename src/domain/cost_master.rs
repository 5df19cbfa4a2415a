// ==========================================
// 工数管理系统 - 成本主数据 (CostMaster)
// ==========================================
// 键: (部, 社员等级, 请求类型, 生效开始日)
// 单位: 月额/日额/固定 = 万円, 时间单价 = 円
// 换算: 月额 / 20 = 日额; 日额 × 10000 / 8 = 时间单价
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::types::{BillingType, ContractType, EmployeeLevel};
use crate::domain::units::{
    daily_to_hourly_yen, daily_to_monthly, hourly_yen_to_daily, man_yen_to_yen, monthly_to_daily,
    range_violation, MAX_RATE_MULTIPLIER, MAX_UNIT_PRICE,
};
use crate::i18n::t_with_args;

/// 默认加班倍率
pub const DEFAULT_OVERTIME_RATE: Decimal = dec!(1.25);

/// 默认休日倍率
pub const DEFAULT_HOLIDAY_RATE: Decimal = dec!(1.35);

// ==========================================
// RateSet - 单价组
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSet {
    pub monthly: Option<Decimal>, // 万円
    pub daily: Option<Decimal>,   // 万円
    pub hourly: Option<Decimal>,  // 円
    pub fixed: Option<Decimal>,   // 万円
}

/// 按请求类型换算后的单价
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRates {
    pub monthly: Option<Decimal>, // 万円
    pub daily: Option<Decimal>,   // 万円
    pub hourly: Option<Decimal>,  // 円
}

impl RateSet {
    /// 请求类型对应的主单价
    pub fn primary(&self, billing_type: BillingType) -> Option<Decimal> {
        match billing_type {
            BillingType::Monthly => self.monthly,
            BillingType::Daily => self.daily,
            BillingType::Hourly => self.hourly,
            BillingType::Fixed => self.fixed,
        }
    }

    /// 以主单价为基准换算出 月额/日额/时间单价
    ///
    /// 固定类型只提供月额（= 固定额）
    pub fn normalize(&self, billing_type: BillingType) -> NormalizedRates {
        match billing_type {
            BillingType::Monthly => {
                let daily = self.monthly.map(monthly_to_daily);
                NormalizedRates {
                    monthly: self.monthly,
                    daily,
                    hourly: daily.map(daily_to_hourly_yen),
                }
            }
            BillingType::Daily => NormalizedRates {
                monthly: self.daily.map(daily_to_monthly),
                daily: self.daily,
                hourly: self.daily.map(daily_to_hourly_yen),
            },
            BillingType::Hourly => {
                let daily = self.hourly.map(hourly_yen_to_daily);
                NormalizedRates {
                    monthly: daily.map(daily_to_monthly),
                    daily,
                    hourly: self.hourly,
                }
            }
            BillingType::Fixed => NormalizedRates {
                monthly: self.fixed,
                daily: None,
                hourly: None,
            },
        }
    }

    fn values(&self) -> [(&'static str, Option<Decimal>); 4] {
        [
            ("monthly", self.monthly),
            ("daily", self.daily),
            ("hourly", self.hourly),
            ("fixed", self.fixed),
        ]
    }
}

// ==========================================
// CostMaster
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMaster {
    pub cost_master_id: String,
    pub department_id: String,
    pub employee_level: Option<EmployeeLevel>, // None = 全等级通用
    pub billing_type: BillingType,

    // ===== 单价 =====
    pub cost: RateSet,
    pub billing: RateSet,

    // ===== 倍率 =====
    pub overtime_rate: Decimal,
    pub holiday_rate: Decimal,

    // ===== 折扣/最低请求额 =====
    pub discount_rate: Decimal,                  // %
    pub minimum_billing_amount: Option<Decimal>, // 万円

    // ===== 契约 =====
    pub client_name: Option<String>,
    pub contract_type: ContractType,
    pub payment_terms: Option<String>,
    pub special_conditions: Option<String>,

    // ===== 有效期间 =====
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub is_active: bool,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CostMaster {
    // ===== 换算后的请求单价 =====

    pub fn billing_rates(&self) -> NormalizedRates {
        self.billing.normalize(self.billing_type)
    }

    pub fn cost_rates(&self) -> NormalizedRates {
        self.cost.normalize(self.billing_type)
    }

    /// 月额请求 (万円)
    pub fn calculated_monthly_billing(&self) -> Option<Decimal> {
        self.billing_rates().monthly
    }

    /// 日额请求 (万円)
    pub fn calculated_daily_billing(&self) -> Option<Decimal> {
        self.billing_rates().daily
    }

    /// 时间单价请求 (円)
    pub fn calculated_hourly_billing(&self) -> Option<Decimal> {
        self.billing_rates().hourly
    }

    /// 月额成本 (万円)
    pub fn calculated_monthly_cost(&self) -> Option<Decimal> {
        self.cost_rates().monthly
    }

    /// 日额成本 (万円)
    pub fn calculated_daily_cost(&self) -> Option<Decimal> {
        self.cost_rates().daily
    }

    /// 时间单价成本 (円)
    pub fn calculated_hourly_cost(&self) -> Option<Decimal> {
        self.cost_rates().hourly
    }

    /// 画面显示用请求额 (例: "90万円/月", "5,625円/時")
    pub fn billing_amount_for_display(&self) -> String {
        let amount = self.billing.primary(self.billing_type);
        let Some(amount) = amount else {
            return crate::i18n::t("common.not_set");
        };
        let amount = amount.normalize();
        match self.billing_type {
            BillingType::Monthly => format!("{}万円/月", amount),
            BillingType::Daily => format!("{}万円/日", amount),
            BillingType::Hourly => format!("{}円/時", amount),
            BillingType::Fixed => format!("{}万円(固定)", amount),
        }
    }

    /// 指定日是否生效
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        if !self.is_active || date < self.effective_from {
            return false;
        }
        match self.effective_to {
            Some(to) => date <= to,
            None => true,
        }
    }

    /// 对请求额（円）应用折扣和最低请求额
    ///
    /// 顺序: 先折扣, 再以最低请求额兜底
    pub fn apply_discount(&self, amount_yen: Decimal) -> Decimal {
        let mut amount = amount_yen;
        if self.discount_rate > Decimal::ZERO {
            amount = amount * (dec!(100) - self.discount_rate) / dec!(100);
        }
        if let Some(minimum) = self.minimum_billing_amount {
            let minimum_yen = man_yen_to_yen(minimum);
            if amount < minimum_yen {
                amount = minimum_yen;
            }
        }
        amount
    }

    /// 校验
    ///
    /// # 返回
    /// - 空 Vec: 校验通过
    /// - 否则为错误消息列表
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.billing.primary(self.billing_type).is_none() {
            let billing_type = self.billing_type.display_name();
            errors.push(t_with_args(
                "validation.billing_rate_required",
                &[("billing_type", billing_type.as_str())],
            ));
        }

        if let Some(to) = self.effective_to {
            if to <= self.effective_from {
                let (to, from) = (to.to_string(), self.effective_from.to_string());
                errors.push(t_with_args(
                    "validation.effective_range",
                    &[("to", to.as_str()), ("from", from.as_str())],
                ));
            }
        }

        if self.discount_rate < Decimal::ZERO || self.discount_rate > dec!(100) {
            let value = self.discount_rate.to_string();
            errors.push(t_with_args("validation.discount_rate_range", &[("value", value.as_str())]));
        }

        for (label, rates) in [("cost", &self.cost), ("billing", &self.billing)] {
            for (kind, value) in rates.values() {
                if let Some(v) = value {
                    let field = format!("{}.{}", label, kind);
                    errors.extend(range_violation(&field, v, MAX_UNIT_PRICE));
                }
            }
        }

        if let Some(minimum) = self.minimum_billing_amount {
            errors.extend(range_violation("minimum_billing_amount", minimum, MAX_UNIT_PRICE));
        }

        for (field, multiplier) in [
            ("overtime_rate", self.overtime_rate),
            ("holiday_rate", self.holiday_rate),
        ] {
            if multiplier < Decimal::ONE || multiplier > MAX_RATE_MULTIPLIER {
                let (max, value) = (MAX_RATE_MULTIPLIER.to_string(), multiplier.to_string());
                errors.push(t_with_args(
                    "validation.multiplier_range",
                    &[("field", field), ("max", max.as_str()), ("value", value.as_str())],
                ));
            }
        }

        errors
    }
}
