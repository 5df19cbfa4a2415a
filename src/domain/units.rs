// ==========================================
// 工数管理系统 - 单位换算
// ==========================================
// 人日 = 8 小时; 月额 / 20 = 日额
// 月额/日额/固定 存储单位为 万円, 时间单价存储单位为 円
// ==========================================

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::i18n::t_with_args;

/// 1 人日 = 8 小时
pub const HOURS_PER_PERSON_DAY: Decimal = dec!(8);

/// 1 个月按 20 个稼动日计算
pub const WORKDAYS_PER_MONTH: Decimal = dec!(20);

/// 1 万円 = 10,000 円
pub const YEN_PER_MAN_YEN: Decimal = dec!(10000);

/// 单日工数上限（小时）
pub const MAX_HOURS_PER_DAY: Decimal = dec!(24);

// ===== 输入上限 =====

/// 金额（円）: 整数部 12 位
pub const MAX_AMOUNT_YEN: Decimal = dec!(999_999_999_999.99);

/// 工数（人日）
pub const MAX_WORKDAYS: Decimal = dec!(9_999.99);

/// 单价（万円 / 円）: 整数部 8 位
pub const MAX_UNIT_PRICE: Decimal = dec!(99_999_999);

/// 作业时间（小时）
pub const MAX_WORK_HOURS: Decimal = dec!(9_999_999.9);

/// 加班/休日倍率
pub const MAX_RATE_MULTIPLIER: Decimal = dec!(10);

/// 0..=max 范围检查, 越界时返回错误消息
pub fn range_violation(field: &str, value: Decimal, max: Decimal) -> Option<String> {
    let value_text = value.to_string();
    if value.is_sign_negative() {
        Some(t_with_args(
            "validation.negative",
            &[("field", field), ("value", value_text.as_str())],
        ))
    } else if value > max {
        let max_text = max.to_string();
        Some(t_with_args(
            "validation.too_large",
            &[("field", field), ("max", max_text.as_str()), ("value", value_text.as_str())],
        ))
    } else {
        None
    }
}

/// 小时 → 人日
pub fn hours_to_person_days(hours: Decimal) -> Decimal {
    hours / HOURS_PER_PERSON_DAY
}

/// 人日 → 小时
pub fn person_days_to_hours(days: Decimal) -> Decimal {
    days * HOURS_PER_PERSON_DAY
}

/// 万円 → 円
pub fn man_yen_to_yen(man_yen: Decimal) -> Decimal {
    man_yen * YEN_PER_MAN_YEN
}

/// 円 → 万円
pub fn yen_to_man_yen(yen: Decimal) -> Decimal {
    yen / YEN_PER_MAN_YEN
}

/// 月额(万円) → 日额(万円)
pub fn monthly_to_daily(monthly_man_yen: Decimal) -> Decimal {
    monthly_man_yen / WORKDAYS_PER_MONTH
}

/// 日额(万円) → 月额(万円)
pub fn daily_to_monthly(daily_man_yen: Decimal) -> Decimal {
    daily_man_yen * WORKDAYS_PER_MONTH
}

/// 日额(万円) → 时间单价(円)
pub fn daily_to_hourly_yen(daily_man_yen: Decimal) -> Decimal {
    man_yen_to_yen(daily_man_yen) / HOURS_PER_PERSON_DAY
}

/// 时间单价(円) → 日额(万円)
pub fn hourly_yen_to_daily(hourly_yen: Decimal) -> Decimal {
    yen_to_man_yen(hourly_yen * HOURS_PER_PERSON_DAY)
}

/// 百分比: numer / denom × 100, 分母为 0 时返回 0
pub fn percentage(numer: Decimal, denom: Decimal) -> Decimal {
    if denom.is_zero() {
        return Decimal::ZERO;
    }
    numer
        .checked_div(denom)
        .map(|ratio| ratio * dec!(100))
        .unwrap_or(Decimal::ZERO)
}

/// 利润率: (billing - cost) / billing × 100, billing 为 0 时返回 0
pub fn profit_rate(billing: Decimal, cost: Decimal) -> Decimal {
    percentage(billing - cost, billing)
}
