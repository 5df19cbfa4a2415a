// ==========================================
// 工数管理系统 - 工数计价引擎
// ==========================================
// 职责: Workload × CostMaster → 成本/请求/利润
// 规则:
//   - 土日/休日的工数全部计为休日工数
//   - 营业日超过 8 小时的部分计为加班工数
//   - 加权工数 = 通常 + 加班 × 加班倍率 + 休日 × 休日倍率
//   - 固定请求类型: 不按工数计价, 直接取固定额
// 红线: Engine 不拼 SQL
// ==========================================

use crate::domain::cost_master::CostMaster;
use crate::domain::types::BillingType;
use crate::domain::units::{hours_to_person_days, man_yen_to_yen, profit_rate, HOURS_PER_PERSON_DAY};
use crate::domain::workload::Workload;
use crate::engine::calendar::{BusinessCalendar, HolidayCalendar};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 工数分类结果（小时）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HourBreakdown {
    pub regular_hours: Decimal,
    pub overtime_hours: Decimal,
    pub holiday_hours: Decimal,
}

impl HourBreakdown {
    pub fn total(&self) -> Decimal {
        self.regular_hours + self.overtime_hours + self.holiday_hours
    }

    /// 加权工数
    pub fn weighted(&self, overtime_rate: Decimal, holiday_rate: Decimal) -> Decimal {
        self.regular_hours + self.overtime_hours * overtime_rate + self.holiday_hours * holiday_rate
    }
}

/// 单行工数的金额结果（円）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadFinancials {
    pub workload_id: String,
    pub cost_master_id: String,
    pub hours: HourBreakdown,
    pub total_hours: Decimal,
    pub person_days: Decimal,
    pub cost_yen: Decimal,
    pub billing_yen: Decimal,
    pub profit_yen: Decimal,
    pub profit_rate: Decimal,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BillingEngine;

impl BillingEngine {
    pub fn new() -> Self {
        Self
    }

    /// 按日历拆分工数
    pub fn classify_hours<C: HolidayCalendar>(
        &self,
        workload: &Workload,
        calendar: &BusinessCalendar<C>,
    ) -> HourBreakdown {
        let mut breakdown = HourBreakdown::default();
        for (date, hours) in workload.dated_hours() {
            if hours.is_zero() {
                continue;
            }
            if calendar.is_business_day(date) {
                let regular = hours.min(HOURS_PER_PERSON_DAY);
                breakdown.regular_hours += regular;
                breakdown.overtime_hours += hours - regular;
            } else {
                breakdown.holiday_hours += hours;
            }
        }
        breakdown
    }

    /// 计价
    ///
    /// 无工数的行不计请求（最低请求额不生效）
    #[instrument(skip_all, fields(workload_id = %workload.workload_id, cost_master_id = %master.cost_master_id))]
    pub fn price<C: HolidayCalendar>(
        &self,
        workload: &Workload,
        master: &CostMaster,
        calendar: &BusinessCalendar<C>,
    ) -> WorkloadFinancials {
        let hours = self.classify_hours(workload, calendar);
        let total_hours = hours.total();

        let (cost_yen, billing_yen) = if total_hours.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else if master.billing_type == BillingType::Fixed {
            let cost = master.cost.fixed.map(man_yen_to_yen).unwrap_or(Decimal::ZERO);
            let billing = master.billing.fixed.map(man_yen_to_yen).unwrap_or(Decimal::ZERO);
            (cost, master.apply_discount(billing))
        } else {
            let weighted = hours.weighted(master.overtime_rate, master.holiday_rate);
            let hourly_cost = master.calculated_hourly_cost().unwrap_or(Decimal::ZERO);
            let hourly_billing = master.calculated_hourly_billing().unwrap_or(Decimal::ZERO);
            if master.calculated_hourly_billing().is_none() {
                tracing::warn!("单价主数据缺少请求单价, 请求额按 0 计算");
            }
            (hourly_cost * weighted, master.apply_discount(hourly_billing * weighted))
        };

        let cost_yen = cost_yen.round_dp(0);
        let billing_yen = billing_yen.round_dp(0);

        WorkloadFinancials {
            workload_id: workload.workload_id.clone(),
            cost_master_id: master.cost_master_id.clone(),
            hours,
            total_hours,
            person_days: hours_to_person_days(total_hours),
            cost_yen,
            billing_yen,
            profit_yen: billing_yen - cost_yen,
            profit_rate: profit_rate(billing_yen, cost_yen).round_dp(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost_master::RateSet;
    use crate::domain::workload::YearMonth;
    use crate::engine::cost_resolver::tests::master;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn workload() -> Workload {
        // 2024-05: 05-01(水) 営業日, 05-04(土), 05-06(月, 振替休日)
        Workload::new("E1", "P1", Some("T1".to_string()), YearMonth::new(2024, 5).unwrap())
    }

    fn from() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn test_classify_hours() {
        let mut w = workload();
        w.set_day_value(1, dec!(10)).unwrap();
        w.set_day_value(4, dec!(4)).unwrap();
        w.set_day_value(6, dec!(3)).unwrap();
        w.set_day_value(7, dec!(8)).unwrap();

        let cal = BusinessCalendar::japanese();
        let h = BillingEngine::new().classify_hours(&w, &cal);
        assert_eq!(h.regular_hours, dec!(16));
        assert_eq!(h.overtime_hours, dec!(2));
        assert_eq!(h.holiday_hours, dec!(7));
        assert_eq!(h.total(), dec!(25));
    }

    #[test]
    fn test_price_daily_master() {
        // 日额 5 万円 → 时间单价 6,250 円; 成本 4 万円 → 5,000 円
        let mut w = workload();
        w.set_day_value(7, dec!(8)).unwrap();
        w.set_day_value(8, dec!(10)).unwrap();

        let m = master("M1", None, from(), dec!(5));
        let cal = BusinessCalendar::japanese();
        let f = BillingEngine::new().price(&w, &m, &cal);

        // 加权 = 16 + 2 × 1.25 = 18.5
        assert_eq!(f.billing_yen, dec!(115625));
        assert_eq!(f.cost_yen, dec!(92500));
        assert_eq!(f.profit_yen, dec!(23125));
        assert_eq!(f.profit_rate, dec!(20.0));
        assert_eq!(f.person_days, dec!(2.25));
    }

    #[test]
    fn test_price_discount_and_minimum() {
        let mut w = workload();
        w.set_day_value(7, dec!(8)).unwrap();

        let mut m = master("M1", None, from(), dec!(5));
        m.discount_rate = dec!(10);
        let cal = BusinessCalendar::japanese();
        let f = BillingEngine::new().price(&w, &m, &cal);
        assert_eq!(f.billing_yen, dec!(45000));

        m.minimum_billing_amount = Some(dec!(10));
        let f = BillingEngine::new().price(&w, &m, &cal);
        assert_eq!(f.billing_yen, dec!(100000));
    }

    #[test]
    fn test_price_fixed_is_flat() {
        let mut w = workload();
        w.set_day_value(7, dec!(8)).unwrap();
        w.set_day_value(8, dec!(8)).unwrap();

        let mut m = master("M1", None, from(), dec!(5));
        m.billing_type = BillingType::Fixed;
        m.billing = RateSet {
            fixed: Some(dec!(50)),
            ..Default::default()
        };
        m.cost = RateSet {
            fixed: Some(dec!(30)),
            ..Default::default()
        };
        let cal = BusinessCalendar::japanese();
        let f = BillingEngine::new().price(&w, &m, &cal);
        assert_eq!(f.billing_yen, dec!(500000));
        assert_eq!(f.cost_yen, dec!(300000));
        assert_eq!(f.profit_rate, dec!(40.0));
    }

    #[test]
    fn test_empty_workload_is_zero() {
        let mut m = master("M1", None, from(), dec!(5));
        m.minimum_billing_amount = Some(dec!(10));
        let cal = BusinessCalendar::japanese();
        let f = BillingEngine::new().price(&workload(), &m, &cal);
        assert_eq!(f.billing_yen, Decimal::ZERO);
        assert_eq!(f.profit_rate, Decimal::ZERO);
    }
}
