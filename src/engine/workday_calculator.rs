// ==========================================
// 工数管理系统 - 工数自动计算引擎
// ==========================================
// 职责: 从工单的日别工数推算 使用工数 / 新人使用工数（人日）
// 窗口: [受注日, 终了日实绩], 缺省为 [当月1日, 今天]
// 规则: junior 社员的工数计入新人工数, 其余计入使用工数
// ==========================================

use crate::domain::types::EmployeeLevel;
use crate::domain::units::hours_to_person_days;
use crate::domain::workload::{Workload, YearMonth};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 计算窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkdayWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl WorkdayWindow {
    /// 以受注日/终了日实绩确定窗口
    pub fn resolve(
        order_date: Option<NaiveDate>,
        actual_end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let from = order_date.unwrap_or_else(|| YearMonth::from_date(today).first_day());
        let to = actual_end_date.unwrap_or(today);
        Self { from, to }
    }

    /// 窗口覆盖的年月
    pub fn target_months(&self) -> Vec<YearMonth> {
        YearMonth::months_between(self.from, self.to)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkdayDebugInfo {
    pub workload_records: usize,
    pub target_months: Vec<String>,
    pub regular_hours: Decimal,
    pub newbie_hours: Decimal,
}

/// 计算结果（人日）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkdayCalculation {
    pub used_workdays: Decimal,
    pub newbie_workdays: Decimal,
    pub total_workdays: Decimal,
    pub debug_info: WorkdayDebugInfo,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WorkdayCalculator;

impl WorkdayCalculator {
    pub fn new() -> Self {
        Self
    }

    /// 计算
    ///
    /// rows: 工单的工数行及其社员等级
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn calculate(
        &self,
        rows: &[(Workload, Option<EmployeeLevel>)],
        window: WorkdayWindow,
    ) -> WorkdayCalculation {
        let months = window.target_months();
        let mut regular_hours = Decimal::ZERO;
        let mut newbie_hours = Decimal::ZERO;
        let mut workload_records = 0;

        for (workload, level) in rows {
            if !months.contains(&workload.year_month) {
                continue;
            }
            workload_records += 1;
            let hours = workload.hours_between(window.from, window.to);
            if level.map(|l| l.is_newbie()).unwrap_or(false) {
                newbie_hours += hours;
            } else {
                regular_hours += hours;
            }
        }

        let used_workdays = hours_to_person_days(regular_hours);
        let newbie_workdays = hours_to_person_days(newbie_hours);
        tracing::debug!(%used_workdays, %newbie_workdays, "工数自动计算完成");

        WorkdayCalculation {
            used_workdays,
            newbie_workdays,
            total_workdays: used_workdays + newbie_workdays,
            debug_info: WorkdayDebugInfo {
                workload_records,
                target_months: months.iter().map(ToString::to_string).collect(),
                regular_hours,
                newbie_hours,
            },
        }
    }
}
