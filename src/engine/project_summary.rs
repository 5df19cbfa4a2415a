// ==========================================
// 工数管理系统 - 项目汇总引擎
// ==========================================
// 职责: 项目级汇总 = 工数汇总行合计 + 月别工数计价 + 外注费
// 计价基准日: 工数所属年月的1日
// 无生效单价的工数行: 计入 unpriced, 金额按 0 计
// ==========================================

use crate::domain::aggregation::{AggregationTotals, WorkloadAggregation};
use crate::domain::cost_master::CostMaster;
use crate::domain::organization::Employee;
use crate::domain::outsourcing::OutsourcingCost;
use crate::domain::project::Project;
use crate::domain::units::{hours_to_person_days, profit_rate};
use crate::domain::workload::{Workload, YearMonth};
use crate::engine::billing::BillingEngine;
use crate::engine::calendar::{BusinessCalendar, HolidayCalendar};
use crate::engine::cost_resolver::CostResolver;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

/// 月别数值（円）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthlyProjectFigures {
    pub year_month: String,
    pub total_hours: Decimal,
    pub person_days: Decimal,
    pub cost_yen: Decimal,
    pub billing_yen: Decimal,
    pub outsourcing_cost_yen: Decimal,
    pub profit_yen: Decimal,
    pub profit_rate: Decimal,
}

impl MonthlyProjectFigures {
    fn finish(&mut self) {
        self.person_days = hours_to_person_days(self.total_hours);
        let cost = self.cost_yen + self.outsourcing_cost_yen;
        self.profit_yen = self.billing_yen - cost;
        self.profit_rate = profit_rate(self.billing_yen, cost).round_dp(1);
    }
}

/// 未能计价的工数行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpricedWorkload {
    pub workload_id: String,
    pub employee_id: String,
    pub year_month: String,
    pub total_hours: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub project_name: String,
    pub aggregation_totals: AggregationTotals,
    pub aggregation_profit_rate: Decimal,
    pub months: Vec<MonthlyProjectFigures>,
    pub totals: MonthlyProjectFigures,
    pub unpriced: Vec<UnpricedWorkload>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectSummaryEngine {
    resolver: CostResolver,
    billing: BillingEngine,
}

impl ProjectSummaryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip_all, fields(project_id = %project.project_id))]
    pub fn summarize<C: HolidayCalendar>(
        &self,
        project: &Project,
        aggregations: &[WorkloadAggregation],
        workloads: &[(Workload, Employee)],
        cost_masters: &[CostMaster],
        outsourcing: &[OutsourcingCost],
        calendar: &BusinessCalendar<C>,
    ) -> ProjectSummary {
        let mut months: BTreeMap<YearMonth, MonthlyProjectFigures> = BTreeMap::new();
        let mut unpriced = Vec::new();

        for (workload, employee) in workloads {
            let entry = months.entry(workload.year_month).or_default();
            let total_hours = workload.total_hours();
            entry.total_hours += total_hours;

            let master = employee.department_id.as_deref().and_then(|dept| {
                self.resolver.resolve(
                    cost_masters,
                    dept,
                    employee.employee_level,
                    workload.year_month.first_day(),
                )
            });
            match master {
                Some(master) => {
                    let f = self.billing.price(workload, master, calendar);
                    entry.cost_yen += f.cost_yen;
                    entry.billing_yen += f.billing_yen;
                }
                None => {
                    tracing::warn!(
                        workload_id = %workload.workload_id,
                        employee_id = %workload.employee_id,
                        year_month = %workload.year_month,
                        "未找到生效的单价主数据, 工数行按 0 计价"
                    );
                    unpriced.push(UnpricedWorkload {
                        workload_id: workload.workload_id.clone(),
                        employee_id: workload.employee_id.clone(),
                        year_month: workload.year_month.to_string(),
                        total_hours,
                    });
                }
            }
        }

        for cost in outsourcing.iter().filter(|c| c.is_active) {
            months.entry(cost.year_month).or_default().outsourcing_cost_yen += cost.total_cost;
        }

        let mut totals = MonthlyProjectFigures {
            year_month: "total".to_string(),
            ..Default::default()
        };
        let months = months
            .into_iter()
            .map(|(ym, mut figures)| {
                figures.year_month = ym.to_string();
                figures.finish();
                totals.total_hours += figures.total_hours;
                totals.cost_yen += figures.cost_yen;
                totals.billing_yen += figures.billing_yen;
                totals.outsourcing_cost_yen += figures.outsourcing_cost_yen;
                figures
            })
            .collect::<Vec<_>>();
        totals.finish();

        let aggregation_totals = AggregationTotals::from_rows(aggregations);
        let labor_and_outsourcing: Decimal = aggregations
            .iter()
            .map(|a| a.labor_cost() + a.outsourcing_cost_excluding_tax)
            .sum();
        let aggregation_profit_rate = profit_rate(
            aggregation_totals.total_billing_amount,
            labor_and_outsourcing,
        )
        .round_dp(1);

        ProjectSummary {
            project_id: project.project_id.clone(),
            project_name: project.name.clone(),
            aggregation_totals,
            aggregation_profit_rate,
            months,
            totals,
            unpriced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::tests::sample;
    use crate::domain::types::{CaseClassification, EmployeeLevel, OutsourcingStatus};
    use crate::engine::cost_resolver::tests::master;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn project() -> Project {
        Project {
            project_id: "P1".into(),
            name: "基幹刷新".into(),
            department_id: "D1".into(),
            status: "active".into(),
            classification: "development".into(),
            client_name: None,
            order_date: None,
            planned_end_date: None,
            actual_end_date: None,
            budget_amount: None,
            is_active: true,
            created_at: now(),
        }
    }

    fn employee(id: &str, dept: Option<&str>) -> Employee {
        Employee {
            employee_id: id.into(),
            username: id.into(),
            full_name: id.into(),
            email: None,
            department_id: dept.map(Into::into),
            section_id: None,
            employee_level: Some(EmployeeLevel::Senior),
            is_leader: false,
            is_staff: false,
            is_active: true,
            created_at: now(),
        }
    }

    #[test]
    fn test_summarize_prices_and_flags_unpriced() {
        let may = YearMonth::new(2024, 5).unwrap();
        let mut w1 = Workload::new("E1", "P1", Some("T1".into()), may);
        w1.set_day_value(7, dec!(8)).unwrap();
        let mut w2 = Workload::new("E2", "P1", Some("T1".into()), may);
        w2.set_day_value(7, dec!(8)).unwrap();

        let workloads = vec![(w1, employee("E1", Some("D1"))), (w2, employee("E2", None))];
        let masters = vec![master("M1", None, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), dec!(5))];
        let outsourcing = vec![OutsourcingCost {
            outsourcing_id: "O1".into(),
            year_month: may,
            partner_id: "BP1".into(),
            project_id: "P1".into(),
            ticket_id: "T1".into(),
            status: OutsourcingStatus::InProgress,
            case_classification: CaseClassification::Development,
            work_hours: dec!(2),
            hourly_rate: dec!(5000),
            total_cost: dec!(10000),
            notes: None,
            is_active: true,
            created_by: None,
            created_at: now(),
            updated_at: now(),
        }];

        let mut agg = sample("2024-05");
        agg.billing_amount_excluding_tax = dec!(1000000);
        agg.used_workdays = dec!(20);

        let cal = BusinessCalendar::japanese();
        let summary = ProjectSummaryEngine::new().summarize(
            &project(),
            &[agg],
            &workloads,
            &masters,
            &outsourcing,
            &cal,
        );

        assert_eq!(summary.months.len(), 1);
        let m = &summary.months[0];
        assert_eq!(m.year_month, "2024-05");
        assert_eq!(m.total_hours, dec!(16));
        assert_eq!(m.person_days, dec!(2));
        assert_eq!(m.billing_yen, dec!(50000));
        assert_eq!(m.cost_yen, dec!(40000));
        assert_eq!(m.outsourcing_cost_yen, dec!(10000));
        assert_eq!(m.profit_yen, Decimal::ZERO);
        assert_eq!(summary.unpriced.len(), 1);
        assert_eq!(summary.unpriced[0].employee_id, "E2");
        assert_eq!(summary.totals.billing_yen, dec!(50000));

        // 汇总行: 请求 100 万, 人件费 = 20 × 75/20 × 10000 = 750,000
        assert_eq!(summary.aggregation_profit_rate, dec!(25.0));
    }
}
