// ==========================================
// 工数管理系统 - 驾驶舱引擎
// ==========================================
// 职责: 管理驾驶舱指标 + 首页统计
// 金额单位: 驾驶舱展示为 万円
// 本月工数 = 当月汇总行使用工数 + 当月至今日的工数小时 / 8
// ==========================================

use crate::domain::aggregation::WorkloadAggregation;
use crate::domain::types::AggregationStatus;
use crate::domain::units::{hours_to_person_days, percentage, yen_to_man_yen};
use crate::domain::workload::{Workload, YearMonth};
use crate::engine::calendar::{BusinessCalendar, HolidayCalendar};
use crate::i18n;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::instrument;

const RECENT_ENTRY_LIMIT: usize = 5;
const OVERDUE_ALERT_LIMIT: usize = 3;
const DEADLINE_ALERT_LIMIT: usize = 2;

/// 驾驶舱输入
pub struct DashboardInput<'a> {
    pub today: NaiveDate,
    pub aggregations: &'a [WorkloadAggregation],
    /// 当月与上月的工数行
    pub workloads: &'a [Workload],
    /// 工数行总数
    pub workload_count: usize,
    pub project_names: &'a HashMap<String, String>,
    pub ticket_titles: &'a HashMap<String, String>,
    pub daily_target_person_days: Decimal,
    pub deadline_warning_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusStat {
    pub status: AggregationStatus,
    pub name: String,
    pub count: usize,
    pub total_amount: Decimal, // 万円
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEntry {
    pub aggregation_id: String,
    pub project_name: String,
    pub ticket_title: String,
    pub used_workdays: Decimal,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Danger,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionTicket {
    pub aggregation_id: String,
    pub ticket_title: String,
    pub project_name: String,
    pub reason: String,
    pub alert_level: AlertLevel,
    pub status_display: String,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDashboard {
    pub current_month: String,

    // ===== 基本统计 =====
    pub total_workload_entries: usize,
    pub active_tickets_count: usize,
    pub overdue_tickets_count: usize,

    // ===== 收益 (万円) =====
    pub total_revenue: Decimal,
    pub total_outsourcing_cost: Decimal,
    pub gross_profit: Decimal,
    pub profit_margin: Decimal,

    // ===== 工数 (人日) =====
    pub this_month_workdays: Decimal,
    pub last_month_workdays: Decimal,
    pub business_days_so_far: u32,
    pub avg_daily_workdays: Decimal,
    pub workdays_growth: Decimal,
    pub target_workdays: Decimal,
    pub target_achievement: Decimal,

    pub ticket_status_stats: Vec<StatusStat>,
    pub recent_entries: Vec<RecentEntry>,
    pub attention_tickets: Vec<AttentionTicket>,
}

/// 首页统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeStats {
    pub year_month: String,
    pub total_departments: usize,
    pub total_projects: usize,
    pub current_month_hours: Decimal,
    pub current_month_person_days: Decimal,
    pub current_month_tickets: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardEngine;

impl DashboardEngine {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(today = %input.today))]
    pub fn company_dashboard<C: HolidayCalendar>(
        &self,
        input: &DashboardInput<'_>,
        calendar: &BusinessCalendar<C>,
    ) -> CompanyDashboard {
        let today = input.today;
        let this_month = YearMonth::from_date(today);
        let last_month = this_month.previous();
        let aggs = input.aggregations;

        // ===== 基本统计 =====
        let tickets = || aggs.iter().filter(|a| a.ticket_id.is_some());
        let active_tickets_count = tickets().filter(|a| a.status.is_open()).count();
        let overdue_tickets_count = tickets().filter(|a| a.is_overdue(today)).count();

        // ===== 收益 =====
        let total_billing: Decimal = aggs.iter().map(|a| a.billing_amount_excluding_tax).sum();
        let total_outsourcing: Decimal = aggs.iter().map(|a| a.outsourcing_cost_excluding_tax).sum();
        let total_revenue = yen_to_man_yen(total_billing);
        let total_outsourcing_cost = yen_to_man_yen(total_outsourcing);
        let gross_profit = total_revenue - total_outsourcing_cost;
        let profit_margin = percentage(gross_profit, total_revenue).round_dp(1);

        // ===== 工数 =====
        let this_month_workdays = self.month_workdays(aggs, input.workloads, this_month, today);
        let last_month_workdays =
            self.month_workdays(aggs, input.workloads, last_month, last_month.last_day());
        let business_days_so_far = calendar.count_business_days(this_month.first_day(), today);
        let avg_daily_workdays = if business_days_so_far == 0 {
            Decimal::ZERO
        } else {
            (this_month_workdays / Decimal::from(business_days_so_far)).round_dp(2)
        };
        let workdays_growth =
            percentage(this_month_workdays - last_month_workdays, last_month_workdays).round_dp(1);
        let target_workdays = Decimal::from(business_days_so_far) * input.daily_target_person_days;
        let target_achievement = percentage(this_month_workdays, target_workdays).round_dp(1);

        CompanyDashboard {
            current_month: format!("{}年{:02}月", this_month.year(), this_month.month()),
            total_workload_entries: input.workload_count + aggs.len(),
            active_tickets_count,
            overdue_tickets_count,
            total_revenue,
            total_outsourcing_cost,
            gross_profit,
            profit_margin,
            this_month_workdays,
            last_month_workdays,
            business_days_so_far,
            avg_daily_workdays,
            workdays_growth,
            target_workdays,
            target_achievement,
            ticket_status_stats: self.status_stats(aggs),
            recent_entries: self.recent_entries(input),
            attention_tickets: self.attention_tickets(input),
        }
    }

    /// 月别工数: 汇总行使用工数 + 工数行 (月初..=until) 小时 / 8
    fn month_workdays(
        &self,
        aggs: &[WorkloadAggregation],
        workloads: &[Workload],
        year_month: YearMonth,
        until: NaiveDate,
    ) -> Decimal {
        let from_aggregation: Decimal = aggs
            .iter()
            .filter(|a| a.year_month == year_month)
            .map(|a| a.used_workdays)
            .sum();
        let hours: Decimal = workloads
            .iter()
            .filter(|w| w.year_month == year_month)
            .map(|w| w.hours_between(year_month.first_day(), until))
            .sum();
        from_aggregation + hours_to_person_days(hours)
    }

    /// 状态别统计（金额降序）
    fn status_stats(&self, aggs: &[WorkloadAggregation]) -> Vec<StatusStat> {
        let mut grouped: BTreeMap<AggregationStatus, (usize, Decimal)> = BTreeMap::new();
        for a in aggs.iter().filter(|a| a.ticket_id.is_some()) {
            let entry = grouped.entry(a.status).or_default();
            entry.0 += 1;
            entry.1 += a.billing_amount_excluding_tax;
        }
        let mut stats = grouped
            .into_iter()
            .map(|(status, (count, amount))| StatusStat {
                status,
                name: status.display_name(),
                count,
                total_amount: yen_to_man_yen(amount),
                color: status.color().to_string(),
            })
            .collect::<Vec<_>>();
        stats.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
        stats
    }

    fn recent_entries(&self, input: &DashboardInput<'_>) -> Vec<RecentEntry> {
        let mut rows: Vec<&WorkloadAggregation> = input.aggregations.iter().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.into_iter()
            .take(RECENT_ENTRY_LIMIT)
            .map(|a| RecentEntry {
                aggregation_id: a.aggregation_id.clone(),
                project_name: self.project_name(input, a),
                ticket_title: self.ticket_title(input, a),
                used_workdays: a.used_workdays,
                created_at: a.created_at,
            })
            .collect()
    }

    /// 期限超过（最多3件）+ 截止临近（最多2件）
    fn attention_tickets(&self, input: &DashboardInput<'_>) -> Vec<AttentionTicket> {
        let today = input.today;
        let open_tickets = || {
            input
                .aggregations
                .iter()
                .filter(|a| a.ticket_id.is_some() && a.status.is_open())
        };

        let overdue = open_tickets()
            .filter_map(|a| a.days_until_deadline(today).map(|d| (a, d)))
            .filter(|(_, d)| *d < 0)
            .take(OVERDUE_ALERT_LIMIT)
            .map(|(a, d)| {
                let days = -d;
                AttentionTicket {
                    aggregation_id: a.aggregation_id.clone(),
                    ticket_title: self.ticket_title(input, a),
                    project_name: self.project_name(input, a),
                    reason: i18n::t_with_args(
                        "dashboard.overdue_reason",
                        &[("days", &days.to_string())],
                    ),
                    alert_level: AlertLevel::Danger,
                    status_display: a.status.display_name(),
                    days,
                }
            });

        let upcoming = open_tickets()
            .filter_map(|a| a.days_until_deadline(today).map(|d| (a, d)))
            .filter(|(_, d)| *d >= 0 && *d <= input.deadline_warning_days)
            .take(DEADLINE_ALERT_LIMIT)
            .map(|(a, d)| AttentionTicket {
                aggregation_id: a.aggregation_id.clone(),
                ticket_title: self.ticket_title(input, a),
                project_name: self.project_name(input, a),
                reason: i18n::t_with_args("dashboard.deadline_reason", &[("days", &d.to_string())]),
                alert_level: AlertLevel::Warning,
                status_display: a.status.display_name(),
                days: d,
            });

        overdue.chain(upcoming).collect()
    }

    fn project_name(&self, input: &DashboardInput<'_>, a: &WorkloadAggregation) -> String {
        input
            .project_names
            .get(&a.project_id)
            .cloned()
            .unwrap_or_else(|| i18n::t("common.not_set"))
    }

    fn ticket_title(&self, input: &DashboardInput<'_>, a: &WorkloadAggregation) -> String {
        a.ticket_id
            .as_ref()
            .and_then(|id| input.ticket_titles.get(id))
            .cloned()
            .unwrap_or_else(|| i18n::t("common.not_set"))
    }

    /// 首页统计
    ///
    /// workloads: 已按可见范围过滤的当月工数行
    pub fn home_stats(
        &self,
        year_month: YearMonth,
        workloads: &[Workload],
        total_departments: usize,
        total_projects: usize,
    ) -> HomeStats {
        let month_rows = workloads.iter().filter(|w| w.year_month == year_month);
        let current_month_hours: Decimal = month_rows.clone().map(|w| w.total_hours()).sum();
        let current_month_tickets = month_rows
            .filter_map(|w| w.ticket_id.as_deref())
            .collect::<HashSet<_>>()
            .len();
        HomeStats {
            year_month: year_month.to_string(),
            total_departments,
            total_projects,
            current_month_hours,
            current_month_person_days: hours_to_person_days(current_month_hours),
            current_month_tickets,
        }
    }
}
