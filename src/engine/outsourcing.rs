// ==========================================
// 工数管理系统 - 外注费引擎
// ==========================================
// 职责: 外注费登记前的单价复制/校验, 月次汇总, 项目别内訳
// ==========================================

use crate::domain::outsourcing::{BusinessPartner, OutsourcingCost, OutsourcingCostSummary};
use crate::domain::types::OutsourcingStatus;
use crate::domain::workload::YearMonth;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 项目别外注费（仅着手）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOutsourcing {
    pub project_id: String,
    pub records: usize,
    pub total_hours: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyOutsourcingReport {
    pub summary: OutsourcingCostSummary,
    pub by_project: Vec<ProjectOutsourcing>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OutsourcingEngine;

impl OutsourcingEngine {
    pub fn new() -> Self {
        Self
    }

    /// 登记/更新前处理: 复制 BP 单价, 重算外注费, 校验
    ///
    /// # 返回
    /// - 空 Vec: 可保存
    /// - 否则为错误消息列表
    pub fn prepare(&self, cost: &mut OutsourcingCost, partner: &BusinessPartner) -> Vec<String> {
        let mut errors = Vec::new();
        if !partner.is_active {
            errors.push(format!("BP已停用: {}", partner.name));
        }
        if !partner.can_work_on(&cost.project_id) {
            errors.push(format!(
                "BP {} 未参加项目 {}",
                partner.name, cost.project_id
            ));
        }
        errors.extend(cost.apply_partner_rate(partner));
        errors
    }

    /// 月次报告（逻辑删除的记录不计入）
    pub fn monthly_report(&self, year_month: YearMonth, costs: &[OutsourcingCost]) -> MonthlyOutsourcingReport {
        let summary = OutsourcingCostSummary::calculate(year_month, costs);

        let mut grouped: BTreeMap<&str, ProjectOutsourcing> = BTreeMap::new();
        for cost in costs
            .iter()
            .filter(|c| c.is_active && c.year_month == year_month)
        {
            let entry = grouped
                .entry(cost.project_id.as_str())
                .or_insert_with(|| ProjectOutsourcing {
                    project_id: cost.project_id.clone(),
                    records: 0,
                    total_hours: Decimal::ZERO,
                    total_cost: Decimal::ZERO,
                });
            entry.records += 1;
            if cost.status == OutsourcingStatus::InProgress {
                entry.total_hours += cost.work_hours;
                entry.total_cost += cost.calculated_cost();
            }
        }

        MonthlyOutsourcingReport {
            summary,
            by_project: grouped.into_values().collect(),
        }
    }
}
