// ==========================================
// 工数管理系统 - 外包 (BP / 外注费)
// ==========================================
// 外注费 = 作业时间 × 时间单价, 仅 "着手" 状态计入
// 时间单价保存时从 BP 复制
// ==========================================

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::{CaseClassification, OutsourcingStatus};
use crate::domain::units::{range_violation, MAX_UNIT_PRICE, MAX_WORK_HOURS};
use crate::domain::workload::YearMonth;

// ==========================================
// BusinessPartner - 业务伙伴
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessPartner {
    pub partner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub hourly_rate: Decimal, // 円
    pub project_ids: Vec<String>, // 参加项目
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BusinessPartner {
    pub fn can_work_on(&self, project_id: &str) -> bool {
        self.project_ids.iter().any(|p| p == project_id)
    }
}

// ==========================================
// OutsourcingCost - 外注费
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutsourcingCost {
    pub outsourcing_id: String,
    pub year_month: YearMonth,
    pub partner_id: String,
    pub project_id: String,
    pub ticket_id: String,
    pub status: OutsourcingStatus,
    pub case_classification: CaseClassification,
    pub work_hours: Decimal,
    pub hourly_rate: Decimal, // 円 (BP 单价复制)
    pub total_cost: Decimal,  // 円
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl OutsourcingCost {
    /// 外注费计算值
    pub fn calculated_cost(&self) -> Decimal {
        match self.status {
            OutsourcingStatus::InProgress => self.work_hours * self.hourly_rate,
            OutsourcingStatus::NotStarted => Decimal::ZERO,
        }
    }

    /// 从 BP 复制单价, 校验通过时重新计算外注费（保存前调用）
    pub fn apply_partner_rate(&mut self, partner: &BusinessPartner) -> Vec<String> {
        self.hourly_rate = partner.hourly_rate;
        let errors = self.validate();
        if errors.is_empty() {
            self.total_cost = self.calculated_cost();
        }
        errors
    }

    pub fn validate(&self) -> Vec<String> {
        [
            range_violation("work_hours", self.work_hours, MAX_WORK_HOURS),
            range_violation("hourly_rate", self.hourly_rate, MAX_UNIT_PRICE),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// 逻辑删除
    pub fn soft_delete(&mut self) {
        self.is_active = false;
    }
}

// ==========================================
// OutsourcingCostSummary - 月次汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutsourcingCostSummary {
    pub year_month: YearMonth,
    pub total_records: usize,
    pub in_progress_records: usize,
    pub not_started_records: usize,
    pub total_hours: Decimal, // 仅着手
    pub total_cost: Decimal,  // 仅着手
}

impl OutsourcingCostSummary {
    /// 汇总指定年月的外注费（逻辑删除的记录不计入）
    pub fn calculate(year_month: YearMonth, costs: &[OutsourcingCost]) -> Self {
        let mut summary = Self {
            year_month,
            total_records: 0,
            in_progress_records: 0,
            not_started_records: 0,
            total_hours: Decimal::ZERO,
            total_cost: Decimal::ZERO,
        };
        for cost in costs
            .iter()
            .filter(|c| c.is_active && c.year_month == year_month)
        {
            summary.total_records += 1;
            match cost.status {
                OutsourcingStatus::InProgress => {
                    summary.in_progress_records += 1;
                    summary.total_hours += cost.work_hours;
                    summary.total_cost += cost.calculated_cost();
                }
                OutsourcingStatus::NotStarted => summary.not_started_records += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn cost(status: OutsourcingStatus, hours: Decimal, rate: Decimal) -> OutsourcingCost {
        let now = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        OutsourcingCost {
            outsourcing_id: uuid::Uuid::new_v4().to_string(),
            year_month: "2025-04".parse().unwrap(),
            partner_id: "BP1".into(),
            project_id: "P1".into(),
            ticket_id: "T1".into(),
            status,
            case_classification: CaseClassification::Development,
            work_hours: hours,
            hourly_rate: rate,
            total_cost: Decimal::ZERO,
            notes: None,
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_cost_only_in_progress() {
        let c = cost(OutsourcingStatus::InProgress, dec!(10), dec!(5000));
        assert_eq!(c.calculated_cost(), dec!(50000));
        let c = cost(OutsourcingStatus::NotStarted, dec!(10), dec!(5000));
        assert_eq!(c.calculated_cost(), Decimal::ZERO);
    }

    #[test]
    fn test_apply_partner_rate_rejects_huge_hours() {
        let mut c = cost(OutsourcingStatus::InProgress, Decimal::MAX, dec!(0));
        let now = c.created_at;
        let mut partner = BusinessPartner {
            partner_id: "BP1".into(),
            name: "BP".into(),
            email: None,
            phone: None,
            company: None,
            hourly_rate: dec!(5000),
            project_ids: vec!["P1".into()],
            notes: None,
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(c.apply_partner_rate(&partner).len(), 1);
        assert_eq!(c.total_cost, Decimal::ZERO);

        c.work_hours = dec!(10);
        partner.hourly_rate = MAX_UNIT_PRICE + Decimal::ONE;
        assert_eq!(c.apply_partner_rate(&partner).len(), 1);

        partner.hourly_rate = dec!(5000);
        assert!(c.apply_partner_rate(&partner).is_empty());
        assert_eq!(c.total_cost, dec!(50000));
    }

    #[test]
    fn test_summary_excludes_soft_deleted() {
        let ym: YearMonth = "2025-04".parse().unwrap();
        let mut deleted = cost(OutsourcingStatus::InProgress, dec!(100), dec!(1000));
        deleted.soft_delete();
        let rows = vec![
            cost(OutsourcingStatus::InProgress, dec!(10), dec!(5000)),
            cost(OutsourcingStatus::InProgress, dec!(2.5), dec!(4000)),
            cost(OutsourcingStatus::NotStarted, dec!(40), dec!(5000)),
            deleted,
        ];
        let s = OutsourcingCostSummary::calculate(ym, &rows);
        assert_eq!(s.total_records, 3);
        assert_eq!(s.in_progress_records, 2);
        assert_eq!(s.not_started_records, 1);
        assert_eq!(s.total_hours, dec!(12.5));
        assert_eq!(s.total_cost, dec!(60000));
    }
}
