// ==========================================
// 工数管理系统 - 项目领域模型
// ==========================================
// Project 1:N ProjectTicket
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::CaseClassification;

// ==========================================
// Project - 项目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub department_id: String,
    pub status: String,         // 自由文本 (画面显示用)
    pub classification: String, // 自由文本
    pub client_name: Option<String>,

    // ===== 日期 =====
    pub order_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,

    // ===== 预算 (円) =====
    pub budget_amount: Option<Decimal>,

    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Project {
    /// 日期顺序校验: 受注日 ≤ 预定结束日
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("项目名称不能为空".to_string());
        }
        if let (Some(order), Some(end)) = (self.order_date, self.planned_end_date) {
            if order > end {
                errors.push(format!("预定结束日({})早于受注日({})", end, order));
            }
        }
        if let Some(budget) = self.budget_amount {
            if budget.is_sign_negative() {
                errors.push("预算金额不能为负数".to_string());
            }
        }
        errors
    }
}

// ==========================================
// ProjectTicket - 工单 (案件)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTicket {
    pub ticket_id: String,
    pub project_id: String,
    pub title: String,
    pub case_classification: CaseClassification,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
