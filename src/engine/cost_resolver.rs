// ==========================================
// 工数管理系统 - 单价主数据解析
// ==========================================
// 职责: 为 (部门, 等级, 日期) 选出生效的 CostMaster
// 规则: 等级完全一致优先于全等级通用; 同优先级取 effective_from 最新
// ==========================================

use crate::domain::cost_master::CostMaster;
use crate::domain::types::EmployeeLevel;
use chrono::NaiveDate;

#[derive(Debug, Default, Clone, Copy)]
pub struct CostResolver;

impl CostResolver {
    pub fn new() -> Self {
        Self
    }

    /// 从候选中选出生效单价
    ///
    /// candidates 可包含其他部门/未生效的行, 此处统一过滤
    pub fn resolve<'a>(
        &self,
        candidates: &'a [CostMaster],
        department_id: &str,
        level: Option<EmployeeLevel>,
        date: NaiveDate,
    ) -> Option<&'a CostMaster> {
        candidates
            .iter()
            .filter(|m| m.department_id == department_id && m.is_effective_on(date))
            .filter(|m| m.employee_level.is_none() || m.employee_level == level)
            .max_by(|a, b| {
                let rank = |m: &CostMaster| (m.employee_level.is_some() && m.employee_level == level) as u8;
                rank(a)
                    .cmp(&rank(b))
                    .then(a.effective_from.cmp(&b.effective_from))
                    .then(a.created_at.cmp(&b.created_at))
            })
    }
}
