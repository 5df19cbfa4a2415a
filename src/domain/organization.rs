// ==========================================
// 工数管理系统 - 组织领域模型
// ==========================================
// 部 1:N 课 1:N 社员
// 访问范围: 管理员全部 / 本课 / 本部 / 仅本人
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::EmployeeLevel;

// ==========================================
// Department - 部
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub department_id: String,
    pub name: String, // 部名 (唯一)
    pub description: Option<String>,
    pub manager_id: Option<String>, // 部长
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// Section - 课
// ==========================================
// 同一部内课名唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub section_id: String,
    pub department_id: String,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: Option<String>, // 课长
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// Employee - 社员
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub department_id: Option<String>,
    pub section_id: Option<String>,
    pub employee_level: Option<EmployeeLevel>,
    pub is_leader: bool, // 领导权限
    pub is_staff: bool,  // 管理员
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Employee {
    /// 是否为新人（工数计入新人工数）
    pub fn is_newbie(&self) -> bool {
        self.employee_level.map(|l| l.is_newbie()).unwrap_or(false)
    }

    /// 显示用等级名称
    pub fn display_level(&self) -> String {
        match self.employee_level {
            Some(level) => level.display_name(),
            None => crate::i18n::t("common.not_set"),
        }
    }

    /// 所属组织完整名称
    ///
    /// # 参数
    /// - department: 所属部（如有）
    /// - section: 所属课（如有）
    pub fn full_organization(
        &self,
        department: Option<&Department>,
        section: Option<&Section>,
    ) -> String {
        match (department, section) {
            (Some(d), Some(s)) => format!("{} - {}", d.name, s.name),
            (Some(d), None) => d.name.clone(),
            _ => crate::i18n::t("common.not_set"),
        }
    }

    /// 作为查看者
    pub fn as_viewer(&self) -> Viewer {
        Viewer {
            employee_id: self.employee_id.clone(),
            is_admin: self.is_staff,
            is_leader: self.is_leader,
            department_id: self.department_id.clone(),
            section_id: self.section_id.clone(),
        }
    }
}

// ==========================================
// Viewer / AccessScope - 访问范围
// ==========================================

/// 发起请求的社员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewer {
    pub employee_id: String,
    pub is_admin: bool,
    pub is_leader: bool,
    pub department_id: Option<String>,
    pub section_id: Option<String>,
}

/// 数据可见范围
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AccessScope {
    All,
    Department(String),
    Section(String),
    SelfOnly(String),
}

impl Viewer {
    /// 计算可见范围: 管理员 → 全部; 有课 → 本课; 有部 → 本部; 否则仅本人
    pub fn scope(&self) -> AccessScope {
        if self.is_admin {
            return AccessScope::All;
        }
        if let Some(section_id) = &self.section_id {
            return AccessScope::Section(section_id.clone());
        }
        if let Some(department_id) = &self.department_id {
            return AccessScope::Department(department_id.clone());
        }
        AccessScope::SelfOnly(self.employee_id.clone())
    }

    /// 是否可编辑某社员的工数
    ///
    /// 管理员 / 本人 / 同课 / 同部 可编辑
    pub fn can_edit_workload_of(&self, owner: &Employee) -> bool {
        if self.is_admin || self.employee_id == owner.employee_id {
            return true;
        }
        let same_section = matches!(
            (&self.section_id, &owner.section_id),
            (Some(a), Some(b)) if a == b
        );
        let same_department = matches!(
            (&self.department_id, &owner.department_id),
            (Some(a), Some(b)) if a == b
        );
        same_section || same_department
    }

    /// 是否可查看管理驾驶舱（领导或管理员）
    pub fn can_view_admin_dashboard(&self) -> bool {
        self.is_admin || self.is_leader
    }
}

impl AccessScope {
    /// 判断社员是否在范围内
    pub fn contains(&self, employee: &Employee) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Department(id) => employee.department_id.as_deref() == Some(id.as_str()),
            AccessScope::Section(id) => employee.section_id.as_deref() == Some(id.as_str()),
            AccessScope::SelfOnly(id) => &employee.employee_id == id,
        }
    }
}
