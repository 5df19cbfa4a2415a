// ==========================================
// 工数管理系统 - 组织/项目 API
// ==========================================
// 职责: 调用者解析, 联动下拉 (部→课, 项目→工单)
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::organization::{Employee, Viewer};
use crate::repository::{OrganizationRepository, ProjectRepository};

/// 下拉选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub id: String,
    pub name: String,
}

pub struct OrganizationApi {
    organization_repo: Arc<OrganizationRepository>,
    project_repo: Arc<ProjectRepository>,
}

impl OrganizationApi {
    pub fn new(
        organization_repo: Arc<OrganizationRepository>,
        project_repo: Arc<ProjectRepository>,
    ) -> Self {
        Self {
            organization_repo,
            project_repo,
        }
    }

    /// 解析调用者
    ///
    /// # 返回
    /// - Err(Unauthorized): 社员不存在或已停用
    pub fn resolve_viewer(&self, employee_id: &str) -> ApiResult<Viewer> {
        let employee = self
            .organization_repo
            .find_employee(employee_id)?
            .filter(|e| e.is_active)
            .ok_or_else(|| ApiError::Unauthorized(employee_id.to_string()))?;
        Ok(employee.as_viewer())
    }

    pub fn get_employee(&self, employee_id: &str) -> ApiResult<Employee> {
        self.organization_repo
            .find_employee(employee_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Employee(id={})不存在", employee_id)))
    }

    /// 可见范围内的社员
    pub fn list_employees(&self, viewer: &Viewer) -> ApiResult<Vec<Employee>> {
        Ok(self
            .organization_repo
            .list_employees_in_scope(&viewer.scope())?)
    }

    pub fn department_options(&self) -> ApiResult<Vec<DropdownOption>> {
        Ok(self
            .organization_repo
            .list_active_departments()?
            .into_iter()
            .map(|d| DropdownOption {
                id: d.department_id,
                name: d.name,
            })
            .collect())
    }

    /// 部 → 课 联动
    pub fn section_options(&self, department_id: &str) -> ApiResult<Vec<DropdownOption>> {
        Ok(self
            .organization_repo
            .list_sections_by_department(department_id)?
            .into_iter()
            .filter(|s| s.is_active)
            .map(|s| DropdownOption {
                id: s.section_id,
                name: s.name,
            })
            .collect())
    }

    pub fn project_options(&self) -> ApiResult<Vec<DropdownOption>> {
        Ok(self
            .project_repo
            .list_active_projects()?
            .into_iter()
            .map(|p| DropdownOption {
                id: p.project_id,
                name: p.name,
            })
            .collect())
    }

    /// 项目 → 工单 联动
    pub fn ticket_options(&self, project_id: &str) -> ApiResult<Vec<DropdownOption>> {
        Ok(self
            .project_repo
            .list_tickets_by_project(project_id)?
            .into_iter()
            .filter(|t| t.is_active)
            .map(|t| DropdownOption {
                id: t.ticket_id,
                name: t.title,
            })
            .collect())
    }
}
