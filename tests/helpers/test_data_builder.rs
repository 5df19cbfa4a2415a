// ==========================================
// 测试数据构建器
// ==========================================
// 标准测试组织:
//   開発部(D-DEV) ─ 第一課(S-DEV1): leader / member / newbie
//                 └ 第二課(S-DEV2)
//   営業部(D-SALES): sales (无课)
//   admin: 管理员, 无所属
// 项目: 基幹刷新(P-CORE) 工单 T-CORE-1 / T-CORE-2
//       保守対応(P-MAINT) 工单 T-MAINT-1
// 单价: 開発部 全等级通用 月额 成本60 / 请求80 万円
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rusqlite::Connection;

use kousu_management::api::CostMasterInput;
use kousu_management::app::AppState;
use kousu_management::domain::{
    CaseClassification, Department, Employee, EmployeeLevel, Project, ProjectTicket, Section,
};
use kousu_management::domain::types::BillingType;
use kousu_management::domain::RateSet;
use kousu_management::repository::{OrganizationRepository, ProjectRepository};

#[derive(Debug, Clone)]
pub struct SeedIds {
    pub dept_dev: String,
    pub dept_sales: String,
    pub section_dev1: String,
    pub section_dev2: String,
    pub admin: String,
    pub leader: String,
    pub member: String,
    pub newbie: String,
    pub sales: String,
    pub project_core: String,
    pub project_maint: String,
    pub ticket_core_1: String,
    pub ticket_core_2: String,
    pub ticket_maint_1: String,
    pub cost_master_dev: String,
}

pub fn ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn department(id: &str, name: &str) -> Department {
    Department {
        department_id: id.to_string(),
        name: name.to_string(),
        description: None,
        manager_id: None,
        is_active: true,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn section(id: &str, department_id: &str, name: &str) -> Section {
    Section {
        section_id: id.to_string(),
        department_id: department_id.to_string(),
        name: name.to_string(),
        description: None,
        manager_id: None,
        is_active: true,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub struct EmployeeBuilder {
    employee: Employee,
}

impl EmployeeBuilder {
    pub fn new(id: &str, full_name: &str) -> Self {
        Self {
            employee: Employee {
                employee_id: id.to_string(),
                username: id.to_lowercase(),
                full_name: full_name.to_string(),
                email: None,
                department_id: None,
                section_id: None,
                employee_level: Some(EmployeeLevel::Middle),
                is_leader: false,
                is_staff: false,
                is_active: true,
                created_at: ts(),
            },
        }
    }

    pub fn department(mut self, id: &str) -> Self {
        self.employee.department_id = Some(id.to_string());
        self
    }

    pub fn section(mut self, id: &str) -> Self {
        self.employee.section_id = Some(id.to_string());
        self
    }

    pub fn level(mut self, level: EmployeeLevel) -> Self {
        self.employee.employee_level = Some(level);
        self
    }

    pub fn leader(mut self) -> Self {
        self.employee.is_leader = true;
        self
    }

    pub fn staff(mut self) -> Self {
        self.employee.is_staff = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.employee.is_active = false;
        self
    }

    pub fn build(self) -> Employee {
        self.employee
    }
}

pub fn project(id: &str, name: &str, department_id: &str) -> Project {
    Project {
        project_id: id.to_string(),
        name: name.to_string(),
        department_id: department_id.to_string(),
        status: "active".to_string(),
        classification: "development".to_string(),
        client_name: Some("株式会社テスト".to_string()),
        order_date: None,
        planned_end_date: None,
        actual_end_date: None,
        budget_amount: None,
        is_active: true,
        created_at: ts(),
    }
}

pub fn ticket(id: &str, project_id: &str, title: &str) -> ProjectTicket {
    ProjectTicket {
        ticket_id: id.to_string(),
        project_id: project_id.to_string(),
        title: title.to_string(),
        case_classification: CaseClassification::Development,
        is_active: true,
        created_at: ts(),
    }
}

/// 月额单价输入（万円）
pub fn monthly_cost_master(
    department_id: &str,
    level: Option<EmployeeLevel>,
    cost: Decimal,
    billing: Decimal,
    effective_from: NaiveDate,
) -> CostMasterInput {
    CostMasterInput {
        department_id: department_id.to_string(),
        employee_level: level,
        billing_type: BillingType::Monthly,
        cost: RateSet {
            monthly: Some(cost),
            ..Default::default()
        },
        billing: RateSet {
            monthly: Some(billing),
            ..Default::default()
        },
        overtime_rate: None,
        holiday_rate: None,
        discount_rate: None,
        minimum_billing_amount: None,
        client_name: None,
        contract_type: None,
        payment_terms: None,
        special_conditions: None,
        effective_from,
        effective_to: None,
    }
}

/// 写入标准测试数据
pub fn seed_standard_data(
    conn: &Arc<Mutex<Connection>>,
    state: &AppState,
) -> Result<SeedIds, Box<dyn Error>> {
    let org = OrganizationRepository::from_connection(conn.clone());
    let projects = ProjectRepository::from_connection(conn.clone());

    org.insert_department(&department("D-DEV", "開発部"))?;
    org.insert_department(&department("D-SALES", "営業部"))?;
    org.insert_section(&section("S-DEV1", "D-DEV", "第一課"))?;
    org.insert_section(&section("S-DEV2", "D-DEV", "第二課"))?;

    org.insert_employee(&EmployeeBuilder::new("E-ADMIN", "管理 太郎").staff().build())?;
    org.insert_employee(
        &EmployeeBuilder::new("E-LEADER", "課長 花子")
            .department("D-DEV")
            .section("S-DEV1")
            .level(EmployeeLevel::Lead)
            .leader()
            .build(),
    )?;
    org.insert_employee(
        &EmployeeBuilder::new("E-MEMBER", "開発 一郎")
            .department("D-DEV")
            .section("S-DEV1")
            .build(),
    )?;
    org.insert_employee(
        &EmployeeBuilder::new("E-NEWBIE", "新人 次郎")
            .department("D-DEV")
            .section("S-DEV1")
            .level(EmployeeLevel::Junior)
            .build(),
    )?;
    org.insert_employee(
        &EmployeeBuilder::new("E-SALES", "営業 三郎")
            .department("D-SALES")
            .build(),
    )?;

    projects.insert_project(&project("P-CORE", "基幹刷新", "D-DEV"))?;
    projects.insert_project(&project("P-MAINT", "保守対応", "D-DEV"))?;
    projects.insert_ticket(&ticket("T-CORE-1", "P-CORE", "要件定義"))?;
    projects.insert_ticket(&ticket("T-CORE-2", "P-CORE", "基本設計"))?;
    projects.insert_ticket(&ticket("T-MAINT-1", "P-MAINT", "定期保守"))?;

    let master = state.cost_master_api.create(monthly_cost_master(
        "D-DEV",
        None,
        dec!(60),
        dec!(80),
        date(2020, 1, 1),
    ))?;

    Ok(SeedIds {
        dept_dev: "D-DEV".to_string(),
        dept_sales: "D-SALES".to_string(),
        section_dev1: "S-DEV1".to_string(),
        section_dev2: "S-DEV2".to_string(),
        admin: "E-ADMIN".to_string(),
        leader: "E-LEADER".to_string(),
        member: "E-MEMBER".to_string(),
        newbie: "E-NEWBIE".to_string(),
        sales: "E-SALES".to_string(),
        project_core: "P-CORE".to_string(),
        project_maint: "P-MAINT".to_string(),
        ticket_core_1: "T-CORE-1".to_string(),
        ticket_core_2: "T-CORE-2".to_string(),
        ticket_maint_1: "T-MAINT-1".to_string(),
        cost_master_dev: master.cost_master_id,
    })
}
