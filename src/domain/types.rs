// ==========================================
// 工数管理系统 - 领域类型定义
// ==========================================
// 职责: 枚举类型 (社员等级/请求类型/状态等)
// 存储: 数据库中统一使用 snake_case 字符串
// 显示: 通过 i18n 层获取本地化名称
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::i18n;

/// 为枚举生成 as_str / parse / display_name / Display
macro_rules! db_enum {
    ($name:ident, $i18n_prefix:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// 全部取值（按声明顺序）
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// 数据库存储字符串
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// 从数据库字符串解析（大小写不敏感）
            pub fn parse(s: &str) -> Option<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// 本地化显示名称
            pub fn display_name(&self) -> String {
                i18n::t(&format!("{}.{}", $i18n_prefix, self.as_str()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

// ==========================================
// 社员等级 (Employee Level)
// ==========================================
// junior 即 "新人", 其工数计入 newbie_workdays
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeLevel {
    Junior,
    Middle,
    Senior,
    Lead,
    Manager,
    Director,
}

db_enum!(EmployeeLevel, "employee_level", {
    Junior => "junior",
    Middle => "middle",
    Senior => "senior",
    Lead => "lead",
    Manager => "manager",
    Director => "director",
});

impl EmployeeLevel {
    /// 是否为新人
    pub fn is_newbie(&self) -> bool {
        matches!(self, EmployeeLevel::Junior)
    }
}

// ==========================================
// 请求类型 (Billing Type)
// ==========================================
// 月额/日额/万円, 时间单价/円, 固定/万円
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    Monthly,
    Daily,
    Hourly,
    Fixed,
}

db_enum!(BillingType, "billing_type", {
    Monthly => "monthly",
    Daily => "daily",
    Hourly => "hourly",
    Fixed => "fixed",
});

// ==========================================
// 契约类型 (Contract Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    QuasiMandate, // 准委任
    Contract,     // 请负
    Dispatch,     // 派遣
    Other,
}

db_enum!(ContractType, "contract_type", {
    QuasiMandate => "quasi_mandate",
    Contract => "contract",
    Dispatch => "dispatch",
    Other => "other",
});

// ==========================================
// 工数汇总状态 (Aggregation Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStatus {
    Planning,
    InProgress,
    Testing,
    Completed,
    OnHold,
    Cancelled,
}

db_enum!(AggregationStatus, "aggregation_status", {
    Planning => "planning",
    InProgress => "in_progress",
    Testing => "testing",
    Completed => "completed",
    OnHold => "on_hold",
    Cancelled => "cancelled",
});

impl AggregationStatus {
    /// 进行中的状态 (企划中/进行中), 用于期限超过判定
    pub fn is_open(&self) -> bool {
        matches!(self, AggregationStatus::Planning | AggregationStatus::InProgress)
    }

    /// 驾驶舱显示颜色
    pub fn color(&self) -> &'static str {
        match self {
            AggregationStatus::Planning => "secondary",
            AggregationStatus::InProgress => "primary",
            AggregationStatus::Testing => "info",
            AggregationStatus::Completed => "success",
            AggregationStatus::OnHold => "warning",
            AggregationStatus::Cancelled => "danger",
        }
    }
}

// ==========================================
// 案件分类 (Case Classification)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseClassification {
    Development,
    Maintenance,
}

db_enum!(CaseClassification, "case_classification", {
    Development => "development",
    Maintenance => "maintenance",
});

// ==========================================
// 外包状态 (Outsourcing Status)
// ==========================================
// 仅 in_progress 计入外包费
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutsourcingStatus {
    NotStarted,
    InProgress,
}

db_enum!(OutsourcingStatus, "outsourcing_status", {
    NotStarted => "not_started",
    InProgress => "in_progress",
});

// ==========================================
// 导出任务 (Report Export)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

db_enum!(ExportStatus, "export_status", {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportType {
    WorkloadAggregation,
    WorkloadDetail,
    ProjectSummary,
    UserWorkload,
}

db_enum!(ExportType, "export_type", {
    WorkloadAggregation => "workload_aggregation",
    WorkloadDetail => "workload_detail",
    ProjectSummary => "project_summary",
    UserWorkload => "user_workload",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

db_enum!(ExportFormat, "export_format", {
    Csv => "csv",
    Json => "json",
});

impl ExportFormat {
    /// 文件扩展名
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// HTTP Content-Type
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}
