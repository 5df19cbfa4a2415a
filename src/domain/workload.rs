// ==========================================
// 工数管理系统 - 工数领域模型
// ==========================================
// 职责: 月度工数行 (社员 × 项目 × 工单 × 年月, 31 个日列)
// 约束: 日 1..=31, 小时 0..=24, 不可在当月不存在的日期填写
// ==========================================

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::units::{hours_to_person_days, MAX_HOURS_PER_DAY};

/// 每行日列数
pub const DAY_COLUMNS: usize = 31;

// ==========================================
// YearMonth - 年月 ("YYYY-MM")
// ==========================================
/// 可登记的年份范围
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    // 月初日期; 构造时即确定, 之后的日期运算不再失败
    first: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            first: date - Duration::days(i64::from(date.day0())),
        }
    }

    /// 当前月（本地时间）
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    /// 月初
    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// 月末
    pub fn last_day(&self) -> NaiveDate {
        self.first + Duration::days(i64::from(self.days_in_month()) - 1)
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            2 if is_leap_year(self.year()) => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// 当月第 day 日（不存在则 None）
    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        self.first.with_day(day)
    }

    pub fn previous(&self) -> Self {
        Self::from_date(self.first - Duration::days(1))
    }

    pub fn next(&self) -> Self {
        Self {
            first: self.first + Duration::days(i64::from(self.days_in_month())),
        }
    }

    /// from..=to 覆盖的所有年月（升序, 限于 MIN_YEAR..=MAX_YEAR）
    pub fn months_between(from: NaiveDate, to: NaiveDate) -> Vec<YearMonth> {
        let (Some(lower), Some(upper)) = (YearMonth::new(MIN_YEAR, 1), YearMonth::new(MAX_YEAR, 12))
        else {
            return Vec::new();
        };
        let last = YearMonth::from_date(to).min(upper);
        let mut cursor = YearMonth::from_date(from).max(lower);
        let mut months = Vec::new();
        while cursor <= last {
            months.push(cursor);
            cursor = cursor.next();
        }
        months
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (y, m) = trimmed
            .split_once('-')
            .ok_or_else(|| format!("年月格式错误(应为YYYY-MM): {}", s))?;
        let year: i32 = y.parse().map_err(|_| format!("年份无效: {}", s))?;
        let month: u32 = m.parse().map_err(|_| format!("月份无效: {}", s))?;
        YearMonth::new(year, month).ok_or_else(|| format!("年月超出范围: {}", s))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

// ==========================================
// WorkloadError - 工数输入错误
// ==========================================
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkloadError {
    #[error("日期无效: day={0} (应为1-31)")]
    InvalidDay(u32),

    #[error("工数超出范围: hours={0} (应为0-24)")]
    HoursOutOfRange(Decimal),

    #[error("{year_month} 不存在第{day}日")]
    DayNotInMonth { year_month: YearMonth, day: u32 },
}

// ==========================================
// Workload - 月度工数行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub workload_id: String,
    pub employee_id: String,
    pub project_id: String,
    pub ticket_id: Option<String>,
    pub year_month: YearMonth,
    pub days: [Decimal; DAY_COLUMNS], // day_01..day_31 (小时)
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Workload {
    /// 新建空工数行
    pub fn new(
        employee_id: impl Into<String>,
        project_id: impl Into<String>,
        ticket_id: Option<String>,
        year_month: YearMonth,
    ) -> Self {
        let now = Local::now().naive_local();
        Self {
            workload_id: uuid::Uuid::new_v4().to_string(),
            employee_id: employee_id.into(),
            project_id: project_id.into(),
            ticket_id,
            year_month,
            days: [Decimal::ZERO; DAY_COLUMNS],
            created_at: now,
            updated_at: now,
        }
    }

    /// 取得第 day 日的工数（范围外返回 0）
    pub fn day_value(&self, day: u32) -> Decimal {
        if (1..=DAY_COLUMNS as u32).contains(&day) {
            self.days[(day - 1) as usize]
        } else {
            Decimal::ZERO
        }
    }

    /// 设置第 day 日的工数
    ///
    /// # 错误
    /// - day 不在 1..=31
    /// - hours 不在 0..=24
    /// - 当月不存在该日（如 2 月 30 日）
    pub fn set_day_value(&mut self, day: u32, hours: Decimal) -> Result<(), WorkloadError> {
        if !(1..=DAY_COLUMNS as u32).contains(&day) {
            return Err(WorkloadError::InvalidDay(day));
        }
        if hours.is_sign_negative() || hours > MAX_HOURS_PER_DAY {
            return Err(WorkloadError::HoursOutOfRange(hours));
        }
        if day > self.year_month.days_in_month() && !hours.is_zero() {
            return Err(WorkloadError::DayNotInMonth {
                year_month: self.year_month,
                day,
            });
        }
        self.days[(day - 1) as usize] = hours;
        self.updated_at = Local::now().naive_local();
        Ok(())
    }

    /// 合计小时
    pub fn total_hours(&self) -> Decimal {
        self.days.iter().copied().sum()
    }

    /// 合计人日
    pub fn total_days(&self) -> Decimal {
        hours_to_person_days(self.total_hours())
    }

    /// from..=to 窗口内的小时合计
    pub fn hours_between(&self, from: NaiveDate, to: NaiveDate) -> Decimal {
        self.dated_hours()
            .filter(|(date, _)| *date >= from && *date <= to)
            .map(|(_, hours)| hours)
            .sum()
    }

    /// (日期, 小时) 迭代，只包含当月实际存在的日期
    pub fn dated_hours(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        (1..=self.year_month.days_in_month()).filter_map(move |day| {
            self.year_month
                .date(day)
                .map(|date| (date, self.days[(day - 1) as usize]))
        })
    }

    /// 校验: 当月不存在的日期不可有工数
    pub fn validate_against_month(&self) -> Result<(), WorkloadError> {
        let days_in_month = self.year_month.days_in_month();
        for day in (days_in_month + 1)..=DAY_COLUMNS as u32 {
            if !self.days[(day - 1) as usize].is_zero() {
                return Err(WorkloadError::DayNotInMonth {
                    year_month: self.year_month,
                    day,
                });
            }
        }
        for (idx, hours) in self.days.iter().enumerate() {
            if hours.is_sign_negative() || *hours > MAX_HOURS_PER_DAY {
                tracing::debug!(day = idx + 1, %hours, "工数超出范围");
                return Err(WorkloadError::HoursOutOfRange(*hours));
            }
        }
        Ok(())
    }
}
