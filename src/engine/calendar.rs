// ==========================================
// 工数管理系统 - 营业日历引擎
// ==========================================
// 职责: 土日/国民祝日/公司休日判定, 营业日计数, 月历信息
// 祝日规则适用范围: 2000-2099 年
// ==========================================

use crate::domain::workload::YearMonth;
use crate::i18n;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// HolidayCalendar - 休日判定接口
// ==========================================
pub trait HolidayCalendar: Send + Sync {
    /// 休日名称（非休日返回 None）
    fn holiday_name(&self, date: NaiveDate) -> Option<String>;

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_name(date).is_some()
    }
}

// ==========================================
// JapaneseHolidayCalendar - 日本国民祝日 + 公司休日
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct JapaneseHolidayCalendar {
    company_holidays: BTreeMap<NaiveDate, String>,
}

impl JapaneseHolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// 附加公司休日（年末年始・夏季休暇等）
    pub fn with_company_holidays<I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, String)>,
    {
        Self {
            company_holidays: holidays.into_iter().collect(),
        }
    }

    /// 指定年份的国民祝日（含振替休日・国民の休日）
    pub fn national_holidays(year: i32) -> BTreeMap<NaiveDate, String> {
        let mut base: BTreeMap<NaiveDate, String> = BTreeMap::new();
        let mut add = |month: u32, day: u32, name: &str| {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                base.insert(date, name.to_string());
            }
        };

        add(1, 1, "元日");
        if let Some(day) = nth_monday(year, 1, 2) {
            add(1, day, "成人の日");
        }
        add(2, 11, "建国記念の日");
        if year >= 2020 {
            add(2, 23, "天皇誕生日");
        } else if year <= 2018 {
            add(12, 23, "天皇誕生日");
        }
        if let Some(day) = vernal_equinox_day(year) {
            add(3, day, "春分の日");
        }
        add(4, 29, "昭和の日");
        add(5, 3, "憲法記念日");
        if year >= 2007 {
            add(5, 4, "みどりの日");
        }
        add(5, 5, "こどもの日");

        match year {
            2020 => {
                add(7, 23, "海の日");
                add(7, 24, "スポーツの日");
                add(8, 10, "山の日");
            }
            2021 => {
                add(7, 22, "海の日");
                add(7, 23, "スポーツの日");
                add(8, 8, "山の日");
            }
            _ => {
                if let Some(day) = nth_monday(year, 7, 3) {
                    add(7, day, "海の日");
                }
                if year >= 2016 {
                    add(8, 11, "山の日");
                }
                if let Some(day) = nth_monday(year, 10, 2) {
                    add(10, day, if year >= 2020 { "スポーツの日" } else { "体育の日" });
                }
            }
        }

        if let Some(day) = nth_monday(year, 9, 3) {
            add(9, day, "敬老の日");
        }
        if let Some(day) = autumnal_equinox_day(year) {
            add(9, day, "秋分の日");
        }
        add(11, 3, "文化の日");
        add(11, 23, "勤労感謝の日");

        if year == 2019 {
            add(5, 1, "天皇の即位の日");
            add(10, 22, "即位礼正殿の儀の行われる日");
        }

        let mut holidays = base.clone();

        // 国民の休日: 前日と翌日が祝日である平日
        for date in base.keys() {
            let candidate = *date + Duration::days(1);
            let next = candidate + Duration::days(1);
            if !base.contains_key(&candidate)
                && base.contains_key(&next)
                && candidate.weekday() != Weekday::Sun
            {
                holidays.insert(candidate, "国民の休日".to_string());
            }
        }

        // 振替休日: 日曜の祝日 → 之后第一个非祝日
        for date in base.keys().filter(|d| d.weekday() == Weekday::Sun) {
            let mut substitute = *date + Duration::days(1);
            while holidays.contains_key(&substitute) {
                substitute += Duration::days(1);
            }
            holidays.insert(substitute, "振替休日".to_string());
        }

        holidays
    }
}

impl HolidayCalendar for JapaneseHolidayCalendar {
    fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        if let Some(name) = self.company_holidays.get(&date) {
            return Some(name.clone());
        }
        Self::national_holidays(date.year()).remove(&date)
    }
}

/// 第 n 个星期一的日
fn nth_monday(year: i32, month: u32, n: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (7 - first.weekday().num_days_from_monday()) % 7;
    Some(1 + offset + 7 * (n - 1))
}

// 春分/秋分近似式 (1980-2099): floor(base + 0.242194 × (y-1980)) - floor((y-1980)/4)
fn equinox_day(year: i32, base_micro: i64) -> Option<u32> {
    if !(1980..=2099).contains(&year) {
        return None;
    }
    let n = (year - 1980) as i64;
    let day = (base_micro + 242_194 * n) / 1_000_000 - n / 4;
    u32::try_from(day).ok()
}

fn vernal_equinox_day(year: i32) -> Option<u32> {
    equinox_day(year, 20_843_100)
}

fn autumnal_equinox_day(year: i32) -> Option<u32> {
    equinox_day(year, 23_248_800)
}

// ==========================================
// BusinessCalendar - 营业日计算
// ==========================================

/// 日期种别（画面着色用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Weekday,
    Saturday,
    Holiday, // 日曜・祝日・公司休日
}

/// 月历中一天的信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayInfo {
    pub day: u32,
    pub date: NaiveDate,
    pub weekday: u32, // 0=月 .. 6=日
    pub weekday_name: String,
    pub is_saturday: bool,
    pub is_sunday: bool,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
    pub kind: DayKind,
    pub display_text: String,
}

pub struct BusinessCalendar<C: HolidayCalendar = JapaneseHolidayCalendar> {
    holidays: C,
}

impl BusinessCalendar<JapaneseHolidayCalendar> {
    /// 仅国民祝日
    pub fn japanese() -> Self {
        Self::new(JapaneseHolidayCalendar::new())
    }
}

impl<C: HolidayCalendar> BusinessCalendar<C> {
    pub fn new(holidays: C) -> Self {
        Self { holidays }
    }

    pub fn holidays(&self) -> &C {
        &self.holidays
    }

    /// 营业日: 非土日且非休日
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.is_holiday(date)
    }

    /// [from, to] 闭区间内的营业日数（from > to 时为 0）
    pub fn count_business_days(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        if from > to {
            return 0;
        }
        from.iter_days()
            .take_while(|d| *d <= to)
            .filter(|d| self.is_business_day(*d))
            .count() as u32
    }

    /// 月历（工数日历画面用）
    pub fn month_calendar(&self, year_month: YearMonth) -> Vec<DayInfo> {
        (1..=year_month.days_in_month())
            .filter_map(|day| year_month.date(day))
            .map(|date| self.day_info(date))
            .collect()
    }

    pub fn day_info(&self, date: NaiveDate) -> DayInfo {
        let weekday = date.weekday();
        let weekday_name = i18n::t(&format!("weekday.{}", weekday_key(weekday)));
        let is_saturday = weekday == Weekday::Sat;
        let is_sunday = weekday == Weekday::Sun;
        let holiday_name = self.holidays.holiday_name(date);
        let is_holiday = holiday_name.is_some();
        let kind = if is_holiday || is_sunday {
            DayKind::Holiday
        } else if is_saturday {
            DayKind::Saturday
        } else {
            DayKind::Weekday
        };
        DayInfo {
            day: date.day(),
            date,
            weekday: weekday.num_days_from_monday(),
            display_text: format!("{}{}", date.day(), weekday_name),
            weekday_name,
            is_saturday,
            is_sunday,
            is_holiday,
            holiday_name,
            kind,
        }
    }
}

fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}
