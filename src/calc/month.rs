use crate::error::PlanError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Years a [`MonthKey`] can round-trip through its four-digit text form.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// A calendar month. Orders chronologically; text form is `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Returns None unless `month` is 1–12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(MonthKey { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            MonthKey {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Display label, e.g. "Jan 2025".
    pub fn label(&self) -> String {
        format!("{} {}", short_month_name(self.month), self.year)
    }

    /// True iff this month is strictly before the month containing `today`.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        *self < MonthKey::from_date(today)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlanError::InvalidMonthKey(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let (year, month) = (&s[..4], &s[5..]);
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// True iff (year, month) is strictly earlier than the month containing `today`.
/// Out-of-range months are never considered past.
pub fn is_past_month(year: i32, month: u32, today: NaiveDate) -> bool {
    MonthKey::new(year, month)
        .map(|key| key.is_past(today))
        .unwrap_or(false)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthEntry {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub key: MonthKey,
    /// Only populated in edit mode, where `Some(true)` locks the month.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_past: Option<bool>,
}

impl MonthEntry {
    pub fn new(key: MonthKey) -> Self {
        MonthEntry {
            year: key.year(),
            month: key.month(),
            label: key.label(),
            key,
            is_past: None,
        }
    }

    pub fn locked(&self) -> bool {
        self.is_past.unwrap_or(false)
    }
}

/// Calendar date range as typed into a form. Either bound may still be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Rejects a range whose start falls after its end, or that reaches
    /// outside [`SUPPORTED_YEARS`].
    pub fn validate(&self) -> Result<(), PlanError> {
        for date in [self.start, self.end].into_iter().flatten() {
            if !SUPPORTED_YEARS.contains(&date.year()) {
                return Err(PlanError::UnsupportedYear(date.year()));
            }
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(PlanError::InvalidRange { start, end }),
            _ => Ok(()),
        }
    }
}

/// Every calendar month touched by `range`, oldest first. Day-of-month is ignored.
/// Empty when either bound is missing.
pub fn derive_month_list(range: &DateRange) -> Result<Vec<MonthEntry>, PlanError> {
    range.validate()?;
    let (start, end) = match (range.start, range.end) {
        (Some(s), Some(e)) => (s, e),
        _ => return Ok(Vec::new()),
    };
    let last = MonthKey::from_date(end);
    let mut current = MonthKey::from_date(start);
    let mut months = Vec::new();
    while current <= last {
        months.push(MonthEntry::new(current));
        current = current.succ();
    }
    Ok(months)
}

/// Sets `is_past` on every entry relative to `today`.
pub fn mark_past(months: &mut [MonthEntry], today: NaiveDate) {
    for entry in months.iter_mut() {
        entry.is_past = Some(is_past_month(entry.year, entry.month, today));
    }
}

pub fn month_keys(months: &[MonthEntry]) -> Vec<MonthKey> {
    months.iter().map(|m| m.key).collect()
}

pub(crate) fn short_month_name(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "???",
    }
}
