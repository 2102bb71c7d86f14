use crate::calc::{derive_month_list, DateRange, MonthKey, PercentageMap};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationType {
    #[default]
    Project,
    Vacation,
    Maternity,
    Prospect,
}

impl AllocationType {
    /// Only project allocations point at a project; the rest send `projectId: null`.
    pub fn requires_project(&self) -> bool {
        matches!(self, AllocationType::Project)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AllocationType::Project => "Project",
            AllocationType::Vacation => "Vacation",
            AllocationType::Maternity => "Maternity",
            AllocationType::Prospect => "Prospect",
        }
    }
}

/// One month of a per-month allocation as exchanged with the backend.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthlyAllocation {
    pub year: i32,
    pub month: u32,
    pub percentage: u8,
}

impl MonthlyAllocation {
    pub fn new(key: MonthKey, percentage: u8) -> Self {
        MonthlyAllocation {
            year: key.year(),
            month: key.month(),
            percentage,
        }
    }

    pub fn key(&self) -> Option<MonthKey> {
        MonthKey::new(self.year, self.month)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: u64,
    pub employee_id: u64,
    pub project_id: Option<u64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocation_type: AllocationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_month_allocation: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monthly_allocations: Vec<MonthlyAllocation>,
}

impl Allocation {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn is_per_month(&self) -> bool {
        !self.monthly_allocations.is_empty()
    }

    /// Month → percentage as stored. A uniform allocation yields its value for
    /// every month in range.
    pub fn percentage_map(&self) -> PercentageMap {
        if self.is_per_month() {
            return self
                .monthly_allocations
                .iter()
                .filter_map(|m| m.key().map(|key| (key, Some(m.percentage))))
                .collect();
        }
        derive_month_list(&self.range())
            .unwrap_or_default()
            .into_iter()
            .map(|entry| (entry.key, self.current_month_allocation))
            .collect()
    }

    /// Percentage in effect for `key`, or None when the month is outside the allocation.
    pub fn percentage_for(&self, key: MonthKey) -> Option<u8> {
        self.percentage_map().get(&key).copied().flatten()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllocationRequest {
    pub employee_id: u64,
    pub project_id: Option<u64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocation_type: AllocationType,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_month_allocation: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_allocations: Option<Vec<MonthlyAllocation>>,
}

/// Replacement of an existing allocation. `monthly_allocations` carries only
/// the months that changed since editing started.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAllocationRequest {
    pub employee_id: u64,
    pub project_id: Option<u64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocation_type: AllocationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_month_allocation: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_allocations: Option<Vec<MonthlyAllocation>>,
}
