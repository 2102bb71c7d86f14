use crate::calc::month::{mark_past, MonthEntry, MonthKey};
use crate::data::MonthlyAllocation;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Month → percentage. A `None` value is a placeholder the user has not filled in yet.
pub type PercentageMap = BTreeMap<MonthKey, Option<u8>>;

/// Where a month that newly enters the range takes its starting value from.
#[derive(Clone, Copy, Debug)]
pub enum Inherit<'a> {
    /// Create mode: new months stay unset.
    Nothing,
    /// Edit mode: the value the allocation had when editing started, else the
    /// prior uniform value.
    Prior {
        historical: &'a PercentageMap,
        uniform: Option<u8>,
    },
}

impl Inherit<'_> {
    pub fn value_for(&self, key: &MonthKey) -> Option<u8> {
        match self {
            Inherit::Nothing => None,
            Inherit::Prior {
                historical,
                uniform,
            } => historical.get(key).copied().flatten().or(*uniform),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub updated_map: PercentageMap,
    /// Months leaving the range that held a real value. Placeholders are not listed.
    pub removed_keys: Vec<MonthKey>,
}

/// Re-keys `old_map` onto `new_keys`. Values for surviving months are kept,
/// months entering the range are seeded from `inherit`.
pub fn reconcile_on_range_change(
    old_map: &PercentageMap,
    old_keys: &[MonthKey],
    new_keys: &[MonthKey],
    inherit: Inherit<'_>,
) -> Reconciliation {
    let incoming: BTreeSet<&MonthKey> = new_keys.iter().collect();
    let removed_keys = old_keys
        .iter()
        .filter(|key| !incoming.contains(key))
        .filter(|key| matches!(old_map.get(*key), Some(Some(_))))
        .copied()
        .collect();

    let updated_map = new_keys
        .iter()
        .map(|key| {
            let value = match old_map.get(key) {
                Some(value) => *value,
                None => inherit.value_for(key),
            };
            (*key, value)
        })
        .collect();

    Reconciliation {
        updated_map,
        removed_keys,
    }
}

/// Builds a map with an unset placeholder for every month.
pub fn placeholder_map(keys: &[MonthKey]) -> PercentageMap {
    keys.iter().map(|key| (*key, None)).collect()
}

/// Edit-mode past flags. A past month is locked only when `history` (the
/// stored allocation) holds a value for it; past months new to the range stay
/// open so they can be filled in.
pub fn lock_past_history(months: &mut [MonthEntry], today: NaiveDate, history: &PercentageMap) {
    mark_past(months, today);
    for entry in months.iter_mut() {
        if entry.locked() && !matches!(history.get(&entry.key), Some(Some(_))) {
            entry.is_past = Some(false);
        }
    }
}

/// Labels of the months in `months` that have no value in `map`.
pub fn missing_labels(map: &PercentageMap, months: &[MonthEntry]) -> Vec<String> {
    months
        .iter()
        .filter(|m| !m.locked())
        .filter(|m| map.get(&m.key).copied().flatten().is_none())
        .map(|m| m.label.clone())
        .collect()
}

/// Editable months whose value differs from the one captured at edit start.
/// Locked (past) months are never reported.
pub fn compute_changed_months(
    current: &PercentageMap,
    original: &PercentageMap,
    months: &[MonthEntry],
) -> Vec<MonthlyAllocation> {
    months
        .iter()
        .filter(|m| !m.locked())
        .filter_map(|m| {
            let now = current.get(&m.key).copied().flatten()?;
            let before = original.get(&m.key).copied().flatten();
            (before != Some(now)).then(|| MonthlyAllocation::new(m.key, now))
        })
        .collect()
}

/// The full ordered month list for a create payload. Months without a value are skipped.
pub fn monthly_list(map: &PercentageMap, months: &[MonthEntry]) -> Vec<MonthlyAllocation> {
    months
        .iter()
        .filter_map(|m| {
            map.get(&m.key)
                .copied()
                .flatten()
                .map(|pct| MonthlyAllocation::new(m.key, pct))
        })
        .collect()
}
