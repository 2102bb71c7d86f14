pub mod month;
pub mod percentage;
pub mod reconcile;

pub use month::{derive_month_list, mark_past, month_keys, DateRange, MonthEntry, MonthKey};
pub use percentage::{clamp_percentage, parse_live_input, parse_percentage, validate_percentage};
pub use reconcile::{
    compute_changed_months, lock_past_history, missing_labels, monthly_list, placeholder_map,
    reconcile_on_range_change, Inherit, PercentageMap, Reconciliation,
};
