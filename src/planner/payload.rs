use crate::calc::{compute_changed_months, monthly_list, MonthEntry, PercentageMap};
use crate::data::{CreateAllocationRequest, MonthlyAllocation, UpdateAllocationRequest};
use crate::planner::form::{AllocationPlan, PlanMode};

/// The percentage part of a submit payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationPayload {
    Uniform(u8),
    Monthly(Vec<MonthlyAllocation>),
}

impl AllocationPayload {
    pub fn split(self) -> (Option<u8>, Option<Vec<MonthlyAllocation>>) {
        match self {
            AllocationPayload::Uniform(pct) => (Some(pct), None),
            AllocationPayload::Monthly(months) => (None, Some(months)),
        }
    }
}

/// Flattens a validated plan. Per-month plans send every month when creating
/// (`original` is None) and only the changed months when updating.
///
/// A uniform update over locked months cannot be a single value, since that
/// would overwrite them; it goes out as the diff of the open months instead.
pub fn flatten_for_submit(
    plan: &AllocationPlan,
    months: &[MonthEntry],
    original: Option<&PercentageMap>,
) -> Option<AllocationPayload> {
    match plan.mode {
        PlanMode::Uniform => {
            let pct = plan.uniform_value?;
            match original {
                Some(original) if months.iter().any(MonthEntry::locked) => {
                    let spread: PercentageMap = months.iter().map(|m| (m.key, Some(pct))).collect();
                    Some(AllocationPayload::Monthly(compute_changed_months(
                        &spread, original, months,
                    )))
                }
                _ => Some(AllocationPayload::Uniform(pct)),
            }
        }
        PlanMode::PerMonth => Some(AllocationPayload::Monthly(match original {
            None => monthly_list(&plan.monthly, months),
            Some(original) => compute_changed_months(&plan.monthly, original, months),
        })),
    }
}

/// What the form wants sent to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Create(CreateAllocationRequest),
    Update {
        id: u64,
        request: UpdateAllocationRequest,
    },
    /// Nothing changed since editing started; no call is made.
    NoOp,
}
