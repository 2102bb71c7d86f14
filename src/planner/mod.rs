//! The allocation form: month list, percentage plan, confirmation gates and
//! the payload sent on submit.

pub mod confirm;
pub mod form;
pub mod payload;

pub use confirm::{AssumeYes, Confirm, PromptConfirm};
pub use form::{AllocationTarget, PlanMode, Planner, Proposal, SubmitOutcome};
