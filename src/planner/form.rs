use crate::api::AllocationApi;
use crate::api::local::project_for;
use crate::calc::{
    derive_month_list, lock_past_history, missing_labels, month_keys, parse_live_input,
    placeholder_map, reconcile_on_range_change, clamp_percentage, validate_percentage, DateRange,
    Inherit, MonthEntry, MonthKey, PercentageMap, Reconciliation,
};
use crate::data::{Allocation, AllocationType, CreateAllocationRequest, UpdateAllocationRequest};
use crate::error::PlanError;
use crate::planner::confirm::{confirm_destructive_change, Confirm};
use crate::planner::payload::{flatten_for_submit, AllocationPayload, Submission};
use chrono::{Datelike, NaiveDate};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlanMode {
    #[default]
    Uniform,
    PerMonth,
}

impl PlanMode {
    pub fn toggled(self) -> Self {
        match self {
            PlanMode::Uniform => PlanMode::PerMonth,
            PlanMode::PerMonth => PlanMode::Uniform,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanMode::Uniform => "Same every month",
            PlanMode::PerMonth => "Per month",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    pub mode: PlanMode,
    pub uniform_value: Option<u8>,
    pub monthly: PercentageMap,
    pub range: DateRange,
}

/// `Closed → Editing(Uniform) ⇄ Editing(PerMonth) → Submitting → Closed`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormState {
    Closed,
    Editing(PlanMode),
    Submitting,
}

/// The non-percentage fields of the form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationTarget {
    pub employee_id: Option<u64>,
    pub project_id: Option<u64>,
    pub allocation_type: AllocationType,
}

/// Captured when an existing allocation is opened for editing.
#[derive(Clone, Debug)]
struct EditSession {
    allocation: Allocation,
    original: PercentageMap,
}

#[derive(Clone, Debug)]
enum PendingChange {
    Range {
        range: DateRange,
        months: Vec<MonthEntry>,
        monthly: PercentageMap,
    },
    Mode(PlanMode),
}

/// Result of proposing a change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Proposal {
    Applied,
    /// The change would discard the values of these months; call
    /// [`Planner::resolve_pending`] with the user's answer.
    NeedsConfirmation(Vec<MonthKey>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Allocation),
    Updated(Allocation),
    NoChanges,
    /// The backend refused; the form is editable again with all values intact.
    Failed(String),
}

/// One allocation form. Owns its plan exclusively; create one per form.
pub struct Planner {
    today: NaiveDate,
    state: FormState,
    target: AllocationTarget,
    plan: AllocationPlan,
    months: Vec<MonthEntry>,
    session: Option<EditSession>,
    pending: Option<PendingChange>,
}

impl Planner {
    /// `today` decides which months count as past.
    pub fn new(today: NaiveDate) -> Self {
        Planner {
            today,
            state: FormState::Closed,
            target: AllocationTarget::default(),
            plan: AllocationPlan::default(),
            months: Vec::new(),
            session: None,
            pending: None,
        }
    }

    pub fn open_create(&mut self, target: AllocationTarget) {
        self.reset();
        self.target = target;
        self.state = FormState::Editing(PlanMode::Uniform);
        tracing::debug!("allocation form opened for create");
    }

    pub fn open_edit(&mut self, allocation: &Allocation) -> Result<(), PlanError> {
        self.reset();
        let mut months = derive_month_list(&allocation.range())?;
        let original = allocation.percentage_map();
        lock_past_history(&mut months, self.today, &original);
        let mode = if allocation.is_per_month() {
            PlanMode::PerMonth
        } else {
            PlanMode::Uniform
        };

        self.target = AllocationTarget {
            employee_id: Some(allocation.employee_id),
            project_id: allocation.project_id,
            allocation_type: allocation.allocation_type,
        };
        self.plan = AllocationPlan {
            mode,
            uniform_value: allocation.current_month_allocation,
            monthly: months
                .iter()
                .map(|m| (m.key, original.get(&m.key).copied().flatten()))
                .collect(),
            range: allocation.range(),
        };
        self.months = months;
        self.session = Some(EditSession {
            allocation: allocation.clone(),
            original,
        });
        self.state = FormState::Editing(mode);
        tracing::debug!(id = allocation.id, mode = ?mode, "allocation form opened for edit");
        Ok(())
    }

    pub fn close(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.state = FormState::Closed;
        self.target = AllocationTarget::default();
        self.plan = AllocationPlan::default();
        self.months.clear();
        self.session = None;
        self.pending = None;
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn mode(&self) -> PlanMode {
        self.plan.mode
    }

    pub fn plan(&self) -> &AllocationPlan {
        &self.plan
    }

    pub fn range(&self) -> DateRange {
        self.plan.range
    }

    pub fn months(&self) -> &[MonthEntry] {
        &self.months
    }

    pub fn target(&self) -> &AllocationTarget {
        &self.target
    }

    pub fn is_edit(&self) -> bool {
        self.session.is_some()
    }

    pub fn editing_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.allocation.id)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn value(&self, key: &MonthKey) -> Option<u8> {
        self.plan.monthly.get(key).copied().flatten()
    }

    fn ensure_editable(&self) -> Result<PlanMode, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::ChangePending);
        }
        match self.state {
            FormState::Editing(mode) => Ok(mode),
            _ => Err(PlanError::NotEditing),
        }
    }

    fn inherit(&self) -> Inherit<'_> {
        match &self.session {
            Some(session) => Inherit::Prior {
                historical: &session.original,
                uniform: self.plan.uniform_value,
            },
            None => Inherit::Nothing,
        }
    }

    pub fn set_employee(&mut self, employee_id: u64) -> Result<(), PlanError> {
        self.ensure_editable()?;
        self.target.employee_id = Some(employee_id);
        Ok(())
    }

    pub fn set_project(&mut self, project_id: Option<u64>) -> Result<(), PlanError> {
        self.ensure_editable()?;
        self.target.project_id = project_id;
        Ok(())
    }

    pub fn set_allocation_type(&mut self, allocation_type: AllocationType) -> Result<(), PlanError> {
        self.ensure_editable()?;
        self.target.allocation_type = allocation_type;
        Ok(())
    }

    /// Starts a range change. Non-destructive changes apply at once; a change
    /// that would drop entered per-month values waits for `resolve_pending`.
    pub fn propose_range(&mut self, range: DateRange) -> Result<Proposal, PlanError> {
        let mode = self.ensure_editable()?;
        let mut months = derive_month_list(&range)?;
        let new_keys = month_keys(&months);
        if let Some(session) = &self.session {
            // Past months keep their history; the range may not drop them
            if let Some(dropped) = self
                .months
                .iter()
                .find(|m| m.locked() && !new_keys.contains(&m.key))
            {
                return Err(PlanError::LockedMonth(dropped.key));
            }
            lock_past_history(&mut months, self.today, &session.original);
        }
        let Reconciliation {
            updated_map,
            removed_keys,
        } = reconcile_on_range_change(
            &self.plan.monthly,
            &month_keys(&self.months),
            &new_keys,
            self.inherit(),
        );
        let change = PendingChange::Range {
            range,
            months,
            monthly: updated_map,
        };
        if mode == PlanMode::PerMonth && !removed_keys.is_empty() {
            self.pending = Some(change);
            return Ok(Proposal::NeedsConfirmation(removed_keys));
        }
        self.apply(change);
        Ok(Proposal::Applied)
    }

    /// Starts a mode toggle. Leaving per-month mode with values entered needs
    /// confirmation. Locked months keep their values and are never listed.
    pub fn propose_mode(&mut self, mode: PlanMode) -> Result<Proposal, PlanError> {
        let current = self.ensure_editable()?;
        if current == mode {
            return Ok(Proposal::Applied);
        }
        if current == PlanMode::PerMonth {
            let defined: Vec<MonthKey> = self
                .months
                .iter()
                .filter(|m| !m.locked() && self.value(&m.key).is_some())
                .map(|m| m.key)
                .collect();
            if !defined.is_empty() {
                self.pending = Some(PendingChange::Mode(mode));
                return Ok(Proposal::NeedsConfirmation(defined));
            }
        }
        self.apply(PendingChange::Mode(mode));
        Ok(Proposal::Applied)
    }

    /// Applies or drops the waiting change. Declining leaves the plan exactly
    /// as it was before the proposal. Returns whether a change was applied.
    pub fn resolve_pending(&mut self, accept: bool) -> bool {
        let Some(change) = self.pending.take() else {
            return false;
        };
        tracing::info!(accept, "pending change resolved");
        if accept {
            self.apply(change);
        }
        accept
    }

    fn apply(&mut self, change: PendingChange) {
        match change {
            PendingChange::Range {
                range,
                months,
                monthly,
            } => {
                tracing::debug!(
                    start = ?range.start,
                    end = ?range.end,
                    months = months.len(),
                    "range applied"
                );
                self.plan.range = range;
                self.months = months;
                self.plan.monthly = monthly;
            }
            PendingChange::Mode(mode) => {
                match mode {
                    PlanMode::Uniform => {
                        let mut monthly = placeholder_map(&month_keys(&self.months));
                        for entry in self.months.iter().filter(|m| m.locked()) {
                            monthly.insert(entry.key, self.value(&entry.key));
                        }
                        self.plan.monthly = monthly;
                    }
                    PlanMode::PerMonth => {
                        let inherit = self.inherit();
                        let seeded: PercentageMap = self
                            .plan
                            .monthly
                            .iter()
                            .map(|(key, value)| (*key, value.or_else(|| inherit.value_for(key))))
                            .collect();
                        self.plan.monthly = seeded;
                    }
                }
                self.plan.mode = mode;
                self.state = FormState::Editing(mode);
                tracing::debug!(mode = ?mode, "mode applied");
            }
        }
    }

    /// Range change with the confirmation gate asked synchronously.
    /// Returns false when the user declined; the previous range is kept.
    pub fn change_range(
        &mut self,
        range: DateRange,
        confirm: &mut dyn Confirm,
    ) -> Result<bool, PlanError> {
        match self.propose_range(range)? {
            Proposal::Applied => Ok(true),
            Proposal::NeedsConfirmation(removed) => {
                let accepted = confirm_destructive_change(&removed, confirm);
                Ok(self.resolve_pending(accepted))
            }
        }
    }

    /// Mode toggle with the confirmation gate asked synchronously.
    pub fn change_mode(
        &mut self,
        mode: PlanMode,
        confirm: &mut dyn Confirm,
    ) -> Result<bool, PlanError> {
        match self.propose_mode(mode)? {
            Proposal::Applied => Ok(true),
            Proposal::NeedsConfirmation(removed) => {
                let accepted = confirm_destructive_change(&removed, confirm);
                Ok(self.resolve_pending(accepted))
            }
        }
    }

    /// Live edit of the uniform value. Clamps, never rejects.
    pub fn set_uniform(&mut self, value: i64) -> Result<u8, PlanError> {
        self.ensure_editable()?;
        let pct = clamp_percentage(value);
        self.plan.uniform_value = Some(pct);
        Ok(pct)
    }

    /// Live edit from a text box. An empty box unsets the value.
    pub fn set_uniform_input(&mut self, input: &str) -> Result<Option<u8>, PlanError> {
        self.ensure_editable()?;
        self.plan.uniform_value = parse_live_input(input);
        Ok(self.plan.uniform_value)
    }

    fn editable_month(&self, key: &MonthKey) -> Result<(), PlanError> {
        self.ensure_editable()?;
        let entry = self
            .months
            .iter()
            .find(|m| m.key == *key)
            .ok_or(PlanError::UnknownMonth(*key))?;
        if entry.locked() {
            return Err(PlanError::LockedMonth(*key));
        }
        Ok(())
    }

    /// Live edit of one month. Clamps, never rejects the value itself.
    pub fn set_month_value(&mut self, key: MonthKey, value: i64) -> Result<u8, PlanError> {
        self.editable_month(&key)?;
        let pct = clamp_percentage(value);
        self.plan.monthly.insert(key, Some(pct));
        Ok(pct)
    }

    pub fn set_month_input(&mut self, key: MonthKey, input: &str) -> Result<Option<u8>, PlanError> {
        self.editable_month(&key)?;
        let pct = parse_live_input(input);
        self.plan.monthly.insert(key, pct);
        Ok(pct)
    }

    /// Full check run before anything is sent.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.target.employee_id.is_none() {
            return Err(PlanError::MissingValue("employee".to_string()));
        }
        if self.target.allocation_type.requires_project() && self.target.project_id.is_none() {
            return Err(PlanError::MissingValue("project".to_string()));
        }
        if self.plan.range.start.is_none() {
            return Err(PlanError::MissingValue("start date".to_string()));
        }
        if self.plan.range.end.is_none() {
            return Err(PlanError::MissingValue("end date".to_string()));
        }
        self.plan.range.validate()?;

        match self.plan.mode {
            PlanMode::Uniform => {
                let pct = self
                    .plan
                    .uniform_value
                    .ok_or_else(|| PlanError::MissingValue("percentage".to_string()))?;
                validate_percentage(pct as i64)?;
            }
            PlanMode::PerMonth => {
                let missing = missing_labels(&self.plan.monthly, &self.months);
                if !missing.is_empty() {
                    return Err(PlanError::missing_months(&missing));
                }
                for entry in self.months.iter().filter(|m| !m.locked()) {
                    if let Some(pct) = self.value(&entry.key) {
                        validate_percentage(pct as i64)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Validates and builds the backend request. Moves the form to `Submitting`,
    /// or closes it when there is nothing to send.
    pub fn begin_submit(&mut self) -> Result<Submission, PlanError> {
        self.ensure_editable()?;
        self.validate()?;
        let (Some(start), Some(end), Some(employee_id)) = (
            self.plan.range.start,
            self.plan.range.end,
            self.target.employee_id,
        ) else {
            return Err(PlanError::MissingValue("date range".to_string()));
        };
        let project_id = project_for(self.target.allocation_type, self.target.project_id);
        let original = self.session.as_ref().map(|s| &s.original);
        let payload = flatten_for_submit(&self.plan, &self.months, original)
            .ok_or_else(|| PlanError::MissingValue("percentage".to_string()))?;

        let submission = match &self.session {
            None => {
                let (current_month_allocation, monthly_allocations) = payload.split();
                Submission::Create(CreateAllocationRequest {
                    employee_id,
                    project_id,
                    start_date: start,
                    end_date: end,
                    allocation_type: self.target.allocation_type,
                    year: start.year(),
                    current_month_allocation,
                    monthly_allocations,
                })
            }
            Some(session) => {
                let before = &session.allocation;
                let unchanged_fields = before.start_date == start
                    && before.end_date == end
                    && before.employee_id == employee_id
                    && before.project_id == project_id
                    && before.allocation_type == self.target.allocation_type;
                let unchanged_values = match &payload {
                    AllocationPayload::Uniform(pct) => {
                        !before.is_per_month() && before.current_month_allocation == Some(*pct)
                    }
                    AllocationPayload::Monthly(changed) => changed.is_empty(),
                };
                if unchanged_fields && unchanged_values {
                    Submission::NoOp
                } else {
                    let (current_month_allocation, monthly_allocations) = payload.split();
                    Submission::Update {
                        id: before.id,
                        request: UpdateAllocationRequest {
                            employee_id,
                            project_id,
                            start_date: start,
                            end_date: end,
                            allocation_type: self.target.allocation_type,
                            current_month_allocation,
                            monthly_allocations,
                        },
                    }
                }
            }
        };

        if submission == Submission::NoOp {
            tracing::info!("no changes to save");
            self.close();
        } else {
            self.state = FormState::Submitting;
        }
        Ok(submission)
    }

    /// The backend accepted the submission.
    pub fn complete_submit(&mut self) {
        if self.state == FormState::Submitting {
            self.close();
        }
    }

    /// The backend refused. Back to editing with every value intact.
    pub fn fail_submit(&mut self) {
        if self.state == FormState::Submitting {
            self.state = FormState::Editing(self.plan.mode);
        }
    }

    /// Runs the whole submit against `api`. Validation errors come back as
    /// `Err` before any call; backend errors come back as `Failed`.
    pub fn submit(&mut self, api: &mut dyn AllocationApi) -> Result<SubmitOutcome, PlanError> {
        let submission = self.begin_submit()?;
        let result = match &submission {
            Submission::NoOp => return Ok(SubmitOutcome::NoChanges),
            Submission::Create(request) => {
                api.create_allocation(request).map(SubmitOutcome::Created)
            }
            Submission::Update { id, request } => {
                api.replace_allocation(*id, request).map(SubmitOutcome::Updated)
            }
        };
        match result {
            Ok(outcome) => {
                self.complete_submit();
                Ok(outcome)
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(error = %message, "submission failed");
                self.fail_submit();
                Ok(SubmitOutcome::Failed(message))
            }
        }
    }
}
