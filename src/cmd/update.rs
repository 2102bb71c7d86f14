use crate::api::{AllocationApi, LocalApi};
use crate::calc::{parse_percentage, DateRange};
use crate::cmd::create::{write_outcome, PercentInput};
use crate::data::AllocationType;
use crate::planner::{AssumeYes, Confirm, PlanMode, Planner, PromptConfirm, SubmitOutcome};
use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};

pub struct UpdateArgs {
    pub id: u64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub allocation_type: Option<AllocationType>,
    pub project_id: Option<u64>,
    pub percent: Option<PercentInput>,
}

pub fn run(args: UpdateArgs, yes: bool) -> Result<()> {
    let mut api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let today = Local::now().date_naive();
    let mut confirm: Box<dyn Confirm> = if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(PromptConfirm::new())
    };
    match update(&mut api, args, today, confirm.as_mut())? {
        Some(outcome) => write_outcome(&outcome, &mut std::io::stdout()),
        None => {
            println!("Update cancelled.");
            Ok(())
        }
    }
}

/// Applies the requested edits through the planner. `None` means the user
/// declined a change that would have discarded entered percentages.
pub(crate) fn update(
    api: &mut LocalApi,
    args: UpdateArgs,
    today: NaiveDate,
    confirm: &mut dyn Confirm,
) -> Result<Option<SubmitOutcome>> {
    let existing = api.allocation(args.id)?;
    let mut planner = Planner::new(today);
    planner.open_edit(&existing)?;

    if let Some(allocation_type) = args.allocation_type {
        planner.set_allocation_type(allocation_type)?;
    }
    if let Some(project_id) = args.project_id {
        planner.set_project(Some(project_id))?;
    }

    if args.start.is_some() || args.end.is_some() {
        let current = planner.range();
        let range = DateRange {
            start: args.start.or(current.start),
            end: args.end.or(current.end),
        };
        if !planner.change_range(range, confirm)? {
            return Ok(None);
        }
    }

    match args.percent {
        Some(PercentInput::Uniform(raw)) => {
            let pct = parse_percentage(&raw)?;
            if !planner.change_mode(PlanMode::Uniform, confirm)? {
                return Ok(None);
            }
            planner.set_uniform(i64::from(pct))?;
        }
        Some(PercentInput::PerMonth(months)) => {
            planner.change_mode(PlanMode::PerMonth, confirm)?;
            for m in months {
                planner.set_month_value(m.key, i64::from(m.percentage))?;
            }
        }
        None => {}
    }

    match planner.submit(api)? {
        SubmitOutcome::Failed(msg) => bail!("backend rejected the update: {msg}"),
        outcome => Ok(Some(outcome)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::MonthKey;
    use crate::cmd::create::tests::{args as create_args, d, make_api};
    use crate::cmd::create::{create, MonthAssignment};
    use crate::data::Allocation;
    use crate::error::PlanError;

    fn mk(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn edit(id: u64) -> UpdateArgs {
        UpdateArgs {
            id,
            start: None,
            end: None,
            allocation_type: None,
            project_id: None,
            percent: None,
        }
    }

    fn months(list: &[&str]) -> PercentInput {
        PercentInput::PerMonth(
            list.iter()
                .map(|s| s.parse::<MonthAssignment>().unwrap())
                .collect(),
        )
    }

    /// Jan-Mar 2025 per-month allocation created on Jan 1st.
    fn seed_per_month(api: &mut LocalApi) -> Allocation {
        let percent = months(&["2025-01=50", "2025-02=50", "2025-03=50"]);
        match create(api, create_args(Some(percent)), d(2025, 1, 1)).unwrap() {
            SubmitOutcome::Created(a) => a,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_edits_is_noop() {
        let mut api = make_api();
        let a = seed_per_month(&mut api);
        let outcome = update(&mut api, edit(a.id), d(2025, 1, 5), &mut AssumeYes).unwrap();
        assert_eq!(outcome, Some(SubmitOutcome::NoChanges));
    }

    #[test]
    fn test_change_one_month() {
        let mut api = make_api();
        let a = seed_per_month(&mut api);
        let mut args = edit(a.id);
        args.percent = Some(months(&["2025-03=20"]));
        update(&mut api, args, d(2025, 1, 5), &mut AssumeYes).unwrap();
        let stored = api.allocation(a.id).unwrap();
        assert_eq!(stored.percentage_for(mk(2025, 1)), Some(50));
        assert_eq!(stored.percentage_for(mk(2025, 3)), Some(20));
    }

    #[test]
    fn test_past_month_is_locked() {
        let mut api = make_api();
        let a = seed_per_month(&mut api);
        let mut args = edit(a.id);
        args.percent = Some(months(&["2025-01=20"]));
        let err = update(&mut api, args, d(2025, 2, 10), &mut AssumeYes).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlanError>(),
            Some(&PlanError::LockedMonth(mk(2025, 1)))
        );
    }

    #[test]
    fn test_shrinking_declined_leaves_store_untouched() {
        let mut api = make_api();
        let a = seed_per_month(&mut api);
        let mut args = edit(a.id);
        args.end = Some(d(2025, 1, 31));
        let mut asked = Vec::new();
        let mut decline = |prompt: &str| {
            asked.push(prompt.to_string());
            false
        };
        let outcome = update(&mut api, args, d(2025, 1, 5), &mut decline).unwrap();
        assert_eq!(outcome, None);
        assert_eq!(asked.len(), 1);
        assert!(asked[0].contains("Feb 2025, Mar 2025"));
        assert_eq!(api.allocation(a.id).unwrap(), a);
    }

    #[test]
    fn test_shrinking_accepted_updates_range() {
        let mut api = make_api();
        let a = seed_per_month(&mut api);
        let mut args = edit(a.id);
        args.end = Some(d(2025, 1, 31));
        let outcome = update(&mut api, args, d(2025, 1, 5), &mut AssumeYes).unwrap();
        let Some(SubmitOutcome::Updated(updated)) = outcome else {
            panic!("expected update");
        };
        assert_eq!(updated.end_date, d(2025, 1, 31));
        assert_eq!(updated.monthly_allocations.len(), 1);
    }

    #[test]
    fn test_switch_to_uniform_needs_confirmation() {
        let mut api = make_api();
        let a = seed_per_month(&mut api);
        let mut args = edit(a.id);
        args.percent = Some(PercentInput::Uniform("30".into()));
        let mut no = |_: &str| false;
        assert_eq!(update(&mut api, args, d(2025, 1, 5), &mut no).unwrap(), None);

        let mut args = edit(a.id);
        args.percent = Some(PercentInput::Uniform("30".into()));
        let Some(SubmitOutcome::Updated(updated)) =
            update(&mut api, args, d(2025, 1, 5), &mut AssumeYes).unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(updated.current_month_allocation, Some(30));
        assert!(updated.monthly_allocations.is_empty());
    }

    #[test]
    fn test_switch_to_uniform_keeps_past_months() {
        let mut api = make_api();
        let a = seed_per_month(&mut api);
        let mut args = edit(a.id);
        args.percent = Some(PercentInput::Uniform("30".into()));
        let mut prompt = String::new();
        let mut accept = |p: &str| {
            prompt = p.to_string();
            true
        };
        update(&mut api, args, d(2025, 2, 10), &mut accept).unwrap();
        assert!(prompt.contains("Feb 2025, Mar 2025"));
        assert!(!prompt.contains("Jan 2025"));

        let stored = api.allocation(a.id).unwrap();
        assert_eq!(stored.percentage_for(mk(2025, 1)), Some(50));
        assert_eq!(stored.percentage_for(mk(2025, 2)), Some(30));
        assert_eq!(stored.percentage_for(mk(2025, 3)), Some(30));
    }

    #[test]
    fn test_extending_uniform_range() {
        let mut api = make_api();
        let created = create(
            &mut api,
            create_args(Some(PercentInput::Uniform("40".into()))),
            d(2025, 1, 1),
        )
        .unwrap();
        let SubmitOutcome::Created(a) = created else {
            panic!("expected create");
        };
        let mut args = edit(a.id);
        args.end = Some(d(2025, 5, 31));
        update(&mut api, args, d(2025, 1, 5), &mut AssumeYes).unwrap();
        let stored = api.allocation(a.id).unwrap();
        assert_eq!(stored.percentage_for(mk(2025, 5)), Some(40));
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let mut api = make_api();
        let err = update(&mut api, edit(404), d(2025, 1, 1), &mut AssumeYes).unwrap_err();
        assert!(err.to_string().contains("allocation 404 not found"));
    }
}
