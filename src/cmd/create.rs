use crate::api::LocalApi;
use crate::calc::{parse_percentage, DateRange, MonthKey};
use crate::data::AllocationType;
use crate::error::PlanError;
use crate::planner::{AllocationTarget, AssumeYes, PlanMode, Planner, SubmitOutcome};
use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use std::str::FromStr;

/// `YYYY-MM=N` as given to `--month`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthAssignment {
    pub key: MonthKey,
    pub percentage: u8,
}

impl FromStr for MonthAssignment {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| PlanError::MissingValue(format!("percentage for '{s}'")))?;
        Ok(MonthAssignment {
            key: key.trim().parse()?,
            percentage: parse_percentage(value)?,
        })
    }
}

/// Percentages given on the command line: one value for every month, or one per month.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PercentInput {
    Uniform(String),
    PerMonth(Vec<MonthAssignment>),
}

impl PercentInput {
    pub fn from_args(percent: Option<String>, months: Vec<MonthAssignment>) -> Result<Option<Self>> {
        match (percent, months.is_empty()) {
            (Some(_), false) => bail!("use either --percent or --month, not both"),
            (Some(p), true) => Ok(Some(PercentInput::Uniform(p))),
            (None, false) => Ok(Some(PercentInput::PerMonth(months))),
            (None, true) => Ok(None),
        }
    }
}

pub struct CreateArgs {
    pub employee_id: u64,
    pub project_id: Option<u64>,
    pub allocation_type: AllocationType,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub percent: Option<PercentInput>,
}

pub fn run(args: CreateArgs) -> Result<()> {
    let mut api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let today = Local::now().date_naive();
    let outcome = create(&mut api, args, today)?;
    write_outcome(&outcome, &mut std::io::stdout())
}

pub(crate) fn create(api: &mut LocalApi, args: CreateArgs, today: NaiveDate) -> Result<SubmitOutcome> {
    let mut planner = Planner::new(today);
    planner.open_create(AllocationTarget {
        employee_id: Some(args.employee_id),
        project_id: args.project_id,
        allocation_type: args.allocation_type,
    });
    // A fresh form has nothing to discard, so no prompt is ever needed here
    planner.change_range(DateRange::new(args.start, args.end), &mut AssumeYes)?;

    match args.percent {
        Some(PercentInput::Uniform(raw)) => {
            planner.set_uniform(i64::from(parse_percentage(&raw)?))?;
        }
        Some(PercentInput::PerMonth(months)) => {
            planner.change_mode(PlanMode::PerMonth, &mut AssumeYes)?;
            for m in months {
                planner.set_month_value(m.key, i64::from(m.percentage))?;
            }
        }
        None => bail!("a percentage is required: pass --percent N or --month YYYY-MM=N"),
    }

    match planner.submit(api)? {
        SubmitOutcome::Failed(msg) => bail!("backend rejected the allocation: {msg}"),
        outcome => Ok(outcome),
    }
}

pub(crate) fn write_outcome<W: std::io::Write>(outcome: &SubmitOutcome, out: &mut W) -> Result<()> {
    match outcome {
        SubmitOutcome::Created(a) => writeln!(out, "Created allocation #{}.", a.id)?,
        SubmitOutcome::Updated(a) => writeln!(out, "Updated allocation #{}.", a.id)?,
        SubmitOutcome::NoChanges => writeln!(out, "No changes.")?,
        SubmitOutcome::Failed(msg) => writeln!(out, "Save failed: {msg}")?,
    }
    Ok(())
}
