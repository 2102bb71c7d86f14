use crate::api::{AllocationApi, LocalApi};
use crate::error::ApiError;
use crate::planner::{AssumeYes, Confirm, PromptConfirm};
use anyhow::Result;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DeleteOutcome {
    Deleted,
    Cancelled,
    Missing,
}

pub fn run(id: u64, yes: bool) -> Result<()> {
    let mut api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let mut confirm: Box<dyn Confirm> = if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(PromptConfirm::new())
    };
    match delete(&mut api, id, confirm.as_mut())? {
        DeleteOutcome::Deleted => println!("Deleted allocation #{id}."),
        DeleteOutcome::Cancelled => println!("Delete cancelled."),
        DeleteOutcome::Missing => println!("Allocation #{id} does not exist; nothing to delete."),
    }
    Ok(())
}

pub(crate) fn delete(api: &mut LocalApi, id: u64, confirm: &mut dyn Confirm) -> Result<DeleteOutcome> {
    let existing = match api.allocation(id) {
        Ok(a) => a,
        Err(ApiError::NotFound { .. }) => return Ok(DeleteOutcome::Missing),
        Err(err) => return Err(err.into()),
    };
    let who = api
        .directory()
        .employee(existing.employee_id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| format!("employee #{}", existing.employee_id));
    let prompt = format!(
        "Delete allocation #{id} for {who} ({} to {})?",
        existing.start_date, existing.end_date
    );
    if !confirm.confirm(&prompt) {
        return Ok(DeleteOutcome::Cancelled);
    }
    api.delete_allocation(id)?;
    Ok(DeleteOutcome::Deleted)
}
