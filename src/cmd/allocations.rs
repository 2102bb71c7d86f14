use crate::api::{AllocationApi, AllocationQuery, LocalApi, Page};
use crate::calc::{derive_month_list, mark_past};
use crate::cmd::directory::write_page_footer;
use crate::data::{Allocation, AppSettings, DirectoryData};
use anyhow::Result;
use chrono::{Local, NaiveDate};

pub fn run(employee_id: Option<u64>, page: usize) -> Result<()> {
    let api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let settings = AppSettings::load()?;
    let query = AllocationQuery {
        employee_id,
        page: page.saturating_sub(1),
        size: settings.page_size(),
    };
    let result = api.allocations(&query)?;
    write_allocations(&result, api.directory(), &mut std::io::stdout())
}

pub fn run_show(id: u64) -> Result<()> {
    let api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let allocation = api.allocation(id)?;
    let today = Local::now().date_naive();
    write_allocation(&allocation, api.directory(), today, &mut std::io::stdout())
}

fn employee_name(directory: &DirectoryData, id: u64) -> String {
    directory
        .employee(id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| format!("#{id}"))
}

fn project_name(directory: &DirectoryData, allocation: &Allocation) -> String {
    match allocation.project_id {
        Some(id) => directory
            .project(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("#{id}")),
        None => allocation.allocation_type.label().to_string(),
    }
}

/// "50%" for uniform allocations, "per month" otherwise.
fn summary(allocation: &Allocation) -> String {
    match allocation.current_month_allocation {
        Some(pct) if !allocation.is_per_month() => format!("{pct}%"),
        _ => "per month".to_string(),
    }
}

pub(crate) fn write_allocations<W: std::io::Write>(
    page: &Page<Allocation>,
    directory: &DirectoryData,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "Allocations")?;
    writeln!(out, "---")?;
    writeln!(
        out,
        "  {:<5} {:<22} {:<20} {:<12} {:<12} {}",
        "ID", "Employee", "Project", "Start", "End", "Allocation"
    )?;
    for a in &page.items {
        writeln!(
            out,
            "  {:<5} {:<22} {:<20} {:<12} {:<12} {}",
            a.id,
            employee_name(directory, a.employee_id),
            project_name(directory, a),
            a.start_date,
            a.end_date,
            summary(a)
        )?;
    }
    write_page_footer(page, "allocation", out)
}

pub(crate) fn write_allocation<W: std::io::Write>(
    allocation: &Allocation,
    directory: &DirectoryData,
    today: NaiveDate,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "Allocation #{}", allocation.id)?;
    writeln!(out, "---")?;
    writeln!(out, "  {:<10} {}", "Employee", employee_name(directory, allocation.employee_id))?;
    writeln!(out, "  {:<10} {}", "Type", allocation.allocation_type.label())?;
    writeln!(out, "  {:<10} {}", "Project", project_name(directory, allocation))?;
    writeln!(
        out,
        "  {:<10} {} to {}",
        "Range", allocation.start_date, allocation.end_date
    )?;
    writeln!(out, "  {:<10} {}", "Mode", summary(allocation))?;
    writeln!(out, "---")?;

    let mut months = derive_month_list(&allocation.range())?;
    mark_past(&mut months, today);
    for m in &months {
        let value = allocation
            .percentage_for(m.key)
            .map(|p| format!("{p}%"))
            .unwrap_or_else(|| "-".to_string());
        let flag = if m.locked() { "past" } else { "" };
        writeln!(out, "  {:<10} {:>5} {}", m.label, value, flag)?;
    }
    Ok(())
}
