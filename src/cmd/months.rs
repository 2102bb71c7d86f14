use crate::calc::{derive_month_list, mark_past, DateRange, MonthEntry};
use anyhow::Result;
use chrono::{Local, NaiveDate};

/// Prints the months a date range covers. With `edit`, past months are flagged
/// the way the edit form locks them.
pub fn run(start: NaiveDate, end: NaiveDate, edit: bool, json: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let months = months_for(start, end, edit, today)?;
    let mut out = std::io::stdout();
    if json {
        serde_json::to_writer_pretty(&mut out, &months)?;
        println!();
        Ok(())
    } else {
        write_months(&months, &mut out)
    }
}

pub(crate) fn months_for(
    start: NaiveDate,
    end: NaiveDate,
    edit: bool,
    today: NaiveDate,
) -> Result<Vec<MonthEntry>> {
    let mut months = derive_month_list(&DateRange::new(start, end))?;
    if edit {
        mark_past(&mut months, today);
    }
    Ok(months)
}

pub(crate) fn write_months<W: std::io::Write>(months: &[MonthEntry], out: &mut W) -> Result<()> {
    writeln!(out, "Months")?;
    writeln!(out, "---")?;
    for m in months {
        let flag = if m.locked() { "past" } else { "" };
        writeln!(out, "  {:<9} {:<10} {}", m.key, m.label, flag)?;
    }
    writeln!(out, "---")?;
    writeln!(out, "Total: {} month(s)", months.len())?;
    Ok(())
}
