use crate::api::{AllocationApi, LocalApi, Page, PageQuery};
use crate::data::{AppSettings, DirectoryData, Employee, Manager, Project};
use anyhow::Result;

fn query(search: Option<&str>, page: usize, settings: &AppSettings) -> PageQuery {
    // Pages are 1-based on the command line
    PageQuery::new(page.saturating_sub(1), settings.page_size()).with_search(search.unwrap_or(""))
}

pub fn run_employees(search: Option<&str>, page: usize) -> Result<()> {
    let api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let settings = AppSettings::load()?;
    let result = api.employees(&query(search, page, &settings))?;
    write_employees(&result, api.directory(), &mut std::io::stdout())
}

pub fn run_projects(search: Option<&str>, page: usize) -> Result<()> {
    let api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let settings = AppSettings::load()?;
    let result = api.projects(&query(search, page, &settings))?;
    write_projects(&result, &mut std::io::stdout())
}

pub fn run_managers(search: Option<&str>, page: usize) -> Result<()> {
    let api = LocalApi::open(&crate::data::persistence::get_data_dir()?)?;
    let settings = AppSettings::load()?;
    let result = api.managers(&query(search, page, &settings))?;
    write_managers(&result, &mut std::io::stdout())
}

pub(crate) fn write_page_footer<W: std::io::Write, T>(
    page: &Page<T>,
    noun: &str,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "---")?;
    writeln!(
        out,
        "Page {} of {}  ({} {}(s))",
        page.page + 1,
        page.total_pages(),
        page.total,
        noun
    )?;
    if page.has_next() {
        writeln!(out, "More results: --page {}", page.page + 2)?;
    }
    Ok(())
}

pub(crate) fn write_employees<W: std::io::Write>(
    page: &Page<Employee>,
    directory: &DirectoryData,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "Employees")?;
    writeln!(out, "---")?;
    writeln!(out, "  {:<5} {:<24} {:<32} {}", "ID", "Name", "Email", "Manager")?;
    for e in &page.items {
        let manager = e
            .manager_id
            .and_then(|id| directory.manager(id))
            .map(|m| m.name.as_str())
            .unwrap_or("");
        writeln!(out, "  {:<5} {:<24} {:<32} {}", e.id, e.name, e.email, manager)?;
    }
    write_page_footer(page, "employee", out)
}

pub(crate) fn write_projects<W: std::io::Write>(page: &Page<Project>, out: &mut W) -> Result<()> {
    writeln!(out, "Projects")?;
    writeln!(out, "---")?;
    writeln!(out, "  {:<5} {:<24} {}", "ID", "Name", "Client")?;
    for p in &page.items {
        writeln!(
            out,
            "  {:<5} {:<24} {}",
            p.id,
            p.name,
            p.client.as_deref().unwrap_or("")
        )?;
    }
    write_page_footer(page, "project", out)
}

pub(crate) fn write_managers<W: std::io::Write>(page: &Page<Manager>, out: &mut W) -> Result<()> {
    writeln!(out, "Managers")?;
    writeln!(out, "---")?;
    writeln!(out, "  {:<5} {}", "ID", "Name")?;
    for m in &page.items {
        writeln!(out, "  {:<5} {}", m.id, m.name)?;
    }
    write_page_footer(page, "manager", out)
}
