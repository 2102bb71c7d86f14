use crate::api::{AllocationApi, LocalApi};
use crate::cmd::create::write_outcome;
use crate::data::{persistence::get_data_dir, AppSettings};
use crate::ui::planner_view::{run_app, App};
use crate::ui::{install_panic_hook, restore_terminal, setup_terminal};
use anyhow::Result;
use chrono::Local;

/// Opens the allocation form: a blank one, or the allocation `edit_id` for editing.
pub fn run(edit_id: Option<u64>) -> Result<()> {
    let settings = AppSettings::load()?;
    let mut api = LocalApi::open(&get_data_dir()?)?;
    let today = Local::now().date_naive();
    let existing = edit_id.map(|id| api.allocation(id)).transpose()?;

    let mut app = match &existing {
        Some(allocation) => App::new_edit(&mut api, &settings, today, allocation)?,
        None => App::new_create(&mut api, &settings, today)?,
    };

    install_panic_hook();
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    result?;

    match app.outcome() {
        Some(outcome) => write_outcome(outcome, &mut std::io::stdout()),
        None => {
            println!("Form closed without saving.");
            Ok(())
        }
    }
}
