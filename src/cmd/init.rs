use crate::data::{AllocationData, AppSettings, DirectoryData, Employee, Manager, Persistable, Project};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn run() -> Result<()> {
    let dir = crate::data::persistence::get_data_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    run_in_dir(&dir)?;
    println!("Data files initialized successfully.");
    Ok(())
}

/// Writes all default data files into `dir`. Exposed for unit testing.
pub(crate) fn run_in_dir(dir: &Path) -> Result<()> {
    AppSettings::default().save_to(dir)?;
    seed_directory().save_to(dir)?;
    AllocationData {
        next_id: 1,
        allocations: Vec::new(),
    }
    .save_to(dir)?;
    tracing::info!(dir = %dir.display(), "data files initialized");
    Ok(())
}

fn employee(id: u64, name: &str, email: &str, manager_id: u64) -> Employee {
    Employee {
        id,
        name: name.to_string(),
        email: email.to_string(),
        manager_id: Some(manager_id),
    }
}

fn project(id: u64, name: &str, client: Option<&str>) -> Project {
    Project {
        id,
        name: name.to_string(),
        client: client.map(str::to_string),
    }
}

fn seed_directory() -> DirectoryData {
    DirectoryData {
        employees: vec![
            employee(1, "Ada Lovelace", "ada.lovelace@example.com", 1),
            employee(2, "Grace Hopper", "grace.hopper@example.com", 1),
            employee(3, "Alan Turing", "alan.turing@example.com", 2),
            employee(4, "Katherine Johnson", "katherine.johnson@example.com", 2),
        ],
        projects: vec![
            project(1, "Guidance Computer", Some("Apollo Program")),
            project(2, "Compiler Rewrite", None),
            project(3, "Data Platform", Some("Northwind")),
        ],
        managers: vec![
            Manager {
                id: 1,
                name: "Margaret Hamilton".to_string(),
            },
            Manager {
                id: 2,
                name: "Dennis Ritchie".to_string(),
            },
        ],
    }
}
