use crate::data::persistence::Persistable;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Employee {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Manager {
    pub id: u64,
    pub name: String,
}

/// Anything a search box can filter on.
pub trait Searchable {
    fn haystacks(&self) -> Vec<&str>;

    /// Case-insensitive substring match. An empty needle matches everything.
    fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self
                .haystacks()
                .iter()
                .any(|h| h.to_lowercase().contains(&needle))
    }
}

impl Searchable for Employee {
    fn haystacks(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }
}

impl Searchable for Project {
    fn haystacks(&self) -> Vec<&str> {
        let mut out = vec![self.name.as_str()];
        if let Some(client) = &self.client {
            out.push(client);
        }
        out
    }
}

impl Searchable for Manager {
    fn haystacks(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

/// People and projects that allocations refer to.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct DirectoryData {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub managers: Vec<Manager>,
}

impl Persistable for DirectoryData {
    fn filename() -> &'static str {
        "directory.yaml"
    }
    fn is_json() -> bool {
        false
    }
}

impl DirectoryData {
    pub fn employee(&self, id: u64) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    pub fn project(&self, id: u64) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn manager(&self, id: u64) -> Option<&Manager> {
        self.managers.iter().find(|m| m.id == id)
    }
}
