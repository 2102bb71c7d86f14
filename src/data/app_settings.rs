use crate::data::allocation::AllocationType;
use crate::data::persistence::Persistable;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    /// Quiet period before a search box issues its lookup.
    pub search_debounce_ms: u64,
    /// Rows per page for list commands and search results.
    pub page_size: usize,
    pub default_allocation_type: AllocationType,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            search_debounce_ms: 300,
            page_size: 10,
            default_allocation_type: AllocationType::Project,
        }
    }
}

/// Reads the `settings` key from config.yaml. Unknown keys are ignored so the
/// file can grow other sections.
#[derive(Serialize, Deserialize, Default, Debug)]
struct SettingsWrapper {
    #[serde(default)]
    settings: AppSettings,
}

impl Persistable for SettingsWrapper {
    fn filename() -> &'static str {
        "config.yaml"
    }
    fn is_json() -> bool {
        false
    }
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        Ok(SettingsWrapper::load()?.settings)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        Ok(SettingsWrapper::load_from(dir)?.settings)
    }

    pub fn save_to(&self, dir: &Path) -> Result<()> {
        let wrapper = SettingsWrapper {
            settings: self.clone(),
        };
        wrapper.save_to(dir)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Page size with a floor of one row.
    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }
}
