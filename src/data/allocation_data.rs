use crate::calc::MonthKey;
use crate::data::allocation::Allocation;
use crate::data::persistence::Persistable;
use serde::{Deserialize, Serialize};

/// All allocation records plus the id counter, stored in allocations.json.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AllocationData {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
}

impl Persistable for AllocationData {
    fn filename() -> &'static str {
        "allocations.json"
    }
    fn is_json() -> bool {
        true
    }
}

impl AllocationData {
    pub fn get(&self, id: u64) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.id == id)
    }

    /// Hands out ids above anything already stored, even if `next_id` was lost.
    pub fn allocate_id(&mut self) -> u64 {
        let highest = self.allocations.iter().map(|a| a.id).max().unwrap_or(0);
        let id = self.next_id.max(highest + 1).max(1);
        self.next_id = id + 1;
        id
    }

    pub fn insert(&mut self, allocation: Allocation) {
        self.allocations.push(allocation);
        self.allocations.sort_by_key(|a| a.id);
    }

    /// Replaces the record with the same id. Returns false when there is none.
    pub fn replace(&mut self, allocation: Allocation) -> bool {
        match self.allocations.iter_mut().find(|a| a.id == allocation.id) {
            Some(slot) => {
                *slot = allocation;
                true
            }
            None => false,
        }
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.allocations.len();
        self.allocations.retain(|a| a.id != id);
        self.allocations.len() != before
    }

    /// Sum of an employee's allocations in `month`, ignoring allocation `except`.
    pub fn employee_total(&self, employee_id: u64, month: MonthKey, except: Option<u64>) -> u32 {
        self.allocations
            .iter()
            .filter(|a| a.employee_id == employee_id && Some(a.id) != except)
            .filter_map(|a| a.percentage_for(month))
            .map(u32::from)
            .sum()
    }
}
