//! Contract with the allocation backend. The planner only ever talks to the
//! backend through [`AllocationApi`].

pub mod local;

use crate::data::{
    Allocation, CreateAllocationRequest, Employee, Manager, Project, UpdateAllocationRequest,
};
use crate::error::ApiError;
use serde::Serialize;

pub use local::LocalApi;

/// Search text plus a 0-based page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub search: Option<String>,
    pub page: usize,
    pub size: usize,
}

impl PageQuery {
    pub fn new(page: usize, size: usize) -> Self {
        PageQuery {
            search: None,
            page,
            size,
        }
    }

    /// Everything in one page.
    pub fn all() -> Self {
        PageQuery::new(0, usize::MAX)
    }

    /// Blank search text is treated as no filter.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    pub fn needle(&self) -> &str {
        self.search.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationQuery {
    pub employee_id: Option<u64>,
    pub page: usize,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Cuts one page out of the full result set.
    pub fn paginate(all: Vec<T>, page: usize, size: usize) -> Self {
        let size = size.max(1);
        let total = all.len();
        let items = all
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();
        Page {
            items,
            page,
            size,
            total,
        }
    }

    /// At least one, so an empty result still renders as "page 1 of 1".
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.size.max(1)).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages()
    }
}

pub trait AllocationApi {
    fn employees(&self, query: &PageQuery) -> Result<Page<Employee>, ApiError>;
    fn projects(&self, query: &PageQuery) -> Result<Page<Project>, ApiError>;
    fn managers(&self, query: &PageQuery) -> Result<Page<Manager>, ApiError>;

    fn allocations(&self, query: &AllocationQuery) -> Result<Page<Allocation>, ApiError>;
    fn allocation(&self, id: u64) -> Result<Allocation, ApiError>;
    fn create_allocation(
        &mut self,
        request: &CreateAllocationRequest,
    ) -> Result<Allocation, ApiError>;
    fn replace_allocation(
        &mut self,
        id: u64,
        request: &UpdateAllocationRequest,
    ) -> Result<Allocation, ApiError>;
    /// Deleting an id that does not exist succeeds.
    fn delete_allocation(&mut self, id: u64) -> Result<(), ApiError>;
}
