pub mod allocation;
pub mod allocation_data;
pub mod app_settings;
pub mod directory;
pub mod persistence;

pub use allocation::{
    Allocation, AllocationType, CreateAllocationRequest, MonthlyAllocation,
    UpdateAllocationRequest,
};
pub use allocation_data::AllocationData;
pub use app_settings::AppSettings;
pub use directory::{DirectoryData, Employee, Manager, Project, Searchable};
pub use persistence::Persistable;
