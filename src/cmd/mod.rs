pub mod allocations;
pub mod create;
pub mod delete;
pub mod directory;
pub mod form;
pub mod init;
pub mod months;
pub mod update;
