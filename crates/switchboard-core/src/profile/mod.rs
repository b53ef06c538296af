//! Profile records and their file-backed store

pub mod store;
pub mod types;

pub use store::ProfileStore;
pub use types::{FamilyKeys, ProfileRecord, ToolFamily};
