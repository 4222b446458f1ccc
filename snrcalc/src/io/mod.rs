//! Tabulated data input

pub mod loader;
pub mod table;

pub use loader::{DirectoryLoader, MemoryLoader, ResourceLoader};
pub use table::{Table, TableError};
