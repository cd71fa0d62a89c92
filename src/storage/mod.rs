pub mod catalog;
pub mod engine;
pub mod memory;
pub mod table;

pub use catalog::Catalog;
pub use engine::StorageEngine;
pub use memory::InMemoryStorage;
pub use table::{Table, TableSchema};
