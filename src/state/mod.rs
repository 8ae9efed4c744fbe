/// State management module
///
/// This module handles everything read from or written to a catalog:
/// - Database connections and the bulk-update duplicate (library.rs)
/// - The narrow query/update capability the pipeline depends on (store.rs)
/// - Turning query rows into catalog records (reader.rs)
/// - Shared data structures (data.rs)
pub mod data;
pub mod library;
pub mod reader;
pub mod store;

#[cfg(test)]
pub mod fixtures;
#[cfg(test)]
pub mod memory;
