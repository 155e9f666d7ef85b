//! Adapters for the fee ledger ports
//!
//! - **memory**: in-memory store, catalog and directory for tests and demos
//!
//! PostgreSQL adapters live in `infra_db`.

pub mod memory;

pub use memory::{InMemoryFeeStore, InMemoryFeeTypeCatalog, InMemoryStudentDirectory};
