//! Domain Adapters
//!
//! Adapter implementations of the fee ledger ports over PostgreSQL. Each
//! adapter implements a port trait, translates between domain models and
//! database row types, and delegates SQL to the repository layer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresFeeStore;
//! use domain_fees::FeeStore;
//!
//! let store = PostgresFeeStore::new(pool);
//! let fee = store.get_fee(fee_id).await?;
//! ```

pub mod fees;

pub use fees::{PostgresFeeStore, PostgresFeeTypeCatalog, PostgresStudentDirectory};
