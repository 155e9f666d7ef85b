//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL persistence for the fee ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: `repositories` owns the SQL and
//! the row types, `adapters` implements the domain ports on top of it.
//!
//! # Concurrency
//!
//! Fees carry a `version` column. Every write that changes a fee, its
//! installments or its payments runs in a transaction that first updates the
//! fee row conditioned on the version the writer read. The row lock serializes
//! concurrent writers and a stale writer gets a version conflict instead of
//! overwriting a newer balance.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//! use infra_db::adapters::PostgresFeeStore;
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/school")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresFeeStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
