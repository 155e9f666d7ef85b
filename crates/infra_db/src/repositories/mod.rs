//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and plain
//! Rust values. Queries are built at runtime with `sqlx::query_as` over
//! `FromRow` row types; multi-statement writes run in one transaction.

pub mod fees;

pub use fees::FeeRepository;
