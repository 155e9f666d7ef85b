//! Core Kernel - Foundational types shared by the fee ledger crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Money with precise decimal arithmetic and minor-unit rounding
//! - Academic calendar and clock abstractions
//! - Strongly typed identifiers
//! - Port error and health-check types for the ports and adapters layout

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, MoneyError};
pub use temporal::{AcademicYear, DateRange, Timezone, TemporalError, Clock, SystemClock, FixedClock, add_months};
pub use identifiers::{FeeId, ScheduleId, PaymentId, StudentId, FeeTypeId, UserId};
pub use error::CoreError;
pub use ports::{
    PortError, ConflictKind, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
