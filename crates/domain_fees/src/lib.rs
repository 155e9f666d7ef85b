//! Fee Domain - Fee Ledger and Installment Scheduling
//!
//! This crate assigns charges to students, amortizes them into due-date
//! installments, records payments against them and keeps the running
//! balances consistent under concurrent writers.
//!
//! # Components
//!
//! - **calculator**: unit amount × billing periods − discount
//! - **schedule**: splits a net amount into installments, last one absorbing rounding
//! - **recorder**: records, updates and deletes payments as single ledger commits
//! - **reconciler**: derives fee and installment statuses from balances and due dates
//! - **revenue**: sums of completed payments by date range or academic year
//! - **service**: fee assignment, edits, plans and balance queries
//! - **sweep**: periodic overdue reconciliation
//!
//! # Consistency
//!
//! Every fee carries a `version`. Writes are compare-and-swap on it; a writer
//! that lost the race re-reads the fee and tries again, so balance validation
//! and balance update always see the same snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_fees::{FeeService, PaymentRecorder, NewFee, NewPayment, Cadence};
//!
//! let fee = service.create_fee(NewFee { cadence: Cadence::Quarterly, .. }, clerk).await?;
//! let plan = service.generate_schedule(fee.id).await?;
//! recorder.record(NewPayment::cash(fee.id, plan[0].amount, today).for_schedule(plan[0].id), clerk).await?;
//! ```

pub mod adapters;
pub mod cadence;
pub mod calculator;
pub mod config;
pub mod error;
pub mod fee;
pub mod payment;
pub mod ports;
pub mod reconciler;
pub mod recorder;
pub mod revenue;
pub mod schedule;
pub mod service;
pub mod sweep;

mod retry;

pub use cadence::Cadence;
pub use calculator::{calculate, gross_amount, FeeAmounts};
pub use config::LedgerConfig;
pub use error::{BalanceScope, ErrorKind, FeeError};
pub use fee::{Fee, FeeBalance, FeeCategory, FeeStatus, FeeType};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentPatch, PaymentStatus};
pub use ports::{FeeFilter, FeeStore, FeeTypeCatalog, LedgerChange, LedgerCommit, RevenueFilter, StudentDirectory};
pub use reconciler::{derive_fee_status, derive_schedule_status};
pub use recorder::PaymentRecorder;
pub use revenue::{RevenueAggregator, RevenueQuery};
pub use schedule::{PaymentSchedule, ScheduleStatus};
pub use service::{FeeDetails, FeePatch, FeeService, FeeSpec, FeeStats, NewFee, StudentFeeSummary};
pub use sweep::{OverdueSweeper, SweepReport};
