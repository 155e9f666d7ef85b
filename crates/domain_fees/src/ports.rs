//! Fee Ledger Ports
//!
//! This module defines the port interfaces the fee ledger needs from the rest
//! of the system, enabling swappable implementations (PostgreSQL, in-memory).
//!
//! # Architecture
//!
//! - `FeeStore` persists fees, installments and payments. Every write is
//!   conditioned on the fee's `version`, so two writers on the same fee can
//!   never both apply a change computed from the same snapshot.
//! - `FeeTypeCatalog` and `StudentDirectory` are read-only lookups into data
//!   owned by other modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_fees::ports::FeeStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn FeeStore> = Arc::new(PostgresFeeStore::new(pool));
//! let fee = store.get_fee(fee_id).await?;
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    AcademicYear, DateRange, DomainPort, FeeId, FeeTypeId, HealthCheckable, Money, PaymentId,
    PortError, ScheduleId, StudentId,
};

use crate::fee::{Fee, FeeStatus, FeeType};
use crate::payment::Payment;
use crate::schedule::PaymentSchedule;

/// Payment row change applied by a ledger commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    /// A new payment
    Insert(Payment),
    /// A modified payment, replacing the stored row with the same id
    Update(Payment),
    /// Removal of a payment
    Delete(PaymentId),
}

/// One atomic unit of ledger mutation
///
/// Applied all-or-nothing: the payment change, the fee's balance and status,
/// and the touched installment's balance and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCommit {
    /// New state of the fee; its `version` is already incremented
    pub fee: Fee,
    /// Version the fee had when the commit was computed
    pub expected_version: i64,
    /// New state of the installment the payment is allocated to
    pub schedule: Option<PaymentSchedule>,
    pub change: LedgerChange,
}

/// Which payments a revenue sum covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueFilter {
    /// Every completed payment
    All,
    /// Completed payments whose payment date falls within the range
    PaymentDates(DateRange),
    /// Completed payments on fees of the academic year
    AcademicYear(AcademicYear),
}

/// Criteria for listing fees; the default matches every fee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeFilter {
    pub status: Option<FeeStatus>,
    pub academic_year: Option<AcademicYear>,
}

impl FeeFilter {
    pub fn matches(&self, fee: &Fee) -> bool {
        self.status.map_or(true, |status| fee.status == status)
            && self.academic_year.map_or(true, |year| fee.academic_year == year)
    }
}

/// Lookup of fee type definitions
#[async_trait]
pub trait FeeTypeCatalog: DomainPort {
    /// Retrieves a fee type, or `PortError::NotFound`
    async fn get_fee_type(&self, id: FeeTypeId) -> Result<FeeType, PortError>;
}

/// Student existence check
#[async_trait]
pub trait StudentDirectory: DomainPort {
    async fn student_exists(&self, id: StudentId) -> Result<bool, PortError>;
}

/// Persistence of fees, installments and payments
///
/// Writes that would overwrite a fee changed since `expected_version` fail
/// with a stale-version `PortError::Conflict`.
#[async_trait]
pub trait FeeStore: DomainPort + HealthCheckable {
    // ========================================================================
    // Fees
    // ========================================================================

    /// Retrieves a fee, or `PortError::NotFound`
    async fn get_fee(&self, id: FeeId) -> Result<Fee, PortError>;

    /// Finds the fee of a student for a fee type and academic year
    async fn find_fee(
        &self,
        student_id: StudentId,
        fee_type_id: FeeTypeId,
        academic_year: AcademicYear,
    ) -> Result<Option<Fee>, PortError>;

    /// All fees of a student, newest first
    async fn fees_for_student(&self, student_id: StudentId) -> Result<Vec<Fee>, PortError>;

    /// All fees whose status is one of `statuses`
    async fn fees_by_status(&self, statuses: &[FeeStatus]) -> Result<Vec<Fee>, PortError>;

    /// Fees matching `filter`, newest first
    async fn list_fees(&self, filter: FeeFilter) -> Result<Vec<Fee>, PortError>;

    /// Inserts fees all-or-nothing
    ///
    /// A fee clashing with an existing (student, fee type, academic year)
    /// fails the whole batch with a duplicate `PortError::Conflict`.
    async fn insert_fees(&self, fees: Vec<Fee>) -> Result<(), PortError>;

    /// Overwrites a fee, optionally replacing its whole installment plan
    async fn update_fee(
        &self,
        fee: &Fee,
        expected_version: i64,
        replace_schedules: Option<Vec<PaymentSchedule>>,
    ) -> Result<(), PortError>;

    /// Deletes a fee together with its installments
    ///
    /// Fails with a referenced `PortError::Conflict` while payments exist.
    async fn delete_fee(&self, id: FeeId, expected_version: i64) -> Result<(), PortError>;

    // ========================================================================
    // Installments
    // ========================================================================

    /// Retrieves an installment, or `PortError::NotFound`
    async fn get_schedule(&self, id: ScheduleId) -> Result<PaymentSchedule, PortError>;

    /// Installments of a fee ordered by installment index
    async fn schedules_for_fee(&self, fee_id: FeeId) -> Result<Vec<PaymentSchedule>, PortError>;

    /// Unpaid installments due before `today` on fees that are not cancelled,
    /// earliest due date first
    async fn overdue_schedules(&self, today: NaiveDate) -> Result<Vec<PaymentSchedule>, PortError>;

    /// Replaces the installment plan of `fee` atomically
    async fn replace_schedules(
        &self,
        fee: &Fee,
        expected_version: i64,
        schedules: Vec<PaymentSchedule>,
    ) -> Result<(), PortError> {
        self.update_fee(fee, expected_version, Some(schedules)).await
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// Retrieves a payment, or `PortError::NotFound`
    async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError>;

    /// Payments of a fee, most recent payment date first
    async fn payments_for_fee(&self, fee_id: FeeId) -> Result<Vec<Payment>, PortError>;

    /// Payments of a student, most recent payment date first
    async fn payments_for_student(&self, student_id: StudentId) -> Result<Vec<Payment>, PortError>;

    /// Every payment, most recent payment date first
    async fn list_payments(&self) -> Result<Vec<Payment>, PortError>;

    /// Applies a ledger commit atomically
    ///
    /// A receipt number already used by another payment fails with a
    /// duplicate `PortError::Conflict`.
    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<(), PortError>;

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Sum of completed payment amounts matching `filter`
    async fn revenue(&self, filter: RevenueFilter) -> Result<Money, PortError>;
}
