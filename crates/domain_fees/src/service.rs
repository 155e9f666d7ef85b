//! Fee service
//!
//! Entry point for fee assignment, edits, installment plans and balance
//! queries. Payment mutations go through [`crate::recorder::PaymentRecorder`].

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use core_kernel::{AcademicYear, Clock, ConflictKind, FeeId, FeeTypeId, Money, PortError, StudentId, UserId};

use crate::cadence::Cadence;
use crate::calculator::{calculate, FeeAmounts};
use crate::config::LedgerConfig;
use crate::error::FeeError;
use crate::fee::{Fee, FeeBalance, FeeStatus, FeeType};
use crate::payment::Payment;
use crate::ports::{FeeFilter, FeeStore, FeeTypeCatalog, StudentDirectory};
use crate::reconciler::derive_fee_status;
use crate::retry::retry_on_conflict;
use crate::schedule::{self, PaymentSchedule};

/// Request to assign a fee to a student
#[derive(Debug, Clone)]
pub struct NewFee {
    pub student_id: StudentId,
    pub fee_type_id: FeeTypeId,
    pub cadence: Cadence,
    pub discount_amount: Option<Money>,
    pub notes: Option<String>,
}

/// One entry of a bulk assignment
#[derive(Debug, Clone)]
pub struct FeeSpec {
    pub fee_type_id: FeeTypeId,
    pub cadence: Cadence,
    pub discount_amount: Option<Money>,
    pub notes: Option<String>,
}

/// Changes to a fee; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct FeePatch {
    pub fee_type_id: Option<FeeTypeId>,
    pub cadence: Option<Cadence>,
    pub discount_amount: Option<Money>,
    pub notes: Option<String>,
}

impl FeePatch {
    fn changes_amounts(&self) -> bool {
        self.fee_type_id.is_some() || self.cadence.is_some() || self.discount_amount.is_some()
    }
}

/// Figures derived from a fee's installments and payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeStats {
    pub installments: usize,
    pub paid_installments: usize,
    pub overdue_installments: usize,
    pub next_due_date: Option<NaiveDate>,
    pub payment_count: usize,
}

/// A fee with everything attached to it
#[derive(Debug, Clone, Serialize)]
pub struct FeeDetails {
    pub fee: Fee,
    pub balance: FeeBalance,
    pub schedules: Vec<PaymentSchedule>,
    pub payments: Vec<Payment>,
    pub stats: FeeStats,
}

/// Totals over a student's fees; cancelled fees are counted but not summed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentFeeSummary {
    pub student_id: Option<StudentId>,
    pub fee_count: usize,
    pub total_expected: Money,
    pub total_discount: Money,
    pub total_net: Money,
    pub total_paid: Money,
    pub total_due: Money,
    pub pending: usize,
    pub partially_paid: usize,
    pub paid: usize,
    pub overdue: usize,
    pub cancelled: usize,
}

type FeeKey = (StudentId, FeeTypeId, AcademicYear);

/// Fee assignment and installment planning
#[derive(Clone)]
pub struct FeeService {
    store: Arc<dyn FeeStore>,
    fee_types: Arc<dyn FeeTypeCatalog>,
    students: Arc<dyn StudentDirectory>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl FeeService {
    pub fn new(
        store: Arc<dyn FeeStore>,
        fee_types: Arc<dyn FeeTypeCatalog>,
        students: Arc<dyn StudentDirectory>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            fee_types,
            students,
            clock,
            config,
        }
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Assigns a fee to a student for the current academic year
    ///
    /// Amounts come from the fee type's unit amount, the cadence and the
    /// discount. The fee starts Pending with no installments.
    ///
    /// # Arguments
    ///
    /// * `request` - Student, fee type, cadence and optional discount and notes
    /// * `assigned_by` - User recorded as having assigned the fee
    ///
    /// # Errors
    ///
    /// * `StudentNotFound` / `FeeTypeNotFound` - Unknown references
    /// * `InvalidDiscount` - Discount exceeds the gross amount
    /// * `DuplicateFee` - The student already has this fee type this academic year
    #[instrument(skip(self, request), fields(student_id = %request.student_id, fee_type_id = %request.fee_type_id))]
    pub async fn create_fee(&self, request: NewFee, assigned_by: UserId) -> Result<Fee, FeeError> {
        self.ensure_student(request.student_id).await?;
        let spec = FeeSpec {
            fee_type_id: request.fee_type_id,
            cadence: request.cadence,
            discount_amount: request.discount_amount,
            notes: request.notes,
        };
        let fee = self.prepare_fee(request.student_id, spec, assigned_by).await?;

        self.insert(vec![fee.clone()]).await?;
        info!(fee_id = %fee.id, net_amount = %fee.net_amount(), cadence = %fee.cadence, "Fee created");
        Ok(fee)
    }

    /// Assigns several fees to one student, all or nothing
    ///
    /// Every entry is validated before anything is stored. One failing entry,
    /// or the same fee type listed twice, rejects the whole batch.
    ///
    /// # Returns
    ///
    /// The created fees in request order
    #[instrument(skip(self, specs), fields(student_id = %student_id, count = specs.len()))]
    pub async fn create_fees_bulk(
        &self,
        student_id: StudentId,
        specs: Vec<FeeSpec>,
        assigned_by: UserId,
    ) -> Result<Vec<Fee>, FeeError> {
        self.ensure_student(student_id).await?;

        let mut seen = HashSet::new();
        let mut fees = Vec::with_capacity(specs.len());
        for spec in specs {
            if !seen.insert(spec.fee_type_id) {
                return Err(FeeError::DuplicateFee {
                    student_id,
                    fee_type_id: spec.fee_type_id,
                    academic_year: self.current_year(),
                });
            }
            fees.push(self.prepare_fee(student_id, spec, assigned_by).await?);
        }

        if !fees.is_empty() {
            self.insert(fees.clone()).await?;
        }
        info!(count = fees.len(), "Fees created in bulk");
        Ok(fees)
    }

    async fn prepare_fee(&self, student_id: StudentId, spec: FeeSpec, assigned_by: UserId) -> Result<Fee, FeeError> {
        let fee_type = self.load_fee_type(spec.fee_type_id).await?;
        let amounts = calculate(
            fee_type.amount,
            spec.cadence,
            spec.discount_amount.unwrap_or(Money::ZERO),
        )?;

        let academic_year = self.current_year();
        if self
            .store
            .find_fee(student_id, spec.fee_type_id, academic_year)
            .await?
            .is_some()
        {
            return Err(FeeError::DuplicateFee {
                student_id,
                fee_type_id: spec.fee_type_id,
                academic_year,
            });
        }

        let mut fee = Fee::new(student_id, fee_type.id, academic_year, spec.cadence, amounts, assigned_by)
            .with_notes(spec.notes);
        fee.status = derive_fee_status(&fee, &[], self.clock.today());
        Ok(fee)
    }

    async fn insert(&self, fees: Vec<Fee>) -> Result<(), FeeError> {
        let keys: Vec<FeeKey> = fees
            .iter()
            .map(|f| (f.student_id, f.fee_type_id, f.academic_year))
            .collect();
        match self.store.insert_fees(fees).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_duplicate() => Err(self.duplicate_fee(&keys, err).await),
            Err(err) => Err(err.into()),
        }
    }

    /// Names the assignment in `keys` that clashed with a stored fee
    async fn duplicate_fee(&self, keys: &[FeeKey], err: PortError) -> FeeError {
        for &(student_id, fee_type_id, academic_year) in keys {
            if let Ok(Some(_)) = self.store.find_fee(student_id, fee_type_id, academic_year).await {
                return FeeError::DuplicateFee {
                    student_id,
                    fee_type_id,
                    academic_year,
                };
            }
        }
        err.into()
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Edits a fee, recomputing amounts and regenerating installments as needed
    ///
    /// Changing the fee type, cadence or discount recomputes the amounts. If
    /// the net amount or cadence changes and the fee already has installments,
    /// the plan is regenerated from today in the same write.
    ///
    /// # Arguments
    ///
    /// * `fee_id` - Fee to edit
    /// * `patch` - Fields to change; `None` keeps the current value
    ///
    /// # Errors
    ///
    /// * `FeeCancelled` - Cancelled fees are frozen
    /// * `NetBelowPaid` - The new net amount would be less than what was already paid
    /// * `SchedulesHavePayments` - The plan would be replaced but an installment is paid
    /// * `DuplicateFee` - The new fee type is already assigned for the year
    #[instrument(skip(self, patch), fields(fee_id = %fee_id))]
    pub async fn update_fee(&self, fee_id: FeeId, patch: FeePatch) -> Result<Fee, FeeError> {
        let patch = &patch;
        let fee = retry_on_conflict(fee_id, self.config.max_commit_retries, move || {
            self.try_update_fee(fee_id, patch)
        })
        .await?;

        info!(net_amount = %fee.net_amount(), status = %fee.status, "Fee updated");
        Ok(fee)
    }

    async fn try_update_fee(&self, fee_id: FeeId, patch: &FeePatch) -> Result<Fee, FeeError> {
        let fee = self.load_fee(fee_id).await?;
        if fee.is_cancelled() {
            return Err(FeeError::FeeCancelled(fee_id));
        }

        let mut updated = fee.clone();
        if patch.changes_amounts() {
            let fee_type_id = patch.fee_type_id.unwrap_or(fee.fee_type_id);
            if fee_type_id != fee.fee_type_id {
                let clash = self
                    .store
                    .find_fee(fee.student_id, fee_type_id, fee.academic_year)
                    .await?;
                if clash.is_some() {
                    return Err(FeeError::DuplicateFee {
                        student_id: fee.student_id,
                        fee_type_id,
                        academic_year: fee.academic_year,
                    });
                }
            }

            let fee_type = self.load_fee_type(fee_type_id).await?;
            let cadence = patch.cadence.unwrap_or(fee.cadence);
            let FeeAmounts { total, discount, net } = calculate(
                fee_type.amount,
                cadence,
                patch.discount_amount.unwrap_or(fee.discount_amount),
            )?;
            if net < fee.paid_amount {
                return Err(FeeError::NetBelowPaid {
                    net,
                    paid: fee.paid_amount,
                });
            }

            updated.fee_type_id = fee_type_id;
            updated.cadence = cadence;
            updated.total_amount = total;
            updated.discount_amount = discount;
        }
        if let Some(ref notes) = patch.notes {
            updated.notes = Some(notes.clone());
        }

        let today = self.clock.today();
        let schedules = self.store.schedules_for_fee(fee_id).await?;
        let replacement = if !schedules.is_empty()
            && (updated.net_amount() != fee.net_amount() || updated.cadence != fee.cadence)
        {
            ensure_unpaid(fee_id, &schedules)?;
            Some(schedule::generate(fee_id, updated.cadence, updated.net_amount(), today, &self.config)?)
        } else {
            None
        };

        updated.status = derive_fee_status(&updated, replacement.as_deref().unwrap_or(&schedules), today);
        updated.touch();
        self.store
            .update_fee(&updated, fee.version, replacement)
            .await
            .map_err(|err| {
                if err.is_duplicate() {
                    FeeError::DuplicateFee {
                        student_id: updated.student_id,
                        fee_type_id: updated.fee_type_id,
                        academic_year: updated.academic_year,
                    }
                } else {
                    err.into()
                }
            })?;
        Ok(updated)
    }

    /// Cancels a fee; cancelled fees accept no further payments
    #[instrument(skip(self), fields(fee_id = %fee_id))]
    pub async fn cancel_fee(&self, fee_id: FeeId) -> Result<Fee, FeeError> {
        let fee = retry_on_conflict(fee_id, self.config.max_commit_retries, move || {
            self.try_cancel_fee(fee_id)
        })
        .await?;

        info!("Fee cancelled");
        Ok(fee)
    }

    /// Deletes a fee and its installments; refused while payments reference it
    ///
    /// # Errors
    ///
    /// Returns `FeeHasPayments` while any payment exists for the fee
    #[instrument(skip(self), fields(fee_id = %fee_id))]
    pub async fn delete_fee(&self, fee_id: FeeId) -> Result<(), FeeError> {
        retry_on_conflict(fee_id, self.config.max_commit_retries, move || {
            self.try_delete_fee(fee_id)
        })
        .await?;

        info!("Fee deleted");
        Ok(())
    }

    async fn try_cancel_fee(&self, fee_id: FeeId) -> Result<Fee, FeeError> {
        let fee = self.load_fee(fee_id).await?;
        if fee.is_cancelled() {
            return Ok(fee);
        }

        let mut updated = fee.clone();
        updated.status = FeeStatus::Cancelled;
        updated.touch();
        self.store.update_fee(&updated, fee.version, None).await?;
        Ok(updated)
    }

    async fn try_delete_fee(&self, fee_id: FeeId) -> Result<(), FeeError> {
        let fee = self.load_fee(fee_id).await?;
        let payments = self.store.payments_for_fee(fee_id).await?;
        if !payments.is_empty() {
            return Err(FeeError::FeeHasPayments {
                fee_id,
                count: payments.len(),
            });
        }

        self.store
            .delete_fee(fee_id, fee.version)
            .await
            .map_err(|err| match err {
                PortError::Conflict {
                    kind: ConflictKind::Referenced,
                    ..
                } => FeeError::FeeHasPayments { fee_id, count: 1 },
                other => other.into(),
            })
    }

    // ========================================================================
    // Installment plans
    // ========================================================================

    /// Generates the installment plan starting today
    pub async fn generate_schedule(&self, fee_id: FeeId) -> Result<Vec<PaymentSchedule>, FeeError> {
        self.generate_schedule_from(fee_id, self.clock.today()).await
    }

    /// Generates the installment plan starting at `start`
    ///
    /// # Arguments
    ///
    /// * `fee_id` - Fee to split into installments
    /// * `start` - Plan start; the first installment falls due one cadence step later
    ///
    /// # Returns
    ///
    /// The installments ordered by index, amounts summing to the net amount
    ///
    /// # Errors
    ///
    /// * `SchedulesAlreadyGenerated` - The fee already has installments
    /// * `FeeCancelled` - Cancelled fees get no plan
    #[instrument(skip(self), fields(fee_id = %fee_id))]
    pub async fn generate_schedule_from(
        &self,
        fee_id: FeeId,
        start: NaiveDate,
    ) -> Result<Vec<PaymentSchedule>, FeeError> {
        let plan = retry_on_conflict(fee_id, self.config.max_commit_retries, move || {
            self.try_replace_plan(fee_id, start, false)
        })
        .await?;

        info!(installments = plan.len(), %start, "Payment schedule generated");
        Ok(plan)
    }

    /// Replaces the installment plan atomically
    ///
    /// Refused with `SchedulesHavePayments` if any installment has been paid.
    #[instrument(skip(self), fields(fee_id = %fee_id))]
    pub async fn regenerate_schedule(
        &self,
        fee_id: FeeId,
        start: Option<NaiveDate>,
    ) -> Result<Vec<PaymentSchedule>, FeeError> {
        let start = start.unwrap_or_else(|| self.clock.today());
        let plan = retry_on_conflict(fee_id, self.config.max_commit_retries, move || {
            self.try_replace_plan(fee_id, start, true)
        })
        .await?;

        info!(installments = plan.len(), %start, "Payment schedule regenerated");
        Ok(plan)
    }

    async fn try_replace_plan(
        &self,
        fee_id: FeeId,
        start: NaiveDate,
        allow_replace: bool,
    ) -> Result<Vec<PaymentSchedule>, FeeError> {
        let fee = self.load_fee(fee_id).await?;
        if fee.is_cancelled() {
            return Err(FeeError::FeeCancelled(fee_id));
        }

        let existing = self.store.schedules_for_fee(fee_id).await?;
        if !existing.is_empty() {
            if !allow_replace {
                return Err(FeeError::SchedulesAlreadyGenerated {
                    fee_id,
                    count: existing.len(),
                });
            }
            ensure_unpaid(fee_id, &existing)?;
        }

        let plan = schedule::generate(fee_id, fee.cadence, fee.net_amount(), start, &self.config)?;

        let mut updated = fee.clone();
        updated.status = derive_fee_status(&updated, &plan, self.clock.today());
        updated.touch();
        self.store
            .replace_schedules(&updated, fee.version, plan.clone())
            .await?;
        Ok(plan)
    }

    /// Installments of a fee ordered by index
    #[instrument(skip(self))]
    pub async fn schedules_for_fee(&self, fee_id: FeeId) -> Result<Vec<PaymentSchedule>, FeeError> {
        self.load_fee(fee_id).await?;
        Ok(self.store.schedules_for_fee(fee_id).await?)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn get_fee(&self, fee_id: FeeId) -> Result<Fee, FeeError> {
        self.load_fee(fee_id).await
    }

    /// The fee with its installments, payments and derived figures
    ///
    /// # Returns
    ///
    /// The fee, its balance, its installments ordered by index, its payments
    /// most recent first, and counts of paid and overdue installments
    #[instrument(skip(self))]
    pub async fn get_fee_details(&self, fee_id: FeeId) -> Result<FeeDetails, FeeError> {
        let fee = self.load_fee(fee_id).await?;
        let schedules = self.store.schedules_for_fee(fee_id).await?;
        let payments = self.store.payments_for_fee(fee_id).await?;
        let today = self.clock.today();

        let stats = FeeStats {
            installments: schedules.len(),
            paid_installments: schedules.iter().filter(|s| s.is_settled()).count(),
            overdue_installments: schedules.iter().filter(|s| s.is_past_due(today)).count(),
            next_due_date: schedules
                .iter()
                .filter(|s| !s.is_settled())
                .map(|s| s.due_date)
                .min(),
            payment_count: payments.len(),
        };
        debug!(?stats, "Loaded fee details");

        Ok(FeeDetails {
            balance: fee.balance(),
            fee,
            schedules,
            payments,
            stats,
        })
    }

    /// Fees of a student, newest first
    #[instrument(skip(self))]
    pub async fn fees_for_student(&self, student_id: StudentId) -> Result<Vec<Fee>, FeeError> {
        self.ensure_student(student_id).await?;
        Ok(self.store.fees_for_student(student_id).await?)
    }

    /// Net, paid and remaining amounts of a fee
    #[instrument(skip(self))]
    pub async fn get_fee_balance(&self, fee_id: FeeId) -> Result<FeeBalance, FeeError> {
        Ok(self.load_fee(fee_id).await?.balance())
    }

    /// Lists fees across all students
    ///
    /// # Arguments
    ///
    /// * `filter` - Optional status and academic year; the default lists every fee
    ///
    /// # Returns
    ///
    /// Matching fees, newest first
    #[instrument(skip(self))]
    pub async fn list_fees(&self, filter: FeeFilter) -> Result<Vec<Fee>, FeeError> {
        let fees = self.store.list_fees(filter).await?;
        debug!(count = fees.len(), "Listed fees");
        Ok(fees)
    }

    /// Installments past due and not fully paid, on fees that are not cancelled
    ///
    /// # Returns
    ///
    /// The installments, earliest due date first
    #[instrument(skip(self))]
    pub async fn overdue_schedules(&self) -> Result<Vec<PaymentSchedule>, FeeError> {
        let schedules = self.store.overdue_schedules(self.clock.today()).await?;
        debug!(count = schedules.len(), "Loaded overdue installments");
        Ok(schedules)
    }

    /// Totals and status counts over a student's fees
    ///
    /// Cancelled fees are counted but left out of the amount totals.
    #[instrument(skip(self))]
    pub async fn student_summary(&self, student_id: StudentId) -> Result<StudentFeeSummary, FeeError> {
        let fees = self.fees_for_student(student_id).await?;

        let mut summary = StudentFeeSummary {
            student_id: Some(student_id),
            fee_count: fees.len(),
            ..Default::default()
        };
        for fee in &fees {
            match fee.status {
                FeeStatus::Pending => summary.pending += 1,
                FeeStatus::PartiallyPaid => summary.partially_paid += 1,
                FeeStatus::Paid => summary.paid += 1,
                FeeStatus::Overdue => summary.overdue += 1,
                FeeStatus::Cancelled => {
                    summary.cancelled += 1;
                    continue;
                }
            }
            summary.total_expected = summary.total_expected + fee.total_amount;
            summary.total_discount = summary.total_discount + fee.discount_amount;
            summary.total_net = summary.total_net + fee.net_amount();
            summary.total_paid = summary.total_paid + fee.paid_amount;
            summary.total_due = summary.total_due + fee.remaining();
        }
        Ok(summary)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn current_year(&self) -> AcademicYear {
        AcademicYear::containing(self.clock.today())
    }

    async fn ensure_student(&self, student_id: StudentId) -> Result<(), FeeError> {
        if !self.students.student_exists(student_id).await? {
            return Err(FeeError::StudentNotFound(student_id));
        }
        Ok(())
    }

    async fn load_fee_type(&self, fee_type_id: FeeTypeId) -> Result<FeeType, FeeError> {
        self.fee_types.get_fee_type(fee_type_id).await.map_err(|err| {
            if err.is_not_found() {
                FeeError::FeeTypeNotFound(fee_type_id)
            } else {
                err.into()
            }
        })
    }

    async fn load_fee(&self, fee_id: FeeId) -> Result<Fee, FeeError> {
        self.store.get_fee(fee_id).await.map_err(|err| {
            if err.is_not_found() {
                FeeError::FeeNotFound(fee_id)
            } else {
                err.into()
            }
        })
    }
}

fn ensure_unpaid(fee_id: FeeId, schedules: &[PaymentSchedule]) -> Result<(), FeeError> {
    if schedules.iter().any(|s| s.paid_amount.is_positive()) {
        return Err(FeeError::SchedulesHavePayments(fee_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryFeeStore, InMemoryFeeTypeCatalog, InMemoryStudentDirectory};
    use core_kernel::FixedClock;
    use rust_decimal_macros::dec;

    async fn service_with(store: Arc<InMemoryFeeStore>, student: StudentId) -> FeeService {
        FeeService::new(
            store,
            Arc::new(InMemoryFeeTypeCatalog::new()),
            Arc::new(InMemoryStudentDirectory::with_students([student]).await),
            Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())),
            LedgerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_names_the_clashing_fee_type() {
        let store = Arc::new(InMemoryFeeStore::new());
        let student = StudentId::new();
        let year = AcademicYear::new(2025);
        let (tuition, transport) = (FeeTypeId::new(), FeeTypeId::new());

        let stored = Fee::new(
            student,
            transport,
            year,
            Cadence::Annually,
            calculate(Money::new(dec!(400)), Cadence::Annually, Money::ZERO).unwrap(),
            UserId::new(),
        );
        store.insert_fees(vec![stored]).await.unwrap();
        let service = service_with(store, student).await;

        let err = service
            .duplicate_fee(
                &[(student, tuition, year), (student, transport, year)],
                PortError::duplicate("unique violation"),
            )
            .await;
        match err {
            FeeError::DuplicateFee { fee_type_id, academic_year, .. } => {
                assert_eq!(fee_type_id, transport);
                assert_eq!(academic_year, year);
            }
            other => panic!("Expected DuplicateFee, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_without_stored_clash_stays_a_conflict() {
        let store = Arc::new(InMemoryFeeStore::new());
        let student = StudentId::new();
        let service = service_with(store, student).await;

        let err = service
            .duplicate_fee(
                &[(student, FeeTypeId::new(), AcademicYear::new(2025))],
                PortError::duplicate("unique violation"),
            )
            .await;
        assert!(matches!(err, FeeError::Storage(ref port) if port.is_duplicate()));
    }
}
