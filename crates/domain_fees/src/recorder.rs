//! Payment recording
//!
//! Every payment mutation follows the same shape: read a snapshot of the fee
//! (and the installment and payment involved), validate against it, derive the
//! new balances and statuses, then hand a single [`LedgerCommit`] to the store.
//! The commit is conditioned on the fee version read at the start, so a
//! concurrent writer forces a re-read instead of an overshoot.
//!
//! Balances are maintained incrementally: only the payment's effective amount
//! (its amount when its status counts toward the balance, zero otherwise) is
//! added or removed.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{Clock, FeeId, Money, PaymentId, ScheduleId, StudentId, UserId};

use crate::config::LedgerConfig;
use crate::error::{BalanceScope, FeeError};
use crate::fee::Fee;
use crate::payment::{
    effective_amount, generate_receipt_number, validate_amount, validate_check, NewPayment, Payment,
    PaymentPatch,
};
use crate::ports::{FeeStore, LedgerChange, LedgerCommit};
use crate::reconciler::{derive_fee_status, derive_schedule_status};
use crate::retry::retry_on_conflict;
use crate::schedule::PaymentSchedule;

/// Records, updates and deletes payments while keeping balances consistent
#[derive(Clone)]
pub struct PaymentRecorder {
    store: Arc<dyn FeeStore>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl PaymentRecorder {
    pub fn new(store: Arc<dyn FeeStore>, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        Self { store, clock, config }
    }

    /// Records a payment against a fee and, optionally, one of its installments
    ///
    /// The amount must fit the fee's remaining balance and, when allocated,
    /// the installment's remaining balance, whatever the payment status. Only
    /// Completed and Pending payments move the balances.
    ///
    /// # Arguments
    ///
    /// * `request` - Fee, amount, method, date and optional installment, check
    ///   details and receipt number
    /// * `processed_by` - User recorded as having taken the payment
    ///
    /// # Returns
    ///
    /// The stored payment; a receipt number is generated when none was given
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - Amount is zero or negative
    /// * `CheckNumberRequired` / `CheckDueDateInPast` - Invalid check details
    /// * `FeeCancelled` - The fee accepts no payments
    /// * `AmountExceedsBalance` - Amount is larger than what remains owed
    /// * `DuplicateReceipt` - The receipt number is already used
    /// * `ConcurrentModification` - Other writers kept winning the fee's version
    #[instrument(skip(self, request), fields(fee_id = %request.fee_id, amount = %request.amount, method = %request.method))]
    pub async fn record(&self, request: NewPayment, processed_by: UserId) -> Result<Payment, FeeError> {
        validate_amount(request.amount)?;
        let today = self.clock.today();
        validate_check(
            request.method,
            request.check_number.as_deref(),
            request.check_due_date,
            today,
        )?;

        let receipt_number = match request.receipt_number.as_deref().map(str::trim) {
            Some(receipt) if !receipt.is_empty() => receipt.to_string(),
            _ => generate_receipt_number(&self.config.receipt_prefix, request.payment_date),
        };
        let payment_id = PaymentId::new_v7();

        let request = &request;
        let receipt = receipt_number.as_str();
        let payment = retry_on_conflict(request.fee_id, self.config.max_commit_retries, move || {
            self.try_record(request, payment_id, receipt, processed_by, today)
        })
        .await
        .map_err(|err| duplicate_receipt(err, receipt))
        .map_err(|err| {
            warn!(error = %err, "Payment rejected");
            err
        })?;

        info!(
            payment_id = %payment.id,
            receipt_number = %payment.receipt_number,
            status = %payment.status,
            "Payment recorded"
        );
        Ok(payment)
    }

    async fn try_record(
        &self,
        request: &NewPayment,
        payment_id: PaymentId,
        receipt_number: &str,
        processed_by: UserId,
        today: NaiveDate,
    ) -> Result<Payment, FeeError> {
        let fee = self.load_fee(request.fee_id).await?;
        if fee.is_cancelled() {
            return Err(FeeError::FeeCancelled(fee.id));
        }

        let status = request.status.unwrap_or_default();
        ensure_within(BalanceScope::Fee, fee.remaining(), request.amount, request.amount)?;
        let effective = effective_amount(request.amount, status);

        let mut schedules = self.store.schedules_for_fee(fee.id).await?;
        let schedule = match request.schedule_id {
            Some(schedule_id) => {
                let schedule = self.find_schedule(&schedules, schedule_id, fee.id).await?;
                ensure_within(BalanceScope::Schedule, schedule.remaining(), request.amount, request.amount)?;
                Some(apply_to_schedule(schedule, effective))
            }
            None => None,
        };

        let now = Utc::now();
        let payment = Payment {
            id: payment_id,
            fee_id: fee.id,
            schedule_id: request.schedule_id,
            student_id: fee.student_id,
            amount: request.amount,
            method: request.method,
            payment_date: request.payment_date,
            check_number: request.check_number.clone(),
            check_due_date: request.check_due_date,
            transaction_ref: request.transaction_ref.clone(),
            receipt_number: receipt_number.to_string(),
            status,
            processed_by,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        let commit = build_commit(
            &fee,
            fee.paid_amount + effective,
            &mut schedules,
            schedule,
            today,
            LedgerChange::Insert(payment.clone()),
        );
        self.store.commit_ledger(commit).await?;
        Ok(payment)
    }

    /// Updates a payment, applying only the change in its effective amount
    ///
    /// Raising the amount, or moving a Failed or Refunded payment back to a
    /// counting status, must still fit the remaining balance. Lowering it
    /// never fails on balance grounds.
    ///
    /// # Arguments
    ///
    /// * `payment_id` - Payment to change
    /// * `patch` - Fields to change; `None` keeps the current value
    #[instrument(skip(self, patch), fields(payment_id = %payment_id))]
    pub async fn update(&self, payment_id: PaymentId, patch: PaymentPatch) -> Result<Payment, FeeError> {
        if let Some(amount) = patch.amount {
            validate_amount(amount)?;
        }
        let today = self.clock.today();

        let fee_id = self.load_payment(payment_id).await?.fee_id;
        let patch = &patch;
        let payment = retry_on_conflict(fee_id, self.config.max_commit_retries, move || {
            self.try_update(payment_id, patch, today)
        })
        .await
        .map_err(|err| match &patch.receipt_number {
            Some(receipt) => duplicate_receipt(err, receipt),
            None => err,
        })?;

        info!(
            fee_id = %payment.fee_id,
            amount = %payment.amount,
            status = %payment.status,
            "Payment updated"
        );
        Ok(payment)
    }

    async fn try_update(
        &self,
        payment_id: PaymentId,
        patch: &PaymentPatch,
        today: NaiveDate,
    ) -> Result<Payment, FeeError> {
        let current = self.load_payment(payment_id).await?;
        let fee = self.load_fee(current.fee_id).await?;
        let updated = patch.apply(&current);

        if patch.method.is_some() || patch.check_number.is_some() || patch.check_due_date.is_some() {
            validate_check(
                updated.method,
                updated.check_number.as_deref(),
                patch.check_due_date,
                today,
            )?;
        }

        let delta = updated.effective_amount() - current.effective_amount();
        if delta.is_positive() && fee.is_cancelled() {
            return Err(FeeError::FeeCancelled(fee.id));
        }
        ensure_within(BalanceScope::Fee, fee.remaining(), delta, delta)?;

        let mut schedules = self.store.schedules_for_fee(fee.id).await?;
        let schedule = match current.schedule_id {
            Some(schedule_id) => {
                let schedule = self.find_schedule(&schedules, schedule_id, fee.id).await?;
                ensure_within(BalanceScope::Schedule, schedule.remaining(), delta, delta)?;
                Some(apply_to_schedule(schedule, delta))
            }
            None => None,
        };

        let commit = build_commit(
            &fee,
            floor_at_zero(fee.paid_amount + delta),
            &mut schedules,
            schedule,
            today,
            LedgerChange::Update(updated.clone()),
        );
        self.store.commit_ledger(commit).await?;
        Ok(updated)
    }

    /// Deletes a payment, reversing its effect on the balances
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn delete(&self, payment_id: PaymentId) -> Result<(), FeeError> {
        let today = self.clock.today();
        let fee_id = self.load_payment(payment_id).await?.fee_id;

        let removed = retry_on_conflict(fee_id, self.config.max_commit_retries, move || {
            self.try_delete(payment_id, today)
        })
        .await?;

        info!(fee_id = %fee_id, amount = %removed.amount, "Payment deleted");
        Ok(())
    }

    async fn try_delete(&self, payment_id: PaymentId, today: NaiveDate) -> Result<Payment, FeeError> {
        let current = self.load_payment(payment_id).await?;
        let fee = self.load_fee(current.fee_id).await?;
        let reversal = -current.effective_amount();

        let mut schedules = self.store.schedules_for_fee(fee.id).await?;
        let schedule = match current.schedule_id {
            Some(schedule_id) => schedules
                .iter()
                .find(|s| s.id == schedule_id)
                .cloned()
                .map(|s| apply_to_schedule(s, reversal)),
            None => None,
        };

        let commit = build_commit(
            &fee,
            floor_at_zero(fee.paid_amount + reversal),
            &mut schedules,
            schedule,
            today,
            LedgerChange::Delete(current.id),
        );
        self.store.commit_ledger(commit).await?;
        Ok(current)
    }

    /// Retrieves a payment
    #[instrument(skip(self))]
    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<Payment, FeeError> {
        self.load_payment(payment_id).await
    }

    /// Payments of a fee, most recent first
    #[instrument(skip(self))]
    pub async fn payments_for_fee(&self, fee_id: FeeId) -> Result<Vec<Payment>, FeeError> {
        self.load_fee(fee_id).await?;
        let payments = self.store.payments_for_fee(fee_id).await?;
        debug!(count = payments.len(), "Loaded fee payments");
        Ok(payments)
    }

    /// Payments of a student, most recent first
    #[instrument(skip(self))]
    pub async fn payments_for_student(&self, student_id: StudentId) -> Result<Vec<Payment>, FeeError> {
        let payments = self.store.payments_for_student(student_id).await?;
        debug!(count = payments.len(), "Loaded student payments");
        Ok(payments)
    }

    /// Every payment in the ledger, most recent first
    #[instrument(skip(self))]
    pub async fn list_payments(&self) -> Result<Vec<Payment>, FeeError> {
        let payments = self.store.list_payments().await?;
        debug!(count = payments.len(), "Listed payments");
        Ok(payments)
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

    async fn load_payment(&self, payment_id: PaymentId) -> Result<Payment, FeeError> {
        self.store.get_payment(payment_id).await.map_err(|err| {
            if err.is_not_found() {
                FeeError::PaymentNotFound(payment_id)
            } else {
                err.into()
            }
        })
    }

    /// Finds an installment of `fee_id`, telling unknown ids apart from foreign ones
    async fn find_schedule(
        &self,
        schedules: &[PaymentSchedule],
        schedule_id: ScheduleId,
        fee_id: FeeId,
    ) -> Result<PaymentSchedule, FeeError> {
        if let Some(schedule) = schedules.iter().find(|s| s.id == schedule_id) {
            return Ok(schedule.clone());
        }
        match self.store.get_schedule(schedule_id).await {
            Ok(_) => Err(FeeError::ScheduleFeeMismatch { schedule_id, fee_id }),
            Err(err) if err.is_not_found() => Err(FeeError::ScheduleNotFound(schedule_id)),
            Err(err) => Err(err.into()),
        }
    }
}

/// Rejects an increase larger than the remaining balance
fn ensure_within(
    scope: BalanceScope,
    remaining: Money,
    increase: Money,
    attempted: Money,
) -> Result<(), FeeError> {
    if increase > remaining {
        return Err(FeeError::AmountExceedsBalance {
            scope,
            remaining,
            attempted,
        });
    }
    Ok(())
}

fn floor_at_zero(amount: Money) -> Money {
    if amount.is_negative() {
        Money::ZERO
    } else {
        amount
    }
}

fn apply_to_schedule(mut schedule: PaymentSchedule, delta: Money) -> PaymentSchedule {
    schedule.paid_amount = floor_at_zero(schedule.paid_amount + delta);
    schedule.status = derive_schedule_status(schedule.amount, schedule.paid_amount);
    schedule.updated_at = Utc::now();
    schedule
}

/// New fee state plus the changed installment, with the fee status re-derived
fn build_commit(
    fee: &Fee,
    paid_amount: Money,
    schedules: &mut [PaymentSchedule],
    schedule: Option<PaymentSchedule>,
    today: NaiveDate,
    change: LedgerChange,
) -> LedgerCommit {
    if let Some(changed) = &schedule {
        if let Some(slot) = schedules.iter_mut().find(|s| s.id == changed.id) {
            *slot = changed.clone();
        }
    }

    let mut updated = fee.clone();
    updated.paid_amount = paid_amount;
    updated.status = derive_fee_status(&updated, schedules, today);
    updated.touch();

    LedgerCommit {
        fee: updated,
        expected_version: fee.version,
        schedule,
        change,
    }
}

fn duplicate_receipt(err: FeeError, receipt: &str) -> FeeError {
    match err {
        FeeError::Storage(port) if port.is_duplicate() => FeeError::DuplicateReceipt(receipt.to_string()),
        other => other,
    }
}
