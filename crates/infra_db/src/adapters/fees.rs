//! PostgreSQL Fee Ledger Adapters
//!
//! Implements the fee ledger ports over `FeeRepository`:
//!
//! - `PostgresFeeStore` for `FeeStore`
//! - `PostgresFeeTypeCatalog` for `FeeTypeCatalog`
//! - `PostgresStudentDirectory` for `StudentDirectory`
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresFeeStore;
//! use domain_fees::FeeStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn FeeStore> = Arc::new(PostgresFeeStore::new(pool));
//! let fee = store.get_fee(fee_id).await?;
//! ```

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AcademicYear, AdapterHealth, DomainPort, FeeId, FeeTypeId, HealthCheckResult, HealthCheckable,
    Money, PaymentId, PortError, ScheduleId, StudentId, UserId,
};
use domain_fees::{
    Cadence, Fee, FeeCategory, FeeFilter, FeeStatus, FeeStore, FeeType, FeeTypeCatalog, LedgerChange, LedgerCommit,
    Payment, PaymentMethod, PaymentSchedule, PaymentStatus, RevenueFilter, ScheduleStatus,
    StudentDirectory,
};

use crate::error::DatabaseError;
use crate::repositories::fees::{
    Cadence as DbCadence, FeeCategory as DbFeeCategory, FeeRepository, FeeRow, FeeStatus as DbFeeStatus,
    FeeTypeRow, PaymentChange, PaymentMethod as DbPaymentMethod, PaymentRow,
    PaymentStatus as DbPaymentStatus, RevenueScope, ScheduleRow, ScheduleStatus as DbScheduleStatus,
};

/// PostgreSQL-backed implementation of `FeeStore`
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - `DatabaseError::StaleVersion` -> stale-version `PortError::Conflict`
/// - unique and foreign key violations -> duplicate and referenced conflicts
/// - Other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresFeeStore {
    repository: FeeRepository,
    pool: PgPool,
}

impl PostgresFeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: FeeRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &FeeRepository {
        &self.repository
    }
}

impl DomainPort for PostgresFeeStore {}

#[async_trait]
impl HealthCheckable for PostgresFeeStore {
    /// Performs a `SELECT 1` round trip through the pool
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-fee-store").await
    }
}

#[async_trait]
impl FeeStore for PostgresFeeStore {
    #[instrument(skip(self), fields(fee_id = %id))]
    async fn get_fee(&self, id: FeeId) -> Result<Fee, PortError> {
        row_to_fee(self.repository.get_fee(id.into()).await?)
    }

    #[instrument(skip(self))]
    async fn find_fee(
        &self,
        student_id: StudentId,
        fee_type_id: FeeTypeId,
        academic_year: AcademicYear,
    ) -> Result<Option<Fee>, PortError> {
        self.repository
            .find_fee(student_id.into(), fee_type_id.into(), academic_year.start_year())
            .await?
            .map(row_to_fee)
            .transpose()
    }

    #[instrument(skip(self), fields(student_id = %student_id))]
    async fn fees_for_student(&self, student_id: StudentId) -> Result<Vec<Fee>, PortError> {
        let rows = self.repository.fees_for_student(student_id.into()).await?;
        rows.into_iter().map(row_to_fee).collect()
    }

    #[instrument(skip(self))]
    async fn fees_by_status(&self, statuses: &[FeeStatus]) -> Result<Vec<Fee>, PortError> {
        let statuses: Vec<_> = statuses.iter().copied().map(fee_status_to_db).collect();
        let rows = self.repository.fees_by_status(&statuses).await?;
        debug!(count = rows.len(), "Loaded fees by status");
        rows.into_iter().map(row_to_fee).collect()
    }

    #[instrument(skip(self))]
    async fn list_fees(&self, filter: FeeFilter) -> Result<Vec<Fee>, PortError> {
        let rows = self
            .repository
            .list_fees(
                filter.status.map(fee_status_to_db),
                filter.academic_year.map(|year| year.start_year()),
            )
            .await?;
        debug!(count = rows.len(), "Listed fees");
        rows.into_iter().map(row_to_fee).collect()
    }

    #[instrument(skip(self, fees), fields(count = fees.len()))]
    async fn insert_fees(&self, fees: Vec<Fee>) -> Result<(), PortError> {
        let rows: Vec<_> = fees.iter().map(fee_to_row).collect();
        self.repository.insert_fees(&rows).await?;
        Ok(())
    }

    #[instrument(skip(self, fee, replace_schedules), fields(fee_id = %fee.id))]
    async fn update_fee(
        &self,
        fee: &Fee,
        expected_version: i64,
        replace_schedules: Option<Vec<PaymentSchedule>>,
    ) -> Result<(), PortError> {
        let schedules = replace_schedules
            .map(|plan| plan.iter().map(schedule_to_row).collect::<Result<Vec<_>, _>>())
            .transpose()?;
        self.repository
            .update_fee(&fee_to_row(fee), expected_version, schedules.as_deref())
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(fee_id = %id))]
    async fn delete_fee(&self, id: FeeId, expected_version: i64) -> Result<(), PortError> {
        self.repository.delete_fee(id.into(), expected_version).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(schedule_id = %id))]
    async fn get_schedule(&self, id: ScheduleId) -> Result<PaymentSchedule, PortError> {
        row_to_schedule(self.repository.get_schedule(id.into()).await?)
    }

    #[instrument(skip(self), fields(fee_id = %fee_id))]
    async fn schedules_for_fee(&self, fee_id: FeeId) -> Result<Vec<PaymentSchedule>, PortError> {
        let rows = self.repository.schedules_for_fee(fee_id.into()).await?;
        rows.into_iter().map(row_to_schedule).collect()
    }

    #[instrument(skip(self))]
    async fn overdue_schedules(&self, today: NaiveDate) -> Result<Vec<PaymentSchedule>, PortError> {
        let rows = self.repository.overdue_schedules(today).await?;
        rows.into_iter().map(row_to_schedule).collect()
    }

    #[instrument(skip(self), fields(payment_id = %id))]
    async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError> {
        Ok(row_to_payment(self.repository.get_payment(id.into()).await?))
    }

    #[instrument(skip(self), fields(fee_id = %fee_id))]
    async fn payments_for_fee(&self, fee_id: FeeId) -> Result<Vec<Payment>, PortError> {
        let rows = self.repository.payments_for_fee(fee_id.into()).await?;
        Ok(rows.into_iter().map(row_to_payment).collect())
    }

    #[instrument(skip(self), fields(student_id = %student_id))]
    async fn payments_for_student(&self, student_id: StudentId) -> Result<Vec<Payment>, PortError> {
        let rows = self.repository.payments_for_student(student_id.into()).await?;
        Ok(rows.into_iter().map(row_to_payment).collect())
    }

    #[instrument(skip(self))]
    async fn list_payments(&self) -> Result<Vec<Payment>, PortError> {
        let rows = self.repository.list_payments().await?;
        Ok(rows.into_iter().map(row_to_payment).collect())
    }

    #[instrument(skip(self, commit), fields(fee_id = %commit.fee.id, expected_version = commit.expected_version))]
    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<(), PortError> {
        let schedule = commit.schedule.as_ref().map(schedule_to_row).transpose()?;
        let change = match &commit.change {
            LedgerChange::Insert(payment) => PaymentChange::Insert(payment_to_row(payment)),
            LedgerChange::Update(payment) => PaymentChange::Update(payment_to_row(payment)),
            LedgerChange::Delete(id) => PaymentChange::Delete((*id).into()),
        };

        self.repository
            .commit(&fee_to_row(&commit.fee), commit.expected_version, schedule.as_ref(), &change)
            .await?;
        debug!(version = commit.fee.version, "Ledger commit applied");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn revenue(&self, filter: RevenueFilter) -> Result<Money, PortError> {
        let scope = match filter {
            RevenueFilter::All => RevenueScope::All,
            RevenueFilter::PaymentDates(range) => RevenueScope::Between(range.start(), range.end()),
            RevenueFilter::AcademicYear(year) => RevenueScope::AcademicYear(year.start_year()),
        };
        let total = self.repository.revenue(scope).await?;
        Ok(Money::new(total.normalize()))
    }
}

/// PostgreSQL-backed implementation of `FeeTypeCatalog`
#[derive(Debug, Clone)]
pub struct PostgresFeeTypeCatalog {
    repository: FeeRepository,
}

impl PostgresFeeTypeCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: FeeRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresFeeTypeCatalog {}

#[async_trait]
impl FeeTypeCatalog for PostgresFeeTypeCatalog {
    #[instrument(skip(self), fields(fee_type_id = %id))]
    async fn get_fee_type(&self, id: FeeTypeId) -> Result<FeeType, PortError> {
        Ok(row_to_fee_type(self.repository.get_fee_type(id.into()).await?))
    }
}

/// PostgreSQL-backed implementation of `StudentDirectory`
#[derive(Debug, Clone)]
pub struct PostgresStudentDirectory {
    repository: FeeRepository,
}

impl PostgresStudentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: FeeRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresStudentDirectory {}

#[async_trait]
impl StudentDirectory for PostgresStudentDirectory {
    #[instrument(skip(self), fields(student_id = %id))]
    async fn student_exists(&self, id: StudentId) -> Result<bool, PortError> {
        Ok(self.repository.student_exists(id.into()).await?)
    }
}

async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };
    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn money(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount.normalize())
}

fn row_to_fee(row: FeeRow) -> Result<Fee, PortError> {
    Ok(Fee {
        id: FeeId::from(row.fee_id),
        student_id: StudentId::from(row.student_id),
        fee_type_id: FeeTypeId::from(row.fee_type_id),
        academic_year: AcademicYear::new(row.academic_year),
        cadence: db_to_cadence(row.cadence),
        total_amount: money(row.total_amount),
        discount_amount: money(row.discount_amount),
        paid_amount: money(row.paid_amount),
        status: db_to_fee_status(row.status),
        notes: row.notes,
        assigned_by: UserId::from(row.assigned_by),
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn fee_to_row(fee: &Fee) -> FeeRow {
    FeeRow {
        fee_id: fee.id.into(),
        student_id: fee.student_id.into(),
        fee_type_id: fee.fee_type_id.into(),
        academic_year: fee.academic_year.start_year(),
        cadence: cadence_to_db(fee.cadence),
        total_amount: fee.total_amount.amount(),
        discount_amount: fee.discount_amount.amount(),
        paid_amount: fee.paid_amount.amount(),
        status: fee_status_to_db(fee.status),
        notes: fee.notes.clone(),
        assigned_by: fee.assigned_by.into(),
        version: fee.version,
        created_at: fee.created_at,
        updated_at: fee.updated_at,
    }
}

fn row_to_schedule(row: ScheduleRow) -> Result<PaymentSchedule, PortError> {
    let installment = u32::try_from(row.installment).map_err(|_| {
        PortError::from(DatabaseError::InvalidData(format!(
            "installment {} of schedule {}",
            row.installment, row.schedule_id
        )))
    })?;

    Ok(PaymentSchedule {
        id: ScheduleId::from(row.schedule_id),
        fee_id: FeeId::from(row.fee_id),
        installment,
        due_date: row.due_date,
        amount: money(row.amount),
        paid_amount: money(row.paid_amount),
        status: match row.status {
            DbScheduleStatus::Pending => ScheduleStatus::Pending,
            DbScheduleStatus::PartiallyPaid => ScheduleStatus::PartiallyPaid,
            DbScheduleStatus::Paid => ScheduleStatus::Paid,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn schedule_to_row(schedule: &PaymentSchedule) -> Result<ScheduleRow, PortError> {
    let installment = i32::try_from(schedule.installment)
        .map_err(|_| PortError::validation_field("Installment index out of range", "installment"))?;

    Ok(ScheduleRow {
        schedule_id: schedule.id.into(),
        fee_id: schedule.fee_id.into(),
        installment,
        due_date: schedule.due_date,
        amount: schedule.amount.amount(),
        paid_amount: schedule.paid_amount.amount(),
        status: match schedule.status {
            ScheduleStatus::Pending => DbScheduleStatus::Pending,
            ScheduleStatus::PartiallyPaid => DbScheduleStatus::PartiallyPaid,
            ScheduleStatus::Paid => DbScheduleStatus::Paid,
        },
        created_at: schedule.created_at,
        updated_at: schedule.updated_at,
    })
}

fn row_to_payment(row: PaymentRow) -> Payment {
    Payment {
        id: PaymentId::from(row.payment_id),
        fee_id: FeeId::from(row.fee_id),
        schedule_id: row.schedule_id.map(ScheduleId::from),
        student_id: StudentId::from(row.student_id),
        amount: money(row.amount),
        method: db_to_payment_method(row.method),
        payment_date: row.payment_date,
        check_number: row.check_number,
        check_due_date: row.check_due_date,
        transaction_ref: row.transaction_ref,
        receipt_number: row.receipt_number,
        status: db_to_payment_status(row.status),
        processed_by: UserId::from(row.processed_by),
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn payment_to_row(payment: &Payment) -> PaymentRow {
    PaymentRow {
        payment_id: payment.id.into(),
        fee_id: payment.fee_id.into(),
        schedule_id: payment.schedule_id.map(Into::into),
        student_id: payment.student_id.into(),
        amount: payment.amount.amount(),
        method: payment_method_to_db(payment.method),
        payment_date: payment.payment_date,
        check_number: payment.check_number.clone(),
        check_due_date: payment.check_due_date,
        transaction_ref: payment.transaction_ref.clone(),
        receipt_number: payment.receipt_number.clone(),
        status: payment_status_to_db(payment.status),
        processed_by: payment.processed_by.into(),
        notes: payment.notes.clone(),
        created_at: payment.created_at,
        updated_at: payment.updated_at,
    }
}

fn row_to_fee_type(row: FeeTypeRow) -> FeeType {
    FeeType {
        id: FeeTypeId::from(row.fee_type_id),
        name: row.name,
        category: match row.category {
            DbFeeCategory::Tuition => FeeCategory::Tuition,
            DbFeeCategory::Registration => FeeCategory::Registration,
            DbFeeCategory::Transport => FeeCategory::Transport,
            DbFeeCategory::Books => FeeCategory::Books,
            DbFeeCategory::Uniform => FeeCategory::Uniform,
            DbFeeCategory::Activity => FeeCategory::Activity,
            DbFeeCategory::Exam => FeeCategory::Exam,
            DbFeeCategory::Other => FeeCategory::Other,
        },
        amount: money(row.amount),
    }
}

// ============================================================================
// Enum conversions
// ============================================================================

fn cadence_to_db(cadence: Cadence) -> DbCadence {
    match cadence {
        Cadence::Monthly => DbCadence::Monthly,
        Cadence::Quarterly => DbCadence::Quarterly,
        Cadence::Semester => DbCadence::Semester,
        Cadence::Annually => DbCadence::Annually,
        Cadence::OneTime => DbCadence::OneTime,
    }
}

fn db_to_cadence(cadence: DbCadence) -> Cadence {
    match cadence {
        DbCadence::Monthly => Cadence::Monthly,
        DbCadence::Quarterly => Cadence::Quarterly,
        DbCadence::Semester => Cadence::Semester,
        DbCadence::Annually => Cadence::Annually,
        DbCadence::OneTime => Cadence::OneTime,
    }
}

fn fee_status_to_db(status: FeeStatus) -> DbFeeStatus {
    match status {
        FeeStatus::Pending => DbFeeStatus::Pending,
        FeeStatus::PartiallyPaid => DbFeeStatus::PartiallyPaid,
        FeeStatus::Paid => DbFeeStatus::Paid,
        FeeStatus::Overdue => DbFeeStatus::Overdue,
        FeeStatus::Cancelled => DbFeeStatus::Cancelled,
    }
}

fn db_to_fee_status(status: DbFeeStatus) -> FeeStatus {
    match status {
        DbFeeStatus::Pending => FeeStatus::Pending,
        DbFeeStatus::PartiallyPaid => FeeStatus::PartiallyPaid,
        DbFeeStatus::Paid => FeeStatus::Paid,
        DbFeeStatus::Overdue => FeeStatus::Overdue,
        DbFeeStatus::Cancelled => FeeStatus::Cancelled,
    }
}

fn payment_method_to_db(method: PaymentMethod) -> DbPaymentMethod {
    match method {
        PaymentMethod::Cash => DbPaymentMethod::Cash,
        PaymentMethod::BankTransfer => DbPaymentMethod::BankTransfer,
        PaymentMethod::Check => DbPaymentMethod::Check,
        PaymentMethod::CreditCard => DbPaymentMethod::CreditCard,
        PaymentMethod::DebitCard => DbPaymentMethod::DebitCard,
        PaymentMethod::Online => DbPaymentMethod::Online,
        PaymentMethod::MobilePayment => DbPaymentMethod::MobilePayment,
    }
}

fn db_to_payment_method(method: DbPaymentMethod) -> PaymentMethod {
    match method {
        DbPaymentMethod::Cash => PaymentMethod::Cash,
        DbPaymentMethod::BankTransfer => PaymentMethod::BankTransfer,
        DbPaymentMethod::Check => PaymentMethod::Check,
        DbPaymentMethod::CreditCard => PaymentMethod::CreditCard,
        DbPaymentMethod::DebitCard => PaymentMethod::DebitCard,
        DbPaymentMethod::Online => PaymentMethod::Online,
        DbPaymentMethod::MobilePayment => PaymentMethod::MobilePayment,
    }
}

fn payment_status_to_db(status: PaymentStatus) -> DbPaymentStatus {
    match status {
        PaymentStatus::Completed => DbPaymentStatus::Completed,
        PaymentStatus::Pending => DbPaymentStatus::Pending,
        PaymentStatus::Failed => DbPaymentStatus::Failed,
        PaymentStatus::Refunded => DbPaymentStatus::Refunded,
    }
}

fn db_to_payment_status(status: DbPaymentStatus) -> PaymentStatus {
    match status {
        DbPaymentStatus::Completed => PaymentStatus::Completed,
        DbPaymentStatus::Pending => PaymentStatus::Pending,
        DbPaymentStatus::Failed => PaymentStatus::Failed,
        DbPaymentStatus::Refunded => PaymentStatus::Refunded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain_fees::{calculate, NewPayment};
    use rust_decimal_macros::dec;

    fn sample_fee() -> Fee {
        let amounts = calculate(Money::new(dec!(250)), Cadence::Quarterly, Money::new(dec!(100))).unwrap();
        Fee::new(
            StudentId::new(),
            FeeTypeId::new(),
            AcademicYear::new(2025),
            Cadence::Quarterly,
            amounts,
            UserId::new(),
        )
    }

    #[test]
    fn test_fee_row_round_trip_keeps_version_and_year() {
        let fee = sample_fee();
        let row = fee_to_row(&fee);
        assert_eq!(row.academic_year, 2025);
        assert_eq!(row.cadence, DbCadence::Quarterly);
        assert_eq!(row.version, 1);

        let back = row_to_fee(row).unwrap();
        assert_eq!(back, fee);
    }

    #[test]
    fn test_numeric_scale_is_normalized() {
        let mut row = fee_to_row(&sample_fee());
        row.total_amount = dec!(1000.0000);

        let fee = row_to_fee(row).unwrap();
        assert_eq!(fee.total_amount.amount().scale(), 0);
        assert_eq!(fee.total_amount.amount(), dec!(1000));
    }

    proptest::proptest! {
        #[test]
        fn prop_normalized_money_keeps_value(minor in 0i64..10_000_000_000, scale in 0u32..=4) {
            let stored = rust_decimal::Decimal::new(minor, scale);
            let read = money(stored.round_dp(4));
            proptest::prop_assert_eq!(read.amount(), stored);
        }
    }

    #[test]
    fn test_negative_installment_rejected() {
        let row = ScheduleRow {
            schedule_id: uuid::Uuid::new_v4(),
            fee_id: uuid::Uuid::new_v4(),
            installment: -1,
            due_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            amount: dec!(250),
            paid_amount: dec!(0),
            status: DbScheduleStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(row_to_schedule(row), Err(PortError::Internal { .. })));
    }

    #[test]
    fn test_payment_enums_survive_mapping() {
        let fee = sample_fee();
        let request = NewPayment::cash(fee.id, Money::new(dec!(50)), NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        let payment = Payment {
            id: PaymentId::new(),
            fee_id: request.fee_id,
            schedule_id: None,
            student_id: fee.student_id,
            amount: request.amount,
            method: PaymentMethod::MobilePayment,
            payment_date: request.payment_date,
            check_number: None,
            check_due_date: None,
            transaction_ref: Some("TX-9".to_string()),
            receipt_number: "RCP-20251001-ABCDEF12".to_string(),
            status: PaymentStatus::Refunded,
            processed_by: UserId::new(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let row = payment_to_row(&payment);
        assert_eq!(row.method, DbPaymentMethod::MobilePayment);
        assert_eq!(row.status, DbPaymentStatus::Refunded);
        assert_eq!(row_to_payment(row), payment);
    }
}
