//! Fee ledger repository implementation
//!
//! This module provides database access for fees, their installment plans and
//! the payments recorded against them. Every write that touches a fee is
//! conditioned on the fee's `version` column: the `UPDATE ... WHERE version = $n`
//! row lock serializes writers, and a writer whose snapshot is stale matches
//! zero rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

const FEE_COLUMNS: &str = "fee_id, student_id, fee_type_id, academic_year, cadence, total_amount, \
     discount_amount, paid_amount, status, notes, assigned_by, version, created_at, updated_at";

const SCHEDULE_COLUMNS: &str =
    "schedule_id, fee_id, installment, due_date, amount, paid_amount, status, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "payment_id, fee_id, schedule_id, student_id, amount, method, payment_date, \
     check_number, check_due_date, transaction_ref, receipt_number, status, processed_by, notes, \
     created_at, updated_at";

/// Repository for the fee ledger tables
#[derive(Debug, Clone)]
pub struct FeeRepository {
    pool: PgPool,
}

impl FeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Reference data
    // ========================================================================

    pub async fn get_fee_type(&self, fee_type_id: Uuid) -> Result<FeeTypeRow, DatabaseError> {
        sqlx::query_as::<_, FeeTypeRow>(
            "SELECT fee_type_id, name, category, amount FROM fee_types WHERE fee_type_id = $1",
        )
        .bind(fee_type_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("FeeType", fee_type_id))
    }

    pub async fn student_exists(&self, student_id: Uuid) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM students WHERE student_id = $1)",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    // ========================================================================
    // Fees
    // ========================================================================

    pub async fn get_fee(&self, fee_id: Uuid) -> Result<FeeRow, DatabaseError> {
        let sql = format!("SELECT {FEE_COLUMNS} FROM fees WHERE fee_id = $1");
        sqlx::query_as::<_, FeeRow>(&sql)
            .bind(fee_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Fee", fee_id))
    }

    pub async fn find_fee(
        &self,
        student_id: Uuid,
        fee_type_id: Uuid,
        academic_year: i32,
    ) -> Result<Option<FeeRow>, DatabaseError> {
        let sql = format!(
            "SELECT {FEE_COLUMNS} FROM fees \
             WHERE student_id = $1 AND fee_type_id = $2 AND academic_year = $3"
        );
        let row = sqlx::query_as::<_, FeeRow>(&sql)
            .bind(student_id)
            .bind(fee_type_id)
            .bind(academic_year)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn fees_for_student(&self, student_id: Uuid) -> Result<Vec<FeeRow>, DatabaseError> {
        let sql = format!(
            "SELECT {FEE_COLUMNS} FROM fees WHERE student_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, FeeRow>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn fees_by_status(&self, statuses: &[FeeStatus]) -> Result<Vec<FeeRow>, DatabaseError> {
        let labels: Vec<String> = statuses.iter().map(|s| s.label().to_string()).collect();
        let sql = format!(
            "SELECT {FEE_COLUMNS} FROM fees WHERE status::text = ANY($1) ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, FeeRow>(&sql)
            .bind(labels)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Fees matching the optional status and academic year, newest first
    pub async fn list_fees(
        &self,
        status: Option<FeeStatus>,
        academic_year: Option<i32>,
    ) -> Result<Vec<FeeRow>, DatabaseError> {
        let sql = format!(
            "SELECT {FEE_COLUMNS} FROM fees \
             WHERE ($1::text IS NULL OR status::text = $1) \
               AND ($2::int IS NULL OR academic_year = $2) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, FeeRow>(&sql)
            .bind(status.map(|s| s.label()))
            .bind(academic_year)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts all fees in one transaction
    pub async fn insert_fees(&self, fees: &[FeeRow]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for fee in fees {
            sqlx::query(
                r#"
                INSERT INTO fees (
                    fee_id, student_id, fee_type_id, academic_year, cadence,
                    total_amount, discount_amount, paid_amount, status, notes,
                    assigned_by, version, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(fee.fee_id)
            .bind(fee.student_id)
            .bind(fee.fee_type_id)
            .bind(fee.academic_year)
            .bind(fee.cadence)
            .bind(fee.total_amount)
            .bind(fee.discount_amount)
            .bind(fee.paid_amount)
            .bind(fee.status)
            .bind(&fee.notes)
            .bind(fee.assigned_by)
            .bind(fee.version)
            .bind(fee.created_at)
            .bind(fee.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Overwrites a fee and optionally its whole installment plan
    pub async fn update_fee(
        &self,
        fee: &FeeRow,
        expected_version: i64,
        schedules: Option<&[ScheduleRow]>,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        update_fee_versioned(&mut *tx, fee, expected_version).await?;

        if let Some(schedules) = schedules {
            sqlx::query("DELETE FROM payment_schedules WHERE fee_id = $1")
                .bind(fee.fee_id)
                .execute(&mut *tx)
                .await?;
            for schedule in schedules {
                insert_schedule(&mut *tx, schedule).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a fee, its installments cascading
    pub async fn delete_fee(&self, fee_id: Uuid, expected_version: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let payments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments WHERE fee_id = $1")
            .bind(fee_id)
            .fetch_one(&mut *tx)
            .await?;
        if payments > 0 {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "Fee {} still has {} payments",
                fee_id, payments
            )));
        }

        let result = sqlx::query("DELETE FROM fees WHERE fee_id = $1 AND version = $2")
            .bind(fee_id)
            .bind(expected_version)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(missing_or_stale(&mut *tx, fee_id).await);
        }

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Installments
    // ========================================================================

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<ScheduleRow, DatabaseError> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM payment_schedules WHERE schedule_id = $1");
        sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(schedule_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("PaymentSchedule", schedule_id))
    }

    pub async fn schedules_for_fee(&self, fee_id: Uuid) -> Result<Vec<ScheduleRow>, DatabaseError> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM payment_schedules WHERE fee_id = $1 ORDER BY installment"
        );
        let rows = sqlx::query_as::<_, ScheduleRow>(&sql)
            .bind(fee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Unpaid installments due before `today` whose fee is not cancelled
    pub async fn overdue_schedules(&self, today: NaiveDate) -> Result<Vec<ScheduleRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            r#"
            SELECT s.schedule_id, s.fee_id, s.installment, s.due_date, s.amount,
                   s.paid_amount, s.status, s.created_at, s.updated_at
            FROM payment_schedules s
            JOIN fees f ON f.fee_id = s.fee_id
            WHERE s.status <> 'paid' AND s.due_date < $1 AND f.status <> 'cancelled'
            ORDER BY s.due_date, s.installment
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ========================================================================
    // Payments
    // ========================================================================

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentRow, DatabaseError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1");
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Payment", payment_id))
    }

    pub async fn payments_for_fee(&self, fee_id: Uuid) -> Result<Vec<PaymentRow>, DatabaseError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE fee_id = $1 \
             ORDER BY payment_date DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(fee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn payments_for_student(&self, student_id: Uuid) -> Result<Vec<PaymentRow>, DatabaseError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE student_id = $1 \
             ORDER BY payment_date DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_payments(&self) -> Result<Vec<PaymentRow>, DatabaseError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY payment_date DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Applies a payment change with the resulting fee and installment state
    ///
    /// The fee row is updated first so that its row lock is held for the rest
    /// of the transaction.
    pub async fn commit(
        &self,
        fee: &FeeRow,
        expected_version: i64,
        schedule: Option<&ScheduleRow>,
        change: &PaymentChange,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        update_fee_versioned(&mut *tx, fee, expected_version).await?;

        match change {
            PaymentChange::Insert(payment) => insert_payment(&mut *tx, payment).await?,
            PaymentChange::Update(payment) => update_payment(&mut *tx, payment).await?,
            PaymentChange::Delete(payment_id) => {
                let result = sqlx::query("DELETE FROM payments WHERE payment_id = $1 AND fee_id = $2")
                    .bind(*payment_id)
                    .bind(fee.fee_id)
                    .execute(&mut *tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(DatabaseError::not_found("Payment", payment_id));
                }
            }
        }

        if let Some(schedule) = schedule {
            let result = sqlx::query(
                r#"
                UPDATE payment_schedules
                SET paid_amount = $3, status = $4, updated_at = $5
                WHERE schedule_id = $1 AND fee_id = $2
                "#,
            )
            .bind(schedule.schedule_id)
            .bind(schedule.fee_id)
            .bind(schedule.paid_amount)
            .bind(schedule.status)
            .bind(schedule.updated_at)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(DatabaseError::not_found("PaymentSchedule", schedule.schedule_id));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Sum of completed payment amounts
    pub async fn revenue(&self, scope: RevenueScope) -> Result<Decimal, DatabaseError> {
        let query = match scope {
            RevenueScope::All => sqlx::query_scalar::<_, Decimal>(
                "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'completed'",
            ),
            RevenueScope::Between(start, end) => sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT COALESCE(SUM(amount), 0) FROM payments
                WHERE status = 'completed' AND payment_date BETWEEN $1 AND $2
                "#,
            )
            .bind(start)
            .bind(end),
            RevenueScope::AcademicYear(year) => sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT COALESCE(SUM(p.amount), 0) FROM payments p
                JOIN fees f ON f.fee_id = p.fee_id
                WHERE p.status = 'completed' AND f.academic_year = $1
                "#,
            )
            .bind(year),
        };
        Ok(query.fetch_one(&self.pool).await?)
    }
}

// ============================================================================
// Transaction helpers
// ============================================================================

async fn update_fee_versioned(
    conn: &mut PgConnection,
    fee: &FeeRow,
    expected_version: i64,
) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE fees SET
            fee_type_id = $3, cadence = $4, total_amount = $5, discount_amount = $6,
            paid_amount = $7, status = $8, notes = $9, version = $10, updated_at = $11
        WHERE fee_id = $1 AND version = $2
        "#,
    )
    .bind(fee.fee_id)
    .bind(expected_version)
    .bind(fee.fee_type_id)
    .bind(fee.cadence)
    .bind(fee.total_amount)
    .bind(fee.discount_amount)
    .bind(fee.paid_amount)
    .bind(fee.status)
    .bind(&fee.notes)
    .bind(fee.version)
    .bind(fee.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(missing_or_stale(conn, fee.fee_id).await);
    }
    Ok(())
}

/// Tells a vanished fee from one whose version moved on
async fn missing_or_stale(conn: &mut PgConnection, fee_id: Uuid) -> DatabaseError {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM fees WHERE fee_id = $1)")
        .bind(fee_id)
        .fetch_one(&mut *conn)
        .await;
    match exists {
        Ok(true) => DatabaseError::stale("Fee", fee_id),
        Ok(false) => DatabaseError::not_found("Fee", fee_id),
        Err(e) => e.into(),
    }
}

async fn insert_schedule(conn: &mut PgConnection, schedule: &ScheduleRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO payment_schedules (
            schedule_id, fee_id, installment, due_date, amount,
            paid_amount, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(schedule.schedule_id)
    .bind(schedule.fee_id)
    .bind(schedule.installment)
    .bind(schedule.due_date)
    .bind(schedule.amount)
    .bind(schedule.paid_amount)
    .bind(schedule.status)
    .bind(schedule.created_at)
    .bind(schedule.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_payment(conn: &mut PgConnection, payment: &PaymentRow) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            payment_id, fee_id, schedule_id, student_id, amount, method, payment_date,
            check_number, check_due_date, transaction_ref, receipt_number, status,
            processed_by, notes, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(payment.payment_id)
    .bind(payment.fee_id)
    .bind(payment.schedule_id)
    .bind(payment.student_id)
    .bind(payment.amount)
    .bind(payment.method)
    .bind(payment.payment_date)
    .bind(&payment.check_number)
    .bind(payment.check_due_date)
    .bind(&payment.transaction_ref)
    .bind(&payment.receipt_number)
    .bind(payment.status)
    .bind(payment.processed_by)
    .bind(&payment.notes)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_payment(conn: &mut PgConnection, payment: &PaymentRow) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE payments SET
            amount = $3, method = $4, payment_date = $5, check_number = $6,
            check_due_date = $7, transaction_ref = $8, receipt_number = $9,
            status = $10, notes = $11, updated_at = $12
        WHERE payment_id = $1 AND fee_id = $2
        "#,
    )
    .bind(payment.payment_id)
    .bind(payment.fee_id)
    .bind(payment.amount)
    .bind(payment.method)
    .bind(payment.payment_date)
    .bind(&payment.check_number)
    .bind(payment.check_due_date)
    .bind(&payment.transaction_ref)
    .bind(&payment.receipt_number)
    .bind(payment.status)
    .bind(&payment.notes)
    .bind(payment.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Payment", payment.payment_id));
    }
    Ok(())
}

// ============================================================================
// Type definitions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "fee_category", rename_all = "snake_case")]
pub enum FeeCategory {
    Tuition,
    Registration,
    Transport,
    Books,
    Uniform,
    Activity,
    Exam,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "fee_cadence", rename_all = "snake_case")]
pub enum Cadence {
    Monthly,
    Quarterly,
    Semester,
    Annually,
    OneTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "fee_status", rename_all = "snake_case")]
pub enum FeeStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl FeeStatus {
    /// Enum label as stored
    pub fn label(&self) -> &'static str {
        match self {
            FeeStatus::Pending => "pending",
            FeeStatus::PartiallyPaid => "partially_paid",
            FeeStatus::Paid => "paid",
            FeeStatus::Overdue => "overdue",
            FeeStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "schedule_status", rename_all = "snake_case")]
pub enum ScheduleStatus {
    Pending,
    PartiallyPaid,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Check,
    CreditCard,
    DebitCard,
    Online,
    MobilePayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct FeeTypeRow {
    pub fee_type_id: Uuid,
    pub name: String,
    pub category: FeeCategory,
    pub amount: Decimal,
}

/// Database row representation of a fee
#[derive(Debug, Clone, FromRow)]
pub struct FeeRow {
    pub fee_id: Uuid,
    pub student_id: Uuid,
    pub fee_type_id: Uuid,
    /// Calendar year the academic year starts in
    pub academic_year: i32,
    pub cadence: Cadence,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: FeeStatus,
    pub notes: Option<String>,
    pub assigned_by: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ScheduleRow {
    pub schedule_id: Uuid,
    pub fee_id: Uuid,
    pub installment: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub fee_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub student_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub check_number: Option<String>,
    pub check_due_date: Option<NaiveDate>,
    pub transaction_ref: Option<String>,
    pub receipt_number: String,
    pub status: PaymentStatus,
    pub processed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment row change carried by a ledger commit
#[derive(Debug, Clone)]
pub enum PaymentChange {
    Insert(PaymentRow),
    Update(PaymentRow),
    Delete(Uuid),
}

/// Which completed payments a revenue sum covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueScope {
    All,
    /// Inclusive payment-date range
    Between(NaiveDate, NaiveDate),
    /// Fees of the academic year starting in this calendar year
    AcademicYear(i32),
}
