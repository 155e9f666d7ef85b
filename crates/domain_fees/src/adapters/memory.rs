//! In-memory adapters
//!
//! Implement the ledger ports over `tokio::sync::RwLock`-guarded maps. The
//! whole ledger sits behind one lock so that a commit's version check and its
//! writes happen without another writer in between.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{
    AdapterHealth, DomainPort, FeeId, FeeTypeId, HealthCheckResult, HealthCheckable, Money,
    PaymentId, PortError, ScheduleId, StudentId, AcademicYear,
};

use crate::fee::{Fee, FeeStatus, FeeType};
use crate::payment::{Payment, PaymentStatus};
use crate::ports::{FeeFilter, FeeStore, FeeTypeCatalog, LedgerChange, LedgerCommit, RevenueFilter, StudentDirectory};
use crate::schedule::PaymentSchedule;

#[derive(Debug, Default)]
struct LedgerState {
    fees: HashMap<FeeId, Fee>,
    schedules: HashMap<ScheduleId, PaymentSchedule>,
    payments: HashMap<PaymentId, Payment>,
}

impl LedgerState {
    fn check_version(&self, fee_id: FeeId, expected_version: i64) -> Result<(), PortError> {
        let current = self
            .fees
            .get(&fee_id)
            .ok_or_else(|| PortError::not_found("Fee", fee_id))?;
        if current.version != expected_version {
            return Err(PortError::stale("Fee", fee_id));
        }
        Ok(())
    }

    fn has_duplicate_fee(&self, fee: &Fee) -> bool {
        self.fees.values().any(|existing| {
            existing.id != fee.id
                && existing.student_id == fee.student_id
                && existing.fee_type_id == fee.fee_type_id
                && existing.academic_year == fee.academic_year
        })
    }

    fn receipt_taken(&self, payment: &Payment) -> bool {
        self.payments
            .values()
            .any(|p| p.id != payment.id && p.receipt_number == payment.receipt_number)
    }
}

/// In-memory `FeeStore`
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeeStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryFeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payments, for assertions
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }
}

impl DomainPort for InMemoryFeeStore {}

#[async_trait]
impl HealthCheckable for InMemoryFeeStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "in-memory-fee-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: Some("In-memory store always healthy".to_string()),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl FeeStore for InMemoryFeeStore {
    async fn get_fee(&self, id: FeeId) -> Result<Fee, PortError> {
        self.state
            .read()
            .await
            .fees
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Fee", id))
    }

    async fn find_fee(
        &self,
        student_id: StudentId,
        fee_type_id: FeeTypeId,
        academic_year: AcademicYear,
    ) -> Result<Option<Fee>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .fees
            .values()
            .find(|f| {
                f.student_id == student_id
                    && f.fee_type_id == fee_type_id
                    && f.academic_year == academic_year
            })
            .cloned())
    }

    async fn fees_for_student(&self, student_id: StudentId) -> Result<Vec<Fee>, PortError> {
        let state = self.state.read().await;
        let mut fees: Vec<_> = state
            .fees
            .values()
            .filter(|f| f.student_id == student_id)
            .cloned()
            .collect();
        fees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(fees)
    }

    async fn fees_by_status(&self, statuses: &[FeeStatus]) -> Result<Vec<Fee>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .fees
            .values()
            .filter(|f| statuses.contains(&f.status))
            .cloned()
            .collect())
    }

    async fn list_fees(&self, filter: FeeFilter) -> Result<Vec<Fee>, PortError> {
        let state = self.state.read().await;
        let mut fees: Vec<_> = state.fees.values().filter(|f| filter.matches(f)).cloned().collect();
        fees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(fees)
    }

    async fn insert_fees(&self, fees: Vec<Fee>) -> Result<(), PortError> {
        let mut state = self.state.write().await;

        let mut batch_keys = HashSet::new();
        for fee in &fees {
            let key = (fee.student_id, fee.fee_type_id, fee.academic_year);
            if state.has_duplicate_fee(fee) || !batch_keys.insert(key) {
                return Err(PortError::duplicate(format!(
                    "Fee already exists for student {} and fee type {} in {}",
                    fee.student_id, fee.fee_type_id, fee.academic_year
                )));
            }
        }

        for fee in fees {
            state.fees.insert(fee.id, fee);
        }
        Ok(())
    }

    async fn update_fee(
        &self,
        fee: &Fee,
        expected_version: i64,
        replace_schedules: Option<Vec<PaymentSchedule>>,
    ) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        state.check_version(fee.id, expected_version)?;

        if state.has_duplicate_fee(fee) {
            return Err(PortError::duplicate(format!(
                "Fee already exists for student {} and fee type {} in {}",
                fee.student_id, fee.fee_type_id, fee.academic_year
            )));
        }

        if let Some(schedules) = replace_schedules {
            state.schedules.retain(|_, s| s.fee_id != fee.id);
            for payment in state.payments.values_mut().filter(|p| p.fee_id == fee.id) {
                payment.schedule_id = None;
            }
            for schedule in schedules {
                state.schedules.insert(schedule.id, schedule);
            }
        }
        state.fees.insert(fee.id, fee.clone());
        Ok(())
    }

    async fn delete_fee(&self, id: FeeId, expected_version: i64) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        state.check_version(id, expected_version)?;

        if state.payments.values().any(|p| p.fee_id == id) {
            return Err(PortError::referenced(format!("Fee {} still has payments", id)));
        }

        state.schedules.retain(|_, s| s.fee_id != id);
        state.fees.remove(&id);
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<PaymentSchedule, PortError> {
        self.state
            .read()
            .await
            .schedules
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("PaymentSchedule", id))
    }

    async fn schedules_for_fee(&self, fee_id: FeeId) -> Result<Vec<PaymentSchedule>, PortError> {
        let state = self.state.read().await;
        let mut schedules: Vec<_> = state
            .schedules
            .values()
            .filter(|s| s.fee_id == fee_id)
            .cloned()
            .collect();
        schedules.sort_by_key(|s| s.installment);
        Ok(schedules)
    }

    async fn overdue_schedules(&self, today: NaiveDate) -> Result<Vec<PaymentSchedule>, PortError> {
        let state = self.state.read().await;
        let mut schedules: Vec<_> = state
            .schedules
            .values()
            .filter(|s| s.is_past_due(today))
            .filter(|s| state.fees.get(&s.fee_id).map_or(false, |f| !f.is_cancelled()))
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.installment.cmp(&b.installment)));
        Ok(schedules)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError> {
        self.state
            .read()
            .await
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Payment", id))
    }

    async fn payments_for_fee(&self, fee_id: FeeId) -> Result<Vec<Payment>, PortError> {
        let state = self.state.read().await;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.fee_id == fee_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date).then(b.created_at.cmp(&a.created_at)));
        Ok(payments)
    }

    async fn payments_for_student(&self, student_id: StudentId) -> Result<Vec<Payment>, PortError> {
        let state = self.state.read().await;
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date).then(b.created_at.cmp(&a.created_at)));
        Ok(payments)
    }

    async fn list_payments(&self) -> Result<Vec<Payment>, PortError> {
        let state = self.state.read().await;
        let mut payments: Vec<_> = state.payments.values().cloned().collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date).then(b.created_at.cmp(&a.created_at)));
        Ok(payments)
    }

    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        state.check_version(commit.fee.id, commit.expected_version)?;

        // Validate everything before the first write
        match &commit.change {
            LedgerChange::Insert(payment) | LedgerChange::Update(payment) => {
                if state.receipt_taken(payment) {
                    return Err(PortError::duplicate(format!(
                        "Receipt number {} already exists",
                        payment.receipt_number
                    )));
                }
                if matches!(commit.change, LedgerChange::Update(_)) && !state.payments.contains_key(&payment.id) {
                    return Err(PortError::not_found("Payment", payment.id));
                }
            }
            LedgerChange::Delete(id) => {
                if !state.payments.contains_key(id) {
                    return Err(PortError::not_found("Payment", id));
                }
            }
        }
        if let Some(schedule) = &commit.schedule {
            match state.schedules.get(&schedule.id) {
                Some(existing) if existing.fee_id == commit.fee.id => {}
                _ => return Err(PortError::not_found("PaymentSchedule", schedule.id)),
            }
        }

        match commit.change {
            LedgerChange::Insert(payment) | LedgerChange::Update(payment) => {
                state.payments.insert(payment.id, payment);
            }
            LedgerChange::Delete(id) => {
                state.payments.remove(&id);
            }
        }
        if let Some(schedule) = commit.schedule {
            state.schedules.insert(schedule.id, schedule);
        }
        state.fees.insert(commit.fee.id, commit.fee);
        Ok(())
    }

    async fn revenue(&self, filter: RevenueFilter) -> Result<Money, PortError> {
        let state = self.state.read().await;
        let total = state
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Completed)
            .filter(|p| match filter {
                RevenueFilter::All => true,
                RevenueFilter::PaymentDates(range) => range.contains(p.payment_date),
                RevenueFilter::AcademicYear(year) => state
                    .fees
                    .get(&p.fee_id)
                    .map_or(false, |f| f.academic_year == year),
            })
            .map(|p| p.amount)
            .sum();
        Ok(total)
    }
}

/// In-memory `FeeTypeCatalog`
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeeTypeCatalog {
    fee_types: Arc<RwLock<HashMap<FeeTypeId, FeeType>>>,
}

impl InMemoryFeeTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with fee types
    pub async fn with_fee_types(fee_types: Vec<FeeType>) -> Self {
        let catalog = Self::new();
        for fee_type in fee_types {
            catalog.insert(fee_type).await;
        }
        catalog
    }

    pub async fn insert(&self, fee_type: FeeType) {
        self.fee_types.write().await.insert(fee_type.id, fee_type);
    }
}

impl DomainPort for InMemoryFeeTypeCatalog {}

#[async_trait]
impl FeeTypeCatalog for InMemoryFeeTypeCatalog {
    async fn get_fee_type(&self, id: FeeTypeId) -> Result<FeeType, PortError> {
        self.fee_types
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("FeeType", id))
    }
}

/// In-memory `StudentDirectory`
#[derive(Debug, Clone, Default)]
pub struct InMemoryStudentDirectory {
    students: Arc<RwLock<HashSet<StudentId>>>,
}

impl InMemoryStudentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_students(students: impl IntoIterator<Item = StudentId>) -> Self {
        let directory = Self::new();
        directory.students.write().await.extend(students);
        directory
    }

    pub async fn insert(&self, student_id: StudentId) {
        self.students.write().await.insert(student_id);
    }
}

impl DomainPort for InMemoryStudentDirectory {}

#[async_trait]
impl StudentDirectory for InMemoryStudentDirectory {
    async fn student_exists(&self, id: StudentId) -> Result<bool, PortError> {
        Ok(self.students.read().await.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::Cadence;
    use crate::calculator::calculate;
    use core_kernel::UserId;
    use rust_decimal_macros::dec;

    fn fee_for(student_id: StudentId, fee_type_id: FeeTypeId) -> Fee {
        Fee::new(
            student_id,
            fee_type_id,
            AcademicYear::new(2025),
            Cadence::Annually,
            calculate(Money::new(dec!(500)), Cadence::Annually, Money::ZERO).unwrap(),
            UserId::new(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryFeeStore::new();
        let fee = fee_for(StudentId::new(), FeeTypeId::new());
        store.insert_fees(vec![fee.clone()]).await.unwrap();

        assert_eq!(store.get_fee(fee.id).await.unwrap(), fee);
        assert!(store.get_fee(FeeId::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_insert_batch_is_all_or_nothing() {
        let store = InMemoryFeeStore::new();
        let student = StudentId::new();
        let fee_type = FeeTypeId::new();

        let result = store
            .insert_fees(vec![fee_for(student, FeeTypeId::new()), fee_for(student, fee_type), fee_for(student, fee_type)])
            .await;

        assert!(result.unwrap_err().is_duplicate());
        assert!(store.fees_for_student(student).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_stale_version() {
        let store = InMemoryFeeStore::new();
        let fee = fee_for(StudentId::new(), FeeTypeId::new());
        store.insert_fees(vec![fee.clone()]).await.unwrap();

        let mut first = fee.clone();
        first.touch();
        store.update_fee(&first, fee.version, None).await.unwrap();

        let mut second = fee.clone();
        second.touch();
        let err = store.update_fee(&second, fee.version, None).await.unwrap_err();
        assert!(err.is_stale_version());
    }

    #[tokio::test]
    async fn test_list_fees_applies_filter() {
        let store = InMemoryFeeStore::new();
        let student = StudentId::new();
        let current = fee_for(student, FeeTypeId::new());
        let mut previous = fee_for(student, FeeTypeId::new());
        previous.academic_year = AcademicYear::new(2024);
        previous.status = FeeStatus::Paid;
        store.insert_fees(vec![current.clone(), previous.clone()]).await.unwrap();

        assert_eq!(store.list_fees(FeeFilter::default()).await.unwrap().len(), 2);

        let paid = store
            .list_fees(FeeFilter {
                status: Some(FeeStatus::Paid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paid, vec![previous]);

        let this_year = store
            .list_fees(FeeFilter {
                academic_year: Some(AcademicYear::new(2025)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(this_year, vec![current]);
    }

    #[tokio::test]
    async fn test_catalog_and_directory() {
        let fee_type = FeeType::new("Tuition", crate::fee::FeeCategory::Tuition, Money::new(dec!(100)));
        let catalog = InMemoryFeeTypeCatalog::with_fee_types(vec![fee_type.clone()]).await;
        assert_eq!(catalog.get_fee_type(fee_type.id).await.unwrap(), fee_type);
        assert!(catalog.get_fee_type(FeeTypeId::new()).await.unwrap_err().is_not_found());

        let student = StudentId::new();
        let directory = InMemoryStudentDirectory::with_students([student]).await;
        assert!(directory.student_exists(student).await.unwrap());
        assert!(!directory.student_exists(StudentId::new()).await.unwrap());
    }
}
