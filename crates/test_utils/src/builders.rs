//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::NaiveDate;
use core_kernel::{AcademicYear, FeeId, FeeTypeId, Money, ScheduleId, StudentId, UserId};
use domain_fees::{
    calculate, derive_fee_status, Cadence, Fee, FeeType, NewPayment, PaymentMethod, PaymentStatus,
};

use crate::fixtures::{DateFixtures, FeeTypeFixtures, IdFixtures};

/// Builder for `Fee` values as a store would hold them
pub struct FeeBuilder {
    student_id: StudentId,
    fee_type: FeeType,
    academic_year: AcademicYear,
    cadence: Cadence,
    discount: Money,
    paid: Money,
    assigned_by: UserId,
    notes: Option<String>,
}

impl Default for FeeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeBuilder {
    /// Quarterly tuition for a fresh student, no discount, nothing paid
    pub fn new() -> Self {
        Self {
            student_id: IdFixtures::student_id(),
            fee_type: FeeTypeFixtures::tuition(),
            academic_year: DateFixtures::academic_year(),
            cadence: Cadence::Quarterly,
            discount: Money::ZERO,
            paid: Money::ZERO,
            assigned_by: IdFixtures::clerk_id(),
            notes: None,
        }
    }

    pub fn with_student(mut self, student_id: StudentId) -> Self {
        self.student_id = student_id;
        self
    }

    pub fn with_fee_type(mut self, fee_type: FeeType) -> Self {
        self.fee_type = fee_type;
        self
    }

    pub fn with_academic_year(mut self, year: AcademicYear) -> Self {
        self.academic_year = year;
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    /// Sets the paid amount; the status is derived from it
    pub fn with_paid(mut self, paid: Money) -> Self {
        self.paid = paid;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builds the fee
    ///
    /// # Panics
    ///
    /// Panics if the discount exceeds the gross amount
    pub fn build(self) -> Fee {
        let amounts = calculate(self.fee_type.amount, self.cadence, self.discount)
            .expect("builder amounts must be valid");
        let mut fee = Fee::new(
            self.student_id,
            self.fee_type.id,
            self.academic_year,
            self.cadence,
            amounts,
            self.assigned_by,
        )
        .with_notes(self.notes);
        fee.paid_amount = self.paid;
        fee.status = derive_fee_status(&fee, &[], DateFixtures::today());
        fee
    }
}

/// Builder for payment requests
pub struct NewPaymentBuilder {
    fee_id: FeeId,
    schedule_id: Option<ScheduleId>,
    amount: Money,
    method: PaymentMethod,
    payment_date: NaiveDate,
    check: Option<(String, Option<NaiveDate>)>,
    receipt_number: Option<String>,
    status: Option<PaymentStatus>,
    notes: Option<String>,
}

impl NewPaymentBuilder {
    /// A completed cash payment dated `DateFixtures::today()`
    pub fn new(fee_id: FeeId, amount: Money) -> Self {
        Self {
            fee_id,
            schedule_id: None,
            amount,
            method: PaymentMethod::Cash,
            payment_date: DateFixtures::today(),
            check: None,
            receipt_number: None,
            status: None,
            notes: None,
        }
    }

    pub fn for_schedule(mut self, schedule_id: ScheduleId) -> Self {
        self.schedule_id = Some(schedule_id);
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn on(mut self, payment_date: NaiveDate) -> Self {
        self.payment_date = payment_date;
        self
    }

    pub fn by_check(mut self, number: impl Into<String>, due_date: Option<NaiveDate>) -> Self {
        self.check = Some((number.into(), due_date));
        self
    }

    pub fn with_receipt(mut self, receipt_number: impl Into<String>) -> Self {
        self.receipt_number = Some(receipt_number.into());
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn build(self) -> NewPayment {
        let mut request = NewPayment::cash(self.fee_id, self.amount, self.payment_date);
        request.method = self.method;
        if let Some((number, due_date)) = self.check {
            request = request.by_check(number, due_date);
        }
        if let Some(schedule_id) = self.schedule_id {
            request = request.for_schedule(schedule_id);
        }
        if let Some(status) = self.status {
            request = request.with_status(status);
        }
        request.receipt_number = self.receipt_number;
        request.notes = self.notes;
        request
    }
}

/// A fee type with an explicit id, for tests that seed a database
pub fn fee_type_with_id(id: FeeTypeId, template: FeeType) -> FeeType {
    FeeType { id, ..template }
}
