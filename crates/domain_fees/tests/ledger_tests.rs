//! End-to-end tests for the fee ledger over the in-memory adapters

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{AcademicYear, FeeTypeId, FixedClock, Money, StudentId, UserId};

use domain_fees::adapters::{InMemoryFeeStore, InMemoryFeeTypeCatalog, InMemoryStudentDirectory};
use domain_fees::{
    BalanceScope, Cadence, FeeCategory, FeeError, FeeFilter, FeePatch, FeeService, FeeSpec, FeeStatus, FeeStore,
    FeeType, LedgerConfig, NewFee, NewPayment, OverdueSweeper, PaymentPatch, PaymentRecorder,
    PaymentStatus, RevenueAggregator, RevenueQuery, ScheduleStatus,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2025, 10, 1)
}

struct Ledger {
    store: Arc<InMemoryFeeStore>,
    fees: FeeService,
    payments: PaymentRecorder,
    revenue: RevenueAggregator,
    student: StudentId,
    clerk: UserId,
    tuition: FeeType,
    transport: FeeType,
}

impl Ledger {
    async fn new() -> Self {
        Self::at(today()).await
    }

    async fn at(day: NaiveDate) -> Self {
        let store = Arc::new(InMemoryFeeStore::new());
        let clock = Arc::new(FixedClock::new(day));
        let tuition = FeeType::new("Tuition", FeeCategory::Tuition, Money::new(dec!(250)));
        let transport = FeeType::new("Bus", FeeCategory::Transport, Money::new(dec!(40)));
        let catalog = InMemoryFeeTypeCatalog::with_fee_types(vec![tuition.clone(), transport.clone()]).await;
        let student = StudentId::new();
        let directory = InMemoryStudentDirectory::with_students([student]).await;
        let config = LedgerConfig::default();

        Self {
            fees: FeeService::new(
                store.clone(),
                Arc::new(catalog),
                Arc::new(directory),
                clock.clone(),
                config.clone(),
            ),
            payments: PaymentRecorder::new(store.clone(), clock.clone(), config),
            revenue: RevenueAggregator::new(store.clone(), clock),
            store,
            student,
            clerk: UserId::new(),
            tuition,
            transport,
        }
    }

    fn new_fee(&self, fee_type: &FeeType, cadence: Cadence) -> NewFee {
        NewFee {
            student_id: self.student,
            fee_type_id: fee_type.id,
            cadence,
            discount_amount: None,
            notes: None,
        }
    }

    async fn quarterly_tuition(&self) -> domain_fees::Fee {
        // 250 × 4 quarters = 1000
        self.fees
            .create_fee(self.new_fee(&self.tuition, Cadence::Quarterly), self.clerk)
            .await
            .unwrap()
    }

    async fn pay(&self, fee_id: core_kernel::FeeId, amount: Money) -> Result<domain_fees::Payment, FeeError> {
        self.payments
            .record(NewPayment::cash(fee_id, amount, today()), self.clerk)
            .await
    }
}

// ============================================================================
// Fee assignment
// ============================================================================

mod assignment_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_fee_computes_amounts_and_year() {
        let ledger = Ledger::new().await;
        let mut request = ledger.new_fee(&ledger.tuition, Cadence::Quarterly);
        request.discount_amount = Some(Money::new(dec!(100)));

        let fee = ledger.fees.create_fee(request, ledger.clerk).await.unwrap();

        assert_eq!(fee.total_amount.amount(), dec!(1000));
        assert_eq!(fee.discount_amount.amount(), dec!(100));
        assert_eq!(fee.net_amount().amount(), dec!(900));
        assert_eq!(fee.academic_year, AcademicYear::new(2025));
        assert_eq!(fee.status, FeeStatus::Pending);
        assert_eq!(fee.assigned_by, ledger.clerk);
    }

    #[tokio::test]
    async fn test_duplicate_assignment_rejected() {
        let ledger = Ledger::new().await;
        ledger.quarterly_tuition().await;

        let err = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.tuition, Cadence::Monthly), ledger.clerk)
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::DuplicateFee { .. }));
    }

    #[tokio::test]
    async fn test_unknown_student_and_fee_type() {
        let ledger = Ledger::new().await;

        let mut request = ledger.new_fee(&ledger.tuition, Cadence::Annually);
        request.student_id = StudentId::new();
        assert!(matches!(
            ledger.fees.create_fee(request, ledger.clerk).await,
            Err(FeeError::StudentNotFound(_))
        ));

        let mut request = ledger.new_fee(&ledger.tuition, Cadence::Annually);
        request.fee_type_id = FeeTypeId::new();
        assert!(matches!(
            ledger.fees.create_fee(request, ledger.clerk).await,
            Err(FeeError::FeeTypeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_discount_above_gross_rejected() {
        let ledger = Ledger::new().await;
        let mut request = ledger.new_fee(&ledger.transport, Cadence::OneTime);
        request.discount_amount = Some(Money::new(dec!(41)));

        let err = ledger.fees.create_fee(request, ledger.clerk).await.unwrap_err();
        assert!(matches!(err, FeeError::InvalidDiscount { .. }));
    }

    #[tokio::test]
    async fn test_bulk_creation_is_all_or_nothing() {
        let ledger = Ledger::new().await;
        let specs = vec![
            FeeSpec {
                fee_type_id: ledger.tuition.id,
                cadence: Cadence::Monthly,
                discount_amount: None,
                notes: None,
            },
            FeeSpec {
                fee_type_id: ledger.transport.id,
                cadence: Cadence::Monthly,
                discount_amount: Some(Money::new(dec!(10_000))),
                notes: None,
            },
        ];

        let err = ledger
            .fees
            .create_fees_bulk(ledger.student, specs, ledger.clerk)
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::InvalidDiscount { .. }));
        assert!(ledger.fees.fees_for_student(ledger.student).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_rejects_repeated_fee_type() {
        let ledger = Ledger::new().await;
        let spec = FeeSpec {
            fee_type_id: ledger.transport.id,
            cadence: Cadence::Monthly,
            discount_amount: None,
            notes: None,
        };

        let err = ledger
            .fees
            .create_fees_bulk(ledger.student, vec![spec.clone(), spec], ledger.clerk)
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::DuplicateFee { .. }));
        assert!(ledger.fees.fees_for_student(ledger.student).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_creation_persists_every_fee() {
        let ledger = Ledger::new().await;
        let specs = vec![
            FeeSpec {
                fee_type_id: ledger.tuition.id,
                cadence: Cadence::Semester,
                discount_amount: None,
                notes: Some("sibling discount pending".to_string()),
            },
            FeeSpec {
                fee_type_id: ledger.transport.id,
                cadence: Cadence::Monthly,
                discount_amount: None,
                notes: None,
            },
        ];

        let fees = ledger
            .fees
            .create_fees_bulk(ledger.student, specs, ledger.clerk)
            .await
            .unwrap();
        assert_eq!(fees.len(), 2);
        assert_eq!(ledger.fees.fees_for_student(ledger.student).await.unwrap().len(), 2);
    }
}

// ============================================================================
// Installment plans
// ============================================================================

mod schedule_tests {
    use super::*;

    #[tokio::test]
    async fn test_quarterly_plan_for_thousand() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;

        let plan = ledger.fees.generate_schedule(fee.id).await.unwrap();

        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|s| s.amount.amount() == dec!(250)));
        assert_eq!(
            plan.iter().map(|s| s.due_date).collect::<Vec<_>>(),
            vec![date(2026, 1, 1), date(2026, 4, 1), date(2026, 7, 1), date(2026, 10, 1)]
        );
        assert_eq!(plan.iter().map(|s| s.amount).sum::<Money>(), fee.net_amount());
    }

    #[tokio::test]
    async fn test_generation_is_guarded() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.fees.generate_schedule(fee.id).await.unwrap();

        let err = ledger.fees.generate_schedule(fee.id).await.unwrap_err();
        assert!(matches!(err, FeeError::SchedulesAlreadyGenerated { count: 4, .. }));
        assert_eq!(ledger.fees.schedules_for_fee(fee.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_regeneration_replaces_plan() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        let first = ledger.fees.generate_schedule(fee.id).await.unwrap();

        let second = ledger
            .fees
            .regenerate_schedule(fee.id, Some(date(2025, 11, 15)))
            .await
            .unwrap();

        let stored = ledger.fees.schedules_for_fee(fee.id).await.unwrap();
        assert_eq!(stored, second);
        assert!(stored.iter().all(|s| first.iter().all(|f| f.id != s.id)));
        assert_eq!(stored[0].due_date, date(2026, 2, 15));
    }

    #[tokio::test]
    async fn test_regeneration_refused_after_installment_payment() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        let plan = ledger.fees.generate_schedule(fee.id).await.unwrap();
        ledger
            .payments
            .record(
                NewPayment::cash(fee.id, Money::new(dec!(10)), today()).for_schedule(plan[0].id),
                ledger.clerk,
            )
            .await
            .unwrap();

        let err = ledger.fees.regenerate_schedule(fee.id, None).await.unwrap_err();
        assert!(matches!(err, FeeError::SchedulesHavePayments(_)));
        let stored = ledger.fees.schedules_for_fee(fee.id).await.unwrap();
        assert_eq!(
            stored.iter().map(|s| s.id).collect::<Vec<_>>(),
            plan.iter().map(|s| s.id).collect::<Vec<_>>()
        );
        assert_eq!(stored[0].status, ScheduleStatus::PartiallyPaid);
        assert_eq!(stored[0].paid_amount.amount(), dec!(10));
    }
}

// ============================================================================
// Payments
// ============================================================================

mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_status_follows_balances() {
        let ledger = Ledger::new().await;
        let fee = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.tuition, Cadence::Semester), ledger.clerk)
            .await
            .unwrap();
        assert_eq!(fee.net_amount().amount(), dec!(500));

        ledger.pay(fee.id, Money::new(dec!(200))).await.unwrap();
        assert_eq!(ledger.fees.get_fee_balance(fee.id).await.unwrap().status, FeeStatus::PartiallyPaid);

        ledger.pay(fee.id, Money::new(dec!(300))).await.unwrap();
        let balance = ledger.fees.get_fee_balance(fee.id).await.unwrap();
        assert_eq!(balance.status, FeeStatus::Paid);
        assert_eq!(balance.remaining, Money::ZERO);
    }

    #[tokio::test]
    async fn test_overpayment_reports_remaining_and_attempted() {
        let ledger = Ledger::new().await;
        let fee = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.tuition, Cadence::Semester), ledger.clerk)
            .await
            .unwrap();
        let before = ledger.fees.get_fee(fee.id).await.unwrap();

        let err = ledger.pay(fee.id, Money::new(dec!(600))).await.unwrap_err();

        match err {
            FeeError::AmountExceedsBalance { scope, remaining, attempted } => {
                assert_eq!(scope, BalanceScope::Fee);
                assert_eq!(remaining.amount(), dec!(500));
                assert_eq!(attempted.amount(), dec!(600));
            }
            other => panic!("Expected AmountExceedsBalance, got {:?}", other),
        }
        assert_eq!(ledger.fees.get_fee(fee.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_check_payments_validated() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;

        let mut missing_number = NewPayment::cash(fee.id, Money::new(dec!(50)), today());
        missing_number.method = domain_fees::PaymentMethod::Check;
        assert!(matches!(
            ledger.payments.record(missing_number, ledger.clerk).await,
            Err(FeeError::CheckNumberRequired)
        ));

        let stale_check = NewPayment::cash(fee.id, Money::new(dec!(50)), today())
            .by_check("000123", Some(date(2025, 9, 30)));
        assert!(matches!(
            ledger.payments.record(stale_check, ledger.clerk).await,
            Err(FeeError::CheckDueDateInPast { .. })
        ));

        let good_check = NewPayment::cash(fee.id, Money::new(dec!(50)), today())
            .by_check("000124", Some(date(2025, 10, 31)));
        let payment = ledger.payments.record(good_check, ledger.clerk).await.unwrap();
        assert_eq!(payment.check_number.as_deref(), Some("000124"));
    }

    #[tokio::test]
    async fn test_cancelled_fee_accepts_no_payments() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.fees.cancel_fee(fee.id).await.unwrap();

        let err = ledger.pay(fee.id, Money::new(dec!(10))).await.unwrap_err();
        assert!(matches!(err, FeeError::FeeCancelled(_)));
    }

    #[tokio::test]
    async fn test_delete_restores_previous_paid_amount() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.pay(fee.id, Money::new(dec!(120))).await.unwrap();
        let before = ledger.fees.get_fee_balance(fee.id).await.unwrap();

        let payment = ledger.pay(fee.id, Money::new(dec!(80))).await.unwrap();
        ledger.payments.delete(payment.id).await.unwrap();

        let after = ledger.fees.get_fee_balance(fee.id).await.unwrap();
        assert_eq!(after.paid_amount, before.paid_amount);
        assert_eq!(after.status, before.status);
    }

    #[tokio::test]
    async fn test_update_validates_delta_only() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.pay(fee.id, Money::new(dec!(600))).await.unwrap();
        let payment = ledger.pay(fee.id, Money::new(dec!(300))).await.unwrap();

        // 300 -> 400 needs 100 of the remaining 100
        let updated = ledger
            .payments
            .update(payment.id, PaymentPatch::amount(Money::new(dec!(400))))
            .await
            .unwrap();
        assert_eq!(updated.amount.amount(), dec!(400));
        assert_eq!(ledger.fees.get_fee_balance(fee.id).await.unwrap().status, FeeStatus::Paid);

        let err = ledger
            .payments
            .update(payment.id, PaymentPatch::amount(Money::new(dec!(400.01))))
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::AmountExceedsBalance { .. }));
    }

    #[tokio::test]
    async fn test_refund_then_complete_again() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        let payment = ledger.pay(fee.id, Money::new(dec!(300))).await.unwrap();

        ledger
            .payments
            .update(payment.id, PaymentPatch::status(PaymentStatus::Refunded))
            .await
            .unwrap();
        assert_eq!(ledger.fees.get_fee_balance(fee.id).await.unwrap().paid_amount, Money::ZERO);

        ledger
            .payments
            .update(payment.id, PaymentPatch::status(PaymentStatus::Completed))
            .await
            .unwrap();
        assert_eq!(
            ledger.fees.get_fee_balance(fee.id).await.unwrap().paid_amount.amount(),
            dec!(300)
        );
    }

    #[tokio::test]
    async fn test_fee_with_payments_cannot_be_deleted() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.fees.generate_schedule(fee.id).await.unwrap();
        let payment = ledger.pay(fee.id, Money::new(dec!(10))).await.unwrap();

        assert!(matches!(
            ledger.fees.delete_fee(fee.id).await,
            Err(FeeError::FeeHasPayments { count: 1, .. })
        ));

        ledger.payments.delete(payment.id).await.unwrap();
        ledger.fees.delete_fee(fee.id).await.unwrap();
        assert!(matches!(ledger.fees.get_fee(fee.id).await, Err(FeeError::FeeNotFound(_))));
        assert!(ledger.store.schedules_for_fee(fee.id).await.unwrap().is_empty());
    }
}

// ============================================================================
// Fee edits
// ============================================================================

mod edit_tests {
    use super::*;

    #[tokio::test]
    async fn test_discount_change_recomputes_and_regenerates() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.fees.generate_schedule(fee.id).await.unwrap();

        let updated = ledger
            .fees
            .update_fee(
                fee.id,
                FeePatch {
                    discount_amount: Some(Money::new(dec!(200))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.net_amount().amount(), dec!(800));
        let plan = ledger.fees.schedules_for_fee(fee.id).await.unwrap();
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|s| s.amount.amount() == dec!(200)));
    }

    #[tokio::test]
    async fn test_cadence_change_recomputes_total() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;

        let updated = ledger
            .fees
            .update_fee(
                fee.id,
                FeePatch {
                    cadence: Some(Cadence::Monthly),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.total_amount.amount(), dec!(2500));
        assert!(updated.version > fee.version);
    }

    #[tokio::test]
    async fn test_net_cannot_drop_below_paid() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.pay(fee.id, Money::new(dec!(900))).await.unwrap();

        let err = ledger
            .fees
            .update_fee(
                fee.id,
                FeePatch {
                    discount_amount: Some(Money::new(dec!(200))),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::NetBelowPaid { .. }));
    }

    #[tokio::test]
    async fn test_notes_only_edit_keeps_amounts() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;

        let updated = ledger
            .fees
            .update_fee(
                fee.id,
                FeePatch {
                    notes: Some("paid by employer".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.total_amount, fee.total_amount);
        assert_eq!(updated.notes.as_deref(), Some("paid by employer"));
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_concurrent_payments_cannot_overshoot() {
        let ledger = Ledger::new().await;
        let fee = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.tuition, Cadence::Semester), ledger.clerk)
            .await
            .unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let recorder = ledger.payments.clone();
                let clerk = ledger.clerk;
                tokio::spawn(async move {
                    recorder
                        .record(NewPayment::cash(fee.id, Money::new(dec!(300)), today()), clerk)
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(FeeError::AmountExceedsBalance { remaining, .. }) => {
                    assert_eq!(remaining.amount(), dec!(200));
                }
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        assert_eq!(successes, 1);
        let balance = ledger.fees.get_fee_balance(fee.id).await.unwrap();
        assert_eq!(balance.paid_amount.amount(), dec!(300));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_concurrent_payments_never_exceed_net() {
        let ledger = Ledger::new().await;
        let fee = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.tuition, Cadence::Semester), ledger.clerk)
            .await
            .unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let recorder = ledger.payments.clone();
                let clerk = ledger.clerk;
                tokio::spawn(async move {
                    recorder
                        .record(NewPayment::cash(fee.id, Money::new(dec!(50)), today()), clerk)
                        .await
                })
            })
            .collect();

        let mut successes = 0i64;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(FeeError::AmountExceedsBalance { .. }) | Err(FeeError::ConcurrentModification { .. }) => {}
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        let balance = ledger.fees.get_fee_balance(fee.id).await.unwrap();
        assert!(balance.paid_amount <= balance.net_amount);
        assert_eq!(balance.paid_amount, Money::from_minor(50 * successes, 0));
        assert_eq!(ledger.store.payment_count().await as i64, successes);
    }
}

// ============================================================================
// Overdue sweep
// ============================================================================

mod sweep_tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_flags_overdue_once() {
        let ledger = Ledger::at(date(2025, 9, 1)).await;
        let fee = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.transport, Cadence::OneTime), ledger.clerk)
            .await
            .unwrap();
        ledger.fees.generate_schedule(fee.id).await.unwrap();

        // Due 2025-10-01; a month later nothing has been paid
        let later: Arc<dyn core_kernel::Clock> = Arc::new(FixedClock::new(date(2025, 11, 1)));
        let sweeper = OverdueSweeper::new(ledger.store.clone(), later);

        let first = sweeper.sweep_once().await.unwrap();
        assert_eq!(first.examined, 1);
        assert_eq!(first.updated, 1);
        assert_eq!(ledger.fees.get_fee(fee.id).await.unwrap().status, FeeStatus::Overdue);

        let second = sweeper.sweep_once().await.unwrap();
        assert_eq!(second.updated, 0);
    }

    #[tokio::test]
    async fn test_sweep_leaves_paid_and_cancelled_fees_alone() {
        let ledger = Ledger::at(date(2025, 9, 1)).await;
        let fee = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.transport, Cadence::OneTime), ledger.clerk)
            .await
            .unwrap();
        ledger.fees.generate_schedule(fee.id).await.unwrap();
        ledger.fees.cancel_fee(fee.id).await.unwrap();

        let later: Arc<dyn core_kernel::Clock> = Arc::new(FixedClock::new(date(2026, 1, 1)));
        let report = OverdueSweeper::new(ledger.store.clone(), later).sweep_once().await.unwrap();

        assert_eq!(report.examined, 0);
        assert_eq!(ledger.fees.get_fee(fee.id).await.unwrap().status, FeeStatus::Cancelled);
    }
}

// ============================================================================
// Listings
// ============================================================================

mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_fees_by_status_and_year() {
        let ledger = Ledger::new().await;
        let tuition = ledger.quarterly_tuition().await;
        let transport = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.transport, Cadence::Monthly), ledger.clerk)
            .await
            .unwrap();
        ledger.pay(transport.id, Money::new(dec!(40))).await.unwrap();

        let all = ledger.fees.list_fees(FeeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let partial = ledger
            .fees
            .list_fees(FeeFilter {
                status: Some(FeeStatus::PartiallyPaid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(partial.iter().map(|f| f.id).collect::<Vec<_>>(), vec![transport.id]);

        let pending_this_year = ledger
            .fees
            .list_fees(FeeFilter {
                status: Some(FeeStatus::Pending),
                academic_year: Some(AcademicYear::new(2025)),
            })
            .await
            .unwrap();
        assert_eq!(pending_this_year.iter().map(|f| f.id).collect::<Vec<_>>(), vec![tuition.id]);

        let last_year = ledger
            .fees
            .list_fees(FeeFilter {
                academic_year: Some(AcademicYear::new(2024)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(last_year.is_empty());
    }

    #[tokio::test]
    async fn test_list_payments_most_recent_first() {
        let ledger = Ledger::new().await;
        let tuition = ledger.quarterly_tuition().await;
        let transport = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.transport, Cadence::Monthly), ledger.clerk)
            .await
            .unwrap();

        let earlier = ledger
            .payments
            .record(
                NewPayment::cash(transport.id, Money::new(dec!(40)), date(2025, 9, 20)),
                ledger.clerk,
            )
            .await
            .unwrap();
        let latest = ledger.pay(tuition.id, Money::new(dec!(100))).await.unwrap();

        let payments = ledger.payments.list_payments().await.unwrap();
        assert_eq!(
            payments.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![latest.id, earlier.id]
        );
    }

    #[tokio::test]
    async fn test_overdue_installments() {
        let ledger = Ledger::new().await;
        let tuition = ledger.quarterly_tuition().await;
        // due 2025-04-01, 2025-07-01, 2025-10-01, 2026-01-01
        let plan = ledger
            .fees
            .generate_schedule_from(tuition.id, date(2025, 1, 1))
            .await
            .unwrap();
        ledger
            .payments
            .record(
                NewPayment::cash(tuition.id, Money::new(dec!(250)), today()).for_schedule(plan[0].id),
                ledger.clerk,
            )
            .await
            .unwrap();

        let transport = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.transport, Cadence::OneTime), ledger.clerk)
            .await
            .unwrap();
        ledger
            .fees
            .generate_schedule_from(transport.id, date(2025, 6, 1))
            .await
            .unwrap();
        ledger.fees.cancel_fee(transport.id).await.unwrap();

        let overdue = ledger.fees.overdue_schedules().await.unwrap();
        assert_eq!(overdue.iter().map(|s| s.id).collect::<Vec<_>>(), vec![plan[1].id]);
    }
}

// ============================================================================
// Revenue and summaries
// ============================================================================

mod reporting_tests {
    use super::*;

    #[tokio::test]
    async fn test_revenue_counts_completed_payments_only() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        ledger.pay(fee.id, Money::new(dec!(100))).await.unwrap();
        ledger
            .payments
            .record(
                NewPayment::cash(fee.id, Money::new(dec!(40)), date(2025, 10, 15)),
                ledger.clerk,
            )
            .await
            .unwrap();
        ledger
            .payments
            .record(
                NewPayment::cash(fee.id, Money::new(dec!(70)), today()).with_status(PaymentStatus::Pending),
                ledger.clerk,
            )
            .await
            .unwrap();

        let all = ledger.revenue.revenue(RevenueQuery::All).await.unwrap();
        assert_eq!(all.amount(), dec!(140));

        let first_day = ledger
            .revenue
            .revenue(RevenueQuery::between(today(), today()).unwrap())
            .await
            .unwrap();
        assert_eq!(first_day.amount(), dec!(100));

        let year = ledger.revenue.revenue(RevenueQuery::CurrentAcademicYear).await.unwrap();
        assert_eq!(year.amount(), dec!(140));

        let other_year = ledger
            .revenue
            .revenue(RevenueQuery::AcademicYear(AcademicYear::new(2024)))
            .await
            .unwrap();
        assert!(other_year.is_zero());
    }

    #[tokio::test]
    async fn test_current_year_revenue_bounded_by_school_months() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        assert_eq!(fee.academic_year, AcademicYear::new(2025));

        ledger.pay(fee.id, Money::new(dec!(100))).await.unwrap();
        ledger
            .payments
            .record(
                NewPayment::cash(fee.id, Money::new(dec!(60)), date(2026, 8, 15)),
                ledger.clerk,
            )
            .await
            .unwrap();

        let current = ledger.revenue.revenue(RevenueQuery::CurrentAcademicYear).await.unwrap();
        assert_eq!(current.amount(), dec!(100));

        let by_fee_year = ledger
            .revenue
            .revenue(RevenueQuery::AcademicYear(AcademicYear::new(2025)))
            .await
            .unwrap();
        assert_eq!(by_fee_year.amount(), dec!(160));
    }

    #[tokio::test]
    async fn test_student_summary() {
        let ledger = Ledger::new().await;
        let tuition = ledger.quarterly_tuition().await;
        let transport = ledger
            .fees
            .create_fee(ledger.new_fee(&ledger.transport, Cadence::Monthly), ledger.clerk)
            .await
            .unwrap();
        ledger.pay(tuition.id, Money::new(dec!(250))).await.unwrap();
        ledger.pay(transport.id, Money::new(dec!(400))).await.unwrap();

        let summary = ledger.fees.student_summary(ledger.student).await.unwrap();
        assert_eq!(summary.fee_count, 2);
        assert_eq!(summary.total_net.amount(), dec!(1400));
        assert_eq!(summary.total_paid.amount(), dec!(650));
        assert_eq!(summary.total_due.amount(), dec!(750));
        assert_eq!(summary.paid, 1);
        assert_eq!(summary.partially_paid, 1);
    }

    #[tokio::test]
    async fn test_fee_details() {
        let ledger = Ledger::new().await;
        let fee = ledger.quarterly_tuition().await;
        let plan = ledger.fees.generate_schedule(fee.id).await.unwrap();
        ledger
            .payments
            .record(
                NewPayment::cash(fee.id, Money::new(dec!(250)), today()).for_schedule(plan[0].id),
                ledger.clerk,
            )
            .await
            .unwrap();

        let details = ledger.fees.get_fee_details(fee.id).await.unwrap();
        assert_eq!(details.stats.installments, 4);
        assert_eq!(details.stats.paid_installments, 1);
        assert_eq!(details.stats.next_due_date, Some(plan[1].due_date));
        assert_eq!(details.payments.len(), 1);
        assert_eq!(details.balance.remaining.amount(), dec!(750));
    }
}
