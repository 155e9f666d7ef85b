//! Periodic overdue reconciliation
//!
//! Fee statuses are re-derived on every ledger commit, but a fee that sees no
//! activity would never turn overdue on its own. The sweeper re-derives the
//! status of every open fee as of today and commits the ones that changed.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use core_kernel::Clock;

use crate::error::FeeError;
use crate::fee::FeeStatus;
use crate::ports::FeeStore;
use crate::reconciler::derive_fee_status;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Open fees looked at
    pub examined: usize,
    /// Fees whose status was changed
    pub updated: usize,
    /// Fees skipped because another writer changed them first
    pub conflicts: usize,
}

/// Re-derives statuses of open fees
#[derive(Clone)]
pub struct OverdueSweeper {
    store: Arc<dyn FeeStore>,
    clock: Arc<dyn Clock>,
}

impl OverdueSweeper {
    pub fn new(store: Arc<dyn FeeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Runs one pass over all pending, partially paid and overdue fees
    ///
    /// Fees changed concurrently are skipped; the next pass picks them up.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<SweepReport, FeeError> {
        let today = self.clock.today();
        let fees = self
            .store
            .fees_by_status(&[FeeStatus::Pending, FeeStatus::PartiallyPaid, FeeStatus::Overdue])
            .await?;

        let mut report = SweepReport {
            examined: fees.len(),
            ..Default::default()
        };

        for fee in fees {
            let schedules = self.store.schedules_for_fee(fee.id).await?;
            let derived = derive_fee_status(&fee, &schedules, today);
            if derived == fee.status {
                continue;
            }

            let mut updated = fee.clone();
            updated.status = derived;
            updated.touch();
            match self.store.update_fee(&updated, fee.version, None).await {
                Ok(()) => {
                    debug!(fee_id = %fee.id, from = %fee.status, to = %derived, "Fee status reconciled");
                    report.updated += 1;
                }
                Err(err) if err.is_stale_version() => {
                    warn!(fee_id = %fee.id, "Fee changed during sweep, skipping");
                    report.conflicts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            examined = report.examined,
            updated = report.updated,
            conflicts = report.conflicts,
            "Overdue sweep finished"
        );
        Ok(report)
    }

    /// Sweeps every `period` until the task is dropped
    pub async fn run_every(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = self.sweep_once().await {
                error!(error = %err, "Overdue sweep failed");
            }
        }
    }
}
