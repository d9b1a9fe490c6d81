//! Background jobs: the payment expiry sweep and status reconciliation.
//!
//! Both run on a fixed interval with missed ticks skipped. A failed run is
//! logged and the loop carries on with the next tick.

use crate::{
    config::BookingPolicy,
    core::{
        expiry::{SweepReport, sweep_expired_transactions},
        reconcile::{ReconcileReport, reconcile_statuses},
    },
    errors::Result,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Rolls back checkouts whose payment never arrived.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    db: DatabaseConnection,
    timeout: chrono::Duration,
    interval: Duration,
}

impl ExpirySweeper {
    /// Sweeper using the policy's payment timeout and sweep interval.
    #[must_use]
    pub fn new(db: DatabaseConnection, policy: &BookingPolicy) -> Self {
        Self {
            db,
            timeout: chrono::Duration::minutes(policy.payment_timeout_minutes),
            interval: Duration::from_secs(policy.sweep_interval_seconds.max(1)),
        }
    }

    /// Spawn the sweeper as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::info!(
                every_secs = self.interval.as_secs(),
                timeout_minutes = self.timeout.num_minutes(),
                "Expiry sweeper started"
            );

            loop {
                interval.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::warn!(error = %e, "Expiry sweep failed");
                }
            }
        })
    }

    /// Run one sweep now.
    pub async fn run_once(&self) -> Result<SweepReport> {
        sweep_expired_transactions(&self.db, Utc::now(), self.timeout).await
    }
}

/// Keeps film, showtime, ticket and seat hold statuses in line with the clock.
#[derive(Debug, Clone)]
pub struct StatusReconciler {
    db: DatabaseConnection,
    interval: Duration,
}

impl StatusReconciler {
    /// Reconciler running every `reconcile_interval_seconds`.
    #[must_use]
    pub fn new(db: DatabaseConnection, policy: &BookingPolicy) -> Self {
        Self {
            db,
            interval: Duration::from_secs(policy.reconcile_interval_seconds.max(1)),
        }
    }

    /// Spawn the reconciler as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::warn!(error = %e, "Status reconciliation failed");
                }
            }
        })
    }

    /// Run one reconciliation now.
    pub async fn run_once(&self) -> Result<ReconcileReport> {
        reconcile_statuses(&self.db, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        entities::{Invoice, Showtime},
        test_utils::*,
    };
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    #[tokio::test]
    async fn test_sweeper_run_once_respects_timeout() -> Result<()> {
        let fixture = setup_showtime().await?;
        create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;

        let sweeper = ExpirySweeper::new(fixture.db.clone(), &BookingPolicy::default());
        let report = sweeper.run_once().await?;
        assert_eq!(report.rolled_back, 0);

        let immediate = BookingPolicy {
            payment_timeout_minutes: 0,
            ..BookingPolicy::default()
        };
        let report = ExpirySweeper::new(fixture.db.clone(), &immediate)
            .run_once()
            .await?;
        assert_eq!(report.rolled_back, 1);
        assert_eq!(Invoice::find().count(&fixture.db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconciler_run_once() -> Result<()> {
        let fixture = setup_showtime().await?;
        let mut started: crate::entities::showtime::ActiveModel = fixture.showtime.clone().into();
        started.start_time = Set(Utc::now() - chrono::Duration::minutes(5));
        started.update(&fixture.db).await?;

        let reconciler = StatusReconciler::new(fixture.db.clone(), &BookingPolicy::default());
        let report = reconciler.run_once().await?;
        assert_eq!(report.showtimes_started, 1);
        let showtime = Showtime::find_by_id(fixture.showtime.id)
            .one(&fixture.db)
            .await?
            .unwrap();
        assert_eq!(
            showtime.status,
            crate::entities::sea_orm_active_enums::ShowtimeStatus::Ongoing
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sweeper_spawn_and_abort() -> Result<()> {
        let db = setup_test_db().await?;
        let policy = BookingPolicy {
            sweep_interval_seconds: 1,
            ..BookingPolicy::default()
        };
        let handle = ExpirySweeper::new(db, &policy).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        Ok(())
    }
}
