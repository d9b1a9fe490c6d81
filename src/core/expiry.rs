//! Expiry sweep for checkouts that were never paid.
//!
//! A transaction still `Pending` after the payment timeout is rolled back:
//! its invoice, tickets, combo lines, voucher rows and the transaction itself
//! are deleted, seats go back on sale and voucher redemptions are restored.
//! Each transaction is handled in its own database transaction and re-checked
//! there, so a webhook that lands mid-sweep wins.

use crate::{
    core::invoice::purge_invoice,
    entities::{Transaction, sea_orm_active_enums::TransactionStatus, transaction},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;

/// Summary of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Transactions found pending past the timeout
    pub scanned: usize,
    pub rolled_back: usize,
    pub released_seats: u64,
    pub restored_vouchers: usize,
    pub failures: usize,
}

/// Rolls back every transaction pending since before `now - timeout`.
///
/// Only the candidate query can fail the whole sweep; errors on individual
/// transactions are logged and counted.
pub async fn sweep_expired_transactions(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<SweepReport> {
    let stale = stale_transactions(db, now - timeout).await?;
    Ok(roll_back_all(db, stale).await)
}

async fn stale_transactions(
    db: &DatabaseConnection,
    cutoff: DateTime<Utc>,
) -> Result<Vec<transaction::Model>> {
    Ok(Transaction::find()
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .filter(transaction::Column::CreatedAt.lte(cutoff))
        .order_by_asc(transaction::Column::CreatedAt)
        .all(db)
        .await?)
}

async fn roll_back_all(db: &DatabaseConnection, stale: Vec<transaction::Model>) -> SweepReport {
    let mut report = SweepReport {
        scanned: stale.len(),
        ..SweepReport::default()
    };

    for candidate in stale {
        match roll_back_transaction(db, candidate.id).await {
            Ok(Some((seats, vouchers))) => {
                report.rolled_back += 1;
                report.released_seats += seats;
                report.restored_vouchers += vouchers;
                tracing::info!(
                    transaction_id = candidate.id,
                    invoice_id = candidate.invoice_id,
                    reference = %candidate.reference,
                    seats,
                    vouchers,
                    "Expired transaction rolled back"
                );
            }
            // settled between the scan and the re-check
            Ok(None) => {}
            Err(e) => {
                report.failures += 1;
                tracing::error!(
                    transaction_id = candidate.id,
                    invoice_id = candidate.invoice_id,
                    error = %e,
                    "Failed to roll back expired transaction"
                );
            }
        }
    }

    if report.scanned > 0 {
        tracing::info!(
            scanned = report.scanned,
            rolled_back = report.rolled_back,
            released_seats = report.released_seats,
            failures = report.failures,
            "Expiry sweep finished"
        );
    }
    report
}

async fn roll_back_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<(u64, usize)>> {
    let txn = db.begin().await?;

    let still_pending = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .filter(|t| t.status == TransactionStatus::Pending);
    let Some(pending) = still_pending else {
        return Ok(None);
    };

    let released = purge_invoice(&txn, pending.invoice_id).await?;
    txn.commit().await?;
    Ok(Some((released.seats, released.vouchers)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::transaction::{PaymentNotification, PaymentOutcome, handle_payment_webhook},
        entities::{
            Invoice, InvoiceCombo, InvoiceVoucher, ShowtimeSeat, Ticket, Voucher,
            sea_orm_active_enums::{InvoiceStatus, SeatStatus, VoucherKind},
        },
        test_utils::*,
    };

    fn timeout() -> Duration {
        Duration::minutes(10)
    }

    #[tokio::test]
    async fn test_fresh_transactions_are_kept() -> Result<()> {
        let fixture = setup_showtime().await?;
        create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;

        let report =
            sweep_expired_transactions(&fixture.db, Utc::now() + Duration::minutes(9), timeout())
                .await?;
        assert_eq!(report, SweepReport::default());
        assert_eq!(Invoice::find().count(&fixture.db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_transaction_is_rolled_back() -> Result<()> {
        let fixture = setup_showtime().await?;
        let combo = create_test_combo(&fixture.db, "Popcorn", 45_000).await?;
        let voucher = create_test_voucher(&fixture.db, "TEN", VoucherKind::Percent, 10).await?;
        let checkout = create_custom_invoice(
            &fixture,
            "alice",
            &fixture.seat_ids[..2],
            &[(combo.id, 1)],
            &[voucher.id],
        )
        .await?;

        let report =
            sweep_expired_transactions(&fixture.db, Utc::now() + Duration::minutes(11), timeout())
                .await?;
        assert_eq!(report.scanned, 1);
        assert_eq!(report.rolled_back, 1);
        assert_eq!(report.released_seats, 2);
        assert_eq!(report.restored_vouchers, 1);
        assert_eq!(report.failures, 0);

        assert!(Invoice::find_by_id(checkout.invoice.id).one(&fixture.db).await?.is_none());
        assert_eq!(Transaction::find().count(&fixture.db).await?, 0);
        assert_eq!(Ticket::find().count(&fixture.db).await?, 0);
        assert_eq!(InvoiceCombo::find().count(&fixture.db).await?, 0);
        assert_eq!(InvoiceVoucher::find().count(&fixture.db).await?, 0);

        let restored = Voucher::find_by_id(voucher.id).one(&fixture.db).await?.unwrap();
        assert_eq!(restored.remaining, voucher.remaining);
        for id in &fixture.seat_ids[..2] {
            let seat = ShowtimeSeat::find_by_id(*id).one(&fixture.db).await?.unwrap();
            assert_eq!(seat.status, SeatStatus::Available);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_settled_transactions_are_ignored() -> Result<()> {
        let fixture = setup_showtime().await?;
        let paid = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;
        let pending = create_custom_invoice(&fixture, "bob", &fixture.seat_ids[1..2], &[], &[])
            .await?;

        handle_payment_webhook(
            &fixture.db,
            PaymentNotification {
                reference: paid.transaction.reference.clone(),
                status: PaymentOutcome::Success,
                amount: paid.transaction.amount,
                provider_transaction_id: None,
            },
            Utc::now(),
        )
        .await?;

        let later = Utc::now() + Duration::minutes(30);
        let report = sweep_expired_transactions(&fixture.db, later, timeout()).await?;
        assert_eq!(report.rolled_back, 1);
        assert!(Invoice::find_by_id(paid.invoice.id).one(&fixture.db).await?.is_some());
        assert!(Invoice::find_by_id(pending.invoice.id).one(&fixture.db).await?.is_none());

        // a second pass finds nothing left to do
        let again = sweep_expired_transactions(&fixture.db, later, timeout()).await?;
        assert_eq!(again.scanned, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_between_scan_and_rollback_wins() -> Result<()> {
        let fixture = setup_showtime().await?;
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;

        let later = Utc::now() + Duration::minutes(11);
        let stale = stale_transactions(&fixture.db, later - timeout()).await?;
        assert_eq!(stale.len(), 1);

        handle_payment_webhook(
            &fixture.db,
            PaymentNotification {
                reference: checkout.transaction.reference.clone(),
                status: PaymentOutcome::Success,
                amount: checkout.transaction.amount,
                provider_transaction_id: None,
            },
            Utc::now(),
        )
        .await?;

        assert_eq!(roll_back_transaction(&fixture.db, stale[0].id).await?, None);
        let report = roll_back_all(&fixture.db, stale).await;
        assert_eq!(report.scanned, 1);
        assert_eq!(report.rolled_back, 0);
        assert_eq!(report.failures, 0);

        let invoice = Invoice::find_by_id(checkout.invoice.id).one(&fixture.db).await?.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(Ticket::find().count(&fixture.db).await?, 1);
        let seat = ShowtimeSeat::find_by_id(fixture.seat_ids[0]).one(&fixture.db).await?.unwrap();
        assert_eq!(seat.status, SeatStatus::Booked);
        Ok(())
    }

    #[tokio::test]
    async fn test_swept_reference_is_not_found_for_late_webhook() -> Result<()> {
        let fixture = setup_showtime().await?;
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;
        sweep_expired_transactions(&fixture.db, Utc::now() + Duration::minutes(11), timeout())
            .await?;

        let late = handle_payment_webhook(
            &fixture.db,
            PaymentNotification {
                reference: checkout.transaction.reference,
                status: PaymentOutcome::Success,
                amount: checkout.transaction.amount,
                provider_transaction_id: None,
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(late, Err(crate::errors::Error::NotFound { .. })));
        Ok(())
    }
}
