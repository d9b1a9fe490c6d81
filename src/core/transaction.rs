//! Payment transaction business logic - settles invoices from provider webhooks.
//!
//! A transaction moves `Pending -> Success` or `Pending -> Failed` exactly once.
//! Providers retry webhooks, so a notification that repeats the current state
//! is acknowledged without side effects.

use crate::{
    core::invoice::cancel_invoice,
    entities::{
        Invoice, Transaction, invoice,
        sea_orm_active_enums::{InvoiceStatus, TransactionStatus},
        transaction,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

/// Outcome reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failed,
}

impl From<PaymentOutcome> for TransactionStatus {
    fn from(outcome: PaymentOutcome) -> Self {
        match outcome {
            PaymentOutcome::Success => Self::Success,
            PaymentOutcome::Failed => Self::Failed,
        }
    }
}

/// Webhook payload from the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    pub reference: String,
    pub status: PaymentOutcome,
    pub amount: i64,
    #[serde(default)]
    pub provider_transaction_id: Option<String>,
}

/// State after a webhook was applied.
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub transaction: transaction::Model,
    pub invoice: invoice::Model,
    /// False when the notification repeated a state already recorded
    pub changed: bool,
}

/// Applies a provider notification to its transaction and invoice.
///
/// Success marks the invoice paid. Failure cancels the invoice and puts its
/// seats and vouchers back.
///
/// # Errors
/// * `NotFound` for an unknown reference (including one already swept away)
/// * `InvalidTransition` if the transaction already settled the other way
/// * `InvalidAmount` if a success reports a different amount than was charged
pub async fn handle_payment_webhook(
    db: &DatabaseConnection,
    notification: PaymentNotification,
    now: DateTime<Utc>,
) -> Result<Settlement> {
    let target: TransactionStatus = notification.status.into();
    let txn = db.begin().await?;

    let transaction = get_transaction_by_reference(&txn, &notification.reference).await?;
    let invoice = Invoice::find_by_id(transaction.invoice_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Invoice", transaction.invoice_id))?;

    if transaction.status == target {
        tracing::debug!(reference = %notification.reference, status = ?target, "Duplicate payment notification");
        return Ok(Settlement {
            transaction,
            invoice,
            changed: false,
        });
    }
    if transaction.status.is_terminal() {
        return Err(Error::InvalidTransition {
            entity: "Transaction",
            from: transaction.status.to_value(),
            to: target.to_value(),
        });
    }
    if target == TransactionStatus::Success && notification.amount != transaction.amount {
        tracing::warn!(
            reference = %notification.reference,
            expected = transaction.amount,
            reported = notification.amount,
            "Payment amount mismatch"
        );
        return Err(Error::InvalidAmount {
            amount: notification.amount,
        });
    }

    let mut active: transaction::ActiveModel = transaction.into();
    active.status = Set(target);
    active.updated_at = Set(now);
    if notification.provider_transaction_id.is_some() {
        active.provider_transaction_id = Set(notification.provider_transaction_id.clone());
    }
    let transaction = active.update(&txn).await?;

    let invoice = match target {
        TransactionStatus::Success => {
            let mut active: invoice::ActiveModel = invoice.into();
            active.status = Set(InvoiceStatus::Paid);
            active.paid_at = Set(Some(now));
            active.update(&txn).await?
        }
        _ => cancel_invoice(&txn, invoice).await?,
    };

    txn.commit().await?;

    tracing::info!(
        reference = %transaction.reference,
        invoice_id = invoice.id,
        status = ?transaction.status,
        "Payment settled"
    );
    Ok(Settlement {
        transaction,
        invoice,
        changed: true,
    })
}

/// Retrieves a transaction by its ID.
pub async fn get_transaction<C>(db: &C, transaction_id: i64) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Transaction", transaction_id))
}

/// Retrieves a transaction by the reference handed to the payment provider.
pub async fn get_transaction_by_reference<C>(db: &C, reference: &str) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::Reference.eq(reference))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Transaction", reference))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::invoice::get_invoice_details,
        entities::{ShowtimeSeat, sea_orm_active_enums::SeatStatus},
        test_utils::*,
    };

    fn notification(reference: &str, status: PaymentOutcome, amount: i64) -> PaymentNotification {
        PaymentNotification {
            reference: reference.to_string(),
            status,
            amount,
            provider_transaction_id: Some("prov-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_success_marks_invoice_paid() -> Result<()> {
        let fixture = setup_showtime().await?;
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;
        let reference = checkout.transaction.reference.clone();

        let settlement = handle_payment_webhook(
            &fixture.db,
            notification(&reference, PaymentOutcome::Success, checkout.invoice.total),
            Utc::now(),
        )
        .await?;

        assert!(settlement.changed);
        assert_eq!(settlement.transaction.status, TransactionStatus::Success);
        assert_eq!(settlement.transaction.provider_transaction_id.as_deref(), Some("prov-1"));
        assert_eq!(settlement.invoice.status, InvoiceStatus::Paid);
        assert!(settlement.invoice.paid_at.is_some());

        let seat = ShowtimeSeat::find_by_id(fixture.seat_ids[0])
            .one(&fixture.db)
            .await?
            .unwrap();
        assert_eq!(seat.status, SeatStatus::Booked);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_notification_is_idempotent() -> Result<()> {
        let fixture = setup_showtime().await?;
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;
        let reference = checkout.transaction.reference.clone();
        let total = checkout.invoice.total;

        handle_payment_webhook(
            &fixture.db,
            notification(&reference, PaymentOutcome::Success, total),
            Utc::now(),
        )
        .await?;
        let again = handle_payment_webhook(
            &fixture.db,
            notification(&reference, PaymentOutcome::Success, total),
            Utc::now(),
        )
        .await?;
        assert!(!again.changed);
        assert_eq!(again.invoice.status, InvoiceStatus::Paid);

        let flipped = handle_payment_webhook(
            &fixture.db,
            notification(&reference, PaymentOutcome::Failed, total),
            Utc::now(),
        )
        .await;
        assert!(matches!(flipped, Err(Error::InvalidTransition { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_cancels_invoice_and_frees_seats() -> Result<()> {
        let fixture = setup_showtime().await?;
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..2]).await?;

        let settlement = handle_payment_webhook(
            &fixture.db,
            notification(&checkout.transaction.reference, PaymentOutcome::Failed, 0),
            Utc::now(),
        )
        .await?;
        assert_eq!(settlement.transaction.status, TransactionStatus::Failed);
        assert_eq!(settlement.invoice.status, InvoiceStatus::Cancelled);

        let details = get_invoice_details(&fixture.db, checkout.invoice.id).await?;
        assert!(details.tickets.is_empty());
        for id in &fixture.seat_ids[..2] {
            let seat = ShowtimeSeat::find_by_id(*id).one(&fixture.db).await?.unwrap();
            assert_eq!(seat.status, SeatStatus::Available);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_amount_mismatch_rejected() -> Result<()> {
        let fixture = setup_showtime().await?;
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;

        let result = handle_payment_webhook(
            &fixture.db,
            notification(&checkout.transaction.reference, PaymentOutcome::Success, 1),
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 1 })));

        let transaction = get_transaction(&fixture.db, checkout.transaction.id).await?;
        assert_eq!(transaction.status, TransactionStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_reference_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = handle_payment_webhook(
            &db,
            notification("missing", PaymentOutcome::Success, 100),
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        let lookup = get_transaction_by_reference(&db, "missing").await;
        assert!(matches!(lookup, Err(Error::NotFound { .. })));
        Ok(())
    }
}
