//! Invoice business logic - the seat reservation and checkout lifecycle.
//!
//! Creating an invoice books the selected seats, records combos and
//! vouchers, and opens a pending payment transaction, all in one database
//! transaction. Afterwards the payment gateway is asked for a checkout link.
//!
//! Invoices that never get paid are undone by compensation rather than by a
//! long-lived database transaction:
//!
//! ```text
//!                 webhook success
//!   Pending ─────────────────────────▶ Paid
//!      │
//!      ├── webhook failed / customer cancel ──▶ Cancelled (rows kept, seats + vouchers released)
//!      │
//!      └── timeout sweep / gateway error ─────▶ deleted   (all rows removed, seats + vouchers released)
//! ```

use crate::{
    config::{BookingPolicy, PricingConfig},
    core::{
        pricing::{self, ComboLine, PriceBreakdown},
        seats::{self, available_seat},
        voucher::{consume_redemption, restore_redemption},
    },
    entities::{
        Combo, Invoice, InvoiceCombo, InvoiceVoucher, Seat, ShowtimeSeat, Ticket, Transaction,
        Voucher, invoice, invoice_combo, invoice_voucher, seat,
        sea_orm_active_enums::{InvoiceStatus, SeatStatus, TicketStatus, TransactionStatus},
        showtime_seat, ticket, transaction,
    },
    errors::{Error, Result},
    payment_gateway::{PaymentGateway, PaymentLinkRequest},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

/// One combo line requested by the customer.
#[derive(Debug, Clone, Deserialize)]
pub struct ComboOrder {
    pub combo_id: i64,
    pub quantity: i32,
}

/// Input for [`create_invoice`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub customer_id: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub showtime_id: i64,
    pub showtime_seat_ids: Vec<i64>,
    #[serde(default)]
    pub combos: Vec<ComboOrder>,
    #[serde(default)]
    pub voucher_ids: Vec<i64>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub invoice: invoice::Model,
    pub tickets: Vec<ticket::Model>,
    pub transaction: transaction::Model,
}

/// An invoice with everything attached to it.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetails {
    pub invoice: invoice::Model,
    pub tickets: Vec<ticket::Model>,
    pub combos: Vec<invoice_combo::Model>,
    pub vouchers: Vec<invoice_voucher::Model>,
    pub transaction: Option<transaction::Model>,
}

/// What a compensation gave back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleasedHoldings {
    pub seats: u64,
    pub vouchers: usize,
}

/// Creates an invoice, books its seats and opens a payment transaction.
///
/// A zero total is settled immediately without contacting the gateway. If the
/// gateway fails, the freshly written invoice is purged before the error is
/// returned so the seats go straight back on sale.
///
/// # Errors
/// * `Validation` for a bad selection, too many combos or a showtime that is closed for booking
/// * `InvalidAmount` if the order total does not fit in an `i64`
/// * `SeatUnavailable` if a seat is booked or held by another customer
/// * `NotFound` for unknown combos or vouchers
/// * `VoucherRejected` if a voucher cannot be applied
/// * `PaymentGateway` if no checkout link could be created
pub async fn create_invoice(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    input: NewInvoice,
    policy: &BookingPolicy,
    pricing_config: &PricingConfig,
    now: DateTime<Utc>,
) -> Result<Checkout> {
    let customer_id = input.customer_id.trim().to_string();
    if customer_id.is_empty() {
        return Err(Error::validation("Customer is required"));
    }
    seats::ensure_distinct(&input.showtime_seat_ids)?;
    if input.showtime_seat_ids.len() > policy.max_seats_per_invoice {
        return Err(Error::validation(format!(
            "At most {} seats can be booked at once",
            policy.max_seats_per_invoice
        )));
    }
    if input.combos.len() > policy.max_combo_lines {
        return Err(Error::validation(format!(
            "At most {} combo lines can be ordered at once",
            policy.max_combo_lines
        )));
    }

    let txn = db.begin().await?;

    let showtime = seats::bookable_showtime(&txn, input.showtime_id, now).await?;
    let rows = seats::claimable_rows(
        &txn,
        showtime.id,
        &input.showtime_seat_ids,
        &customer_id,
        now,
    )
    .await?;

    // Ticket prices, in the order the seats were requested
    let seat_models = Seat::find()
        .filter(seat::Column::Id.is_in(rows.iter().map(|r| r.seat_id)))
        .all(&txn)
        .await?;
    let mut priced_rows = Vec::with_capacity(rows.len());
    for id in &input.showtime_seat_ids {
        let row = rows
            .iter()
            .find(|r| r.id == *id)
            .ok_or_else(|| Error::not_found("Showtime seat", id))?;
        let seat = seat_models
            .iter()
            .find(|s| s.id == row.seat_id)
            .ok_or_else(|| Error::not_found("Seat", row.seat_id))?;
        let price = pricing::ticket_price(showtime.base_price, seat.seat_type, pricing_config);
        priced_rows.push((row.clone(), price));
    }

    let mut combo_lines = Vec::with_capacity(input.combos.len());
    for order in &input.combos {
        let combo = Combo::find_by_id(order.combo_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Combo", order.combo_id))?;
        combo_lines.push(ComboLine::new(&combo, order.quantity, policy.max_combo_quantity)?);
    }

    let mut vouchers = Vec::with_capacity(input.voucher_ids.len());
    for voucher_id in &input.voucher_ids {
        let voucher = Voucher::find_by_id(*voucher_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Voucher", voucher_id))?;
        vouchers.push(voucher);
    }

    let ticket_prices: Vec<i64> = priced_rows.iter().map(|(_, price)| *price).collect();
    let breakdown = pricing::price_order(&ticket_prices, &combo_lines, &vouchers, now)?;
    let settled = breakdown.total == 0;

    let invoice = invoice::ActiveModel {
        customer_id: Set(customer_id.clone()),
        customer_email: Set(input.customer_email.clone()),
        showtime_id: Set(showtime.id),
        subtotal: Set(breakdown.subtotal),
        discount: Set(breakdown.discount),
        total: Set(breakdown.total),
        status: Set(if settled {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Pending
        }),
        created_at: Set(now),
        paid_at: Set(settled.then_some(now)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut tickets = Vec::with_capacity(priced_rows.len());
    for (row, price) in priced_rows {
        tickets.push(
            ticket::ActiveModel {
                invoice_id: Set(invoice.id),
                showtime_seat_id: Set(row.id),
                price: Set(price),
                status: Set(TicketStatus::Unused),
                ..Default::default()
            }
            .insert(&txn)
            .await?,
        );

        let mut booked: showtime_seat::ActiveModel = row.into();
        booked.status = Set(SeatStatus::Booked);
        booked.held_by = Set(None);
        booked.held_until = Set(None);
        booked.update(&txn).await?;
    }

    for line in &combo_lines {
        invoice_combo::ActiveModel {
            invoice_id: Set(invoice.id),
            combo_id: Set(line.combo_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    record_vouchers(&txn, invoice.id, &breakdown, &vouchers).await?;

    let transaction = transaction::ActiveModel {
        invoice_id: Set(invoice.id),
        reference: Set(uuid::Uuid::new_v4().simple().to_string()),
        amount: Set(breakdown.total),
        status: Set(if settled {
            TransactionStatus::Success
        } else {
            TransactionStatus::Pending
        }),
        payment_url: Set(None),
        provider_transaction_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        invoice_id = invoice.id,
        showtime_id = showtime.id,
        customer_id = %customer_id,
        seats = tickets.len(),
        subtotal = breakdown.subtotal,
        discount = breakdown.discount,
        total = breakdown.total,
        "Invoice created"
    );

    if settled {
        return Ok(Checkout {
            invoice,
            tickets,
            transaction,
        });
    }

    let link_request = PaymentLinkRequest {
        reference: transaction.reference.clone(),
        amount: transaction.amount,
    };
    let payment_url = match gateway.create_payment_link(&link_request).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(invoice_id = invoice.id, error = %e, "Payment link failed, rolling back invoice");
            if let Err(rollback_err) = purge_invoice_now(db, invoice.id).await {
                tracing::error!(
                    invoice_id = invoice.id,
                    error = %rollback_err,
                    "Rollback after payment link failure failed; the expiry sweep will retry"
                );
            }
            return Err(e);
        }
    };

    let mut active: transaction::ActiveModel = transaction.into();
    active.payment_url = Set(Some(payment_url));
    let transaction = active.update(db).await?;

    Ok(Checkout {
        invoice,
        tickets,
        transaction,
    })
}

/// Writes one row per applied voucher and consumes a redemption for each.
async fn record_vouchers<C>(
    db: &C,
    invoice_id: i64,
    breakdown: &PriceBreakdown,
    vouchers: &[crate::entities::voucher::Model],
) -> Result<()>
where
    C: ConnectionTrait,
{
    for applied in &breakdown.vouchers {
        if !consume_redemption(db, applied.voucher_id).await? {
            let code = vouchers
                .iter()
                .find(|v| v.id == applied.voucher_id)
                .map_or_else(|| applied.voucher_id.to_string(), |v| v.code.clone());
            return Err(Error::VoucherRejected {
                code,
                reason: "voucher has been fully redeemed".to_string(),
            });
        }
        invoice_voucher::ActiveModel {
            invoice_id: Set(invoice_id),
            voucher_id: Set(applied.voucher_id),
            discount: Set(applied.discount),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Invoice with its tickets, combo lines, vouchers and latest transaction.
pub async fn get_invoice_details<C>(db: &C, invoice_id: i64) -> Result<InvoiceDetails>
where
    C: ConnectionTrait,
{
    let invoice = Invoice::find_by_id(invoice_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Invoice", invoice_id))?;

    let tickets = Ticket::find()
        .filter(ticket::Column::InvoiceId.eq(invoice_id))
        .order_by_asc(ticket::Column::Id)
        .all(db)
        .await?;
    let combos = InvoiceCombo::find()
        .filter(invoice_combo::Column::InvoiceId.eq(invoice_id))
        .all(db)
        .await?;
    let vouchers = InvoiceVoucher::find()
        .filter(invoice_voucher::Column::InvoiceId.eq(invoice_id))
        .all(db)
        .await?;
    let transaction = Transaction::find()
        .filter(transaction::Column::InvoiceId.eq(invoice_id))
        .order_by_desc(transaction::Column::CreatedAt)
        .one(db)
        .await?;

    Ok(InvoiceDetails {
        invoice,
        tickets,
        combos,
        vouchers,
        transaction,
    })
}

/// Customer abandons checkout: the pending payment fails and the invoice is cancelled.
///
/// Returns `NotFound` when the invoice does not belong to `customer_id`.
pub async fn cancel_pending_invoice(
    db: &DatabaseConnection,
    invoice_id: i64,
    customer_id: &str,
    now: DateTime<Utc>,
) -> Result<invoice::Model> {
    let txn = db.begin().await?;

    let invoice = Invoice::find_by_id(invoice_id)
        .one(&txn)
        .await?
        .filter(|inv| inv.customer_id == customer_id)
        .ok_or_else(|| Error::not_found("Invoice", invoice_id))?;
    if invoice.status != InvoiceStatus::Pending {
        return Err(Error::InvalidTransition {
            entity: "Invoice",
            from: invoice.status.to_value(),
            to: InvoiceStatus::Cancelled.to_value(),
        });
    }

    let pending = Transaction::find()
        .filter(transaction::Column::InvoiceId.eq(invoice_id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .all(&txn)
        .await?;
    for tx in pending {
        let mut active: transaction::ActiveModel = tx.into();
        active.status = Set(TransactionStatus::Failed);
        active.updated_at = Set(now);
        active.update(&txn).await?;
    }

    let invoice = cancel_invoice(&txn, invoice).await?;
    txn.commit().await?;

    tracing::info!(invoice_id, customer_id, "Pending invoice cancelled by customer");
    Ok(invoice)
}

/// Releases what an unpaid invoice holds: seats go back on sale, voucher
/// redemptions are restored, tickets are deleted.
pub(crate) async fn release_invoice_holdings<C>(db: &C, invoice_id: i64) -> Result<ReleasedHoldings>
where
    C: ConnectionTrait,
{
    let tickets = Ticket::find()
        .filter(ticket::Column::InvoiceId.eq(invoice_id))
        .all(db)
        .await?;
    let seat_ids: Vec<i64> = tickets.iter().map(|t| t.showtime_seat_id).collect();

    let seats = if seat_ids.is_empty() {
        0
    } else {
        ShowtimeSeat::update_many()
            .set(available_seat())
            .filter(showtime_seat::Column::Id.is_in(seat_ids))
            .filter(showtime_seat::Column::Status.eq(SeatStatus::Booked))
            .exec(db)
            .await?
            .rows_affected
    };

    let applied = InvoiceVoucher::find()
        .filter(invoice_voucher::Column::InvoiceId.eq(invoice_id))
        .all(db)
        .await?;
    for row in &applied {
        restore_redemption(db, row.voucher_id).await?;
    }

    Ticket::delete_many()
        .filter(ticket::Column::InvoiceId.eq(invoice_id))
        .exec(db)
        .await?;

    Ok(ReleasedHoldings {
        seats,
        vouchers: applied.len(),
    })
}

/// Releases holdings and marks the invoice cancelled, keeping its rows for the record.
pub(crate) async fn cancel_invoice<C>(db: &C, invoice: invoice::Model) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    let released = release_invoice_holdings(db, invoice.id).await?;
    tracing::debug!(
        invoice_id = invoice.id,
        seats = released.seats,
        vouchers = released.vouchers,
        "Invoice holdings released"
    );

    let mut active: invoice::ActiveModel = invoice.into();
    active.status = Set(InvoiceStatus::Cancelled);
    active.update(db).await.map_err(Into::into)
}

/// Releases holdings and deletes the invoice with its combo, voucher and transaction rows.
pub(crate) async fn purge_invoice<C>(db: &C, invoice_id: i64) -> Result<ReleasedHoldings>
where
    C: ConnectionTrait,
{
    let released = release_invoice_holdings(db, invoice_id).await?;

    InvoiceCombo::delete_many()
        .filter(invoice_combo::Column::InvoiceId.eq(invoice_id))
        .exec(db)
        .await?;
    InvoiceVoucher::delete_many()
        .filter(invoice_voucher::Column::InvoiceId.eq(invoice_id))
        .exec(db)
        .await?;
    Transaction::delete_many()
        .filter(transaction::Column::InvoiceId.eq(invoice_id))
        .exec(db)
        .await?;
    Invoice::delete_by_id(invoice_id).exec(db).await?;

    Ok(released)
}

async fn purge_invoice_now(db: &DatabaseConnection, invoice_id: i64) -> Result<ReleasedHoldings> {
    let txn = db.begin().await?;
    let released = purge_invoice(&txn, invoice_id).await?;
    txn.commit().await?;
    Ok(released)
}
