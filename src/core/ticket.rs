//! Ticket business logic - check-in and the refund request workflow.
//!
//! Ticket lifecycle:
//!
//! ```text
//!   Unused ──check-in──▶ Used
//!     │  ▲
//!     │  └──reject── RefundPending ──approve──▶ Refunded
//!     └──request──────────▲
//!   Unused ──showtime finished──▶ Expired
//! ```

use crate::{
    core::seats::available_seat,
    entities::{
        Invoice, RefundRequest, Showtime, ShowtimeSeat, Ticket, invoice, refund_request,
        sea_orm_active_enums::{InvoiceStatus, RefundStatus, ShowtimeStatus, TicketStatus},
        showtime, showtime_seat, ticket,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Retrieves a ticket by its ID.
pub async fn get_ticket<C>(db: &C, ticket_id: i64) -> Result<ticket::Model>
where
    C: ConnectionTrait,
{
    Ticket::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Ticket", ticket_id))
}

async fn paid_invoice<C>(db: &C, ticket: &ticket::Model) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    let invoice = Invoice::find_by_id(ticket.invoice_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Invoice", ticket.invoice_id))?;
    if invoice.status != InvoiceStatus::Paid {
        return Err(Error::validation(format!(
            "Invoice {} has not been paid",
            invoice.id
        )));
    }
    Ok(invoice)
}

async fn ticket_showtime<C>(db: &C, ticket: &ticket::Model) -> Result<showtime::Model>
where
    C: ConnectionTrait,
{
    let row = ShowtimeSeat::find_by_id(ticket.showtime_seat_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Showtime seat", ticket.showtime_seat_id))?;
    Showtime::find_by_id(row.showtime_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Showtime", row.showtime_id))
}

fn require_ticket_status(ticket: &ticket::Model, expected: TicketStatus, to: TicketStatus) -> Result<()> {
    if ticket.status == expected {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            entity: "Ticket",
            from: ticket.status.to_value(),
            to: to.to_value(),
        })
    }
}

/// Admits the holder of an unused ticket of a paid invoice.
pub async fn check_in_ticket(db: &DatabaseConnection, ticket_id: i64) -> Result<ticket::Model> {
    let txn = db.begin().await?;

    let ticket = get_ticket(&txn, ticket_id).await?;
    require_ticket_status(&ticket, TicketStatus::Unused, TicketStatus::Used)?;
    paid_invoice(&txn, &ticket).await?;
    let showtime = ticket_showtime(&txn, &ticket).await?;
    if matches!(
        showtime.status,
        ShowtimeStatus::Finished | ShowtimeStatus::Cancelled
    ) {
        return Err(Error::validation(format!(
            "Showtime {} is no longer running",
            showtime.id
        )));
    }

    let mut active: ticket::ActiveModel = ticket.into();
    active.status = Set(TicketStatus::Used);
    let ticket = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(ticket_id, showtime_id = showtime.id, "Ticket checked in");
    Ok(ticket)
}

/// Share of the invoice total paid for one ticket, after voucher discounts.
#[must_use]
pub fn refundable_amount(ticket_price: i64, invoice: &invoice::Model) -> i64 {
    if invoice.subtotal <= 0 {
        return 0;
    }
    let scaled = i128::from(ticket_price) * i128::from(invoice.total) / i128::from(invoice.subtotal);
    i64::try_from(scaled).unwrap_or(ticket_price)
}

/// Opens a refund request for an unused ticket.
///
/// # Errors
/// * `InvalidTransition` unless the ticket is unused
/// * `Validation` if the invoice is not paid
/// * `RefundWindowClosed` when the showtime starts within `cutoff_hours`
pub async fn request_refund(
    db: &DatabaseConnection,
    ticket_id: i64,
    reason: &str,
    cutoff_hours: i64,
    now: DateTime<Utc>,
) -> Result<refund_request::Model> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::validation("A refund reason is required"));
    }

    let txn = db.begin().await?;

    let ticket = get_ticket(&txn, ticket_id).await?;
    require_ticket_status(&ticket, TicketStatus::Unused, TicketStatus::RefundPending)?;
    let invoice = paid_invoice(&txn, &ticket).await?;
    let showtime = ticket_showtime(&txn, &ticket).await?;
    if showtime.start_time - now < Duration::hours(cutoff_hours) {
        return Err(Error::RefundWindowClosed { cutoff_hours });
    }

    let request = refund_request::ActiveModel {
        ticket_id: Set(ticket.id),
        reason: Set(reason.to_string()),
        amount: Set(refundable_amount(ticket.price, &invoice)),
        status: Set(RefundStatus::Pending),
        created_at: Set(now),
        resolved_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: ticket::ActiveModel = ticket.into();
    active.status = Set(TicketStatus::RefundPending);
    active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        refund_request_id = request.id,
        ticket_id,
        amount = request.amount,
        "Refund requested"
    );
    Ok(request)
}

async fn pending_request<C>(db: &C, request_id: i64, to: RefundStatus) -> Result<refund_request::Model>
where
    C: ConnectionTrait,
{
    let request = RefundRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Refund request", request_id))?;
    if request.status != RefundStatus::Pending {
        return Err(Error::InvalidTransition {
            entity: "Refund request",
            from: request.status.to_value(),
            to: to.to_value(),
        });
    }
    Ok(request)
}

async fn resolve<C>(
    db: &C,
    request: refund_request::Model,
    status: RefundStatus,
    now: DateTime<Utc>,
) -> Result<refund_request::Model>
where
    C: ConnectionTrait,
{
    let mut active: refund_request::ActiveModel = request.into();
    active.status = Set(status);
    active.resolved_at = Set(Some(now));
    active.update(db).await.map_err(Into::into)
}

/// Approves a pending refund: the ticket is refunded and its seat goes back on sale.
pub async fn approve_refund(
    db: &DatabaseConnection,
    request_id: i64,
    now: DateTime<Utc>,
) -> Result<refund_request::Model> {
    let txn = db.begin().await?;

    let request = pending_request(&txn, request_id, RefundStatus::Approved).await?;
    let ticket = get_ticket(&txn, request.ticket_id).await?;
    let seat_id = ticket.showtime_seat_id;

    let mut active: ticket::ActiveModel = ticket.into();
    active.status = Set(TicketStatus::Refunded);
    active.update(&txn).await?;

    ShowtimeSeat::update_many()
        .set(available_seat())
        .filter(showtime_seat::Column::Id.eq(seat_id))
        .exec(&txn)
        .await?;

    let request = resolve(&txn, request, RefundStatus::Approved, now).await?;
    txn.commit().await?;

    tracing::info!(refund_request_id = request_id, amount = request.amount, "Refund approved");
    Ok(request)
}

/// Rejects a pending refund; the ticket becomes usable again.
pub async fn reject_refund(
    db: &DatabaseConnection,
    request_id: i64,
    now: DateTime<Utc>,
) -> Result<refund_request::Model> {
    let txn = db.begin().await?;

    let request = pending_request(&txn, request_id, RefundStatus::Rejected).await?;
    let ticket = get_ticket(&txn, request.ticket_id).await?;
    let mut active: ticket::ActiveModel = ticket.into();
    active.status = Set(TicketStatus::Unused);
    active.update(&txn).await?;

    let request = resolve(&txn, request, RefundStatus::Rejected, now).await?;
    txn.commit().await?;

    tracing::info!(refund_request_id = request_id, "Refund rejected");
    Ok(request)
}

/// Lists refund requests, oldest first, optionally filtered by status.
pub async fn list_refund_requests<C>(
    db: &C,
    status: Option<RefundStatus>,
) -> Result<Vec<refund_request::Model>>
where
    C: ConnectionTrait,
{
    let mut query = RefundRequest::find().order_by_asc(refund_request::Column::CreatedAt);
    if let Some(status) = status {
        query = query.filter(refund_request::Column::Status.eq(status));
    }
    query.all(db).await.map_err(Into::into)
}
