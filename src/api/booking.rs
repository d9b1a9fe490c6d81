//! Booking routes: seat holds, checkout, payment transactions and the provider webhook.

use crate::{
    api::{
        AppState,
        response::{created, success},
    },
    core::{
        invoice::{self, NewInvoice},
        seats,
        transaction::{self, PaymentNotification},
    },
    errors::{Error, Result},
    payment_gateway::SIGNATURE_HEADER,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Body of `POST /showtimes/:id/holds`.
#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    pub customer_id: String,
    pub showtime_seat_ids: Vec<i64>,
}

/// Identifies the customer acting on holds or an invoice.
#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub customer_id: String,
}

#[derive(Debug, Serialize)]
struct Released {
    released: u64,
}

/// `POST /showtimes/:id/holds`
pub async fn hold_seats(
    State(state): State<AppState>,
    Path(showtime_id): Path<i64>,
    Json(request): Json<HoldRequest>,
) -> Result<Response> {
    let held = seats::hold_seats(
        &state.db,
        showtime_id,
        &request.showtime_seat_ids,
        &request.customer_id,
        state.config.booking.seat_hold_minutes,
        Utc::now(),
    )
    .await?;
    Ok(success(held, "Seats held"))
}

/// `DELETE /showtimes/:id/holds?customer_id=`
pub async fn release_holds(
    State(state): State<AppState>,
    Path(showtime_id): Path<i64>,
    Query(query): Query<CustomerQuery>,
) -> Result<Response> {
    let released = seats::release_holds(&state.db, showtime_id, &query.customer_id).await?;
    Ok(success(Released { released }, "Holds released"))
}

/// `POST /invoices` - checkout; the response carries the payment link.
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(input): Json<NewInvoice>,
) -> Result<Response> {
    let checkout = invoice::create_invoice(
        &state.db,
        state.gateway.as_ref(),
        input,
        &state.config.booking,
        &state.config.pricing,
        Utc::now(),
    )
    .await?;
    Ok(created(checkout, "Invoice created"))
}

/// `GET /invoices/:id`
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> Result<Response> {
    let details = invoice::get_invoice_details(&state.db, invoice_id).await?;
    Ok(success(details, "Invoice retrieved"))
}

/// `POST /invoices/:id/cancel` - the owning customer abandons a pending checkout.
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
    Json(customer): Json<CustomerQuery>,
) -> Result<Response> {
    let invoice =
        invoice::cancel_pending_invoice(&state.db, invoice_id, &customer.customer_id, Utc::now())
            .await?;
    Ok(success(invoice, "Invoice cancelled"))
}

/// `GET /transactions/:id`
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<i64>,
) -> Result<Response> {
    let transaction = transaction::get_transaction(&state.db, transaction_id).await?;
    Ok(success(transaction, "Transaction retrieved"))
}

/// `POST /payments/webhook` - settles a transaction from a signed provider callback.
///
/// The signature is checked against the raw body before it is parsed.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state
        .gateway
        .verify_notification(&body, signature)
        .inspect_err(|e| tracing::warn!(error = %e, "Rejected payment webhook"))?;

    let notification: PaymentNotification = serde_json::from_slice(&body)
        .map_err(|e| Error::validation(format!("Malformed payment notification: {e}")))?;
    let settlement = transaction::handle_payment_webhook(&state.db, notification, Utc::now()).await?;
    let message = if settlement.changed {
        "Payment recorded"
    } else {
        "Payment already recorded"
    };
    Ok(success(settlement, message))
}
