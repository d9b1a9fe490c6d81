//! Ticket routes: check-in and refunds.

use crate::{
    api::{
        AppState,
        response::{created, success},
    },
    core::ticket,
    entities::sea_orm_active_enums::RefundStatus,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;

/// Body of `POST /tickets/:id/refund-requests`.
#[derive(Debug, Deserialize)]
pub struct RefundBody {
    pub reason: String,
}

/// `POST /tickets/:id/check-in`
pub async fn check_in(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> Result<Response> {
    let ticket = ticket::check_in_ticket(&state.db, ticket_id).await?;
    Ok(success(ticket, "Ticket checked in"))
}

/// `POST /tickets/:id/refund-requests`
pub async fn request_refund(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    Json(body): Json<RefundBody>,
) -> Result<Response> {
    let request = ticket::request_refund(
        &state.db,
        ticket_id,
        &body.reason,
        state.config.booking.refund_cutoff_hours,
        Utc::now(),
    )
    .await?;
    Ok(created(request, "Refund requested"))
}

/// Optional `?status=` filter for refund listings.
#[derive(Debug, Deserialize)]
pub struct RefundFilter {
    pub status: Option<RefundStatus>,
}

/// `GET /refund-requests`
pub async fn list_refund_requests(
    State(state): State<AppState>,
    Query(filter): Query<RefundFilter>,
) -> Result<Response> {
    let requests = ticket::list_refund_requests(&state.db, filter.status).await?;
    Ok(success(requests, "Refund requests retrieved"))
}

/// `POST /refund-requests/:id/approve` - also frees the seat.
pub async fn approve_refund(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Response> {
    let request = ticket::approve_refund(&state.db, request_id, Utc::now()).await?;
    Ok(success(request, "Refund approved"))
}

/// `POST /refund-requests/:id/reject`
pub async fn reject_refund(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Response> {
    let request = ticket::reject_refund(&state.db, request_id, Utc::now()).await?;
    Ok(success(request, "Refund rejected"))
}
