//! Seat maps and short-lived seat holds for a showtime.
//!
//! A hold claims seats for one customer while they pick combos and vouchers.
//! Holds lapse on their own; lapsed holds are treated as available and are
//! swept back to `Available` by the reconciliation job.

use crate::{
    config::PricingConfig,
    core::pricing::ticket_price,
    entities::{
        Seat, Showtime, ShowtimeSeat,
        sea_orm_active_enums::{SeatStatus, SeatType, ShowtimeStatus},
        showtime, showtime_seat,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashSet;

/// One seat of a showtime as shown to a customer.
#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub showtime_seat_id: i64,
    pub seat_id: i64,
    pub label: String,
    pub seat_type: SeatType,
    pub status: SeatStatus,
    pub price: i64,
}

/// Whether `customer_id` may claim this row at `now`.
///
/// Available rows, rows the customer already holds, and rows whose hold has
/// lapsed are claimable. Booked rows never are.
#[must_use]
pub fn is_claimable(row: &showtime_seat::Model, customer_id: &str, now: DateTime<Utc>) -> bool {
    match row.status {
        SeatStatus::Available => true,
        SeatStatus::Held => {
            row.held_by.as_deref() == Some(customer_id)
                || row.held_until.is_none_or(|until| until <= now)
        }
        SeatStatus::Booked => false,
    }
}

/// Rejects empty or duplicated seat selections.
pub(crate) fn ensure_distinct(showtime_seat_ids: &[i64]) -> Result<()> {
    if showtime_seat_ids.is_empty() {
        return Err(Error::validation("At least one seat must be selected"));
    }
    let mut seen = HashSet::with_capacity(showtime_seat_ids.len());
    if let Some(dup) = showtime_seat_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(Error::validation(format!("Seat {dup} was selected twice")));
    }
    Ok(())
}

/// Loads a showtime that can still be sold at `now`.
pub(crate) async fn bookable_showtime<C>(
    db: &C,
    showtime_id: i64,
    now: DateTime<Utc>,
) -> Result<showtime::Model>
where
    C: ConnectionTrait,
{
    let showtime = Showtime::find_by_id(showtime_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Showtime", showtime_id))?;
    if showtime.status != ShowtimeStatus::Scheduled || showtime.start_time <= now {
        return Err(Error::validation(format!(
            "Showtime {showtime_id} is no longer open for booking"
        )));
    }
    Ok(showtime)
}

/// Loads the requested rows and checks each belongs to the showtime and is claimable.
pub(crate) async fn claimable_rows<C>(
    db: &C,
    showtime_id: i64,
    showtime_seat_ids: &[i64],
    customer_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<showtime_seat::Model>>
where
    C: ConnectionTrait,
{
    let rows = ShowtimeSeat::find()
        .filter(showtime_seat::Column::Id.is_in(showtime_seat_ids.iter().copied()))
        .filter(showtime_seat::Column::ShowtimeId.eq(showtime_id))
        .all(db)
        .await?;

    for id in showtime_seat_ids {
        let claimable = rows
            .iter()
            .find(|row| row.id == *id)
            .is_some_and(|row| is_claimable(row, customer_id, now));
        if !claimable {
            return Err(Error::SeatUnavailable {
                showtime_id,
                showtime_seat_id: *id,
            });
        }
    }
    Ok(rows)
}

/// Seat map of a showtime with per-seat prices.
pub async fn showtime_seat_map<C>(
    db: &C,
    showtime_id: i64,
    pricing: &PricingConfig,
    now: DateTime<Utc>,
) -> Result<Vec<SeatView>>
where
    C: ConnectionTrait,
{
    let showtime = Showtime::find_by_id(showtime_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Showtime", showtime_id))?;

    let rows = ShowtimeSeat::find()
        .filter(showtime_seat::Column::ShowtimeId.eq(showtime_id))
        .order_by_asc(showtime_seat::Column::Id)
        .find_also_related(Seat)
        .all(db)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for (row, seat) in rows {
        let seat = seat.ok_or_else(|| Error::not_found("Seat", row.seat_id))?;
        // A lapsed hold reads as available even before the sweep resets it
        let status = if row.status == SeatStatus::Held && is_claimable(&row, "", now) {
            SeatStatus::Available
        } else {
            row.status
        };
        views.push(SeatView {
            showtime_seat_id: row.id,
            seat_id: seat.id,
            label: seat.label(),
            seat_type: seat.seat_type,
            status,
            price: ticket_price(showtime.base_price, seat.seat_type, pricing),
        });
    }
    Ok(views)
}

/// Holds seats for a customer until `now + hold_minutes`.
///
/// # Errors
/// * `Validation` for an empty or duplicated selection or a closed showtime
/// * `SeatUnavailable` if any seat is booked or held by someone else
pub async fn hold_seats(
    db: &DatabaseConnection,
    showtime_id: i64,
    showtime_seat_ids: &[i64],
    customer_id: &str,
    hold_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Vec<showtime_seat::Model>> {
    ensure_distinct(showtime_seat_ids)?;

    let txn = db.begin().await?;
    bookable_showtime(&txn, showtime_id, now).await?;
    let rows = claimable_rows(&txn, showtime_id, showtime_seat_ids, customer_id, now).await?;

    let held_until = now + Duration::minutes(hold_minutes);
    let mut held = Vec::with_capacity(rows.len());
    for row in rows {
        let mut active: showtime_seat::ActiveModel = row.into();
        active.status = Set(SeatStatus::Held);
        active.held_by = Set(Some(customer_id.to_string()));
        active.held_until = Set(Some(held_until));
        held.push(active.update(&txn).await?);
    }

    txn.commit().await?;
    tracing::debug!(showtime_id, customer_id, seats = held.len(), %held_until, "Seats held");
    Ok(held)
}

/// Releases every seat the customer holds for a showtime. Returns the number released.
pub async fn release_holds<C>(db: &C, showtime_id: i64, customer_id: &str) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = ShowtimeSeat::update_many()
        .set(available_seat())
        .filter(showtime_seat::Column::ShowtimeId.eq(showtime_id))
        .filter(showtime_seat::Column::Status.eq(SeatStatus::Held))
        .filter(showtime_seat::Column::HeldBy.eq(customer_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Returns seats whose hold lapsed before `now` to `Available`.
pub async fn release_expired_holds<C>(db: &C, now: DateTime<Utc>) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = ShowtimeSeat::update_many()
        .set(available_seat())
        .filter(showtime_seat::Column::Status.eq(SeatStatus::Held))
        .filter(showtime_seat::Column::HeldUntil.lte(now))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        tracing::info!(released = result.rows_affected, "Released lapsed seat holds");
    }
    Ok(result.rows_affected)
}

/// Partial model resetting a row to a free seat.
pub(crate) fn available_seat() -> showtime_seat::ActiveModel {
    showtime_seat::ActiveModel {
        status: Set(SeatStatus::Available),
        held_by: Set(None),
        held_until: Set(None),
        ..Default::default()
    }
}
