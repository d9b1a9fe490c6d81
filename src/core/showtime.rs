//! Showtime scheduling.
//!
//! Creating a showtime materialises one showtime-seat row per seat of the
//! room; those rows are what customers hold and book.

use crate::{
    entities::{
        Film, FilmVersion, Invoice, Room, Seat, Showtime, ShowtimeSeat, invoice, seat,
        sea_orm_active_enums::{InvoiceStatus, SeatStatus, ShowtimeStatus},
        showtime, showtime_seat,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Input for [`create_showtime`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewShowtime {
    pub film_version_id: i64,
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    pub base_price: i64,
}

/// Whether `[a_start, a_end + gap)` and `[b_start, b_end + gap)` intersect.
fn overlaps(
    a: (DateTime<Utc>, DateTime<Utc>),
    b: (DateTime<Utc>, DateTime<Utc>),
    gap: Duration,
) -> bool {
    a.0 < b.1 + gap && b.0 < a.1 + gap
}

/// Schedules a screening and creates its showtime seats.
///
/// # Errors
/// * `NotFound` if the film version, its film or the room does not exist
/// * `Validation` if the room is inactive, the start is not in the future or the price is not positive
/// * `Conflict` if another screening occupies the room (turnaround gap included)
pub async fn create_showtime(
    db: &DatabaseConnection,
    input: NewShowtime,
    turnaround_minutes: i64,
    now: DateTime<Utc>,
) -> Result<showtime::Model> {
    if input.base_price <= 0 {
        return Err(Error::InvalidAmount {
            amount: input.base_price,
        });
    }
    if input.start_time <= now {
        return Err(Error::validation("Showtime must start in the future"));
    }

    let txn = db.begin().await?;

    let version = FilmVersion::find_by_id(input.film_version_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Film version", input.film_version_id))?;
    let film = Film::find_by_id(version.film_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Film", version.film_id))?;
    let room = Room::find_by_id(input.room_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Room", input.room_id))?;
    if !room.is_active {
        return Err(Error::validation(format!("Room '{}' is not active", room.name)));
    }

    let end_time = input.start_time + Duration::minutes(i64::from(film.duration_minutes));
    let gap = Duration::minutes(turnaround_minutes);

    let scheduled = Showtime::find()
        .filter(showtime::Column::RoomId.eq(room.id))
        .filter(showtime::Column::Status.ne(ShowtimeStatus::Cancelled))
        .all(&txn)
        .await?;
    if let Some(clash) = scheduled
        .iter()
        .find(|s| overlaps((input.start_time, end_time), (s.start_time, s.end_time), gap))
    {
        return Err(Error::conflict(format!(
            "Room '{}' is already booked by showtime {} ({} - {})",
            room.name, clash.id, clash.start_time, clash.end_time
        )));
    }

    let showtime = showtime::ActiveModel {
        film_version_id: Set(version.id),
        room_id: Set(room.id),
        start_time: Set(input.start_time),
        end_time: Set(end_time),
        base_price: Set(input.base_price),
        status: Set(ShowtimeStatus::Scheduled),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let seats = Seat::find()
        .filter(seat::Column::RoomId.eq(room.id))
        .order_by_asc(seat::Column::Id)
        .all(&txn)
        .await?;
    for seat in &seats {
        showtime_seat::ActiveModel {
            showtime_id: Set(showtime.id),
            seat_id: Set(seat.id),
            status: Set(SeatStatus::Available),
            held_by: Set(None),
            held_until: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        showtime_id = showtime.id,
        room_id = room.id,
        film = %film.title,
        seats = seats.len(),
        "Showtime scheduled"
    );
    Ok(showtime)
}

/// Showtime by id, `None` if it does not exist.
pub async fn get_showtime<C>(db: &C, showtime_id: i64) -> Result<Option<showtime::Model>>
where
    C: ConnectionTrait,
{
    Showtime::find_by_id(showtime_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Upcoming screenings of one film version, soonest first.
pub async fn list_showtimes_for_version<C>(
    db: &C,
    film_version_id: i64,
) -> Result<Vec<showtime::Model>>
where
    C: ConnectionTrait,
{
    Showtime::find()
        .filter(showtime::Column::FilmVersionId.eq(film_version_id))
        .filter(showtime::Column::Status.eq(ShowtimeStatus::Scheduled))
        .order_by_asc(showtime::Column::StartTime)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cancels a screening that nobody has paid for or is paying for.
pub async fn cancel_showtime(db: &DatabaseConnection, showtime_id: i64) -> Result<showtime::Model> {
    let txn = db.begin().await?;

    let showtime = Showtime::find_by_id(showtime_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Showtime", showtime_id))?;
    if showtime.status != ShowtimeStatus::Scheduled {
        return Err(Error::InvalidTransition {
            entity: "Showtime",
            from: showtime.status.to_value(),
            to: ShowtimeStatus::Cancelled.to_value(),
        });
    }

    let open_invoices = Invoice::find()
        .filter(invoice::Column::ShowtimeId.eq(showtime_id))
        .filter(invoice::Column::Status.is_in([InvoiceStatus::Pending, InvoiceStatus::Paid]))
        .count(&txn)
        .await?;
    if open_invoices > 0 {
        return Err(Error::conflict(format!(
            "Showtime {showtime_id} has {open_invoices} open invoice(s)"
        )));
    }

    let mut active: showtime::ActiveModel = showtime.into();
    active.status = Set(ShowtimeStatus::Cancelled);
    let showtime = active.update(&txn).await?;

    ShowtimeSeat::update_many()
        .set(showtime_seat::ActiveModel {
            status: Set(SeatStatus::Available),
            held_by: Set(None),
            held_until: Set(None),
            ..Default::default()
        })
        .filter(showtime_seat::Column::ShowtimeId.eq(showtime_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    tracing::info!(showtime_id, "Showtime cancelled");
    Ok(showtime)
}
