//! Screening rooms and their seat maps.

use crate::{
    entities::{Room, Seat, room, seat, sea_orm_active_enums::SeatType},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

const MAX_ROWS: i32 = 26;
const MAX_COLUMNS: i32 = 40;

/// Layout used to generate a room's seats.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomLayout {
    pub name: String,
    pub rows: i32,
    pub columns: i32,
    /// Row letters whose seats are VIP
    #[serde(default)]
    pub vip_rows: Vec<String>,
    /// Row letters whose seats are couple seats
    #[serde(default)]
    pub couple_rows: Vec<String>,
}

/// Row letter for a zero-based row index (`0 -> "A"`).
fn row_label(index: i32) -> String {
    // index is bounded by MAX_ROWS, so the cast cannot truncate
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    char::from(b'A' + index as u8).to_string()
}

impl RoomLayout {
    fn seat_type_for(&self, label: &str) -> SeatType {
        if self.couple_rows.iter().any(|r| r.eq_ignore_ascii_case(label)) {
            SeatType::Couple
        } else if self.vip_rows.iter().any(|r| r.eq_ignore_ascii_case(label)) {
            SeatType::Vip
        } else {
            SeatType::Standard
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Room name cannot be empty"));
        }
        if !(1..=MAX_ROWS).contains(&self.rows) {
            return Err(Error::validation(format!(
                "Room must have between 1 and {MAX_ROWS} rows"
            )));
        }
        if !(1..=MAX_COLUMNS).contains(&self.columns) {
            return Err(Error::validation(format!(
                "Room must have between 1 and {MAX_COLUMNS} seats per row"
            )));
        }
        Ok(())
    }
}

/// Creates a room together with its full seat map in one database transaction.
pub async fn create_room(db: &DatabaseConnection, layout: RoomLayout) -> Result<room::Model> {
    layout.validate()?;
    let name = layout.name.trim().to_string();

    let txn = db.begin().await?;

    let existing = Room::find()
        .filter(room::Column::Name.eq(name.as_str()))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(Error::conflict(format!("Room '{name}' already exists")));
    }

    let room = room::ActiveModel {
        name: Set(name),
        rows: Set(layout.rows),
        columns: Set(layout.columns),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for row in 0..layout.rows {
        let label = row_label(row);
        let seat_type = layout.seat_type_for(&label);
        for number in 1..=layout.columns {
            seat::ActiveModel {
                room_id: Set(room.id),
                row_label: Set(label.clone()),
                number: Set(number),
                seat_type: Set(seat_type),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;

    tracing::info!(
        room_id = room.id,
        seats = layout.rows * layout.columns,
        "Room created"
    );
    Ok(room)
}

/// Room by id, `None` if it does not exist.
pub async fn get_room<C>(db: &C, room_id: i64) -> Result<Option<room::Model>>
where
    C: ConnectionTrait,
{
    Room::find_by_id(room_id).one(db).await.map_err(Into::into)
}

/// Seats of a room in row/number order.
pub async fn list_room_seats<C>(db: &C, room_id: i64) -> Result<Vec<seat::Model>>
where
    C: ConnectionTrait,
{
    Seat::find()
        .filter(seat::Column::RoomId.eq(room_id))
        .order_by_asc(seat::Column::RowLabel)
        .order_by_asc(seat::Column::Number)
        .all(db)
        .await
        .map_err(Into::into)
}
