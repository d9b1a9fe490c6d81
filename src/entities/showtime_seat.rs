//! Showtime seat entity - The bookable unit: one seat for one showtime.
//!
//! `held_by` / `held_until` are only meaningful while `status` is `Held`.

use super::sea_orm_active_enums::SeatStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Showtime seat database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "showtime_seats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub showtime_id: i64,
    pub seat_id: i64,
    pub status: SeatStatus,
    /// Customer holding the seat during selection
    pub held_by: Option<String>,
    /// When the hold lapses
    pub held_until: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::showtime::Entity",
        from = "Column::ShowtimeId",
        to = "super::showtime::Column::Id"
    )]
    Showtime,
    #[sea_orm(
        belongs_to = "super::seat::Entity",
        from = "Column::SeatId",
        to = "super::seat::Column::Id"
    )]
    Seat,
}

impl Related<super::showtime::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Showtime.def()
    }
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
