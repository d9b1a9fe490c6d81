//! Showtime entity - A scheduled screening of a film version in a room.

use super::sea_orm_active_enums::ShowtimeStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Showtime database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "showtimes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub film_version_id: i64,
    pub room_id: i64,
    pub start_time: DateTimeUtc,
    /// `start_time` plus the film's running time
    pub end_time: DateTimeUtc,
    /// Price of a standard seat; seat-type surcharges are added on top
    pub base_price: i64,
    pub status: ShowtimeStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::film_version::Entity",
        from = "Column::FilmVersionId",
        to = "super::film_version::Column::Id"
    )]
    FilmVersion,
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
    #[sea_orm(has_many = "super::showtime_seat::Entity")]
    ShowtimeSeats,
}

impl Related<super::film_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FilmVersion.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl Related<super::showtime_seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShowtimeSeats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
