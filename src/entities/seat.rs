//! Seat entity - One physical seat in a screening room.

use super::sea_orm_active_enums::SeatType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seat database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub room_id: i64,
    /// Row letter, e.g. `"C"`
    pub row_label: String,
    /// 1-based position within the row
    pub number: i32,
    pub seat_type: SeatType,
}

impl Model {
    /// Human-readable seat label such as `"C7"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{}", self.row_label, self.number)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
