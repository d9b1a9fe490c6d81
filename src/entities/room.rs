//! Screening room entity.
//!
//! The seat map of a room is generated once at creation from its row and
//! column counts; see `core::catalog::create_room`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Screening room database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    /// Number of seat rows (labelled A, B, ...)
    pub rows: i32,
    /// Seats per row
    pub columns: i32,
    /// Inactive rooms cannot receive new showtimes
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::seat::Entity")]
    Seats,
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
