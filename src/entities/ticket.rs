//! Ticket entity - Admission for one seat of one showtime, issued by an invoice.

use super::sea_orm_active_enums::TicketStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ticket database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub invoice_id: i64,
    pub showtime_seat_id: i64,
    /// Price charged for this seat before vouchers
    pub price: i64,
    pub status: TicketStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id"
    )]
    Invoice,
    #[sea_orm(
        belongs_to = "super::showtime_seat::Entity",
        from = "Column::ShowtimeSeatId",
        to = "super::showtime_seat::Column::Id"
    )]
    ShowtimeSeat,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl Related<super::showtime_seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShowtimeSeat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
