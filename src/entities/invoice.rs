//! Invoice entity - A customer order aggregating tickets, combos and vouchers.

use super::sea_orm_active_enums::InvoiceStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub showtime_id: i64,
    /// Tickets plus combos, before vouchers
    pub subtotal: i64,
    /// Sum of voucher discounts, never above `subtotal`
    pub discount: i64,
    /// Amount charged: `subtotal - discount`
    pub total: i64,
    pub status: InvoiceStatus,
    pub created_at: DateTimeUtc,
    pub paid_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::showtime::Entity",
        from = "Column::ShowtimeId",
        to = "super::showtime::Column::Id"
    )]
    Showtime,
    #[sea_orm(has_many = "super::ticket::Entity")]
    Tickets,
    #[sea_orm(has_many = "super::invoice_combo::Entity")]
    InvoiceCombos,
    #[sea_orm(has_many = "super::invoice_voucher::Entity")]
    InvoiceVouchers,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::showtime::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Showtime.def()
    }
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tickets.def()
    }
}

impl Related<super::invoice_combo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceCombos.def()
    }
}

impl Related<super::invoice_voucher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceVouchers.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
