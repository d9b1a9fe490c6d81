//! Transaction entity - A payment attempt for an invoice.
//!
//! Each transaction carries a unique `reference` that is handed to the
//! payment provider and echoed back in its webhook callbacks.
use super::sea_orm_active_enums::TransactionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub invoice_id: i64,
    #[sea_orm(unique)]
    pub reference: String,
    pub amount: i64,
    pub status: TransactionStatus,
    /// Hosted checkout page the customer is sent to
    pub payment_url: Option<String>,
    /// Provider-side identifier reported by the webhook
    pub provider_transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id"
    )]
    Invoice,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
