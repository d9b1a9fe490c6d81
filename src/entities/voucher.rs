//! Voucher entity - Promotion codes applied to invoices.
//!
//! `remaining` counts unused redemptions. It is decremented when an invoice
//! applies the voucher and restored when that invoice is rolled back.

use super::sea_orm_active_enums::VoucherKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Voucher database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Upper-cased redemption code
    #[sea_orm(unique)]
    pub code: String,
    pub kind: VoucherKind,
    /// Percentage (1..=100) or fixed amount depending on `kind`
    pub value: i64,
    /// Upper bound for percentage discounts
    pub max_discount: Option<i64>,
    /// Minimum subtotal required to apply the voucher
    pub min_order_total: i64,
    pub remaining: i32,
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
