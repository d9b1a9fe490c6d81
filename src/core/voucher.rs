//! Voucher business logic - creation and lookup of promotion codes.
//!
//! Redemption itself happens inside invoice creation (see `core::pricing`
//! for the rules and `core::invoice` for the bookkeeping).

use crate::{
    entities::{Voucher, sea_orm_active_enums::VoucherKind, voucher},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*, sea_query::Expr};
use serde::Deserialize;

/// Input for [`create_voucher`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewVoucher {
    pub code: String,
    pub kind: VoucherKind,
    pub value: i64,
    #[serde(default)]
    pub max_discount: Option<i64>,
    #[serde(default)]
    pub min_order_total: i64,
    pub quantity: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Creates an active voucher.
///
/// # Errors
/// * `Validation` for an empty code, out-of-range value, non-positive quantity or empty window
/// * `Conflict` if the code is taken
pub async fn create_voucher<C>(db: &C, input: NewVoucher) -> Result<voucher::Model>
where
    C: ConnectionTrait,
{
    let code = normalize_code(&input.code);
    if code.is_empty() {
        return Err(Error::validation("Voucher code cannot be empty"));
    }
    match input.kind {
        VoucherKind::Percent if !(1..=100).contains(&input.value) => {
            return Err(Error::validation(
                "Percentage vouchers must be between 1 and 100",
            ));
        }
        VoucherKind::Fixed if input.value <= 0 => {
            return Err(Error::InvalidAmount {
                amount: input.value,
            });
        }
        _ => {}
    }
    if input.max_discount.is_some_and(|max| max <= 0) || input.min_order_total < 0 {
        return Err(Error::validation(
            "Voucher limits must be positive amounts",
        ));
    }
    if input.quantity <= 0 {
        return Err(Error::validation("Voucher quantity must be positive"));
    }
    if input.starts_at >= input.ends_at {
        return Err(Error::validation("Voucher must start before it ends"));
    }

    if get_voucher_by_code(db, &code).await?.is_some() {
        return Err(Error::conflict(format!("Voucher '{code}' already exists")));
    }

    let voucher = voucher::ActiveModel {
        code: Set(code),
        kind: Set(input.kind),
        value: Set(input.value),
        max_discount: Set(input.max_discount),
        min_order_total: Set(input.min_order_total),
        remaining: Set(input.quantity),
        starts_at: Set(input.starts_at),
        ends_at: Set(input.ends_at),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(voucher_id = voucher.id, code = %voucher.code, "Voucher created");
    Ok(voucher)
}

/// Looks a voucher up by code, case-insensitively.
pub async fn get_voucher_by_code<C>(db: &C, code: &str) -> Result<Option<voucher::Model>>
where
    C: ConnectionTrait,
{
    Voucher::find()
        .filter(voucher::Column::Code.eq(normalize_code(code)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Atomically consumes one redemption. Returns `false` if none were left.
pub(crate) async fn consume_redemption<C>(db: &C, voucher_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Voucher::update_many()
        .col_expr(
            voucher::Column::Remaining,
            Expr::col(voucher::Column::Remaining).sub(1),
        )
        .filter(voucher::Column::Id.eq(voucher_id))
        .filter(voucher::Column::Remaining.gt(0))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Gives back one redemption consumed by a rolled-back invoice.
pub(crate) async fn restore_redemption<C>(db: &C, voucher_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Voucher::update_many()
        .col_expr(
            voucher::Column::Remaining,
            Expr::col(voucher::Column::Remaining).add(1),
        )
        .filter(voucher::Column::Id.eq(voucher_id))
        .exec(db)
        .await?;
    Ok(())
}
