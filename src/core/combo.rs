//! Combo business logic - concession bundles sold alongside tickets.

use crate::{
    entities::{Combo, combo},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Input for [`create_combo`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCombo {
    pub name: String,
    pub price: i64,
}

/// Creates an active combo after validating its name and price.
///
/// # Errors
/// Returns an error if the name is empty, the price is not positive, or the insert fails.
pub async fn create_combo<C>(db: &C, input: NewCombo) -> Result<combo::Model>
where
    C: ConnectionTrait,
{
    if input.name.trim().is_empty() {
        return Err(Error::validation("Combo name cannot be empty"));
    }
    if input.price <= 0 {
        return Err(Error::InvalidAmount {
            amount: input.price,
        });
    }

    combo::ActiveModel {
        name: Set(input.name.trim().to_string()),
        price: Set(input.price),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Combos currently on sale, ordered alphabetically.
pub async fn list_active_combos<C>(db: &C) -> Result<Vec<combo::Model>>
where
    C: ConnectionTrait,
{
    Combo::find()
        .filter(combo::Column::IsActive.eq(true))
        .order_by_asc(combo::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Takes a combo off sale or puts it back. Past invoices keep their price.
pub async fn set_combo_active<C>(db: &C, combo_id: i64, is_active: bool) -> Result<combo::Model>
where
    C: ConnectionTrait,
{
    let mut combo: combo::ActiveModel = Combo::find_by_id(combo_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Combo", combo_id))?
        .into();
    combo.is_active = Set(is_active);
    combo.update(db).await.map_err(Into::into)
}
