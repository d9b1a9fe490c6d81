//! Pricing - seat, combo and voucher aggregation for an invoice.
//!
//! Everything here is pure: callers load the rows, this module validates the
//! vouchers and sums the amounts. Amounts are integers in the smallest
//! currency unit.

use crate::{
    config::PricingConfig,
    entities::{
        combo, sea_orm_active_enums::{SeatType, VoucherKind}, voucher,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Price of one seat for a showtime.
#[must_use]
pub const fn ticket_price(base_price: i64, seat_type: SeatType, pricing: &PricingConfig) -> i64 {
    match seat_type {
        SeatType::Standard => base_price,
        SeatType::Vip => base_price.saturating_add(pricing.vip_surcharge),
        SeatType::Couple => base_price.saturating_add(pricing.couple_surcharge),
    }
}

/// A combo line as it will be written to the invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboLine {
    pub combo_id: i64,
    pub quantity: i32,
    pub unit_price: i64,
}

impl ComboLine {
    /// Builds a line from the combo row.
    ///
    /// Inactive combos are rejected, as are quantities outside `1..=max_quantity`.
    pub fn new(combo: &combo::Model, quantity: i32, max_quantity: i32) -> Result<Self> {
        if !combo.is_active {
            return Err(Error::validation(format!(
                "Combo '{}' is no longer sold",
                combo.name
            )));
        }
        if quantity <= 0 {
            return Err(Error::validation(format!(
                "Quantity for combo '{}' must be positive",
                combo.name
            )));
        }
        if quantity > max_quantity {
            return Err(Error::validation(format!(
                "At most {max_quantity} of combo '{}' can be ordered at once",
                combo.name
            )));
        }
        Ok(Self {
            combo_id: combo.id,
            quantity,
            unit_price: combo.price,
        })
    }

    /// Unit price times quantity; `InvalidAmount` if that does not fit in an `i64`.
    pub fn line_total(&self) -> Result<i64> {
        self.unit_price
            .checked_mul(i64::from(self.quantity))
            .ok_or(Error::InvalidAmount {
                amount: self.unit_price,
            })
    }
}

/// Discount contributed by one voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedVoucher {
    pub voucher_id: i64,
    pub discount: i64,
}

/// Result of pricing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub vouchers: Vec<AppliedVoucher>,
}

/// Checks that a voucher may be redeemed against `subtotal` at `now`.
pub fn validate_voucher(voucher: &voucher::Model, subtotal: i64, now: DateTime<Utc>) -> Result<()> {
    let reject = |reason: &str| Error::VoucherRejected {
        code: voucher.code.clone(),
        reason: reason.to_string(),
    };

    if !voucher.is_active {
        return Err(reject("voucher is disabled"));
    }
    if now < voucher.starts_at {
        return Err(reject("voucher is not valid yet"));
    }
    if now > voucher.ends_at {
        return Err(reject("voucher has expired"));
    }
    if voucher.remaining <= 0 {
        return Err(reject("voucher has been fully redeemed"));
    }
    if subtotal < voucher.min_order_total {
        return Err(reject(&format!(
            "order total must be at least {}",
            voucher.min_order_total
        )));
    }
    Ok(())
}

/// Discount a single voucher gives on `subtotal`, before the overall cap.
#[must_use]
pub fn voucher_discount(voucher: &voucher::Model, subtotal: i64) -> i64 {
    let raw = match voucher.kind {
        VoucherKind::Percent => i128::from(subtotal) * i128::from(voucher.value) / 100,
        VoucherKind::Fixed => i128::from(voucher.value),
    };
    let capped = voucher
        .max_discount
        .map_or(raw, |max| raw.min(i128::from(max)))
        .clamp(0, i128::from(subtotal.max(0)));
    // clamped into 0..=subtotal above
    i64::try_from(capped).unwrap_or(0)
}

fn add_amount(total: i64, amount: i64) -> Result<i64> {
    total
        .checked_add(amount)
        .ok_or(Error::InvalidAmount { amount: total })
}

/// Sums tickets and combos, then applies every voucher against the subtotal.
///
/// The combined discount never exceeds the subtotal; the last vouchers
/// absorb the cap so the per-voucher rows always add up to `discount`.
///
/// # Errors
/// * `InvalidAmount` if the subtotal overflows
/// * `VoucherRejected` for a voucher that cannot be applied
pub fn price_order(
    ticket_prices: &[i64],
    combos: &[ComboLine],
    vouchers: &[voucher::Model],
    now: DateTime<Utc>,
) -> Result<PriceBreakdown> {
    let mut subtotal: i64 = 0;
    for price in ticket_prices {
        subtotal = add_amount(subtotal, *price)?;
    }
    for line in combos {
        subtotal = add_amount(subtotal, line.line_total()?)?;
    }

    let mut seen = HashSet::new();
    let mut applied = Vec::with_capacity(vouchers.len());
    let mut discount: i64 = 0;
    for voucher in vouchers {
        if !seen.insert(voucher.id) {
            return Err(Error::VoucherRejected {
                code: voucher.code.clone(),
                reason: "voucher applied more than once".to_string(),
            });
        }
        validate_voucher(voucher, subtotal, now)?;

        let amount = voucher_discount(voucher, subtotal).min(subtotal - discount);
        discount += amount;
        applied.push(AppliedVoucher {
            voucher_id: voucher.id,
            discount: amount,
        });
    }

    Ok(PriceBreakdown {
        subtotal,
        discount,
        total: subtotal - discount,
        vouchers: applied,
    })
}
