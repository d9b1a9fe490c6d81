//! Shared test utilities for the booking service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::{BookingPolicy, PricingConfig},
    core::{
        combo::{self, NewCombo},
        film::{self, NewFilm, NewFilmVersion},
        invoice::{self, Checkout, ComboOrder, NewInvoice},
        room::{self, RoomLayout},
        showtime::{self, NewShowtime},
        voucher::{self, NewVoucher},
    },
    entities::{self, ShowtimeSeat, sea_orm_active_enums::VoucherKind, showtime_seat},
    errors::Result,
    payment_gateway::MockPaymentGateway,
};
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cinema_booking=debug")
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a film that is currently showing.
///
/// # Defaults
/// * `duration_minutes`: 120
/// * `release_date`: 30 days ago, no end date
pub async fn create_test_film(
    db: &DatabaseConnection,
    title: &str,
) -> Result<entities::film::Model> {
    let today = Utc::now().date_naive();
    film::create_film(
        db,
        NewFilm {
            title: title.to_string(),
            duration_minutes: 120,
            release_date: today - Duration::days(30),
            end_date: None,
        },
        today,
    )
    .await
}

/// Creates an active combo.
pub async fn create_test_combo(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
) -> Result<entities::combo::Model> {
    combo::create_combo(
        db,
        NewCombo {
            name: name.to_string(),
            price,
        },
    )
    .await
}

/// Creates a voucher valid right now.
///
/// # Defaults
/// * `quantity`: 5
/// * no minimum order, no discount cap
/// * window: from yesterday to 30 days ahead
pub async fn create_test_voucher(
    db: &DatabaseConnection,
    code: &str,
    kind: VoucherKind,
    value: i64,
) -> Result<entities::voucher::Model> {
    let now = Utc::now();
    voucher::create_voucher(
        db,
        NewVoucher {
            code: code.to_string(),
            kind,
            value,
            max_discount: None,
            min_order_total: 0,
            quantity: 5,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(30),
        },
    )
    .await
}

/// A scheduled showtime ready for booking.
pub struct ShowtimeFixture {
    pub db: DatabaseConnection,
    pub showtime: entities::showtime::Model,
    /// Showtime seat ids in seat map order (A1..A4, B1..B4, C1..C4)
    pub seat_ids: Vec<i64>,
}

/// Sets up a complete booking environment.
///
/// # Defaults
/// * room "Room 1": 3 rows x 4 seats, row B vip, row C couple
/// * film "Dune" (120 minutes), 2D English version
/// * showtime three days from now, base price 90,000
pub async fn setup_showtime() -> Result<ShowtimeFixture> {
    let db = setup_test_db().await?;
    let film = create_test_film(&db, "Dune").await?;
    let version = film::add_film_version(
        &db,
        film.id,
        NewFilmVersion {
            format: "2D".to_string(),
            language: "English".to_string(),
        },
    )
    .await?;
    let room = room::create_room(
        &db,
        RoomLayout {
            name: "Room 1".to_string(),
            rows: 3,
            columns: 4,
            vip_rows: vec!["B".to_string()],
            couple_rows: vec!["C".to_string()],
        },
    )
    .await?;

    let now = Utc::now();
    let showtime = showtime::create_showtime(
        &db,
        NewShowtime {
            film_version_id: version.id,
            room_id: room.id,
            start_time: now + Duration::days(3),
            base_price: 90_000,
        },
        BookingPolicy::default().showtime_turnaround_minutes,
        now,
    )
    .await?;

    let seat_ids = ShowtimeSeat::find()
        .filter(showtime_seat::Column::ShowtimeId.eq(showtime.id))
        .order_by_asc(showtime_seat::Column::Id)
        .all(&db)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    Ok(ShowtimeFixture {
        db,
        showtime,
        seat_ids,
    })
}

/// Books seats for "alice" with no combos or vouchers; the payment stays pending.
pub async fn create_test_invoice(fixture: &ShowtimeFixture, seat_ids: &[i64]) -> Result<Checkout> {
    create_custom_invoice(fixture, "alice", seat_ids, &[], &[]).await
}

/// Books seats with custom customer, `(combo_id, quantity)` lines and vouchers.
pub async fn create_custom_invoice(
    fixture: &ShowtimeFixture,
    customer_id: &str,
    seat_ids: &[i64],
    combos: &[(i64, i32)],
    voucher_ids: &[i64],
) -> Result<Checkout> {
    invoice::create_invoice(
        &fixture.db,
        &MockPaymentGateway::default(),
        NewInvoice {
            customer_id: customer_id.to_string(),
            customer_email: None,
            showtime_id: fixture.showtime.id,
            showtime_seat_ids: seat_ids.to_vec(),
            combos: combos
                .iter()
                .map(|&(combo_id, quantity)| ComboOrder { combo_id, quantity })
                .collect(),
            voucher_ids: voucher_ids.to_vec(),
        },
        &BookingPolicy::default(),
        &PricingConfig::default(),
        Utc::now(),
    )
    .await
}
