//! Catalogue routes: films, rooms, showtimes, combos and vouchers.

use crate::{
    api::{
        AppState,
        response::{created, success},
    },
    core::{
        combo::{self, NewCombo},
        film::{self, NewFilm, NewFilmVersion},
        room::{self, RoomLayout},
        seats,
        showtime::{self, NewShowtime},
        voucher::{self, NewVoucher},
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct FilmDetails {
    film: crate::entities::FilmModel,
    versions: Vec<crate::entities::FilmVersionModel>,
}

/// `GET /films`
pub async fn list_films(State(state): State<AppState>) -> Result<Response> {
    let films = film::list_films(&state.db).await?;
    Ok(success(films, "Films retrieved"))
}

/// `POST /films`
pub async fn create_film(
    State(state): State<AppState>,
    Json(input): Json<NewFilm>,
) -> Result<Response> {
    let film = film::create_film(&state.db, input, Utc::now().date_naive()).await?;
    Ok(created(film, "Film created"))
}

/// `GET /films/:id` - the film with its versions.
pub async fn get_film(
    State(state): State<AppState>,
    Path(film_id): Path<i64>,
) -> Result<Response> {
    let film = film::get_film(&state.db, film_id)
        .await?
        .ok_or_else(|| Error::not_found("Film", film_id))?;
    let versions = film::list_film_versions(&state.db, film_id).await?;
    Ok(success(FilmDetails { film, versions }, "Film retrieved"))
}

/// `POST /films/:id/versions`
pub async fn add_film_version(
    State(state): State<AppState>,
    Path(film_id): Path<i64>,
    Json(input): Json<NewFilmVersion>,
) -> Result<Response> {
    let version = film::add_film_version(&state.db, film_id, input).await?;
    Ok(created(version, "Film version added"))
}

/// `POST /rooms` - creates the room and its seat grid.
pub async fn create_room(
    State(state): State<AppState>,
    Json(layout): Json<RoomLayout>,
) -> Result<Response> {
    let room = room::create_room(&state.db, layout).await?;
    Ok(created(room, "Room created"))
}

/// `GET /rooms/:id/seats`
pub async fn list_room_seats(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Response> {
    room::get_room(&state.db, room_id)
        .await?
        .ok_or_else(|| Error::not_found("Room", room_id))?;
    let seats = room::list_room_seats(&state.db, room_id).await?;
    Ok(success(seats, "Seats retrieved"))
}

/// `POST /showtimes`
pub async fn create_showtime(
    State(state): State<AppState>,
    Json(input): Json<NewShowtime>,
) -> Result<Response> {
    let showtime = showtime::create_showtime(
        &state.db,
        input,
        state.config.booking.showtime_turnaround_minutes,
        Utc::now(),
    )
    .await?;
    Ok(created(showtime, "Showtime scheduled"))
}

/// `GET /showtimes/:id`
pub async fn get_showtime(
    State(state): State<AppState>,
    Path(showtime_id): Path<i64>,
) -> Result<Response> {
    let showtime = showtime::get_showtime(&state.db, showtime_id)
        .await?
        .ok_or_else(|| Error::not_found("Showtime", showtime_id))?;
    Ok(success(showtime, "Showtime retrieved"))
}

/// `GET /film-versions/:id/showtimes`
pub async fn list_version_showtimes(
    State(state): State<AppState>,
    Path(film_version_id): Path<i64>,
) -> Result<Response> {
    let showtimes = showtime::list_showtimes_for_version(&state.db, film_version_id).await?;
    Ok(success(showtimes, "Showtimes retrieved"))
}

/// `POST /showtimes/:id/cancel`
pub async fn cancel_showtime(
    State(state): State<AppState>,
    Path(showtime_id): Path<i64>,
) -> Result<Response> {
    let showtime = showtime::cancel_showtime(&state.db, showtime_id).await?;
    Ok(success(showtime, "Showtime cancelled"))
}

/// `GET /showtimes/:id/seats` - seat map with live status and prices.
pub async fn showtime_seat_map(
    State(state): State<AppState>,
    Path(showtime_id): Path<i64>,
) -> Result<Response> {
    let map =
        seats::showtime_seat_map(&state.db, showtime_id, &state.config.pricing, Utc::now()).await?;
    Ok(success(map, "Seat map retrieved"))
}

/// `GET /combos` - combos currently on sale.
pub async fn list_combos(State(state): State<AppState>) -> Result<Response> {
    let combos = combo::list_active_combos(&state.db).await?;
    Ok(success(combos, "Combos retrieved"))
}

/// `POST /combos`
pub async fn create_combo(
    State(state): State<AppState>,
    Json(input): Json<NewCombo>,
) -> Result<Response> {
    let combo = combo::create_combo(&state.db, input).await?;
    Ok(created(combo, "Combo created"))
}

/// Body of `POST /combos/:id/active`.
#[derive(Debug, Deserialize)]
pub struct ComboAvailability {
    pub is_active: bool,
}

/// `POST /combos/:id/active`
pub async fn set_combo_active(
    State(state): State<AppState>,
    Path(combo_id): Path<i64>,
    Json(body): Json<ComboAvailability>,
) -> Result<Response> {
    let combo = combo::set_combo_active(&state.db, combo_id, body.is_active).await?;
    Ok(success(combo, "Combo updated"))
}

/// `POST /vouchers`
pub async fn create_voucher(
    State(state): State<AppState>,
    Json(input): Json<NewVoucher>,
) -> Result<Response> {
    let voucher = voucher::create_voucher(&state.db, input).await?;
    Ok(created(voucher, "Voucher created"))
}

/// `GET /vouchers/:code`
pub async fn get_voucher(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response> {
    let voucher = voucher::get_voucher_by_code(&state.db, &code)
        .await?
        .ok_or_else(|| Error::not_found("Voucher", &code))?;
    Ok(success(voucher, "Voucher retrieved"))
}
