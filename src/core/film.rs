//! Film catalogue business logic - films and their versions.
//!
//! A film's status is a function of its release window and the current date;
//! it is computed on creation and refreshed by the reconciliation job.

use crate::{
    entities::{Film, FilmVersion, film, film_version, sea_orm_active_enums::FilmStatus},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Input for [`create_film`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewFilm {
    pub title: String,
    pub duration_minutes: i32,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Input for [`add_film_version`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewFilmVersion {
    pub format: String,
    pub language: String,
}

/// Status a film should have on `today`.
#[must_use]
pub fn film_status_on(
    release_date: NaiveDate,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
) -> FilmStatus {
    if today < release_date {
        FilmStatus::Upcoming
    } else if end_date.is_some_and(|end| today > end) {
        FilmStatus::Ended
    } else {
        FilmStatus::Showing
    }
}

/// Creates a film after validating its title, running time and release window.
pub async fn create_film<C>(db: &C, input: NewFilm, today: NaiveDate) -> Result<film::Model>
where
    C: ConnectionTrait,
{
    let title = input.title.trim();
    if title.is_empty() {
        return Err(Error::validation("Film title cannot be empty"));
    }
    if input.duration_minutes <= 0 {
        return Err(Error::validation("Film duration must be positive"));
    }
    if input.end_date.is_some_and(|end| end < input.release_date) {
        return Err(Error::validation(
            "Film end date cannot be before its release date",
        ));
    }

    let film = film::ActiveModel {
        title: Set(title.to_string()),
        duration_minutes: Set(input.duration_minutes),
        release_date: Set(input.release_date),
        end_date: Set(input.end_date),
        status: Set(film_status_on(input.release_date, input.end_date, today)),
        ..Default::default()
    };
    let film = film.insert(db).await?;
    tracing::info!(film_id = film.id, title = %film.title, "Film created");
    Ok(film)
}

/// Lists every film, most recent release first.
pub async fn list_films<C>(db: &C) -> Result<Vec<film::Model>>
where
    C: ConnectionTrait,
{
    Film::find()
        .order_by_desc(film::Column::ReleaseDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Film by id, `None` if it does not exist.
pub async fn get_film<C>(db: &C, film_id: i64) -> Result<Option<film::Model>>
where
    C: ConnectionTrait,
{
    Film::find_by_id(film_id).one(db).await.map_err(Into::into)
}

/// Adds a projection format / language variant to an existing film.
pub async fn add_film_version<C>(
    db: &C,
    film_id: i64,
    input: NewFilmVersion,
) -> Result<film_version::Model>
where
    C: ConnectionTrait,
{
    if input.format.trim().is_empty() || input.language.trim().is_empty() {
        return Err(Error::validation(
            "Film version format and language are required",
        ));
    }

    Film::find_by_id(film_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Film", film_id))?;

    let version = film_version::ActiveModel {
        film_id: Set(film_id),
        format: Set(input.format.trim().to_string()),
        language: Set(input.language.trim().to_string()),
        ..Default::default()
    };
    version.insert(db).await.map_err(Into::into)
}

/// Every version of a film.
pub async fn list_film_versions<C>(db: &C, film_id: i64) -> Result<Vec<film_version::Model>>
where
    C: ConnectionTrait,
{
    FilmVersion::find()
        .filter(film_version::Column::FilmId.eq(film_id))
        .all(db)
        .await
        .map_err(Into::into)
}
