//! Film entity - A title in the cinema catalogue.
//!
//! The `status` column is derived from `release_date` / `end_date` and kept
//! current by the status reconciliation job.

use super::sea_orm_active_enums::FilmStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Film database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "films")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title
    pub title: String,
    /// Running time, used to compute showtime end times
    pub duration_minutes: i32,
    /// First day the film can be shown
    pub release_date: Date,
    /// Last day the film is shown, open-ended when `None`
    pub end_date: Option<Date>,
    pub status: FilmStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One film has many versions (2D, 3D, dubbed, ...)
    #[sea_orm(has_many = "super::film_version::Entity")]
    FilmVersions,
}

impl Related<super::film_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FilmVersions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
