//! Film version entity - A projection format and language of a film.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Film version database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "film_versions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub film_id: i64,
    /// Projection format, e.g. `"2D"`, `"3D"`, `"IMAX"`
    pub format: String,
    /// Audio/subtitle variant, e.g. `"subtitled"`, `"dubbed"`
    pub language: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::film::Entity",
        from = "Column::FilmId",
        to = "super::film::Column::Id"
    )]
    Film,
}

impl Related<super::film::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Film.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
