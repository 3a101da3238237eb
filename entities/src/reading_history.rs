//! One row per chapter a signed-in viewer has opened. The progress columns
//! are written by the chapter reader; everything else by history tracking.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reading_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub manga_slug: String,
    pub manga_title: String,
    pub manga_cover: Option<String>,
    pub chapter_slug: String,
    pub chapter_title: String,
    /// Percentage of the chapter scrolled, 0 - 100
    pub scroll_progress: f64,
    pub last_image_index: i32,
    pub read_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
