use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use entities::bookmark;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SqlErr,
};
use uuid::Uuid;

use crate::domain::models::{Bookmark, NewBookmark};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkOutcome {
    Added,
    AlreadyBookmarked,
}

#[derive(Clone, Debug)]
pub struct BookmarkStore {
    db: Arc<DatabaseConnection>,
}

impl From<bookmark::Model> for Bookmark {
    fn from(row: bookmark::Model) -> Self {
        Bookmark {
            id: row.id,
            manga_slug: row.manga_slug,
            manga_title: row.manga_title,
            manga_cover: row.manga_cover,
            created_at: row.created_at,
        }
    }
}

impl BookmarkStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[tracing::instrument(level = "debug", skip(self, new), fields(manga = %new.manga_slug))]
    pub async fn add(&self, user_id: Uuid, new: NewBookmark) -> anyhow::Result<BookmarkOutcome> {
        let row = bookmark::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            manga_slug: Set(new.manga_slug),
            manga_title: Set(new.manga_title),
            manga_cover: Set(new.manga_cover),
            created_at: Set(Utc::now()),
        };
        match bookmark::Entity::insert(row)
            .exec_without_returning(self.db.as_ref())
            .await
        {
            Ok(_) => Ok(BookmarkOutcome::Added),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!("manga already bookmarked");
                Ok(BookmarkOutcome::AlreadyBookmarked)
            }
            Err(e) => Err(e).with_context(|| "Failed to add bookmark"),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list(&self, user_id: Uuid) -> anyhow::Result<Vec<Bookmark>> {
        let rows = bookmark::Entity::find()
            .filter(bookmark::Column::UserId.eq(user_id))
            .order_by_desc(bookmark::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .with_context(|| "Failed to load bookmarks")?;
        Ok(rows.into_iter().map(Bookmark::from).collect())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn is_bookmarked(&self, user_id: Uuid, manga_slug: &str) -> anyhow::Result<bool> {
        let count = bookmark::Entity::find()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::MangaSlug.eq(manga_slug))
            .count(self.db.as_ref())
            .await
            .with_context(|| "Failed to look up bookmark")?;
        Ok(count > 0)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn remove(&self, user_id: Uuid, manga_slug: &str) -> anyhow::Result<bool> {
        let result = bookmark::Entity::delete_many()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::MangaSlug.eq(manga_slug))
            .exec(self.db.as_ref())
            .await
            .with_context(|| "Failed to remove bookmark")?;
        Ok(result.rows_affected > 0)
    }

    #[tracing::instrument(level = "debug", skip(self, ids), fields(count = ids.len()))]
    pub async fn remove_many(&self, user_id: Uuid, ids: &[Uuid]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = bookmark::Entity::delete_many()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::Id.is_in(ids.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .with_context(|| "Failed to remove bookmarks")?;
        Ok(result.rows_affected)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn remove_all(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let result = bookmark::Entity::delete_many()
            .filter(bookmark::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .with_context(|| "Failed to remove all bookmarks")?;
        Ok(result.rows_affected)
    }
}
