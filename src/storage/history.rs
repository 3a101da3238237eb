use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use entities::reading_history;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::OnConflict,
};
use uuid::Uuid;

use super::remote::progress_from_row;
use crate::domain::models::{HistoryEntry, NewHistoryEntry};

/// The chapters a signed-in viewer has opened, newest first.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    db: Arc<DatabaseConnection>,
}

impl From<reading_history::Model> for HistoryEntry {
    fn from(row: reading_history::Model) -> Self {
        HistoryEntry {
            progress: progress_from_row(&row),
            id: row.id,
            manga_slug: row.manga_slug,
            manga_title: row.manga_title,
            manga_cover: row.manga_cover,
            chapter_slug: row.chapter_slug,
            chapter_title: row.chapter_title,
            read_at: row.read_at,
        }
    }
}

impl HistoryStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a chapter visit. Revisits refresh the labels and `read_at` on
    /// the existing row and leave its saved progress alone.
    #[tracing::instrument(level = "debug", skip(self, entry), fields(chapter = %entry.chapter_slug))]
    pub async fn add(&self, user_id: Uuid, entry: NewHistoryEntry) -> anyhow::Result<()> {
        let row = reading_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            manga_slug: Set(entry.manga_slug),
            manga_title: Set(entry.manga_title),
            manga_cover: Set(entry.manga_cover),
            chapter_slug: Set(entry.chapter_slug),
            chapter_title: Set(entry.chapter_title),
            scroll_progress: Set(0.0),
            last_image_index: Set(0),
            read_at: Set(Utc::now()),
        };
        reading_history::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    reading_history::Column::UserId,
                    reading_history::Column::MangaSlug,
                    reading_history::Column::ChapterSlug,
                ])
                .update_columns([
                    reading_history::Column::MangaTitle,
                    reading_history::Column::MangaCover,
                    reading_history::Column::ChapterTitle,
                    reading_history::Column::ReadAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .with_context(|| "Failed to record reading history")?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list(&self, user_id: Uuid) -> anyhow::Result<Vec<HistoryEntry>> {
        let rows = reading_history::Entity::find()
            .filter(reading_history::Column::UserId.eq(user_id))
            .order_by_desc(reading_history::Column::ReadAt)
            .all(self.db.as_ref())
            .await
            .with_context(|| "Failed to load reading history")?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    /// Returns whether a row owned by `user_id` was removed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn remove(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = reading_history::Entity::delete_many()
            .filter(reading_history::Column::Id.eq(id))
            .filter(reading_history::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .with_context(|| "Failed to remove reading history entry")?;
        Ok(result.rows_affected > 0)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let result = reading_history::Entity::delete_many()
            .filter(reading_history::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .with_context(|| "Failed to clear reading history")?;
        tracing::info!(user_id = %user_id, removed = result.rows_affected, "cleared reading history");
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::models::ReadingProgress,
        storage::{RemoteProgressStore, remote::{SeaOrmProgressStore, test_db}},
    };

    fn entry(manga: &str, chapter: &str, title: &str) -> NewHistoryEntry {
        NewHistoryEntry {
            manga_slug: manga.into(),
            manga_title: title.into(),
            manga_cover: Some(format!("https://img/{manga}.jpg")),
            chapter_slug: chapter.into(),
            chapter_title: format!("{title} {chapter}"),
        }
    }

    #[tokio::test]
    async fn revisit_refreshes_row_and_keeps_progress() {
        let db = Arc::new(test_db::connect().await);
        let history = HistoryStore::new(db.clone());
        let progress = SeaOrmProgressStore::new(db);
        let user = Uuid::new_v4();

        history.add(user, entry("sl", "sl-1", "Solo Leveling")).await.unwrap();
        progress
            .update(user, "sl-1", ReadingProgress::new(55.0, 9))
            .await
            .unwrap();
        history.add(user, entry("sl", "sl-1", "Solo Leveling Renamed")).await.unwrap();

        let rows = history.list(user).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].manga_title, "Solo Leveling Renamed");
        assert_eq!(rows[0].progress, ReadingProgress::new(55.0, 9));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_per_user() {
        let db = Arc::new(test_db::connect().await);
        let history = HistoryStore::new(db);
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        history.add(user, entry("a", "a-1", "A")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        history.add(user, entry("b", "b-1", "B")).await.unwrap();
        history.add(other, entry("c", "c-1", "C")).await.unwrap();

        let rows = history.list(user).await.unwrap();
        let slugs: Vec<_> = rows.iter().map(|r| r.chapter_slug.as_str()).collect();
        assert_eq!(slugs, vec!["b-1", "a-1"]);

        tokio::time::sleep(Duration::from_millis(5)).await;
        history.add(user, entry("a", "a-1", "A")).await.unwrap();
        let rows = history.list(user).await.unwrap();
        assert_eq!(rows[0].chapter_slug, "a-1");
    }

    #[tokio::test]
    async fn remove_and_clear_only_touch_own_rows() {
        let db = Arc::new(test_db::connect().await);
        let history = HistoryStore::new(db);
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        history.add(user, entry("a", "a-1", "A")).await.unwrap();
        history.add(user, entry("a", "a-2", "A")).await.unwrap();
        history.add(other, entry("a", "a-1", "A")).await.unwrap();

        let theirs = history.list(other).await.unwrap()[0].id;
        assert!(!history.remove(user, theirs).await.unwrap());

        let mine = history.list(user).await.unwrap()[0].id;
        assert!(history.remove(user, mine).await.unwrap());
        assert_eq!(history.list(user).await.unwrap().len(), 1);

        assert_eq!(history.clear(user).await.unwrap(), 1);
        assert!(history.list(user).await.unwrap().is_empty());
        assert_eq!(history.list(other).await.unwrap().len(), 1);
    }
}
