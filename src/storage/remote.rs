use std::sync::Arc;

use anyhow::Context;
use entities::reading_history;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, sea_query::Expr,
};
use uuid::Uuid;

use super::RemoteProgressStore;
use crate::domain::models::ReadingProgress;

/// Progress kept on the viewer's `reading_history` rows.
#[derive(Clone, Debug)]
pub struct SeaOrmProgressStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmProgressStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

pub(crate) fn progress_from_row(row: &reading_history::Model) -> ReadingProgress {
    let index = u32::try_from(row.last_image_index).unwrap_or(0);
    ReadingProgress::new(row.scroll_progress, index)
}

/// Rows are keyed by `(user, manga, chapter)` but progress is addressed by
/// `(user, chapter)`. A chapter slug shared by two manga makes `get` fail
/// rather than pick one, and `update` writes every matching row.
#[async_trait::async_trait]
impl RemoteProgressStore for SeaOrmProgressStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(
        &self,
        user_id: Uuid,
        chapter_id: &str,
    ) -> anyhow::Result<Option<ReadingProgress>> {
        let rows = reading_history::Entity::find()
            .filter(reading_history::Column::UserId.eq(user_id))
            .filter(reading_history::Column::ChapterSlug.eq(chapter_id))
            .limit(2)
            .all(self.db.as_ref())
            .await
            .with_context(|| format!("Failed to load progress for chapter {chapter_id}"))?;
        if rows.len() > 1 {
            anyhow::bail!("Chapter {chapter_id} matches more than one history row");
        }
        Ok(rows.first().map(progress_from_row))
    }

    #[tracing::instrument(level = "debug", skip(self, progress))]
    async fn update(
        &self,
        user_id: Uuid,
        chapter_id: &str,
        progress: ReadingProgress,
    ) -> anyhow::Result<u64> {
        let index = i32::try_from(progress.last_visible_index).unwrap_or(i32::MAX);
        let result = reading_history::Entity::update_many()
            .col_expr(
                reading_history::Column::ScrollProgress,
                Expr::value(progress.scroll_fraction),
            )
            .col_expr(reading_history::Column::LastImageIndex, Expr::value(index))
            .filter(reading_history::Column::UserId.eq(user_id))
            .filter(reading_history::Column::ChapterSlug.eq(chapter_id))
            .exec(self.db.as_ref())
            .await
            .with_context(|| format!("Failed to update progress for chapter {chapter_id}"))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
pub(crate) mod test_db {
    use migration::MigratorTrait;
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};

    /// Fresh in-memory SQLite with all migrations applied. One connection,
    /// since every SQLite memory connection is its own database.
    pub async fn connect() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::models::NewHistoryEntry, storage::history::HistoryStore};

    fn entry(chapter_slug: &str) -> NewHistoryEntry {
        NewHistoryEntry {
            manga_slug: "solo-leveling".into(),
            manga_title: "Solo Leveling".into(),
            manga_cover: None,
            chapter_slug: chapter_slug.into(),
            chapter_title: "Chapter".into(),
        }
    }

    #[tokio::test]
    async fn update_without_row_matches_nothing() {
        let db = Arc::new(test_db::connect().await);
        let store = SeaOrmProgressStore::new(db);
        let user = Uuid::new_v4();

        let matched = store
            .update(user, "ch-7", ReadingProgress::new(33.0, 4))
            .await
            .unwrap();
        assert_eq!(matched, 0);
        assert_eq!(store.get(user, "ch-7").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_lands_on_history_row() {
        let db = Arc::new(test_db::connect().await);
        let history = HistoryStore::new(db.clone());
        let store = SeaOrmProgressStore::new(db);
        let user = Uuid::new_v4();

        history.add(user, entry("ch-7")).await.unwrap();
        assert_eq!(
            store.get(user, "ch-7").await.unwrap(),
            Some(ReadingProgress::new(0.0, 0))
        );

        let matched = store
            .update(user, "ch-7", ReadingProgress::new(33.0, 4))
            .await
            .unwrap();
        assert_eq!(matched, 1);
        assert_eq!(
            store.get(user, "ch-7").await.unwrap(),
            Some(ReadingProgress::new(33.0, 4))
        );
    }

    #[tokio::test]
    async fn rows_are_scoped_per_user() {
        let db = Arc::new(test_db::connect().await);
        let history = HistoryStore::new(db.clone());
        let store = SeaOrmProgressStore::new(db);
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        history.add(owner, entry("ch-7")).await.unwrap();
        let matched = store
            .update(other, "ch-7", ReadingProgress::new(90.0, 30))
            .await
            .unwrap();
        assert_eq!(matched, 0);
        assert_eq!(store.get(other, "ch-7").await.unwrap(), None);
        assert_eq!(
            store.get(owner, "ch-7").await.unwrap(),
            Some(ReadingProgress::new(0.0, 0))
        );
    }

    #[tokio::test]
    async fn chapter_slug_shared_across_manga_is_ambiguous() {
        let db = Arc::new(test_db::connect().await);
        let history = HistoryStore::new(db.clone());
        let store = SeaOrmProgressStore::new(db);
        let user = Uuid::new_v4();

        history.add(user, entry("chapter-1")).await.unwrap();
        history
            .add(
                user,
                NewHistoryEntry {
                    manga_slug: "omniscient-reader".into(),
                    ..entry("chapter-1")
                },
            )
            .await
            .unwrap();

        assert!(store.get(user, "chapter-1").await.is_err());
        let matched = store
            .update(user, "chapter-1", ReadingProgress::new(20.0, 2))
            .await
            .unwrap();
        assert_eq!(matched, 2);
    }
}
