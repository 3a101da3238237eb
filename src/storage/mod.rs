// Persistence seams for reading state; sea-orm and file-backed implementations live alongside

pub mod bookmarks;
pub mod history;
pub mod local;
pub mod remote;

use uuid::Uuid;

use crate::domain::models::ReadingProgress;

/// Per-user progress rows in the hosted database.
#[async_trait::async_trait]
pub trait RemoteProgressStore: Send + Sync {
    async fn get(&self, user_id: Uuid, chapter_id: &str)
    -> anyhow::Result<Option<ReadingProgress>>;

    /// Conditional update on `(user_id, chapter_id)`. Never inserts; returns
    /// the number of rows matched, which is zero when no row exists yet.
    async fn update(
        &self,
        user_id: Uuid,
        chapter_id: &str,
        progress: ReadingProgress,
    ) -> anyhow::Result<u64>;
}

/// A single namespaced string bucket on the device, in the spirit of browser
/// local storage. Values are JSON documents owned by the caller.
pub trait KeyValueBucket: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}
