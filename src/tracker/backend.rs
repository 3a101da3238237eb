use std::{fmt, sync::Arc};

use anyhow::Context;
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::{
    auth::AuthContext,
    domain::models::ReadingProgress,
    storage::{RemoteProgressStore, local::LocalProgressStore},
};

/// Where one reading session keeps its progress. Chosen once from the
/// session's identity so callers never branch on sign-in state themselves.
#[derive(Clone)]
pub enum ProgressBackend {
    Local(Arc<LocalProgressStore>),
    Remote {
        store: Arc<dyn RemoteProgressStore>,
        user_id: Uuid,
    },
}

impl fmt::Debug for ProgressBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressBackend::Local(_) => f.write_str("ProgressBackend::Local"),
            ProgressBackend::Remote { user_id, .. } => f
                .debug_struct("ProgressBackend::Remote")
                .field("user_id", user_id)
                .finish(),
        }
    }
}

/// Run local bucket I/O off the async workers; inline when there is no runtime.
async fn run_blocking<T, F>(work: F) -> anyhow::Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(runtime) => runtime
            .spawn_blocking(work)
            .await
            .with_context(|| "Local progress task failed"),
        Err(_) => Ok(work()),
    }
}

impl ProgressBackend {
    pub fn select(
        auth: &AuthContext,
        local: Arc<LocalProgressStore>,
        remote: Arc<dyn RemoteProgressStore>,
    ) -> Self {
        match auth.viewer_id() {
            Some(user_id) => ProgressBackend::Remote {
                store: remote,
                user_id,
            },
            None => ProgressBackend::Local(local),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProgressBackend::Local(_) => "local",
            ProgressBackend::Remote { .. } => "remote",
        }
    }

    pub async fn load(&self, chapter_id: &str) -> anyhow::Result<Option<ReadingProgress>> {
        match self {
            ProgressBackend::Local(store) => {
                let store = Arc::clone(store);
                let chapter_id = chapter_id.to_string();
                run_blocking(move || store.get(&chapter_id)).await
            }
            ProgressBackend::Remote { store, user_id } => store.get(*user_id, chapter_id).await,
        }
    }

    pub async fn save(&self, chapter_id: &str, progress: ReadingProgress) -> anyhow::Result<()> {
        match self {
            ProgressBackend::Local(store) => {
                let store = Arc::clone(store);
                let chapter_id = chapter_id.to_string();
                run_blocking(move || store.set(&chapter_id, progress)).await?
            }
            ProgressBackend::Remote { store, user_id } => {
                let matched = store.update(*user_id, chapter_id, progress).await?;
                if matched == 0 {
                    // Updates never insert; the row is created by history tracking.
                    tracing::debug!(%chapter_id, user_id = %user_id, "no progress row matched, progress not stored");
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::local::FileBucket;

    struct NoRemote;

    #[async_trait::async_trait]
    impl RemoteProgressStore for NoRemote {
        async fn get(&self, _: Uuid, _: &str) -> anyhow::Result<Option<ReadingProgress>> {
            anyhow::bail!("remote store used for an anonymous viewer")
        }

        async fn update(&self, _: Uuid, _: &str, _: ReadingProgress) -> anyhow::Result<u64> {
            anyhow::bail!("remote store used for an anonymous viewer")
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn local_file_io_runs_on_blocking_pool() {
        let dir = std::env::temp_dir().join(format!("chapter-progress-{}", Uuid::new_v4()));
        let local = Arc::new(LocalProgressStore::new(Arc::new(FileBucket::open(&dir).unwrap())));
        let backend = ProgressBackend::select(&AuthContext::anonymous(), local, Arc::new(NoRemote));
        assert_eq!(backend.kind(), "local");

        backend
            .save("ch-3", ReadingProgress::new(63.5, 11))
            .await
            .unwrap();
        assert_eq!(
            backend.load("ch-3").await.unwrap(),
            Some(ReadingProgress::new(63.5, 11))
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
