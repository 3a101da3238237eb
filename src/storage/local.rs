//! Device-local reading positions for anonymous viewers.
//!
//! All positions live under one bucket key as a single JSON object mapping
//! chapter slug to progress. Every write rewrites the whole object.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context;

use super::KeyValueBucket;
use crate::domain::models::ReadingProgress;

pub const LOCAL_PROGRESS_KEY: &str = "reading-progress";
pub const LOCAL_PROGRESS_CAP: usize = 100;

pub struct LocalProgressStore {
    bucket: Arc<dyn KeyValueBucket>,
    // Serializes read-modify-write cycles from concurrent trackers.
    write_lock: Mutex<()>,
}

impl LocalProgressStore {
    pub fn new(bucket: Arc<dyn KeyValueBucket>) -> Self {
        Self {
            bucket,
            write_lock: Mutex::new(()),
        }
    }

    /// Missing, unreadable or corrupt data all read as an empty collection.
    fn read_all(&self) -> BTreeMap<String, ReadingProgress> {
        let raw = match self.bucket.get(LOCAL_PROGRESS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "local progress bucket unreadable, treating as empty");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "local progress data corrupt, treating as empty");
            BTreeMap::new()
        })
    }

    pub fn get(&self, chapter_id: &str) -> Option<ReadingProgress> {
        self.read_all().get(chapter_id).copied()
    }

    pub fn len(&self) -> usize {
        self.read_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upsert one chapter's position. Past the cap only the most advanced
    /// positions survive, whatever their age.
    #[tracing::instrument(level = "debug", skip(self, progress))]
    pub fn set(&self, chapter_id: &str, progress: ReadingProgress) -> anyhow::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut all = self.read_all();
        all.insert(chapter_id.to_string(), progress);

        if all.len() > LOCAL_PROGRESS_CAP {
            let mut ranked: Vec<_> = all.into_iter().collect();
            ranked.sort_by(|a, b| b.1.scroll_fraction.total_cmp(&a.1.scroll_fraction));
            let evicted = ranked.len() - LOCAL_PROGRESS_CAP;
            ranked.truncate(LOCAL_PROGRESS_CAP);
            tracing::debug!(evicted, "local progress over capacity, dropped least advanced");
            all = ranked.into_iter().collect();
        }

        let json = serde_json::to_string(&all)?;
        self.bucket
            .set(LOCAL_PROGRESS_KEY, &json)
            .with_context(|| "Failed to write local reading progress")
    }
}

/// Bucket backed by one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBucket {
    dir: PathBuf,
}

impl FileBucket {
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create local store directory {}", dir.display()))?;
        tracing::debug!(dir = %dir.display(), "opened local bucket");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            anyhow::bail!("Invalid bucket key: {:?}", key);
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueBucket for FileBucket {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        // Write then rename so a crash never leaves a half-written document.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))
    }
}

/// Process-lifetime bucket, for sessions that must not touch the disk.
#[derive(Debug, Default)]
pub struct MemoryBucket {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBucket for MemoryBucket {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
