//! Reading-progress core for a manga reader: catalog access, per-viewer
//! history and bookmarks, and the chapter progress tracker.

pub mod auth;
pub mod config;
pub mod content_client;
pub mod domain;
pub mod storage;
pub mod tracker;

pub type ProgressResult<T> = anyhow::Result<T>;
