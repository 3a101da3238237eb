// Domain models the reader works with, independent of the catalog API's wire shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How far into a chapter's page sequence a viewer has scrolled.
///
/// Serialized with the field names the device-local store has always used,
/// so previously saved positions keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredProgress")]
pub struct ReadingProgress {
    /// 0.0 - 100.0 percentage of the scrollable height
    #[serde(rename = "scrollProgress")]
    pub scroll_fraction: f64,
    #[serde(rename = "lastImageIndex")]
    pub last_visible_index: u32,
}

/// Wire shape of [`ReadingProgress`]; stored values go back through
/// [`ReadingProgress::new`] on load.
#[derive(Deserialize)]
struct StoredProgress {
    #[serde(rename = "scrollProgress")]
    scroll_fraction: f64,
    #[serde(rename = "lastImageIndex")]
    last_visible_index: u32,
}

impl From<StoredProgress> for ReadingProgress {
    fn from(stored: StoredProgress) -> Self {
        ReadingProgress::new(stored.scroll_fraction, stored.last_visible_index)
    }
}

impl ReadingProgress {
    /// Build a progress value, clamping the fraction into `[0, 100]`.
    /// Non-finite fractions collapse to zero.
    pub fn new(scroll_fraction: f64, last_visible_index: u32) -> Self {
        let scroll_fraction = if scroll_fraction.is_finite() {
            scroll_fraction.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            scroll_fraction,
            last_visible_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MangaKind {
    Manga,
    Manhwa,
    Manhua,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MangaSummary {
    pub title: String,
    pub slug: String,
    pub cover_url: String,
    pub latest_chapter: Option<String>,
    pub rating: String,
    pub kind: MangaKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRef {
    pub title: String,
    pub slug: String,
    /// Free-form release label as published ("2 hours ago", "Oct 12, 2025")
    pub released: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectUpdate {
    pub manga: MangaSummary,
    pub chapters: Vec<ChapterRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Home {
    pub hot_updates: Vec<MangaSummary>,
    pub project_updates: Vec<ProjectUpdate>,
    pub latest_releases: Vec<ProjectUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MangaDetail {
    pub title: String,
    pub native_title: Option<String>,
    pub cover_url: String,
    pub rating: String,
    pub synopsis: String,
    pub released: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    pub kind: MangaKind,
    pub updated: Option<String>,
    pub genres: Vec<Genre>,
    pub chapters: Vec<ChapterRef>,
}

/// One ordered sequence of page images plus its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub slug: String,
    pub title: String,
    pub images: Vec<String>,
    pub prev_chapter: Option<String>,
    pub next_chapter: Option<String>,
    pub manga_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub has_next_page: bool,
    pub next_page: Option<u32>,
}

/// What the reader knows about a chapter when it records a visit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub manga_slug: String,
    pub manga_title: String,
    pub manga_cover: Option<String>,
    pub chapter_slug: String,
    pub chapter_title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub manga_slug: String,
    pub manga_title: String,
    pub manga_cover: Option<String>,
    pub chapter_slug: String,
    pub chapter_title: String,
    pub progress: ReadingProgress,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBookmark {
    pub manga_slug: String,
    pub manga_title: String,
    pub manga_cover: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub id: Uuid,
    pub manga_slug: String,
    pub manga_title: String,
    pub manga_cover: Option<String>,
    pub created_at: DateTime<Utc>,
}
