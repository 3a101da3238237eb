// Client for the catalog API serving manga listings, details and chapter pages

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, de::DeserializeOwned};

use crate::domain::{
    mapping,
    models::{Chapter, Genre, Home, MangaDetail, MangaSummary, Paginated},
};

pub const DEFAULT_CONTENT_BASE_URL: &str = "https://www.sankavollerei.com/comic/komikcast";

#[derive(Clone, Debug)]
pub struct ContentClient {
    base_url: String,
    client: reqwest::Client,
}

impl ContentClient {
    /// Create a new client with the given base URL (e.g. "https://example.org/comic/komikcast").
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base_url_str = base_url.into();
        tracing::debug!(base_url = %base_url_str, "creating ContentClient");
        Ok(ContentClient {
            base_url: base_url_str.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Append path segments to the base URL. Each segment is percent-encoded
    /// on its own, so a search query containing `/` stays one segment.
    pub fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid content base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Content base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_envelope<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> anyhow::Result<ApiEnvelope<T>> {
        let url = self.url(segments)?;
        tracing::debug!(%url, "GET content");
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.error_for_status()?;
        let body = status.text().await?;
        let envelope = match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                let snippet_end = body
                    .char_indices()
                    .nth(2000)
                    .map(|(i, _)| i)
                    .unwrap_or(body.len());
                let snippet = &body[..snippet_end];
                tracing::error!(error = %e, %url, body_snippet = %snippet, "failed to parse content response");
                return Err(e.into());
            }
        };
        if !envelope.success {
            anyhow::bail!("Content API returned an unsuccessful response for {}", url);
        }
        Ok(envelope)
    }

    async fn fetch_data<T: DeserializeOwned>(&self, segments: &[&str]) -> anyhow::Result<T> {
        self.fetch_envelope(segments)
            .await?
            .data
            .with_context(|| format!("Content response for /{} has no data", segments.join("/")))
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> anyhow::Result<(Vec<T>, PaginationDto)> {
        let envelope = self.fetch_envelope::<Vec<T>>(segments).await?;
        Ok((
            envelope.data.unwrap_or_default(),
            envelope.pagination.unwrap_or_default(),
        ))
    }

    async fn fetch_manga_page(&self, segments: &[&str]) -> anyhow::Result<Paginated<MangaSummary>> {
        let (items, pagination) = self.fetch_page::<MangaItemDto>(segments).await?;
        Ok(mapping::map_page(items, pagination, mapping::map_manga_item))
    }

    /// GET /home
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn home(&self) -> anyhow::Result<Home> {
        let dto: HomeDto = self.fetch_data(&["home"]).await?;
        Ok(mapping::map_home(dto))
    }

    /// GET /list
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn all_manga(&self) -> anyhow::Result<Vec<MangaSummary>> {
        let items: Vec<MangaItemDto> = self.fetch_data(&["list"]).await?;
        Ok(items.into_iter().map(mapping::map_manga_item).collect())
    }

    /// GET /latest/{page}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn latest(&self, page: u32) -> anyhow::Result<Paginated<MangaSummary>> {
        self.fetch_manga_page(&["latest", &page.to_string()]).await
    }

    /// GET /populer/{page}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn popular(&self, page: u32) -> anyhow::Result<Paginated<MangaSummary>> {
        self.fetch_manga_page(&["populer", &page.to_string()]).await
    }

    /// GET /completed/{page}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn completed(&self, page: u32) -> anyhow::Result<Paginated<MangaSummary>> {
        self.fetch_manga_page(&["completed", &page.to_string()]).await
    }

    /// GET /ongoing/{page}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn ongoing(&self, page: u32) -> anyhow::Result<Paginated<MangaSummary>> {
        self.fetch_manga_page(&["ongoing", &page.to_string()]).await
    }

    /// GET /projects/{page}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn projects(&self, page: u32) -> anyhow::Result<Paginated<MangaSummary>> {
        self.fetch_manga_page(&["projects", &page.to_string()]).await
    }

    /// GET /search/{query}/{page}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search(&self, query: &str, page: u32) -> anyhow::Result<Paginated<MangaSummary>> {
        self.fetch_manga_page(&["search", query, &page.to_string()])
            .await
    }

    /// GET /genres
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn genres(&self) -> anyhow::Result<Vec<Genre>> {
        let genres: Vec<GenreDto> = self.fetch_data(&["genres"]).await?;
        Ok(genres.into_iter().map(mapping::map_genre).collect())
    }

    /// GET /genre/{slug}/{page}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn by_genre(&self, slug: &str, page: u32) -> anyhow::Result<Paginated<MangaSummary>> {
        self.fetch_manga_page(&["genre", slug, &page.to_string()])
            .await
    }

    /// GET /detail/{slug}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn manga_detail(&self, slug: &str) -> anyhow::Result<MangaDetail> {
        let dto: MangaDetailDto = self.fetch_data(&["detail", slug]).await?;
        Ok(mapping::map_detail(dto))
    }

    /// GET /chapter/{slug}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn chapter(&self, slug: &str) -> anyhow::Result<Chapter> {
        let dto: ChapterDto = self.fetch_data(&["chapter", slug]).await?;
        Ok(mapping::map_chapter(slug, dto))
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ApiEnvelope<T> {
    pub creator: Option<String>,
    pub success: bool,
    pub data: Option<T>,
    pub pagination: Option<PaginationDto>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub current_page: u32,
    pub has_next_page: bool,
    pub next_page: Option<u32>,
}

impl Default for PaginationDto {
    fn default() -> Self {
        Self {
            current_page: 1,
            has_next_page: false,
            next_page: None,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MangaItemDto {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub image: String,
    pub chapter: Option<String>,
    pub latest_chapter: Option<String>,
    #[serde(deserialize_with = "crate::content_client::de::string_from_str_or_num", default)]
    pub rating: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ChapterInfoDto {
    pub title: String,
    pub slug: String,
    pub time: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ProjectUpdateDto {
    #[serde(flatten)]
    pub item: MangaItemDto,
    #[serde(default)]
    pub chapters: Vec<ChapterInfoDto>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HomeDto {
    #[serde(default)]
    pub hot_updates: Vec<MangaItemDto>,
    #[serde(default)]
    pub project_updates: Vec<ProjectUpdateDto>,
    #[serde(default)]
    pub latest_releases: Vec<ProjectUpdateDto>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct GenreDto {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MangaDetailDto {
    pub title: String,
    pub native_title: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(deserialize_with = "crate::content_client::de::string_from_str_or_num", default)]
    pub rating: String,
    #[serde(default)]
    pub synopsis: String,
    pub released: Option<String>,
    pub author: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub updated: Option<String>,
    #[serde(default)]
    pub genres: Vec<GenreDto>,
    #[serde(default)]
    pub chapters: Vec<ChapterInfoDto>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDto {
    pub title: Option<String>,
    pub comic_slug: Option<String>,
    #[serde(deserialize_with = "crate::content_client::de::image_urls", default)]
    pub images: Vec<String>,
    pub navigation: Option<ChapterNavigationDto>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterNavigationDto {
    pub prev: Option<String>,
    pub next: Option<String>,
    pub all_chapters: Option<String>,
}

/// Internal serde helpers
pub mod de {
    use serde::{Deserialize, Deserializer};

    /// Accept a rating published either as `"7.5"` or `7.5`; null -> "".
    pub fn string_from_str_or_num<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumOrStr {
            Num(f64),
            Str(String),
        }

        let val: Option<NumOrStr> = Option::deserialize(deserializer)?;
        Ok(match val {
            None => String::new(),
            Some(NumOrStr::Num(n)) => n.to_string(),
            Some(NumOrStr::Str(s)) => s.trim().to_string(),
        })
    }

    /// Chapter pages arrive either as bare URLs or as `{ "image": url }` objects.
    pub fn image_urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Page {
            Url(String),
            Object { image: String },
        }

        let pages: Option<Vec<Page>> = Option::deserialize(deserializer)?;
        Ok(pages
            .unwrap_or_default()
            .into_iter()
            .map(|p| match p {
                Page::Url(url) => url,
                Page::Object { image } => image,
            })
            .filter(|url| !url.trim().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_basic() {
        let c = ContentClient::new("https://example.org/comic/komikcast/").unwrap();
        let url = c.url(&["chapter", "solo-leveling-chapter-12"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/comic/komikcast/chapter/solo-leveling-chapter-12"
        );
    }

    #[test]
    fn build_url_encodes_search_query_as_one_segment() {
        let c = ContentClient::new("https://example.org/comic/komikcast").unwrap();
        let url = c.url(&["search", "one piece/red", "2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/comic/komikcast/search/one%20piece%2Fred/2"
        );
    }

    #[test]
    fn envelope_with_pagination_deserialize() {
        let json = r#"{
            "creator": "someone",
            "success": true,
            "data": [
                { "title": "Solo Leveling", "slug": "solo-leveling", "image": "https://img/sl.jpg", "chapter": "Chapter 200", "rating": "9.1", "type": "Manhwa" },
                { "title": "Tales", "slug": "tales", "image": "https://img/t.jpg", "latestChapter": "Chapter 3", "rating": 7, "type": "Manhua" }
            ],
            "pagination": { "currentPage": 2, "hasNextPage": true, "nextPage": 3 }
        }"#;
        let env: ApiEnvelope<Vec<MangaItemDto>> = serde_json::from_str(json).unwrap();
        assert!(env.success);
        let data = env.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].rating, "9.1");
        assert_eq!(data[1].rating, "7");
        assert_eq!(data[1].latest_chapter.as_deref(), Some("Chapter 3"));
        assert_eq!(
            env.pagination.unwrap(),
            PaginationDto {
                current_page: 2,
                has_next_page: true,
                next_page: Some(3)
            }
        );
    }

    #[test]
    fn unsuccessful_envelope_without_data() {
        let json = r#"{ "creator": "someone", "success": false }"#;
        let env: ApiEnvelope<Vec<MangaItemDto>> = serde_json::from_str(json).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert!(env.pagination.is_none());
    }

    #[test]
    fn chapter_images_accept_strings_and_objects() {
        let json = r#"{
            "title": "Chapter 12",
            "comicSlug": "solo-leveling",
            "images": ["https://img/1.jpg", { "image": "https://img/2.jpg" }, ""],
            "navigation": { "prev": "solo-leveling-chapter-11", "next": null }
        }"#;
        let dto: ChapterDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.images, vec!["https://img/1.jpg", "https://img/2.jpg"]);
        let nav = dto.navigation.unwrap();
        assert_eq!(nav.prev.as_deref(), Some("solo-leveling-chapter-11"));
        assert_eq!(nav.next, None);
    }

    #[test]
    fn detail_deserialize_example() {
        let json = r#"{
            "title": "Solo Leveling",
            "nativeTitle": "나 혼자만 레벨업",
            "image": "https://img/sl.jpg",
            "rating": "9.1",
            "synopsis": "A hunter levels up.",
            "author": "Chugong",
            "status": "Completed",
            "type": "Manhwa",
            "genres": [{ "title": "Action", "slug": "action" }],
            "chapters": [
                { "title": "Chapter 2", "slug": "solo-leveling-chapter-2", "time": "1 day ago" },
                { "title": "Chapter 1", "slug": "solo-leveling-chapter-1", "date": "Jan 1, 2020" }
            ]
        }"#;
        let dto: MangaDetailDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.native_title.as_deref(), Some("나 혼자만 레벨업"));
        assert_eq!(dto.genres[0].slug, "action");
        assert_eq!(dto.chapters.len(), 2);
        assert_eq!(dto.released, None);
    }
}
