// Mapping from catalog API DTOs to domain models

use super::models::{
    Chapter, ChapterRef, Genre, Home, MangaDetail, MangaKind, MangaSummary, Paginated,
    ProjectUpdate,
};
use crate::content_client::{
    ChapterDto, ChapterInfoDto, GenreDto, HomeDto, MangaDetailDto, MangaItemDto, PaginationDto,
    ProjectUpdateDto,
};

impl MangaKind {
    /// Unknown labels fall back to `Manga`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "manhwa" => MangaKind::Manhwa,
            "manhua" => MangaKind::Manhua,
            _ => MangaKind::Manga,
        }
    }
}

/// Chapter titles from the catalog sometimes carry hard line breaks.
pub fn clean_chapter_title(title: &str) -> String {
    title.replace('\n', " ").trim().to_string()
}

/// Title shown when the API omits one: the slug with dashes as spaces and the
/// "bahasa indonesia" suffix dropped.
pub fn title_from_slug(slug: &str) -> String {
    const LANGUAGE_SUFFIX: &str = "bahasa indonesia";

    let spaced = slug.replace('-', " ");
    let lower = spaced.to_ascii_lowercase();
    let mut title = String::with_capacity(spaced.len());
    let mut rest = 0;
    // ASCII lowercasing keeps byte offsets aligned with `spaced`.
    for (start, _) in lower.match_indices(LANGUAGE_SUFFIX) {
        if start >= rest {
            title.push_str(&spaced[rest..start]);
            rest = start + LANGUAGE_SUFFIX.len();
        }
    }
    title.push_str(&spaced[rest..]);
    title.trim().to_string()
}

pub fn map_manga_item(item: MangaItemDto) -> MangaSummary {
    MangaSummary {
        kind: MangaKind::from_label(&item.kind),
        latest_chapter: item.latest_chapter.or(item.chapter),
        title: item.title,
        slug: item.slug,
        cover_url: item.image,
        rating: item.rating,
    }
}

pub fn map_chapter_ref(info: ChapterInfoDto) -> ChapterRef {
    ChapterRef {
        title: clean_chapter_title(&info.title),
        slug: info.slug,
        released: info.time.or(info.date),
    }
}

pub fn map_genre(genre: GenreDto) -> Genre {
    Genre {
        title: genre.title,
        slug: genre.slug,
    }
}

fn map_project_update(update: ProjectUpdateDto) -> ProjectUpdate {
    ProjectUpdate {
        manga: map_manga_item(update.item),
        chapters: update.chapters.into_iter().map(map_chapter_ref).collect(),
    }
}

pub fn map_home(home: HomeDto) -> Home {
    Home {
        hot_updates: home.hot_updates.into_iter().map(map_manga_item).collect(),
        project_updates: home
            .project_updates
            .into_iter()
            .map(map_project_update)
            .collect(),
        latest_releases: home
            .latest_releases
            .into_iter()
            .map(map_project_update)
            .collect(),
    }
}

pub fn map_detail(detail: MangaDetailDto) -> MangaDetail {
    MangaDetail {
        kind: MangaKind::from_label(&detail.kind),
        title: detail.title,
        native_title: detail.native_title.filter(|t| !t.trim().is_empty()),
        cover_url: detail.image,
        rating: detail.rating,
        synopsis: detail.synopsis,
        released: detail.released,
        author: detail.author,
        status: detail.status,
        updated: detail.updated,
        genres: detail.genres.into_iter().map(map_genre).collect(),
        chapters: detail.chapters.into_iter().map(map_chapter_ref).collect(),
    }
}

pub fn map_chapter(slug: &str, chapter: ChapterDto) -> Chapter {
    let title = chapter
        .title
        .map(|t| clean_chapter_title(&t))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title_from_slug(slug));
    let (prev_chapter, next_chapter) = chapter
        .navigation
        .map(|nav| (nav.prev, nav.next))
        .unwrap_or_default();

    Chapter {
        slug: slug.to_string(),
        title,
        images: chapter.images,
        prev_chapter: prev_chapter.filter(|s| !s.is_empty()),
        next_chapter: next_chapter.filter(|s| !s.is_empty()),
        manga_slug: chapter.comic_slug.filter(|s| !s.is_empty()),
    }
}

pub fn map_page<D, T>(
    items: Vec<D>,
    pagination: PaginationDto,
    map: impl Fn(D) -> T,
) -> Paginated<T> {
    Paginated {
        items: items.into_iter().map(map).collect(),
        current_page: pagination.current_page,
        has_next_page: pagination.has_next_page,
        next_page: pagination.next_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_client::ChapterNavigationDto;

    #[test]
    fn kind_from_label_is_case_insensitive() {
        assert_eq!(MangaKind::from_label("Manhwa"), MangaKind::Manhwa);
        assert_eq!(MangaKind::from_label(" MANHUA "), MangaKind::Manhua);
        assert_eq!(MangaKind::from_label("manga"), MangaKind::Manga);
        assert_eq!(MangaKind::from_label("webtoon"), MangaKind::Manga);
    }

    #[test]
    fn chapter_title_falls_back_to_slug() {
        assert_eq!(
            title_from_slug("solo-leveling-chapter-12-bahasa-indonesia"),
            "solo leveling chapter 12"
        );
        assert_eq!(
            title_from_slug("Omniscient-Reader-Chapter-3-Bahasa-Indonesia"),
            "Omniscient Reader Chapter 3"
        );
        assert_eq!(title_from_slug("plain-slug"), "plain slug");
    }

    #[test]
    fn clean_title_drops_line_breaks() {
        assert_eq!(clean_chapter_title("Chapter\n12\n"), "Chapter 12");
    }

    #[test]
    fn map_chapter_uses_navigation_and_fallback_title() {
        let dto = ChapterDto {
            title: None,
            comic_slug: Some("solo-leveling".into()),
            images: vec!["https://img/1.jpg".into()],
            navigation: Some(ChapterNavigationDto {
                prev: Some("solo-leveling-chapter-11".into()),
                next: Some(String::new()),
                all_chapters: None,
            }),
        };
        let chapter = map_chapter("solo-leveling-chapter-12-bahasa-indonesia", dto);
        assert_eq!(chapter.title, "solo leveling chapter 12");
        assert_eq!(
            chapter.prev_chapter.as_deref(),
            Some("solo-leveling-chapter-11")
        );
        assert_eq!(chapter.next_chapter, None);
        assert_eq!(chapter.manga_slug.as_deref(), Some("solo-leveling"));
    }

    #[test]
    fn map_page_keeps_pagination() {
        let page = map_page(
            vec![MangaItemDto {
                title: "Tales".into(),
                slug: "tales".into(),
                image: "https://img/t.jpg".into(),
                chapter: Some("Chapter 3".into()),
                latest_chapter: None,
                rating: "7".into(),
                kind: "Manhua".into(),
            }],
            PaginationDto::default(),
            map_manga_item,
        );
        assert_eq!(page.current_page, 1);
        assert!(!page.has_next_page);
        assert_eq!(page.items[0].kind, MangaKind::Manhua);
        assert_eq!(page.items[0].latest_chapter.as_deref(), Some("Chapter 3"));
    }
}
