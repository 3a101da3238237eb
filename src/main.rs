use std::{path::Path, sync::Arc};

use anyhow::Context;
use chapter_progress::{
    ProgressResult,
    config::Config,
    content_client::ContentClient,
    domain::models::{Chapter, NewBookmark, NewHistoryEntry},
    storage::{
        RemoteProgressStore,
        bookmarks::{BookmarkOutcome, BookmarkStore},
        history::HistoryStore,
        local::{FileBucket, LocalProgressStore},
        remote::SeaOrmProgressStore,
    },
    tracker::{
        ProgressNotice, ProgressTracker, TrackerSettings, TrackerState, backend::ProgressBackend,
        sample::ScrollSample,
    },
};
use migration::MigratorTrait;
use sea_orm::Database;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};
use uuid::Uuid;

const USAGE: &str = "usage: chapter_progress <chapter-slug>";
const HELP: &str = "commands: scroll <percent> <page> | viewport <scroll_top> <viewport_height> <page heights...> | resume | dismiss | state | bookmark | unbookmark | history | quit";

/// Signed-in extras: reading history and bookmarks for the open chapter's manga.
struct Library {
    user_id: Uuid,
    history: HistoryStore,
    bookmarks: BookmarkStore,
    manga: Option<NewBookmark>,
}

#[tokio::main]
async fn main() -> ProgressResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,sea_orm=warn,sqlx=warn,reqwest=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish()
        .with(ErrorLayer::default())
        .init();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting chapter progress session"
    );
    // Load environment variables from .env files
    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load()?;
    if let Err(e) = config.validate() {
        return Err(anyhow::anyhow!(e));
    }

    let chapter_slug = std::env::args()
        .nth(1)
        .filter(|s| !s.trim().is_empty())
        .context(USAGE)?;

    let db_conn = Database::connect(&config.db_connection_string)
        .await
        .with_context(|| "Failed to connect to database")?;
    migration::Migrator::up(&db_conn, None)
        .await
        .with_context(|| "Failed to run database migrations")?;
    let db = Arc::new(db_conn);

    let auth = config.auth_context()?;
    tracing::info!(authenticated = auth.is_authenticated(), "resolved viewer identity");

    let client = ContentClient::new(&config.content_base_url)?;
    let chapter = match client.chapter(&chapter_slug).await {
        Ok(chapter) => Some(chapter),
        Err(e) => {
            tracing::warn!(error = %e, %chapter_slug, "could not fetch chapter, tracking progress anyway");
            None
        }
    };
    if let Some(chapter) = &chapter {
        println!(
            "{} ({} pages, prev: {}, next: {})",
            chapter.title,
            chapter.images.len(),
            chapter.prev_chapter.as_deref().unwrap_or("-"),
            chapter.next_chapter.as_deref().unwrap_or("-"),
        );
    }
    let library = match auth.viewer_id() {
        Some(user_id) => {
            let mut library = Library {
                user_id,
                history: HistoryStore::new(db.clone()),
                bookmarks: BookmarkStore::new(db.clone()),
                manga: None,
            };
            if let Some(chapter) = &chapter {
                library.manga = record_visit(&client, &library, chapter).await;
            }
            Some(library)
        }
        None => None,
    };

    let local = Arc::new(LocalProgressStore::new(Arc::new(FileBucket::open(
        &config.local_store_dir,
    )?)));
    let remote: Arc<dyn RemoteProgressStore> = Arc::new(SeaOrmProgressStore::new(db.clone()));
    let backend = ProgressBackend::select(&auth, local, remote);
    let mut tracker = ProgressTracker::new(chapter_slug, backend, TrackerSettings::from(&config));

    spawn_notice_printer(&tracker);
    spawn_state_printer(&tracker);
    tracker.load_initial_progress().await;
    if let Some(saved) = tracker.saved_progress().filter(|_| tracker.is_resuming()) {
        println!(
            "resume reading at {:.1}% (page {})? type `resume` or `dismiss`",
            saved.scroll_fraction,
            saved.last_visible_index + 1
        );
    }

    run_session(&mut tracker, library.as_ref()).await?;
    tracker.close();
    Ok(())
}

/// Signed-in visits land in reading history, which also creates the row the
/// tracker later writes progress into.
async fn record_visit(
    client: &ContentClient,
    library: &Library,
    chapter: &Chapter,
) -> Option<NewBookmark> {
    let Some(manga_slug) = chapter.manga_slug.clone() else {
        tracing::debug!(chapter = %chapter.slug, "chapter has no manga slug, not recording history");
        return None;
    };
    let (manga_title, manga_cover) = match client.manga_detail(&manga_slug).await {
        Ok(detail) => (detail.title, Some(detail.cover_url).filter(|c| !c.is_empty())),
        Err(e) => {
            tracing::warn!(error = %e, %manga_slug, "could not fetch manga detail for history");
            (manga_slug.replace('-', " "), None)
        }
    };
    let entry = NewHistoryEntry {
        manga_slug: manga_slug.clone(),
        manga_title: manga_title.clone(),
        manga_cover: manga_cover.clone(),
        chapter_slug: chapter.slug.clone(),
        chapter_title: chapter.title.clone(),
    };
    if let Err(e) = library.history.add(library.user_id, entry).await {
        tracing::warn!(error = %e, "failed to record reading history");
    }
    Some(NewBookmark {
        manga_slug,
        manga_title,
        manga_cover,
    })
}

fn spawn_notice_printer(tracker: &ProgressTracker) {
    let mut notices = tracker.subscribe_notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice {
                ProgressNotice::WriteFailed { message, .. } => {
                    eprintln!("progress not saved: {message}");
                }
            }
        }
    });
}

fn spawn_state_printer(tracker: &ProgressTracker) {
    let mut states = tracker.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            if *states.borrow_and_update() == TrackerState::LoadedNoResume {
                tracing::debug!("resume prompt closed");
            }
        }
    });
}

async fn run_session(
    tracker: &mut ProgressTracker,
    library: Option<&Library>,
) -> ProgressResult<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("scroll") => {
                let fraction = words.next().and_then(|w| w.parse::<f64>().ok());
                let index = words.next().and_then(|w| w.parse::<u32>().ok());
                match (fraction, index) {
                    (Some(fraction), Some(index)) => tracker.record_sample(fraction, index),
                    _ => println!("usage: scroll <percent> <page>"),
                }
            }
            Some("viewport") => {
                let numbers: Vec<f64> = words.filter_map(|w| w.parse().ok()).collect();
                match numbers.as_slice() {
                    [scroll_top, viewport_height, pages @ ..] if !pages.is_empty() => {
                        let sample =
                            ScrollSample::from_viewport(*scroll_top, *viewport_height, pages);
                        println!(
                            "at {:.1}%, page {}",
                            sample.scroll_fraction,
                            sample.last_visible_index + 1
                        );
                        tracker.record(sample);
                    }
                    _ => println!("usage: viewport <scroll_top> <viewport_height> <page heights...>"),
                }
            }
            Some("resume") => match tracker.resume() {
                Some(fraction) => println!("scroll to {fraction:.1}%"),
                None => println!("nothing to resume"),
            },
            Some("dismiss") => tracker.dismiss_resume(),
            Some("state") => println!("{:?}", tracker.state()),
            Some(command @ ("bookmark" | "unbookmark" | "history")) => match library {
                Some(library) => {
                    if let Err(e) = run_library_command(library, command).await {
                        eprintln!("{command} failed: {e:#}");
                    }
                }
                None => println!("sign in (VIEWER_ID) to use {command}"),
            },
            Some("quit") | Some("exit") => break,
            Some(_) => println!("{HELP}"),
            None => {}
        }
    }
    Ok(())
}

async fn run_library_command(library: &Library, command: &str) -> ProgressResult<()> {
    match (command, &library.manga) {
        ("history", _) => {
            for entry in library.history.list(library.user_id).await? {
                println!(
                    "{}  {} / {}  {:.1}%",
                    entry.read_at.format("%Y-%m-%d %H:%M"),
                    entry.manga_title,
                    entry.chapter_title,
                    entry.progress.scroll_fraction
                );
            }
        }
        ("bookmark", Some(manga)) => {
            match library.bookmarks.add(library.user_id, manga.clone()).await? {
                BookmarkOutcome::Added => println!("bookmarked {}", manga.manga_title),
                BookmarkOutcome::AlreadyBookmarked => {
                    println!("{} is already bookmarked", manga.manga_title)
                }
            }
        }
        ("unbookmark", Some(manga)) => {
            if library
                .bookmarks
                .remove(library.user_id, &manga.manga_slug)
                .await?
            {
                println!("removed bookmark for {}", manga.manga_title);
            } else {
                println!("{} was not bookmarked", manga.manga_title);
            }
        }
        _ => println!("no manga known for this chapter"),
    }
    Ok(())
}
