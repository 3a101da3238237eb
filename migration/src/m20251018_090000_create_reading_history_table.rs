use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReadingHistory::Table)
                    .if_not_exists()
                    .col(uuid(ReadingHistory::Id).primary_key())
                    .col(uuid(ReadingHistory::UserId))
                    .col(string(ReadingHistory::MangaSlug))
                    .col(string(ReadingHistory::MangaTitle))
                    .col(string_null(ReadingHistory::MangaCover))
                    .col(string(ReadingHistory::ChapterSlug))
                    .col(string(ReadingHistory::ChapterTitle))
                    .col(double(ReadingHistory::ScrollProgress).default(0.0))
                    .col(integer(ReadingHistory::LastImageIndex).default(0))
                    .col(timestamp_with_time_zone(ReadingHistory::ReadAt))
                    .to_owned(),
            )
            .await?;

        // One row per (user, manga, chapter); history writes upsert on it.
        manager
            .create_index(
                Index::create()
                    .name("idx_reading_history_user_manga_chapter")
                    .table(ReadingHistory::Table)
                    .col(ReadingHistory::UserId)
                    .col(ReadingHistory::MangaSlug)
                    .col(ReadingHistory::ChapterSlug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reading_history_user_chapter")
                    .table(ReadingHistory::Table)
                    .col(ReadingHistory::UserId)
                    .col(ReadingHistory::ChapterSlug)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReadingHistory::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum ReadingHistory {
    Table,
    Id,
    UserId,
    MangaSlug,
    MangaTitle,
    MangaCover,
    ChapterSlug,
    ChapterTitle,
    ScrollProgress,
    LastImageIndex,
    ReadAt,
}
