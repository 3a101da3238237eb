pub mod bookmark;
pub mod reading_history;

pub mod prelude {
    pub use super::bookmark::Entity as Bookmark;
    pub use super::reading_history::Entity as ReadingHistory;
}
