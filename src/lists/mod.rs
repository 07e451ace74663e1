mod list_manager;
pub mod list_models;
mod list_store;
mod sqlite_list_store;

pub use list_manager::{AddOutcome, ListError, ListManager, RemoveOutcome, MAX_WRITE_ATTEMPTS};
pub use list_models::{ItemPredicate, ListDocument, ListName, UnknownListName, MAX_LIST_ITEMS};
pub use list_store::{ListCollections, ListStore, StoreError};
pub use sqlite_list_store::{SqliteListStore, LISTS_SCHEMA};
