use super::list_models::{ItemPredicate, ListDocument, ListName};
use anyhow::bail;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A {list} document already exists for owner {owner}")]
    AlreadyExists { list: ListName, owner: String },

    #[error("The {list} document of owner {owner} was modified concurrently")]
    VersionConflict { list: ListName, owner: String },

    #[error("Store operation timed out")]
    Timeout,

    #[error("Corrupt {list} document for owner {owner}: {reason}")]
    Corrupt {
        list: ListName,
        owner: String,
        reason: String,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// True for the errors caused by another writer touching the same document.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyExists { .. } | StoreError::VersionConflict { .. }
        )
    }
}

/// Persistence of the documents of a single list collection, keyed by owner.
pub trait ListStore: Send + Sync {
    /// The collection this store operates on.
    fn list_name(&self) -> ListName;

    /// Returns the owner's document.
    /// Returns Ok(None) if the owner has no document in this collection.
    fn find_by_owner(&self, owner: &str) -> Result<Option<ListDocument>, StoreError>;

    /// Inserts a new document.
    /// Fails with `AlreadyExists` if the owner already has one.
    fn insert(&self, document: &ListDocument) -> Result<(), StoreError>;

    /// Replaces the items of an existing document and bumps its version.
    /// Fails with `VersionConflict` if the stored version is not `expected_version`
    /// or the document is gone.
    fn replace(
        &self,
        owner: &str,
        item_ids: &[String],
        updated_at: DateTime<Utc>,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Deletes the owner's document, doing nothing if there is none.
    /// With `expected_version` set, a document holding another version is left
    /// untouched and `VersionConflict` is returned.
    fn delete(&self, owner: &str, expected_version: Option<u64>) -> Result<(), StoreError>;

    /// Counts the documents of the whole collection matching the predicate.
    fn count_where(&self, predicate: &ItemPredicate) -> Result<usize, StoreError>;
}

/// One store handle per list name, fixed at construction.
#[derive(Clone)]
pub struct ListCollections {
    watchlist: Arc<dyn ListStore>,
    favourites: Arc<dyn ListStore>,
    viewed: Arc<dyn ListStore>,
    recent_bids: Arc<dyn ListStore>,
    purchased: Arc<dyn ListStore>,
}

impl ListCollections {
    pub fn new(
        watchlist: Arc<dyn ListStore>,
        favourites: Arc<dyn ListStore>,
        viewed: Arc<dyn ListStore>,
        recent_bids: Arc<dyn ListStore>,
        purchased: Arc<dyn ListStore>,
    ) -> anyhow::Result<Self> {
        let collections = ListCollections {
            watchlist,
            favourites,
            viewed,
            recent_bids,
            purchased,
        };
        for list in ListName::ALL {
            let bound = collections.get(list).list_name();
            if bound != list {
                bail!("Store for {} is bound to the {} collection", list, bound);
            }
        }
        Ok(collections)
    }

    /// Builds the table by asking `make_store` for the store of each list name.
    pub fn from_fn<F>(mut make_store: F) -> anyhow::Result<Self>
    where
        F: FnMut(ListName) -> Arc<dyn ListStore>,
    {
        Self::new(
            make_store(ListName::Watchlist),
            make_store(ListName::Favourites),
            make_store(ListName::Viewed),
            make_store(ListName::RecentBids),
            make_store(ListName::Purchased),
        )
    }

    fn slot(&self, list: ListName) -> &Arc<dyn ListStore> {
        match list {
            ListName::Watchlist => &self.watchlist,
            ListName::Favourites => &self.favourites,
            ListName::Viewed => &self.viewed,
            ListName::RecentBids => &self.recent_bids,
            ListName::Purchased => &self.purchased,
        }
    }

    pub fn get(&self, list: ListName) -> &dyn ListStore {
        self.slot(list).as_ref()
    }

    /// Shared handle to the store of `list`, for wrapping or moving across threads.
    pub fn store(&self, list: ListName) -> Arc<dyn ListStore> {
        self.slot(list).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedStore(ListName);

    impl ListStore for NamedStore {
        fn list_name(&self) -> ListName {
            self.0
        }

        fn find_by_owner(&self, _owner: &str) -> Result<Option<ListDocument>, StoreError> {
            Ok(None)
        }

        fn insert(&self, _document: &ListDocument) -> Result<(), StoreError> {
            Ok(())
        }

        fn replace(
            &self,
            _owner: &str,
            _item_ids: &[String],
            _updated_at: DateTime<Utc>,
            _expected_version: u64,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        fn delete(&self, _owner: &str, _expected_version: Option<u64>) -> Result<(), StoreError> {
            Ok(())
        }

        fn count_where(&self, _predicate: &ItemPredicate) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn routes_each_list_to_its_own_store() {
        let collections =
            ListCollections::from_fn(|list| Arc::new(NamedStore(list)) as Arc<dyn ListStore>)
                .unwrap();
        for list in ListName::ALL {
            assert_eq!(collections.get(list).list_name(), list);
        }
    }

    #[test]
    fn rejects_store_bound_to_wrong_collection() {
        let result = ListCollections::new(
            Arc::new(NamedStore(ListName::Watchlist)),
            Arc::new(NamedStore(ListName::Watchlist)),
            Arc::new(NamedStore(ListName::Viewed)),
            Arc::new(NamedStore(ListName::RecentBids)),
            Arc::new(NamedStore(ListName::Purchased)),
        );
        let err = result.err().unwrap().to_string();
        assert!(err.contains("favourites"));
    }

    #[test]
    fn only_concurrency_errors_are_conflicts() {
        assert!(StoreError::AlreadyExists {
            list: ListName::Viewed,
            owner: "o".to_string()
        }
        .is_conflict());
        assert!(StoreError::VersionConflict {
            list: ListName::Viewed,
            owner: "o".to_string()
        }
        .is_conflict());
        assert!(!StoreError::Timeout.is_conflict());
        assert!(!StoreError::Other(anyhow::anyhow!("boom")).is_conflict());
    }
}
