use super::list_models::{ItemPredicate, ListDocument, ListName, MAX_LIST_ITEMS};
use super::list_store::{ListCollections, StoreError};
use chrono::Utc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How many times a write is recomputed after losing a race with another writer
/// on the same document before giving up.
pub const MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Gave up writing {list} of owner {owner} after {attempts} concurrent modifications")]
    Contention {
        list: ListName,
        owner: String,
        attempts: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The owner had no list, a new one was created.
    Created,
    /// The item was put in front of the existing list.
    Prepended,
    /// The item was already on the list, nothing changed.
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The list became empty and was deleted.
    ListDeleted,
    NotPresent,
}

/// Returns the new item list with `item_id` in front, capped at [`MAX_LIST_ITEMS`],
/// or None if the item is already listed.
fn prepend_item(item_ids: &[String], item_id: &str) -> Option<Vec<String>> {
    if item_ids.iter().any(|id| id == item_id) {
        return None;
    }
    let mut updated = Vec::with_capacity((item_ids.len() + 1).min(MAX_LIST_ITEMS));
    updated.push(item_id.to_string());
    updated.extend(item_ids.iter().take(MAX_LIST_ITEMS - 1).cloned());
    Some(updated)
}

fn without_item(item_ids: &[String], item_id: &str) -> Vec<String> {
    item_ids
        .iter()
        .filter(|id| id.as_str() != item_id)
        .cloned()
        .collect()
}

/// Point in time past which an operation must not start another store call.
#[derive(Debug, Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn check(&self) -> Result<(), StoreError> {
        match self.0 {
            Some(at) if Instant::now() >= at => Err(StoreError::Timeout),
            _ => Ok(()),
        }
    }
}

/// Reads and mutates the recency lists, and aggregates across them.
pub struct ListManager {
    collections: ListCollections,
    op_timeout: Option<Duration>,
}

impl ListManager {
    pub fn new(collections: ListCollections) -> Self {
        Self {
            collections,
            op_timeout: None,
        }
    }

    /// Bounds every operation to `timeout`. An operation running out of time fails with
    /// `StoreError::Timeout` and never writes after that point.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    fn deadline(&self) -> Deadline {
        Deadline(self.op_timeout.map(|timeout| Instant::now() + timeout))
    }

    fn find(
        &self,
        owner: &str,
        list: ListName,
        deadline: Deadline,
    ) -> Result<Option<ListDocument>, StoreError> {
        deadline.check()?;
        let found = self.collections.get(list).find_by_owner(owner)?;
        deadline.check()?;
        Ok(found)
    }

    /// Returns the owner's list, or None if the owner has nothing in it.
    pub fn get_list(&self, owner: &str, list: ListName) -> Result<Option<ListDocument>, ListError> {
        Ok(self.find(owner, list, self.deadline())?)
    }

    /// Returns every non-empty list of the owner.
    pub fn get_lists(&self, owner: &str) -> Result<Vec<(ListName, ListDocument)>, ListError> {
        let deadline = self.deadline();
        let mut lists = vec![];
        for list in ListName::ALL {
            if let Some(document) = self.find(owner, list, deadline)? {
                lists.push((list, document));
            }
        }
        Ok(lists)
    }

    pub fn contains_item(
        &self,
        owner: &str,
        list: ListName,
        item_id: &str,
    ) -> Result<bool, ListError> {
        Ok(self
            .get_list(owner, list)?
            .map(|document| document.contains(item_id))
            .unwrap_or(false))
    }

    /// Puts the item in front of the owner's list, creating the list if needed.
    /// Adding an item that is already listed leaves the list untouched, it is not moved
    /// to the front.
    pub fn add_item(
        &self,
        owner: &str,
        list: ListName,
        item_id: &str,
    ) -> Result<AddOutcome, ListError> {
        let store = self.collections.get(list);
        let deadline = self.deadline();
        let outcome = self.retry_on_conflict(owner, list, || {
            let found = self.find(owner, list, deadline)?;
            let now = Utc::now();
            match found {
                None => {
                    store.insert(&ListDocument::new(owner, item_id, now))?;
                    Ok(AddOutcome::Created)
                }
                Some(document) => match prepend_item(&document.item_ids, item_id) {
                    None => Ok(AddOutcome::AlreadyPresent),
                    Some(item_ids) => {
                        store.replace(owner, &item_ids, now, document.version)?;
                        Ok(AddOutcome::Prepended)
                    }
                },
            }
        })?;
        debug!("add_item({}, {}, {}) -> {:?}", owner, list, item_id, outcome);
        Ok(outcome)
    }

    /// Removes the item from the owner's list, deleting the list when it becomes empty.
    /// Missing lists and items are not errors.
    ///
    /// An empty `item_id` removes the whole list, same as [`ListManager::remove_all`].
    pub fn remove_item(
        &self,
        owner: &str,
        list: ListName,
        item_id: &str,
    ) -> Result<RemoveOutcome, ListError> {
        let store = self.collections.get(list);
        let deadline = self.deadline();

        if item_id.is_empty() {
            if self.find(owner, list, deadline)?.is_none() {
                return Ok(RemoveOutcome::NotPresent);
            }
            store.delete(owner, None)?;
            info!("Removed {} of owner {}", list, owner);
            return Ok(RemoveOutcome::ListDeleted);
        }

        let outcome = self.retry_on_conflict(owner, list, || {
            let Some(document) = self.find(owner, list, deadline)? else {
                return Ok(RemoveOutcome::NotPresent);
            };
            let remaining = without_item(&document.item_ids, item_id);
            if remaining.len() == document.item_ids.len() {
                return Ok(RemoveOutcome::NotPresent);
            }
            if remaining.is_empty() {
                store.delete(owner, Some(document.version))?;
                return Ok(RemoveOutcome::ListDeleted);
            }
            store.replace(owner, &remaining, Utc::now(), document.version)?;
            Ok(RemoveOutcome::Removed)
        })?;
        debug!(
            "remove_item({}, {}, {}) -> {:?}",
            owner, list, item_id, outcome
        );
        Ok(outcome)
    }

    /// Deletes the owner's whole list. Does nothing if there is none.
    pub fn remove_all(&self, owner: &str, list: ListName) -> Result<(), ListError> {
        self.deadline().check()?;
        self.collections.get(list).delete(owner, None)?;
        info!("Removed {} of owner {}", list, owner);
        Ok(())
    }

    /// Number of owners currently watching the item. Only watchlists are counted.
    pub fn count_watchers(&self, item_id: &str) -> Result<usize, ListError> {
        let deadline = self.deadline();
        let watchers = self
            .collections
            .get(ListName::Watchlist)
            .count_where(&ItemPredicate::Contains(item_id.to_string()))?;
        deadline.check()?;
        Ok(watchers)
    }

    fn retry_on_conflict<T, F>(
        &self,
        owner: &str,
        list: ListName,
        mut write: F,
    ) -> Result<T, ListError>
    where
        F: FnMut() -> Result<T, StoreError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            match write() {
                Err(err) if err.is_conflict() => {
                    debug!(
                        "Attempt {}/{} on {} of owner {} lost a race: {}",
                        attempt, MAX_WRITE_ATTEMPTS, list, owner, err
                    );
                }
                result => return result.map_err(ListError::from),
            }
        }
        warn!(
            "Giving up on {} of owner {} after {} conflicting attempts",
            list, owner, MAX_WRITE_ATTEMPTS
        );
        Err(ListError::Contention {
            list,
            owner: owner.to_string(),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }
}
