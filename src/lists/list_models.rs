use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of items kept in a single list, newest first.
pub const MAX_LIST_ITEMS: usize = 50;

/// The fixed set of per-user recency lists. Each one lives in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListName {
    Watchlist,
    Favourites,
    Viewed,
    RecentBids,
    Purchased,
}

impl ListName {
    pub const ALL: [ListName; 5] = [
        ListName::Watchlist,
        ListName::Favourites,
        ListName::Viewed,
        ListName::RecentBids,
        ListName::Purchased,
    ];

    /// The name used both on the wire and as the storage collection name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListName::Watchlist => "watchlist",
            ListName::Favourites => "favourites",
            ListName::Viewed => "viewed",
            ListName::RecentBids => "recentbids",
            ListName::Purchased => "purchased",
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown list name: {0}")]
pub struct UnknownListName(pub String);

impl FromStr for ListName {
    type Err = UnknownListName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListName::ALL
            .into_iter()
            .find(|list| list.as_str() == s)
            .ok_or_else(|| UnknownListName(s.to_string()))
    }
}

/// A user's list in one collection. A document only exists while it holds at least one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListDocument {
    pub owner_id: String,
    /// Most recent first, no duplicates, at most [`MAX_LIST_ITEMS`].
    pub item_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every replace, used to detect concurrent writers.
    #[serde(skip)]
    pub version: u64,
}

impl ListDocument {
    pub fn new(owner_id: &str, item_id: &str, now: DateTime<Utc>) -> Self {
        ListDocument {
            owner_id: owner_id.to_string(),
            item_ids: vec![item_id.to_string()],
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.item_ids.iter().any(|id| id == item_id)
    }
}

/// Conditions the store can evaluate over a document's items when counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPredicate {
    Contains(String),
}
