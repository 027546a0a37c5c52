use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::date;
use crate::error::TimelineError;

/// Opaque identity of an item. Unique within a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single dated bar on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(with = "date::ymd")]
    pub start: NaiveDate,
    #[serde(with = "date::ymd")]
    pub end: NaiveDate,
}

impl Item {
    /// Create an item with a fresh id.
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::with_id(ItemId::new(), name, start, end)
    }

    pub fn with_id(id: ItemId, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            start,
            end,
        }
    }

    /// Inclusive span in days; a same-day item spans one day.
    pub fn span_days(&self) -> i64 {
        date::days_between(self.start, self.end) + 1
    }
}

/// An item as it arrives from a host, dates still in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: String,
    pub start: String,
    pub end: String,
}

impl TryFrom<ItemRecord> for Item {
    type Error = TimelineError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let parse = |field: &'static str, token: &str| {
            date::parse_ymd(token).map_err(|source| TimelineError::Date {
                id: record.id.to_string(),
                field,
                source,
            })
        };
        let start = parse("start", &record.start)?;
        let end = parse("end", &record.end)?;
        Ok(Item::with_id(record.id, record.name, start, end))
    }
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            start: date::format_ymd(item.start),
            end: date::format_ymd(item.end),
        }
    }
}

/// Keyed replace-by-id store that receives item mutations.
///
/// Mutations are always resolved against the store's current copy, so a
/// store that no longer knows an id simply rejects the replacement.
pub trait ItemStore {
    fn item(&self, id: ItemId) -> Option<&Item>;

    /// Replace the item sharing `item.id`. Returns false when the id is unknown.
    fn replace_item(&mut self, item: Item) -> bool;
}

impl ItemStore for Vec<Item> {
    fn item(&self, id: ItemId) -> Option<&Item> {
        self.iter().find(|it| it.id == id)
    }

    fn replace_item(&mut self, item: Item) -> bool {
        match self.iter_mut().find(|it| it.id == item.id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }
}
