use std::fmt;
use std::slice;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single record served by the item source.
///
/// Items are immutable once fetched; a list is replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub description: String,
    pub text: String,
}

impl Item {
    #[must_use]
    pub fn new(id: u64, description: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(id),
            description: description.into(),
            text: text.into(),
        }
    }
}

/// Items in source order.
///
/// An empty list doubles as the placeholder a timed-out race resolves with.
/// A source that legitimately has zero items is indistinguishable from a
/// deadline miss at this level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList(Vec<Item>);

impl ItemList {
    /// The placeholder list served when the deadline wins.
    #[must_use]
    pub const fn placeholder() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.0.get(index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Item> {
        self.0.first()
    }

    pub fn iter(&self) -> slice::Iter<'_, Item> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Item] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Item> {
        self.0
    }
}

impl From<Vec<Item>> for ItemList {
    fn from(items: Vec<Item>) -> Self {
        Self(items)
    }
}

impl FromIterator<Item> for ItemList {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ItemList {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a Item;
    type IntoIter = slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
