//! State the renderer reads: the item picker and the form status line.

use crate::item::{Item, ItemList};

/// Which item the picker currently points at.
///
/// With nothing selected (or a stale index after the list was replaced) the
/// first item stands in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    index: Option<usize>,
}

impl Selection {
    pub fn select(&mut self, index: usize) {
        self.index = Some(index);
    }

    pub fn clear(&mut self) {
        self.index = None;
    }

    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The explicitly selected item, if its index is still in range.
    #[must_use]
    pub fn selected<'a>(&self, list: &'a ItemList) -> Option<&'a Item> {
        self.index.and_then(|i| list.get(i))
    }

    #[must_use]
    pub fn description<'a>(&self, list: &'a ItemList) -> Option<&'a str> {
        self.selected(list)
            .or_else(|| list.first())
            .map(|item| item.description.as_str())
    }
}

/// Two-state status line for the form: in flight, or settled.
///
/// A form that has never been submitted reads as `Sent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionStatus {
    Sending,
    #[default]
    Sent,
}

impl SubmissionStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Sending => "Sending",
            SubmissionStatus::Sent => "Sent",
        }
    }

    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, SubmissionStatus::Sending)
    }
}
