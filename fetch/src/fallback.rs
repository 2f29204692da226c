//! Fallback controller: second tier of the two-tier fetch.
//!
//! One controller lives for one mount of the item list. It is driven by
//! explicit events rather than callbacks:
//!
//! ```text
//! Pending ──deliver──▶ Raced{Empty|Populated} ──after_first_render──▶ Final{..}
//!                            │ Empty
//!                            └──────▶ Retrying ──▶ Final{Populated|Errored}
//! ```
//!
//! An empty delivered list is read as "the deadline won" and earns exactly one
//! direct retry. The displayed list only ever changes through [`FallbackController::replace`].
use std::sync::Arc;

use tierfetch_types::{FetchError, ItemList};

use crate::source::{ItemSource, RequestOptions, fetch_items};

/// Where the sink sends fetch failures the UI swallows.
pub trait ErrorSink {
    fn report(&self, error: &FetchError);
}

/// Reports through `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: &FetchError) {
        tracing::warn!(url = error.url(), %error, "client-side fetch failed");
    }
}

impl<F: Fn(&FetchError)> ErrorSink for F {
    fn report(&self, error: &FetchError) {
        self(error);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivered {
    Empty,
    Populated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Populated,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    /// Nothing delivered yet.
    Pending,
    /// The first tier delivered a list, not yet rendered.
    Raced(Delivered),
    Retrying,
    Final(Settled),
}

impl FallbackState {
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, FallbackState::Final(_))
    }
}

#[derive(Debug)]
pub struct FallbackController<S, K = TracingSink> {
    source: Arc<S>,
    retry_url: String,
    options: RequestOptions,
    sink: K,
    state: FallbackState,
    displayed: ItemList,
    retried: bool,
}

impl<S: ItemSource> FallbackController<S, TracingSink> {
    #[must_use]
    pub fn new(source: Arc<S>, retry_url: impl Into<String>) -> Self {
        Self::with_sink(source, retry_url, TracingSink)
    }
}

impl<S: ItemSource, K: ErrorSink> FallbackController<S, K> {
    /// `retry_url` is normally relative; the source resolves it against the
    /// client's own origin.
    #[must_use]
    pub fn with_sink(source: Arc<S>, retry_url: impl Into<String>, sink: K) -> Self {
        Self {
            source,
            retry_url: retry_url.into(),
            options: RequestOptions::default(),
            sink,
            state: FallbackState::Pending,
            displayed: ItemList::placeholder(),
            retried: false,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn state(&self) -> FallbackState {
        self.state
    }

    #[must_use]
    pub fn displayed(&self) -> &ItemList {
        &self.displayed
    }

    #[must_use]
    pub fn into_displayed(self) -> ItemList {
        self.displayed
    }

    #[must_use]
    pub fn has_retried(&self) -> bool {
        self.retried
    }

    /// Hand over the list the first tier produced. Only the first delivery
    /// counts.
    pub fn deliver(&mut self, list: ItemList) {
        if self.state != FallbackState::Pending {
            tracing::debug!(state = ?self.state, "ignoring repeat delivery");
            return;
        }
        self.state = FallbackState::Raced(if list.is_empty() {
            Delivered::Empty
        } else {
            Delivered::Populated
        });
        self.displayed = list;
    }

    /// Swap in a whole new list.
    ///
    /// Filling the list here before the first render counts as "populated",
    /// so the retry will not fire.
    pub fn replace(&mut self, list: ItemList) {
        if self.state == FallbackState::Raced(Delivered::Empty) && !list.is_empty() {
            self.state = FallbackState::Raced(Delivered::Populated);
        }
        self.displayed = list;
    }

    /// Drive the controller once the delivered list has been shown.
    ///
    /// Issues at most one direct fetch per controller. Calling this before a
    /// list is delivered, or again after it settled, does nothing.
    pub async fn after_first_render(&mut self) -> FallbackState {
        match self.state {
            FallbackState::Pending => {
                tracing::debug!("render event before any delivery; nothing to do");
            }
            FallbackState::Raced(Delivered::Populated) => {
                self.state = FallbackState::Final(Settled::Populated);
            }
            FallbackState::Raced(Delivered::Empty) if !self.retried => {
                self.retry().await;
            }
            FallbackState::Raced(Delivered::Empty)
            | FallbackState::Retrying
            | FallbackState::Final(_) => {}
        }
        self.state
    }

    async fn retry(&mut self) {
        self.retried = true;
        self.state = FallbackState::Retrying;
        tracing::info!(
            url = %self.retry_url,
            "Something went wrong on the server, fetching client-side"
        );

        match fetch_items(self.source.as_ref(), &self.retry_url, &self.options).await {
            Ok(list) => {
                tracing::debug!(url = %self.retry_url, count = list.len(), "client-side fetch succeeded");
                self.displayed = list;
                self.state = FallbackState::Final(Settled::Populated);
            }
            Err(error) => {
                self.sink.report(&error);
                self.state = FallbackState::Final(Settled::Errored);
            }
        }
    }
}
