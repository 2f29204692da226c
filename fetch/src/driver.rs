//! Both tiers, end to end.
//!
//! [`TwoTierFetch::run`] plays the server render (a bounded race) and then the
//! client mount (the fallback controller), in that order.
use std::sync::Arc;

use thiserror::Error;
use tierfetch_types::{FetchError, InvalidArgument, ItemList};

use crate::fallback::{ErrorSink, FallbackController, FallbackState};
use crate::race::RaceCoordinator;
use crate::source::{ItemSource, RequestOptions};

#[derive(Debug, Error)]
pub enum TwoTierError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    /// The first tier failed outright; there is no placeholder to repair.
    #[error("server-side fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoTierOutcome {
    /// What the first tier handed to the renderer.
    pub raced: ItemList,
    /// What is on screen once the controller settles.
    pub displayed: ItemList,
    pub state: FallbackState,
}

impl TwoTierOutcome {
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        self.raced.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TwoTierFetch<S> {
    race: RaceCoordinator<S>,
    server_url: String,
    client_url: String,
    bound_ms: f64,
    options: RequestOptions,
}

impl<S: ItemSource> TwoTierFetch<S> {
    /// `server_url` is raced with `bound_ms`; `client_url` is the unbounded
    /// same-origin retry target.
    #[must_use]
    pub fn new(
        source: Arc<S>,
        server_url: impl Into<String>,
        client_url: impl Into<String>,
        bound_ms: f64,
    ) -> Self {
        Self {
            race: RaceCoordinator::new(source),
            server_url: server_url.into(),
            client_url: client_url.into(),
            bound_ms,
            options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run<K: ErrorSink>(&self, sink: K) -> Result<TwoTierOutcome, TwoTierError> {
        let raced = self
            .race
            .race_items(&self.server_url, self.bound_ms, self.options.clone())?
            .await?;

        let mut controller =
            FallbackController::with_sink(Arc::clone(self.race.source()), &self.client_url, sink)
                .with_options(self.options.clone());
        controller.deliver(raced.clone());
        let state = controller.after_first_render().await;

        Ok(TwoTierOutcome {
            raced,
            displayed: controller.into_displayed(),
            state,
        })
    }
}
