//! Race coordinator: first tier of the two-tier fetch.
//!
//! A fetch is spawned as its own task and raced against a [`Deadline`]. Exactly
//! one outcome escapes:
//!
//! | Settles first          | Result                                  |
//! |------------------------|-----------------------------------------|
//! | fetch, `Ok(value)`     | `Ok(value)`; the deadline is dropped    |
//! | fetch, `Err(error)`    | `Err(error)`; never the fallback        |
//! | deadline               | `Ok(fallback)`; the fetch is cancelled  |
//!
//! Dropping the race future before it settles cancels the fetch as well. A
//! cancelled fetch may still run to completion in the background. Its result
//! (or failure) is dropped with the detached task.
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use tierfetch_types::{FetchError, InvalidArgument, ItemList};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::deadline::{self, Deadline};
use crate::source::{ItemSource, RequestOptions};

/// Which side of the race settled first. Never leaves this module.
enum RaceOutcome<T> {
    Resolved(Result<T, FetchError>),
    TimedOut,
}

#[derive(Debug)]
pub struct RaceCoordinator<S> {
    source: Arc<S>,
}

impl<S> Clone for RaceCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: ItemSource> RaceCoordinator<S> {
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Fetch `url` as `T`, giving up after `bound_ms` and resolving with
    /// `fallback` instead.
    ///
    /// The bound is checked here, before the returned future exists, so an
    /// invalid bound never reaches the network. Must be called from within a
    /// tokio runtime, which owns the deadline's timer.
    pub fn race_fetch<T>(
        &self,
        url: &str,
        bound_ms: f64,
        fallback: T,
        options: RequestOptions,
    ) -> Result<BoxFuture<'static, Result<T, FetchError>>, InvalidArgument>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let deadline = deadline::after(bound_ms)?;
        let source = Arc::clone(&self.source);
        let url = url.to_string();
        Ok(run_race(source, url, deadline, fallback, options).boxed())
    }

    /// [`race_fetch`](Self::race_fetch) for the item list, with the empty
    /// placeholder as fallback.
    pub fn race_items(
        &self,
        url: &str,
        bound_ms: f64,
        options: RequestOptions,
    ) -> Result<BoxFuture<'static, Result<ItemList, FetchError>>, InvalidArgument> {
        self.race_fetch(url, bound_ms, ItemList::placeholder(), options)
    }
}

async fn run_race<S, T>(
    source: Arc<S>,
    url: String,
    deadline: Deadline,
    fallback: T,
    options: RequestOptions,
) -> Result<T, FetchError>
where
    S: ItemSource,
    T: DeserializeOwned + Send + 'static,
{
    let bound = deadline.bound();
    let started = Instant::now();
    let cancel = CancellationToken::new();
    // Trips the token if this future is dropped before the race is decided.
    let _cancel_on_drop = cancel.clone().drop_guard();
    let mut call = tokio::spawn(adapter_call::<S, T>(
        source,
        url.clone(),
        options,
        cancel.clone(),
    ));

    // Biased toward the fetch: when both are ready on the same poll, real data wins.
    let outcome = tokio::select! {
        biased;
        joined = &mut call => RaceOutcome::Resolved(flatten(&url, joined)),
        _signal = deadline => RaceOutcome::TimedOut,
    };

    match outcome {
        RaceOutcome::Resolved(Ok(value)) => {
            tracing::debug!(
                %url,
                elapsed_ms = started.elapsed().as_millis(),
                "fetch beat the deadline"
            );
            Ok(value)
        }
        RaceOutcome::Resolved(Err(error)) => {
            tracing::debug!(%url, %error, "fetch failed before the deadline");
            Err(error)
        }
        RaceOutcome::TimedOut => {
            cancel.cancel();
            // Detach: the task may finish later, but nobody reads its output.
            drop(call);
            tracing::info!(
                %url,
                bound_ms = bound.as_millis(),
                "Timed out on server fetch, deferring to client"
            );
            Ok(fallback)
        }
    }
}

async fn adapter_call<S, T>(
    source: Arc<S>,
    url: String,
    options: RequestOptions,
    cancel: CancellationToken,
) -> Result<T, FetchError>
where
    S: ItemSource,
    T: DeserializeOwned + Send + 'static,
{
    let result = source.fetch_json::<T>(&url, &options, cancel.clone()).await;
    if cancel.is_cancelled() {
        match &result {
            Ok(_) => tracing::debug!(%url, "discarding fetch result that lost the race"),
            Err(error) => tracing::debug!(%url, %error, "swallowing failure from a cancelled fetch"),
        }
    }
    result
}

fn flatten<T>(
    url: &str,
    joined: Result<Result<T, FetchError>, JoinError>,
) -> Result<T, FetchError> {
    match joined {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => {
            std::panic::resume_unwind(join_error.into_panic())
        }
        // The task is only aborted by runtime shutdown.
        Err(join_error) => Err(FetchError::Transport {
            url: url.to_string(),
            message: format!("fetch task stopped: {join_error}"),
        }),
    }
}
