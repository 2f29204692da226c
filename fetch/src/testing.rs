//! Scripted item source for tests.
//!
//! Each call pops the next [`Scripted`] reply, sleeps for its delay on the
//! tokio clock (so paused-time tests stay deterministic), then answers.
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tierfetch_types::{FetchError, Item, ItemList};
use tokio_util::sync::CancellationToken;

use crate::source::{ItemSource, RequestOptions};

/// The three records the demo endpoint serves.
#[must_use]
pub fn sample_items() -> ItemList {
    ItemList::from(vec![
        Item::new(1, "f1r5t p05t!", "first"),
        Item::new(2, "secondarily", "second"),
        Item::new(3, "trifecta", "third"),
    ])
}

#[derive(Debug, Clone)]
pub struct Scripted {
    delay: Duration,
    reply: Result<Value, FetchError>,
    honors_cancel: bool,
}

impl Scripted {
    #[must_use]
    pub fn items(items: &ItemList) -> Self {
        Self::json(serde_json::to_value(items).unwrap_or(Value::Null))
    }

    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(body),
            honors_cancel: true,
        }
    }

    #[must_use]
    pub fn error(error: FetchError) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Err(error),
            honors_cancel: true,
        }
    }

    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Keep running to completion even after cancellation, like a transport
    /// that cannot abort an in-flight request.
    #[must_use]
    pub fn ignoring_cancel(mut self) -> Self {
        self.honors_cancel = false;
        self
    }
}

#[derive(Debug, Default)]
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Scripted>>,
    requested: Mutex<Vec<String>>,
    calls: AtomicUsize,
    completions: AtomicUsize,
    cancellations: AtomicUsize,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Calls started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end of their delay and produced a reply.
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Calls that stopped early because their token fired.
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self, url: &str) -> Scripted {
        if let Ok(mut urls) = self.requested.lock() {
            urls.push(url.to_string());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| {
                Scripted::error(FetchError::Transport {
                    url: url.to_string(),
                    message: "no scripted reply left".to_string(),
                })
            })
    }
}

impl ItemSource for ScriptedSource {
    fn fetch_json<T>(
        &self,
        url: &str,
        _options: &RequestOptions,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<T, FetchError>> + Send
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.next_reply(url);
        let url = url.to_string();

        async move {
            if scripted.honors_cancel {
                tokio::select! {
                    () = tokio::time::sleep(scripted.delay) => {}
                    () = cancel.cancelled() => {
                        self.cancellations.fetch_add(1, Ordering::SeqCst);
                        return Err(FetchError::Cancelled { url });
                    }
                }
            } else {
                tokio::time::sleep(scripted.delay).await;
            }

            self.completions.fetch_add(1, Ordering::SeqCst);
            let body = scripted.reply?;
            serde_json::from_value(body).map_err(|e| FetchError::Decode {
                url,
                message: e.to_string(),
            })
        }
    }
}
