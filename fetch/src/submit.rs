//! Two-field form submission.
//!
//! The status line is published on a `watch` channel so the renderer can show
//! "Sending" while the POST is in flight without holding the submitter.
use reqwest::Client;
use serde::Serialize;
use tierfetch_types::{FetchError, SubmissionStatus};
use tokio::sync::watch;
use url::Url;

use crate::fallback::{ErrorSink, TracingSink};
use crate::source::transport_error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFields {
    pub a: String,
    pub b: String,
}

#[derive(Debug)]
pub struct FormSubmitter<K = TracingSink> {
    client: Client,
    endpoint: Url,
    sink: K,
    status: watch::Sender<SubmissionStatus>,
}

impl FormSubmitter<TracingSink> {
    #[must_use]
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self::with_sink(client, endpoint, TracingSink)
    }
}

impl<K: ErrorSink> FormSubmitter<K> {
    #[must_use]
    pub fn with_sink(client: Client, endpoint: Url, sink: K) -> Self {
        let (status, _) = watch::channel(SubmissionStatus::default());
        Self {
            client,
            endpoint,
            sink,
            status,
        }
    }

    #[must_use]
    pub fn status(&self) -> SubmissionStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SubmissionStatus> {
        self.status.subscribe()
    }

    /// POST `{"a": .., "b": ..}` as JSON.
    ///
    /// The status reads `Sending` until the request settles either way. A
    /// failure goes to the sink and is also returned.
    pub async fn submit(&self, a: impl Into<String>, b: impl Into<String>) -> Result<(), FetchError> {
        let fields = FormFields {
            a: a.into(),
            b: b.into(),
        };
        self.status.send_replace(SubmissionStatus::Sending);
        let result = self.post(&fields).await;
        self.status.send_replace(SubmissionStatus::Sent);

        if let Err(error) = &result {
            self.sink.report(error);
        }
        result
    }

    async fn post(&self, fields: &FormFields) -> Result<(), FetchError> {
        let url = self.endpoint.to_string();
        let body = serde_json::to_string(fields).map_err(|e| FetchError::Transport {
            url: url.clone(),
            message: format!("failed to encode form: {e}"),
        })?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "form submitted");
            Ok(())
        } else {
            Err(FetchError::Status {
                url,
                status: status.as_u16(),
            })
        }
    }
}
