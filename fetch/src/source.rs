//! Item source adapter.
//!
//! [`ItemSource`] is the seam both tiers fetch through: the race coordinator
//! with a cancellation token it may trip, and the fallback controller with one
//! it never does. [`HttpItemSource`] is the production implementation over
//! `reqwest`.
use std::future::Future;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tierfetch_types::{FetchError, ItemList};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Transport settings passed through to the source untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Defaults to GET.
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestOptions {
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn header_map(&self, url: &str) -> Result<HeaderMap, FetchError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FetchError::Transport {
                    url: url.to_string(),
                    message: format!("invalid header name {name:?}: {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: format!("invalid value for header {name}: {e}"),
            })?;
            map.append(name, value);
        }
        Ok(map)
    }
}

/// Anything that can answer "GET me this JSON document".
///
/// Implementations must stop promptly once `cancel` fires and report
/// [`FetchError::Cancelled`]; the caller has already moved on and will not
/// look at the result.
pub trait ItemSource: Send + Sync + 'static {
    fn fetch_json<T>(
        &self,
        url: &str,
        options: &RequestOptions,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<T, FetchError>> + Send
    where
        T: DeserializeOwned + Send + 'static;
}

/// Fetch the item list directly, with no deadline.
pub async fn fetch_items<S: ItemSource>(
    source: &S,
    url: &str,
    options: &RequestOptions,
) -> Result<ItemList, FetchError> {
    source
        .fetch_json::<ItemList>(url, options, CancellationToken::new())
        .await
}

/// `reqwest`-backed item source.
///
/// Relative URLs resolve against `origin`, which is how the client-side retry
/// reaches the same-origin endpoint.
#[derive(Debug, Clone)]
pub struct HttpItemSource {
    client: Client,
    origin: Option<Url>,
}

impl HttpItemSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            origin: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    pub fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        match Url::parse(url) {
            Ok(parsed) => Ok(parsed),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let origin = self.origin.as_ref().ok_or_else(|| FetchError::InvalidUrl {
                    url: url.to_string(),
                    reason: "relative URL with no origin configured".to_string(),
                })?;
                origin.join(url).map_err(|e| FetchError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        target: Url,
        options: &RequestOptions,
    ) -> Result<T, FetchError> {
        let url = target.to_string();
        let method = options.method.clone().unwrap_or(Method::GET);
        let mut builder = self
            .client
            .request(method, target)
            .headers(options.header_map(&url)?);
        if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

impl ItemSource for HttpItemSource {
    fn fetch_json<T>(
        &self,
        url: &str,
        options: &RequestOptions,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<T, FetchError>> + Send
    where
        T: DeserializeOwned + Send + 'static,
    {
        async move {
            let target = self.resolve(url)?;
            let requested = target.to_string();
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(FetchError::Cancelled { url: requested }),
                result = self.request(target, options) => result,
            }
        }
    }
}

pub(crate) fn transport_error(url: &str, error: &reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        format!("timed out: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    };
    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}
