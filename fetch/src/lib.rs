//! Deadline-bounded item fetching with a client-side second chance.
//!
//! The first tier races a fetch against a deadline so a slow upstream cannot
//! hold up a render; on a miss it serves an empty placeholder. The second tier
//! notices the placeholder after the first render and fetches once more,
//! directly and without a bound.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`deadline`] | Validated, cancellable timer that settles with a `TimeoutSignal` |
//! | [`source`] | `ItemSource` seam and the `reqwest` implementation |
//! | [`race`] | First tier: fetch vs. deadline, loser cancelled |
//! | [`fallback`] | Second tier: one retry driven by an explicit state machine |
//! | [`submit`] | Two-field form POST with a Sending/Sent status line |
//! | [`driver`] | Both tiers composed in render order |
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tierfetch_fetch::{HttpItemSource, TracingSink, TwoTierFetch};
//!
//! let source = Arc::new(HttpItemSource::new(reqwest::Client::new()).with_origin(origin));
//! let fetch = TwoTierFetch::new(source, "http://127.0.0.1:3000/api/talk2/items", "/api/talk2/items", 200.0);
//! let outcome = fetch.run(TracingSink).await?;
//! ```
//!
//! # Error Handling
//!
//! Bounds are validated synchronously ([`InvalidArgument`]). A deadline miss is
//! not an error. Fetch failures are [`FetchError`]s: the race returns them, the
//! fallback controller hands them to an [`ErrorSink`].

pub mod deadline;
pub mod driver;
pub mod fallback;
pub mod race;
pub mod source;
pub mod submit;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use deadline::{Deadline, TimeoutSignal, after, after_duration};
pub use driver::{TwoTierError, TwoTierFetch, TwoTierOutcome};
pub use fallback::{Delivered, ErrorSink, FallbackController, FallbackState, Settled, TracingSink};
pub use race::RaceCoordinator;
pub use source::{HttpItemSource, ItemSource, RequestOptions, fetch_items};
pub use submit::{FormFields, FormSubmitter};
pub use tierfetch_types::{FetchError, InvalidArgument, Item, ItemId, ItemList, Selection, SubmissionStatus};
