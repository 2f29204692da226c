//! Core domain types for tierfetch.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from either side of the two-tier fetch: the bounded
//! server-side race and the client-side fallback.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod error;
mod item;
mod view;

pub use error::{FetchError, InvalidArgument};
pub use item::{Item, ItemId, ItemList};
pub use view::{Selection, SubmissionStatus};
