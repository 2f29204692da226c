//! Integration test suite modules

mod config;
mod two_tier;
