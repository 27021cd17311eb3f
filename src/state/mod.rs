//! State module for tracking per-URL fetch outcomes
//!
//! `FetchStatus` is the status column of the URL state store.

mod fetch_status;

pub use fetch_status::FetchStatus;
