//! HTTP client for source pages.
//!
//! This module provides the [`PageClient`] used by extractors that scrape
//! HTML documents.

mod page;

pub use page::{PageClient, USER_AGENT};
