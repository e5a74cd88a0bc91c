//! Remote commit feed
//!
//! The feed is a JSON array of commit records fetched over HTTP. Fetch
//! failures never reach the store: callers treat them as an empty feed.

mod client;
mod types;

pub use client::{FeedClient, FeedError, FeedResult, FetchOptions, HttpFeedClient};
pub use types::{FeedAuthor, FeedCommit, FeedRecord};
