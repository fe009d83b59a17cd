//! Mirror node access over its REST API.
//!
//! # Responsibilities
//! - Balance, topic, token and NFT queries (`QueryService`)
//! - Pages of topic messages for subscriptions (`MessageFeed`)
//!
//! # Design Decisions
//! - Read-only; mutations go through a `Gateway`
//! - 404 is a missing entity: a query error, or an empty message page
//! - 429 and 5xx are retryable network errors; other 4xx are query errors

pub mod client;
pub mod wire;

pub use client::{MirrorClient, MAX_PAGE_SIZE};
