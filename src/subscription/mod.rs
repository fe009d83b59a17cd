//! Topic subscriptions.
//!
//! # Data Flow
//! ```text
//! SubscriptionReader::subscribe(topic, start, limit, on_message)
//!     → spawned Worker task
//!         → MessageFeed::messages(topic, since cursor, page)
//!         → sort, drop anything not after the last delivered timestamp
//!         → on_message(&TopicMessage) per message
//!     → SubscriptionHandle (cancel / join / is_finished)
//! ```

pub mod reader;

pub use reader::{StopReason, SubscriptionHandle, SubscriptionReader, SubscriptionSummary};
