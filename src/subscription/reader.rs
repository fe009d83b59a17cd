//! Ordered topic subscriptions.
//!
//! # Responsibilities
//! - Poll a `MessageFeed` on a background task
//! - Deliver each message once, in strictly increasing consensus order
//! - Stop on a message limit, a consumer request or cancellation
//!
//! # Design Decisions
//! - The cursor is the last delivered timestamp; anything at or before it is
//!   dropped, whatever order the feed returns pages in
//! - Feed errors back off and retry; they never end the subscription
//! - Cancellation uses a broadcast channel the way shutdown does elsewhere;
//!   dropping the handle also stops the task

use futures_util::Stream;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::schema::{RetryConfig, SubscriptionConfig};
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::{Timestamp, TopicId};
use crate::ledger::network::{MessageFeed, Since};
use crate::ledger::types::TopicMessage;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::RetryPolicy;

/// Why a subscription ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of messages was delivered.
    Limit,
    /// The consumer returned `ControlFlow::Break`.
    Consumer,
    /// `cancel` was called or the handle was dropped.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSummary {
    pub delivered: usize,
    pub last_timestamp: Option<Timestamp>,
    pub reason: StopReason,
}

/// Opens subscriptions against a message feed.
#[derive(Clone)]
pub struct SubscriptionReader {
    feed: Arc<dyn MessageFeed>,
    poll_interval: Duration,
    page_size: usize,
    retry: RetryPolicy,
}

impl SubscriptionReader {
    pub fn new(feed: Arc<dyn MessageFeed>) -> Self {
        Self::from_config(feed, &SubscriptionConfig::default(), &RetryConfig::default())
    }

    pub fn from_config(feed: Arc<dyn MessageFeed>, config: &SubscriptionConfig, retries: &RetryConfig) -> Self {
        Self {
            feed,
            poll_interval: config.poll_interval(),
            page_size: config.page_size.max(1),
            retry: RetryPolicy::from(retries),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Backoff applied after feed errors.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Deliver messages with consensus timestamp at or after `start_time` to
    /// `on_message`, on a spawned task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn subscribe<F>(
        &self,
        topic_id: TopicId,
        start_time: Timestamp,
        limit: Option<usize>,
        on_message: F,
    ) -> SubscriptionHandle
    where
        F: FnMut(&TopicMessage) -> ControlFlow<()> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let (cancel, cancel_rx) = broadcast::channel(1);
        let worker = Worker {
            id,
            feed: self.feed.clone(),
            topic_id,
            poll_interval: self.poll_interval,
            page_size: self.page_size,
            retry: self.retry,
        };

        tracing::info!(
            subscription_id = %id,
            topic_id = %topic_id,
            start_time = %start_time,
            limit = ?limit,
            "Subscription opened"
        );

        let task = tokio::spawn(worker.run(start_time, limit, on_message, cancel_rx));
        SubscriptionHandle {
            id,
            topic_id,
            cancel,
            task,
        }
    }

    /// Same delivery as [`subscribe`](Self::subscribe), exposed as a stream.
    pub fn stream(
        &self,
        topic_id: TopicId,
        start_time: Timestamp,
        limit: Option<usize>,
    ) -> (SubscriptionHandle, impl Stream<Item = TopicMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(topic_id, start_time, limit, move |message| {
            // a dropped stream ends the subscription
            match tx.send(message.clone()) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        });
        let stream = futures_util::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|m| (m, rx)) });
        (handle, stream)
    }
}

/// Control over a running subscription.
#[must_use = "dropping a SubscriptionHandle cancels the subscription"]
pub struct SubscriptionHandle {
    id: Uuid,
    topic_id: TopicId,
    cancel: broadcast::Sender<()>,
    task: JoinHandle<SubscriptionSummary>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    /// Ask the delivery task to stop. No message is delivered after the
    /// task observes the request.
    pub fn cancel(&self) {
        let _ = self.cancel.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the delivery task to end.
    pub async fn join(self) -> LedgerResult<SubscriptionSummary> {
        let SubscriptionHandle { id, task, cancel, .. } = self;
        let result = task.await;
        drop(cancel);
        result.map_err(|e| LedgerError::State(format!("subscription {} task failed: {}", id, e)))
    }
}

struct Worker {
    id: Uuid,
    feed: Arc<dyn MessageFeed>,
    topic_id: TopicId,
    poll_interval: Duration,
    page_size: usize,
    retry: RetryPolicy,
}

impl Worker {
    async fn run<F>(
        self,
        start_time: Timestamp,
        limit: Option<usize>,
        mut on_message: F,
        mut cancel: broadcast::Receiver<()>,
    ) -> SubscriptionSummary
    where
        F: FnMut(&TopicMessage) -> ControlFlow<()> + Send + 'static,
    {
        let mut since = Since::AtOrAfter(start_time);
        let mut last_timestamp: Option<Timestamp> = None;
        let mut delivered = 0usize;
        let mut failures = 0u32;

        let reason = 'poll: loop {
            let wanted = match limit {
                Some(limit) if delivered >= limit => break StopReason::Limit,
                Some(limit) => (limit - delivered).min(self.page_size),
                None => self.page_size,
            };

            let page = tokio::select! {
                _ = cancel.recv() => break StopReason::Cancelled,
                page = self.feed.messages(self.topic_id, since, wanted) => page,
            };

            let pause = match page {
                Ok(mut messages) => {
                    failures = 0;
                    let full_page = messages.len() >= wanted;
                    messages.sort_by_key(|m| (m.consensus_timestamp, m.sequence_number));

                    for message in &messages {
                        let fresh = since.admits(message.consensus_timestamp)
                            && last_timestamp.map_or(true, |last| message.consensus_timestamp > last);
                        if !fresh || message.topic_id != self.topic_id {
                            continue;
                        }

                        delivered += 1;
                        last_timestamp = Some(message.consensus_timestamp);
                        since = Since::After(message.consensus_timestamp);
                        metrics::record_subscription_message();
                        tracing::debug!(
                            subscription_id = %self.id,
                            sequence_number = message.sequence_number,
                            consensus_timestamp = %message.consensus_timestamp,
                            "Message delivered"
                        );

                        if on_message(message).is_break() {
                            break 'poll StopReason::Consumer;
                        }
                        if limit.is_some_and(|limit| delivered >= limit) {
                            break 'poll StopReason::Limit;
                        }
                    }

                    // a full page means more may be waiting
                    if full_page {
                        Duration::ZERO
                    } else {
                        self.poll_interval
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = calculate_backoff(failures, self.retry.base_delay_ms, self.retry.max_delay_ms)
                        .max(self.poll_interval);
                    tracing::warn!(
                        subscription_id = %self.id,
                        topic_id = %self.topic_id,
                        attempt = failures,
                        delay = ?delay,
                        error = %e,
                        "Message feed failed, retrying"
                    );
                    delay
                }
            };

            if !pause.is_zero() {
                tokio::select! {
                    _ = cancel.recv() => break StopReason::Cancelled,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        };

        tracing::info!(
            subscription_id = %self.id,
            topic_id = %self.topic_id,
            delivered = delivered,
            reason = ?reason,
            "Subscription closed"
        );

        SubscriptionSummary {
            delivered,
            last_timestamp,
            reason,
        }
    }
}
