//! Live event notification channel.
//!
//! The transport delivers ordered, at-least-once notifications scoped to
//! one job. The core subscribes around live-session boundaries and decodes
//! payloads at this boundary; the transport itself stays external.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::model::FetchError;

/// One notification from the live channel, payload still undecoded.
#[derive(Debug, Clone)]
pub enum LiveNotification {
    /// A job produced output.
    Event(serde_json::Value),
    /// The job changed state.
    Status(serde_json::Value),
}

/// An active subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<LiveNotification>,
}

impl Subscription {
    /// Wrap a notification receiver.
    pub fn new(receiver: mpsc::Receiver<LiveNotification>) -> Self {
        Self { receiver }
    }

    /// Wait for the next notification. `None` once the feed closes.
    pub async fn recv(&mut self) -> Option<LiveNotification> {
        self.receiver.recv().await
    }
}

/// Subscribing side of the live notification channel.
#[async_trait]
pub trait LiveFeed: Send {
    /// Open a subscription for the viewed job.
    ///
    /// # Errors
    ///
    /// [`FetchError`] when the transport cannot establish the subscription.
    async fn subscribe(&mut self) -> Result<Subscription, FetchError>;
}

/// In-process [`LiveFeed`] over an mpsc channel.
///
/// Hosts hold the [`LivePublisher`] and push notifications as the
/// transport delivers them; re-subscription replaces the channel, so a
/// dropped [`Subscription`] stops receiving.
#[derive(Debug)]
pub struct ChannelFeed {
    outlet: Arc<Mutex<Option<mpsc::Sender<LiveNotification>>>>,
    buffer: usize,
}

/// Publishing side of a [`ChannelFeed`].
#[derive(Debug, Clone)]
pub struct LivePublisher {
    outlet: Arc<Mutex<Option<mpsc::Sender<LiveNotification>>>>,
}

impl ChannelFeed {
    /// Create a feed buffering up to `buffer` undelivered notifications.
    pub fn new(buffer: usize) -> (Self, LivePublisher) {
        let outlet = Arc::new(Mutex::new(None));
        (
            Self {
                outlet: Arc::clone(&outlet),
                buffer: buffer.max(1),
            },
            LivePublisher { outlet },
        )
    }
}

impl LivePublisher {
    /// Deliver a notification to the current subscriber.
    ///
    /// Returns `false` when no subscription is active or the subscriber
    /// went away; at-least-once transports simply move on.
    pub async fn publish(&self, notification: LiveNotification) -> bool {
        let sender = self.outlet.lock().await.clone();
        match sender {
            Some(sender) => sender.send(notification).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl LiveFeed for ChannelFeed {
    async fn subscribe(&mut self) -> Result<Subscription, FetchError> {
        let (sender, receiver) = mpsc::channel(self.buffer);
        *self.outlet.lock().await = Some(sender);
        Ok(Subscription::new(receiver))
    }
}
