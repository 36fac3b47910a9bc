//! Live feed of the program's account changes.
//!
//! Both consumption modes sit on one [`Subscription`](crate::subscription::Subscription)
//! and classify notifications the same way:
//!
//! - [`Monitor::watch`] calls typed handlers, one per account kind.
//! - [`Monitor::events`] yields job and market events; run updates are folded
//!   into the job they belong to before they reach the consumer.

mod events;
mod handlers;

pub use events::{EventStream, MonitorEvent};
pub use handlers::{Handlers, MonitorHandle};

use crate::codec::{self, AnyAccount, DecodeError};
use crate::constants::DEFAULT_UNIFIED_CHANNEL_BOUND;
use crate::query::AccountReader;
use crate::rpc::AccountNotification;
use crate::subscription::SubscriptionManager;
use crate::utilities::logger::Log;
use std::sync::Arc;

#[derive(Clone)]
pub struct Monitor {
    subscriptions: SubscriptionManager,
    reader: AccountReader,
    log: Arc<dyn Log>,
    channel_bound: usize,
}

impl Monitor {
    /// `reader` supplies the program id and the lookups unified mode needs.
    pub fn new(subscriptions: SubscriptionManager, reader: AccountReader, log: Arc<dyn Log>) -> Self {
        Self {
            subscriptions,
            reader,
            log,
            channel_bound: DEFAULT_UNIFIED_CHANNEL_BOUND,
        }
    }

    /// Capacity of the queue between the unified loop and its consumer.
    pub fn with_channel_bound(mut self, bound: usize) -> Self {
        self.channel_bound = bound.max(1);
        self
    }

    pub fn reader(&self) -> &AccountReader {
        &self.reader
    }

    pub fn watch(&self, handlers: Handlers) -> MonitorHandle {
        let (subscription, stop) = self.subscriptions.start(*self.reader.program());
        handlers::spawn(subscription, stop, handlers, self.log.clone())
    }

    pub fn events(&self) -> EventStream {
        let (subscription, stop) = self.subscriptions.start(*self.reader.program());
        events::spawn(
            subscription,
            stop,
            self.reader.clone(),
            self.log.clone(),
            self.channel_bound,
        )
    }
}

/// `Ok(None)` for a closed account, whose notification carries no data.
pub(crate) fn classify(
    notification: &AccountNotification,
) -> Result<Option<AnyAccount>, DecodeError> {
    let data = &notification.data;
    if data.is_empty() {
        return Ok(None);
    }
    let kind = codec::identify(data)
        .ok_or_else(|| DecodeError::new(None, "unknown discriminator", data))?;
    codec::decode(kind, data).map(Some)
}
