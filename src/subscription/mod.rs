//! Persistent push subscription to one program, reopened after a fixed delay
//! whenever the channel fails or drops, until stopped.
//!
//! The loop is an explicit state machine driven by [`Subscription::next`]:
//!
//! ```text
//! Idle -> Connecting -> Streaming -> Error -> (delay) -> Connecting
//!            \              \           \
//!             +--------------+-----------+--> Stopped
//! ```
//!
//! Each call to `next` advances the machine until one notification is
//! available or the subscription is stopped. Nothing runs between calls.

mod cancel;

pub use cancel::{CancelToken, StopHandle, stop_pair};

use crate::codec::Pubkey;
use crate::constants::DEFAULT_RECONNECT_DELAY;
use crate::rpc::{AccountNotification, NotificationStream, ProgramSubscriber};
use crate::utilities::logger::Log;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Connecting,
    Streaming,
    Error,
    Stopped,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionState::Idle => "idle",
            SubscriptionState::Connecting => "connecting",
            SubscriptionState::Streaming => "streaming",
            SubscriptionState::Error => "error",
            SubscriptionState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Opens subscriptions through a [`ProgramSubscriber`].
#[derive(Clone)]
pub struct SubscriptionManager {
    subscriber: Arc<dyn ProgramSubscriber>,
    log: Arc<dyn Log>,
    reconnect_delay: Duration,
}

impl SubscriptionManager {
    pub fn new(subscriber: Arc<dyn ProgramSubscriber>, log: Arc<dyn Log>) -> Self {
        Self {
            subscriber,
            log,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// The channel is opened lazily by the first `next()`.
    pub fn start(&self, program: Pubkey) -> (Subscription, StopHandle) {
        let (stop, cancel) = stop_pair();
        let subscription = Subscription {
            program,
            subscriber: self.subscriber.clone(),
            log: self.log.clone(),
            reconnect_delay: self.reconnect_delay,
            state: SubscriptionState::Idle,
            stream: None,
            stop: stop.clone(),
            cancel,
            attempts: 0,
        };
        (subscription, stop)
    }
}

pub struct Subscription {
    program: Pubkey,
    subscriber: Arc<dyn ProgramSubscriber>,
    log: Arc<dyn Log>,
    reconnect_delay: Duration,
    state: SubscriptionState,
    stream: Option<NotificationStream>,
    stop: StopHandle,
    cancel: CancelToken,
    attempts: u64,
}

impl Subscription {
    pub fn program(&self) -> &Pubkey {
        &self.program
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Number of connect attempts so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Next raw notification, or `None` once stopped. Transport failures never
    /// surface here; they move the machine to `Error` and back to `Connecting`.
    pub async fn next(&mut self) -> Option<AccountNotification> {
        loop {
            if self.cancel.is_cancelled() && self.state != SubscriptionState::Stopped {
                self.enter_stopped();
            }

            match self.state {
                SubscriptionState::Stopped => return None,
                SubscriptionState::Idle | SubscriptionState::Connecting => self.connect().await,
                SubscriptionState::Streaming => {
                    if let Some(notification) = self.receive().await {
                        return Some(notification);
                    }
                }
                SubscriptionState::Error => self.back_off().await,
            }
        }
    }

    async fn connect(&mut self) {
        self.state = SubscriptionState::Connecting;
        self.attempts += 1;
        self.log.debug(format!(
            "subscribing to program {} (attempt {})",
            self.program, self.attempts
        ));

        let res = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            res = self.subscriber.subscribe(&self.program, self.cancel.clone()) => Some(res),
        };

        match res {
            // stop raised mid-connect, picked up at the top of the loop
            None => {}
            Some(Ok(stream)) => {
                self.log
                    .info(format!("subscribed to program {}", self.program));
                self.stream = Some(stream);
                self.state = SubscriptionState::Streaming;
            }
            Some(Err(e)) => {
                self.log.warn(format!(
                    "failed to subscribe to program {}: {}",
                    self.program, e
                ));
                self.state = SubscriptionState::Error;
            }
        }
    }

    async fn receive(&mut self) -> Option<AccountNotification> {
        let Some(stream) = self.stream.as_mut() else {
            self.state = SubscriptionState::Error;
            return None;
        };

        let item = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            item = stream.next() => item,
        };

        match item {
            Some(Ok(notification)) => {
                if self.cancel.is_cancelled() {
                    return None;
                }
                Some(notification)
            }
            Some(Err(e)) => {
                self.log.warn(format!(
                    "subscription to program {} dropped: {}",
                    self.program, e
                ));
                self.stream = None;
                self.state = SubscriptionState::Error;
                None
            }
            None => {
                self.log.warn(format!(
                    "subscription to program {} closed",
                    self.program
                ));
                self.stream = None;
                self.state = SubscriptionState::Error;
                None
            }
        }
    }

    async fn back_off(&mut self) {
        self.log.info(format!(
            "reconnecting to program {} in {:?}",
            self.program, self.reconnect_delay
        ));
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.reconnect_delay) => {
                self.state = SubscriptionState::Connecting;
            }
        }
    }

    fn enter_stopped(&mut self) {
        self.stream = None;
        self.state = SubscriptionState::Stopped;
        self.log
            .info(format!("subscription to program {} stopped", self.program));
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("program", &self.program)
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .finish()
    }
}
