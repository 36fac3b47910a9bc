//! Capabilities this crate consumes from the outside world, plus the
//! JSON-RPC and WebSocket implementations that talk to a real ledger node.

use crate::codec::Pubkey;
use crate::err::Result;
use crate::subscription::CancelToken;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

mod http;
mod ws;

pub use http::HttpRpc;
pub use ws::WsProgramSubscriber;

/// "Bytes at `offset` must equal `bytes`." Predicates are ANDed server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Evaluate the predicate locally.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len())
            .is_some_and(|window| window == self.bytes.as_slice())
    }
}

/// One account change pushed by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNotification {
    pub address: Pubkey,
    pub data: Bytes,
}

pub type NotificationStream = BoxStream<'static, Result<AccountNotification>>;

/// Point and predicate reads of raw account blobs.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// `None` when the account does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Bytes>>;

    /// One entry per requested address, in request order.
    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Bytes>>>;

    /// Every account owned by `program` that satisfies all `filters`.
    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Bytes)>>;
}

/// Push notifications for every account owned by a program.
#[async_trait]
pub trait ProgramSubscriber: Send + Sync {
    /// Opens one channel. The returned stream ends (usually after yielding an
    /// error) when the channel drops; `cancel` aborts both the open and the
    /// receive side.
    async fn subscribe(&self, program: &Pubkey, cancel: CancelToken) -> Result<NotificationStream>;
}
