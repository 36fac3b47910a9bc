//! Account Codec: classification and decoding of raw account blobs.
//!
//! Classification is a lookup over a closed set of kinds, in a fixed priority
//! order; decoding is one pure function per kind. Nothing here performs I/O.

use crate::err::{ErrorKind, MonitorError};
use borsh::BorshDeserialize;
use bytes::Bytes;
use std::fmt::{Debug, Display, Formatter};

pub mod ipfs;
mod job;
pub mod layout;
mod market;
mod pubkey;
mod run;

pub use job::{Job, JobState};
pub use layout::DISCRIMINATOR_LEN;
pub use market::{Market, QueueType};
pub use pubkey::{PUBKEY_LEN, Pubkey};
pub use run::Run;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKind {
    Job,
    Run,
    Market,
}

impl AccountKind {
    /// Priority order used by [`identify`].
    pub const ALL: [AccountKind; 3] = [AccountKind::Job, AccountKind::Run, AccountKind::Market];

    pub fn discriminator(self) -> &'static [u8; DISCRIMINATOR_LEN] {
        match self {
            AccountKind::Job => &layout::JOB_DISCRIMINATOR,
            AccountKind::Run => &layout::RUN_DISCRIMINATOR,
            AccountKind::Market => &layout::MARKET_DISCRIMINATOR,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccountKind::Job => "job",
            AccountKind::Run => "run",
            AccountKind::Market => "market",
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A record type that lives in the program's account set.
pub trait Account: Sized + Send + 'static {
    const KIND: AccountKind;

    fn decode(data: &[u8]) -> Result<Self, DecodeError>;
}

/// A decoded record paired with the address it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<T> {
    pub address: Pubkey,
    pub account: T,
}

impl<T> Record<T> {
    pub fn new(address: Pubkey, account: T) -> Self {
        Self { address, account }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyAccount {
    Job(Job),
    Run(Run),
    Market(Market),
}

impl AnyAccount {
    pub fn kind(&self) -> AccountKind {
        match self {
            AnyAccount::Job(_) => AccountKind::Job,
            AnyAccount::Run(_) => AccountKind::Run,
            AnyAccount::Market(_) => AccountKind::Market,
        }
    }
}

/// A blob that does not fit the layout its kind promises. Keeps the
/// original bytes for diagnostics.
#[derive(Clone)]
pub struct DecodeError {
    kind: Option<AccountKind>,
    reason: String,
    data: Bytes,
}

impl DecodeError {
    pub fn new(kind: Option<AccountKind>, reason: impl Into<String>, data: &[u8]) -> Self {
        Self {
            kind,
            reason: reason.into(),
            data: Bytes::copy_from_slice(data),
        }
    }

    pub fn account_kind(&self) -> Option<AccountKind> {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Some(kind) => write!(
                f,
                "unable to decode {} account ({} bytes): {}",
                kind,
                self.data.len(),
                self.reason
            ),
            None => write!(
                f,
                "unable to classify account ({} bytes): {}",
                self.data.len(),
                self.reason
            ),
        }
    }
}

impl Debug for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let preview = &self.data[..self.data.len().min(16)];
        write!(
            f,
            "DecodeError {{ kind: {:?}, reason: {}, len: {}, head: {} }}",
            self.kind,
            self.reason,
            self.data.len(),
            hex::encode(preview)
        )
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for MonitorError {
    fn from(e: DecodeError) -> Self {
        let msg = e.to_string();
        MonitorError::new(ErrorKind::Decode, msg, file!(), line!(), Some(Box::new(e)))
    }
}

/// Classify a blob by its discriminator. `None` means the kind is unknown.
pub fn identify(data: &[u8]) -> Option<AccountKind> {
    if data.len() < DISCRIMINATOR_LEN {
        return None;
    }
    let head = &data[..DISCRIMINATOR_LEN];
    AccountKind::ALL
        .into_iter()
        .find(|kind| head == kind.discriminator())
}

pub fn decode(kind: AccountKind, data: &[u8]) -> Result<AnyAccount, DecodeError> {
    match kind {
        AccountKind::Job => Job::decode(data).map(AnyAccount::Job),
        AccountKind::Run => Run::decode(data).map(AnyAccount::Run),
        AccountKind::Market => Market::decode(data).map(AnyAccount::Market),
    }
}

/// Check the discriminator, then Borsh-decode the body. Trailing bytes are
/// allocation padding and are ignored.
pub(crate) fn decode_layout<L: BorshDeserialize>(
    kind: AccountKind,
    data: &[u8],
) -> Result<L, DecodeError> {
    if data.len() < DISCRIMINATOR_LEN || &data[..DISCRIMINATOR_LEN] != kind.discriminator() {
        return Err(DecodeError::new(Some(kind), "discriminator mismatch", data));
    }
    let mut body = &data[DISCRIMINATOR_LEN..];
    L::deserialize(&mut body).map_err(|e| DecodeError::new(Some(kind), e.to_string(), data))
}
