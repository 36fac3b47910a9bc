//! Wire-level layout of the program's accounts.
//!
//! Every account starts with an 8-byte discriminator, followed by the Borsh
//! encoding of its fields. The offsets below are part of the wire contract:
//! server-side predicates compare bytes at exactly these positions.

use sha2::{Digest, Sha256};

pub const DISCRIMINATOR_LEN: usize = 8;

/// `sha256("account:JobAccount")[..8]`
pub const JOB_DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] = [91, 16, 162, 5, 45, 210, 125, 65];
/// `sha256("account:RunAccount")[..8]`
pub const RUN_DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] = [194, 169, 110, 230, 235, 11, 225, 22];
/// `sha256("account:MarketAccount")[..8]`
pub const MARKET_DISCRIMINATOR: [u8; DISCRIMINATOR_LEN] = [201, 78, 187, 225, 240, 198, 201, 251];

pub mod job {
    pub const IPFS_JOB: usize = 8;
    pub const IPFS_RESULT: usize = 40;
    pub const MARKET: usize = 72;
    pub const NODE: usize = 104;
    pub const PAYER: usize = 136;
    pub const PRICE: usize = 168;
    pub const PROJECT: usize = 176;
    pub const STATE: usize = 208;
    pub const TIME_END: usize = 209;
    pub const TIME_START: usize = 217;
    pub const SIZE: usize = 225;
}

pub mod run {
    pub const JOB: usize = 8;
    pub const NODE: usize = 40;
    pub const PAYER: usize = 72;
    pub const STATE: usize = 104;
    pub const TIME: usize = 105;
    pub const SIZE: usize = 113;
}

/// Anchor-style account discriminator for a type name.
pub fn account_discriminator(type_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("account:{}", type_name).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}
