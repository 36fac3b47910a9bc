//! Program-derived addresses and the cache that memoises them.

use crate::codec::Pubkey;
use crate::err::{ErrorKind, Result};
use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

pub const MAX_SEEDS: usize = 16;
pub const MAX_SEED_LEN: usize = 32;
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

const REFLECTION_SEED: &[u8] = b"reflection";

fn check_seeds(seeds: &[&[u8]], max_seeds: usize) -> Result<()> {
    if seeds.len() > max_seeds {
        return Err(monitor_error!(
            ErrorKind::Config,
            "{} seeds given, at most {} allowed",
            seeds.len(),
            max_seeds
        ));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(monitor_error!(
            ErrorKind::Config,
            "seed of {} bytes exceeds {}",
            seed.len(),
            MAX_SEED_LEN
        ));
    }
    Ok(())
}

/// `None` when the hash lands on the ed25519 curve.
fn off_curve_hash(seeds: &[&[u8]], program: &Pubkey) -> Option<Pubkey> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program.as_bytes());
    hasher.update(PDA_MARKER);
    let hash: [u8; 32] = hasher.finalize().into();

    match CompressedEdwardsY(hash).decompress() {
        Some(_) => None,
        None => Some(Pubkey::new(hash)),
    }
}

/// Derive the address for `seeds` under `program`. Fails when the seeds are
/// oversized or the hash lands on the ed25519 curve.
pub fn create_program_address(seeds: &[&[u8]], program: &Pubkey) -> Result<Pubkey> {
    check_seeds(seeds, MAX_SEEDS)?;
    off_curve_hash(seeds, program).ok_or_else(|| {
        monitor_error!(
            ErrorKind::Config,
            "derived address for program {} lies on the curve",
            program
        )
    })
}

/// Search bumps from 255 downwards; returns the first off-curve address and
/// its bump.
pub fn find_program_address(seeds: &[&[u8]], program: &Pubkey) -> Result<(Pubkey, u8)> {
    // one slot is taken by the bump
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);
        if let Some(address) = off_curve_hash(&with_bump, program) {
            return Ok((address, bump));
        }
    }
    Err(monitor_error!(
        ErrorKind::Config,
        "no viable bump for program {}",
        program
    ))
}

/// Memoised derived addresses, keyed by name. The first caller for a key
/// runs the derivation; concurrent callers wait on the same cell. A failed
/// derivation leaves the key empty so a later call retries.
#[derive(Default)]
pub struct DerivedAddressCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Pubkey>>>>,
}

impl DerivedAddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_derive<F, Fut>(&self, key: &str, derive: F) -> Result<Pubkey>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Pubkey>>,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
            cells.entry(key.to_string()).or_default().clone()
        };
        cell.get_or_try_init(derive).await.copied()
    }

    pub fn cached(&self, key: &str) -> Option<Pubkey> {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.get(key).and_then(|cell| cell.get().copied())
    }
}

impl std::fmt::Debug for DerivedAddressCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.cells.lock().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("DerivedAddressCache").field("keys", &n).finish()
    }
}

/// Program ids the marketplace is deployed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub jobs: Pubkey,
    pub rewards: Pubkey,
    pub nos_mint: Pubkey,
}

impl ProgramIds {
    pub fn parse(jobs: &str, rewards: &str, nos_mint: &str) -> Result<Self> {
        Ok(Self {
            jobs: Pubkey::from_str(jobs)?,
            rewards: Pubkey::from_str(rewards)?,
            nos_mint: Pubkey::from_str(nos_mint)?,
        })
    }

    pub fn mainnet() -> Result<Self> {
        use crate::constants::{JOBS_PROGRAM_ID, NOS_MINT, REWARDS_PROGRAM_ID};
        Self::parse(JOBS_PROGRAM_ID, REWARDS_PROGRAM_ID, NOS_MINT)
    }
}

/// Fixed protocol addresses, derived once per cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAccounts {
    pub jobs_program: Pubkey,
    pub rewards_program: Pubkey,
    pub nos_mint: Pubkey,
    pub rewards_reflection: Pubkey,
    pub rewards_vault: Pubkey,
}

impl StaticAccounts {
    pub async fn resolve(cache: &DerivedAddressCache, ids: &ProgramIds) -> Result<Self> {
        let rewards = ids.rewards;
        let mint = ids.nos_mint;

        let reflection = cache
            .get_or_derive(&format!("rewards_reflection:{}", rewards), || async move {
                find_program_address(&[REFLECTION_SEED], &rewards).map(|(a, _)| a)
            })
            .await?;
        let vault = cache
            .get_or_derive(&format!("rewards_vault:{}:{}", rewards, mint), || async move {
                find_program_address(&[mint.as_bytes().as_slice()], &rewards).map(|(a, _)| a)
            })
            .await?;

        Ok(Self {
            jobs_program: ids.jobs,
            rewards_program: ids.rewards,
            nos_mint: ids.nos_mint,
            rewards_reflection: reflection,
            rewards_vault: vault,
        })
    }
}
