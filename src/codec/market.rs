use super::{Account, AccountKind, DecodeError, Pubkey, decode_layout};
use borsh::{BorshDeserialize, BorshSerialize};

#[derive(BorshSerialize, BorshDeserialize)]
pub(crate) struct MarketLayout {
    pub authority: Pubkey,
    pub job_expiration: i64,
    pub job_price: u64,
    pub job_timeout: i64,
    pub job_type: u8,
    pub vault: Pubkey,
    pub vault_bump: u8,
    pub node_access_key: Pubkey,
    pub node_xnos_minimum: u128,
    pub queue_type: u8,
    pub queue: Vec<Pubkey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// The queue holds jobs waiting for a node.
    JobQueue = 0,
    /// The queue holds nodes waiting for a job.
    NodeQueue = 1,
}

impl TryFrom<u8> for QueueType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QueueType::JobQueue),
            1 => Ok(QueueType::NodeQueue),
            other => Err(other),
        }
    }
}

/// Pricing and queueing context jobs are submitted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub authority: Pubkey,
    pub job_expiration: i64,
    pub job_price: u64,
    pub job_timeout: i64,
    pub job_type: u8,
    pub vault: Pubkey,
    pub vault_bump: u8,
    pub node_access_key: Pubkey,
    pub node_stake_minimum: u128,
    pub queue_type: QueueType,
    pub queue: Vec<Pubkey>,
}

impl Account for Market {
    const KIND: AccountKind = AccountKind::Market;

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let layout: MarketLayout = decode_layout(Self::KIND, data)?;
        let queue_type = QueueType::try_from(layout.queue_type).map_err(|q| {
            DecodeError::new(Some(Self::KIND), format!("unknown queue type {}", q), data)
        })?;
        Ok(Market {
            authority: layout.authority,
            job_expiration: layout.job_expiration,
            job_price: layout.job_price,
            job_timeout: layout.job_timeout,
            job_type: layout.job_type,
            vault: layout.vault,
            vault_bump: layout.vault_bump,
            node_access_key: layout.node_access_key,
            node_stake_minimum: layout.node_xnos_minimum,
            queue_type,
            queue: layout.queue,
        })
    }
}
