use super::{Account, AccountKind, DecodeError, Pubkey, decode_layout};
use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};

#[derive(BorshSerialize, BorshDeserialize)]
pub(crate) struct RunLayout {
    pub job: Pubkey,
    pub node: Pubkey,
    pub payer: Pubkey,
    pub state: u8,
    pub time: i64,
}

/// Short-lived assignment of a job to the node executing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub job: Pubkey,
    pub node: Pubkey,
    pub payer: Pubkey,
    pub state: u8,
    /// Unix seconds at which the node picked up the job.
    pub time: i64,
}

impl Run {
    pub fn assigned_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

impl Account for Run {
    const KIND: AccountKind = AccountKind::Run;

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let layout: RunLayout = decode_layout(Self::KIND, data)?;
        Ok(Run {
            job: layout.job,
            node: layout.node,
            payer: layout.payer,
            state: layout.state,
            time: layout.time,
        })
    }
}
