use super::ipfs::cid_or_none;
use super::{Account, AccountKind, DecodeError, Pubkey, decode_layout};
use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

#[derive(BorshSerialize, BorshDeserialize)]
pub(crate) struct JobLayout {
    pub ipfs_job: [u8; 32],
    pub ipfs_result: [u8; 32],
    pub market: Pubkey,
    pub node: Pubkey,
    pub payer: Pubkey,
    pub price: u64,
    pub project: Pubkey,
    pub state: u8,
    pub time_end: i64,
    pub time_start: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued = 0,
    Running = 1,
    Completed = 2,
    Stopped = 3,
}

impl JobState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Stopped)
    }
}

impl TryFrom<u8> for JobState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(JobState::Queued),
            1 => Ok(JobState::Running),
            2 => Ok(JobState::Completed),
            3 => Ok(JobState::Stopped),
            other => Err(other),
        }
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Completed => "COMPLETED",
            JobState::Stopped => "STOPPED",
        };
        write!(f, "{}", s)
    }
}

/// One unit of requested work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// CID of the work definition.
    pub ipfs_job: Option<String>,
    /// CID of the posted result, once there is one.
    pub ipfs_result: Option<String>,
    pub market: Pubkey,
    pub node: Option<Pubkey>,
    pub payer: Pubkey,
    pub price: u64,
    pub project: Pubkey,
    pub state: JobState,
    /// Unix seconds.
    pub time_start: Option<i64>,
    /// Unix seconds.
    pub time_end: Option<i64>,
}

impl Job {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.time_start.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.time_end.and_then(|t| DateTime::from_timestamp(t, 0))
    }
}

fn optional_time(t: i64) -> Option<i64> {
    (t != 0).then_some(t)
}

impl Account for Job {
    const KIND: AccountKind = AccountKind::Job;

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let layout: JobLayout = decode_layout(Self::KIND, data)?;
        let state = JobState::try_from(layout.state).map_err(|s| {
            DecodeError::new(Some(Self::KIND), format!("unknown job state {}", s), data)
        })?;
        Ok(Job {
            ipfs_job: cid_or_none(&layout.ipfs_job),
            ipfs_result: cid_or_none(&layout.ipfs_result),
            market: layout.market,
            node: layout.node.non_default(),
            payer: layout.payer,
            price: layout.price,
            project: layout.project,
            state,
            time_start: optional_time(layout.time_start),
            time_end: optional_time(layout.time_end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::layout::{self, JOB_DISCRIMINATOR};
    use crate::codec::{AnyAccount, decode, identify};

    fn sample_layout() -> JobLayout {
        JobLayout {
            ipfs_job: [9u8; 32],
            ipfs_result: [0u8; 32],
            market: Pubkey::new([1u8; 32]),
            node: Pubkey::new([2u8; 32]),
            payer: Pubkey::new([3u8; 32]),
            price: 1_500_000,
            project: Pubkey::new([4u8; 32]),
            state: JobState::Running.as_u8(),
            time_end: 0,
            time_start: 1_700_000_000,
        }
    }

    fn blob(l: &JobLayout) -> Vec<u8> {
        let mut out = JOB_DISCRIMINATOR.to_vec();
        out.extend(borsh::to_vec(l).unwrap());
        out
    }

    #[test]
    fn layout_offsets_match_the_filter_contract() {
        let data = blob(&sample_layout());
        assert_eq!(data.len(), layout::job::SIZE);
        assert_eq!(&data[layout::job::MARKET..layout::job::MARKET + 32], &[1u8; 32]);
        assert_eq!(&data[layout::job::NODE..layout::job::NODE + 32], &[2u8; 32]);
        assert_eq!(&data[layout::job::PAYER..layout::job::PAYER + 32], &[3u8; 32]);
        assert_eq!(&data[layout::job::PROJECT..layout::job::PROJECT + 32], &[4u8; 32]);
        assert_eq!(data[layout::job::STATE], JobState::Running.as_u8());
        assert_eq!(
            &data[layout::job::PRICE..layout::job::PRICE + 8],
            &1_500_000u64.to_le_bytes()
        );
        assert_eq!(
            &data[layout::job::TIME_START..layout::job::TIME_START + 8],
            &1_700_000_000i64.to_le_bytes()
        );
    }

    #[test]
    fn decodes_running_job() {
        let data = blob(&sample_layout());
        assert_eq!(identify(&data), Some(AccountKind::Job));
        let job = Job::decode(&data).expect("well-formed job");
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.node, Some(Pubkey::new([2u8; 32])));
        assert_eq!(job.price, 1_500_000);
        assert_eq!(job.time_start, Some(1_700_000_000));
        assert_eq!(job.time_end, None);
        assert!(job.ipfs_job.is_some());
        // empty-hash sentinel is reported as absent
        assert_eq!(job.ipfs_result, None);
        assert_eq!(
            job.started_at().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn queued_job_without_node_and_padding_is_fine() {
        let mut l = sample_layout();
        l.node = Pubkey::default();
        l.state = JobState::Queued.as_u8();
        l.time_start = 0;
        let mut data = blob(&l);
        data.extend_from_slice(&[0u8; 31]);
        match decode(AccountKind::Job, &data).expect("decodes") {
            AnyAccount::Job(job) => {
                assert_eq!(job.state, JobState::Queued);
                assert_eq!(job.node, None);
                assert_eq!(job.time_start, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn truncated_or_bad_state_is_a_decode_error() {
        let data = blob(&sample_layout());
        let err = Job::decode(&data[..100]).unwrap_err();
        assert_eq!(err.data().len(), 100);

        let mut l = sample_layout();
        l.state = 9;
        let err = Job::decode(&blob(&l)).unwrap_err();
        assert!(err.reason().contains("unknown job state 9"));
    }

    #[test]
    fn state_conversions() {
        for s in [
            JobState::Queued,
            JobState::Running,
            JobState::Completed,
            JobState::Stopped,
        ] {
            assert_eq!(JobState::try_from(s.as_u8()), Ok(s));
        }
        assert_eq!(JobState::try_from(4), Err(4));
        assert!(JobState::Stopped.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert_eq!(JobState::Completed.to_string(), "COMPLETED");
    }
}
