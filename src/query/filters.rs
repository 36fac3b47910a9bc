use crate::codec::layout::{job, run};
use crate::codec::{Account, Job, JobState, Market, Pubkey, Run};
use crate::rpc::MemcmpFilter;

/// Field-equality predicates for one account kind. The discriminator
/// predicate is added by [`predicate`](super::predicate), not here.
pub trait AccountFilter: Send + Sync {
    type Account: Account;

    fn field_filters(&self) -> Vec<MemcmpFilter>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub state: Option<JobState>,
    pub market: Option<Pubkey>,
    pub node: Option<Pubkey>,
    pub project: Option<Pubkey>,
}

impl JobFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn market(mut self, market: Pubkey) -> Self {
        self.market = Some(market);
        self
    }

    pub fn node(mut self, node: Pubkey) -> Self {
        self.node = Some(node);
        self
    }

    pub fn project(mut self, project: Pubkey) -> Self {
        self.project = Some(project);
        self
    }
}

impl AccountFilter for JobFilter {
    type Account = Job;

    fn field_filters(&self) -> Vec<MemcmpFilter> {
        let mut out = Vec::new();
        if let Some(state) = self.state {
            out.push(MemcmpFilter::new(job::STATE, vec![state.as_u8()]));
        }
        if let Some(project) = &self.project {
            out.push(MemcmpFilter::new(job::PROJECT, project.as_bytes().to_vec()));
        }
        if let Some(node) = &self.node {
            out.push(MemcmpFilter::new(job::NODE, node.as_bytes().to_vec()));
        }
        if let Some(market) = &self.market {
            out.push(MemcmpFilter::new(job::MARKET, market.as_bytes().to_vec()));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub job: Option<Pubkey>,
    pub node: Option<Pubkey>,
}

impl RunFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(mut self, job: Pubkey) -> Self {
        self.job = Some(job);
        self
    }

    pub fn node(mut self, node: Pubkey) -> Self {
        self.node = Some(node);
        self
    }
}

impl AccountFilter for RunFilter {
    type Account = Run;

    fn field_filters(&self) -> Vec<MemcmpFilter> {
        let mut out = Vec::new();
        if let Some(node) = &self.node {
            out.push(MemcmpFilter::new(run::NODE, node.as_bytes().to_vec()));
        }
        if let Some(job) = &self.job {
            out.push(MemcmpFilter::new(run::JOB, job.as_bytes().to_vec()));
        }
        out
    }
}

/// Markets carry no filterable fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketFilter;

impl AccountFilter for MarketFilter {
    type Account = Market;

    fn field_filters(&self) -> Vec<MemcmpFilter> {
        Vec::new()
    }
}
