//! Point-in-time reads of the program's account set.
//!
//! Bulk reads send one predicate query and decode every returned blob on its
//! own: a blob that fails to decode is logged and dropped, the rest of the
//! result survives. Transport failures abort the call. Nothing is retried.

mod filters;

pub use filters::{AccountFilter, JobFilter, MarketFilter, RunFilter};

use crate::address::{DerivedAddressCache, ProgramIds, StaticAccounts};
use crate::codec::{Account, Job, JobState, Market, Pubkey, Record, Run};
use crate::err::{ErrorKind, Result};
use crate::reconcile::reconcile;
use crate::rpc::{AccountSource, MemcmpFilter};
use crate::utilities::logger::Log;
use std::collections::HashMap;
use std::sync::Arc;

/// Full predicate for `filter`: the discriminator at offset 0, then the
/// field predicates.
pub fn predicate<F: AccountFilter>(filter: &F) -> Vec<MemcmpFilter> {
    let kind = <F::Account as Account>::KIND;
    let mut out = vec![MemcmpFilter::new(0, kind.discriminator().to_vec())];
    out.extend(filter.field_filters());
    out
}

#[derive(Clone)]
pub struct AccountReader {
    source: Arc<dyn AccountSource>,
    ids: ProgramIds,
    log: Arc<dyn Log>,
    cache: Arc<DerivedAddressCache>,
}

impl AccountReader {
    pub fn new(source: Arc<dyn AccountSource>, ids: ProgramIds, log: Arc<dyn Log>) -> Self {
        Self {
            source,
            ids,
            log,
            cache: Arc::new(DerivedAddressCache::new()),
        }
    }

    /// Share a derived-address cache with other components.
    pub fn with_cache(mut self, cache: Arc<DerivedAddressCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn program(&self) -> &Pubkey {
        &self.ids.jobs
    }

    pub fn source(&self) -> &Arc<dyn AccountSource> {
        &self.source
    }

    /// Every account of `F::Account`'s kind matching `filter`.
    pub async fn all<F: AccountFilter>(&self, filter: &F) -> Result<Vec<Record<F::Account>>> {
        let kind = <F::Account as Account>::KIND;
        let raw = self
            .source
            .get_program_accounts(&self.ids.jobs, &predicate(filter))
            .await
            .map_err(|e| {
                let kind_of_failure = e.kind();
                monitor_error_with_source!(
                    kind_of_failure,
                    e,
                    "failed to fetch {} accounts of program {}",
                    kind,
                    self.ids.jobs
                )
            })?;

        let total = raw.len();
        let mut out = Vec::with_capacity(total);
        for (address, data) in raw {
            match F::Account::decode(&data) {
                Ok(account) => out.push(Record::new(address, account)),
                Err(e) => self.log.warn(format!("skipping account {}: {}", address, e)),
            }
        }
        if out.len() < total {
            self.log.debug(format!(
                "{} of {} {} accounts decoded",
                out.len(),
                total,
                kind
            ));
        }
        Ok(out)
    }

    pub async fn jobs(&self, filter: &JobFilter) -> Result<Vec<Record<Job>>> {
        self.all(filter).await
    }

    pub async fn runs(&self, filter: &RunFilter) -> Result<Vec<Record<Run>>> {
        self.all(filter).await
    }

    pub async fn markets(&self) -> Result<Vec<Record<Market>>> {
        self.all(&MarketFilter).await
    }

    /// One account by address. A missing account is `NotFound`; a blob that
    /// does not decode as `T` is `Decode`.
    pub async fn get<T: Account>(&self, address: &Pubkey) -> Result<Record<T>> {
        let data = self.source.get_account(address).await?.ok_or_else(|| {
            monitor_error!(
                ErrorKind::NotFound,
                "{} account {} not found",
                T::KIND,
                address
            )
        })?;
        let account = T::decode(&data)?;
        Ok(Record::new(*address, account))
    }

    /// Missing and undecodable accounts are left out of the result.
    pub async fn get_many<T: Account>(&self, addresses: &[Pubkey]) -> Result<Vec<Record<T>>> {
        let blobs = self.source.get_multiple_accounts(addresses).await?;
        let mut out = Vec::with_capacity(blobs.len());
        for (address, blob) in addresses.iter().zip(blobs) {
            let Some(data) = blob else {
                self.log
                    .debug(format!("{} account {} not found", T::KIND, address));
                continue;
            };
            match T::decode(&data) {
                Ok(account) => out.push(Record::new(*address, account)),
                Err(e) => self.log.warn(format!("skipping account {}: {}", address, e)),
            }
        }
        Ok(out)
    }

    /// The run currently assigned to `job`, if any.
    pub async fn run_for_job(&self, job: &Pubkey) -> Result<Option<Record<Run>>> {
        let mut runs = self.runs(&RunFilter::new().job(*job)).await?;
        if runs.len() > 1 {
            self.log
                .warn(format!("{} runs found for job {}", runs.len(), job));
        }
        Ok(runs.pop())
    }

    /// Like [`get`](Self::get), with the job's run merged in.
    pub async fn job_with_run(&self, address: &Pubkey) -> Result<Record<Job>> {
        let record: Record<Job> = self.get(address).await?;
        if record.account.state != JobState::Queued {
            return Ok(record);
        }
        let run = self.run_for_job(address).await?;
        Ok(Record::new(
            record.address,
            reconcile(record.account, run.as_ref().map(|r| &r.account)),
        ))
    }

    /// Like [`jobs`](Self::jobs), with runs merged in. Issues one extra run
    /// query when any matching job is queued.
    pub async fn jobs_with_runs(&self, filter: &JobFilter) -> Result<Vec<Record<Job>>> {
        let jobs = self.jobs(filter).await?;
        if !jobs.iter().any(|r| r.account.state == JobState::Queued) {
            return Ok(jobs);
        }

        let runs: HashMap<Pubkey, Run> = self
            .runs(&RunFilter::new())
            .await?
            .into_iter()
            .map(|r| (r.account.job, r.account))
            .collect();

        Ok(jobs
            .into_iter()
            .map(|r| {
                let run = runs.get(&r.address);
                Record::new(r.address, reconcile(r.account, run))
            })
            .collect())
    }

    pub async fn static_accounts(&self) -> Result<StaticAccounts> {
        StaticAccounts::resolve(&self.cache, &self.ids).await
    }
}
