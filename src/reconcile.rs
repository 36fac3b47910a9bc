//! Merging a run into its job.
//!
//! A job sitting in `QUEUED` while a run exists for it has in fact been picked
//! up; the ledger just has not written the transition yet. The merge only ever
//! promotes `QUEUED` to `RUNNING`. A job is never demoted when its run goes
//! away.

use crate::codec::{Job, JobState, Run};

pub fn reconcile(job: Job, run: Option<&Run>) -> Job {
    match run {
        Some(run) if job.state == JobState::Queued => Job {
            state: JobState::Running,
            node: Some(run.node),
            time_start: Some(run.time),
            ..job
        },
        _ => job,
    }
}
