use super::classify;
use crate::codec::{AnyAccount, Job, JobState, Market, Pubkey, Record, Run};
use crate::err::Result;
use crate::query::AccountReader;
use crate::reconcile::reconcile;
use crate::rpc::AccountNotification;
use crate::subscription::{StopHandle, Subscription};
use crate::utilities::logger::Log;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One item of the unified feed. Runs never appear on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Job(Record<Job>),
    Market(Record<Market>),
}

/// Unified-mode feed. Yields `Err` items for undecodable notifications and
/// failed lookups; the feed itself keeps going.
pub struct EventStream {
    rx: mpsc::Receiver<Result<MonitorEvent>>,
    stop: StopHandle,
    task: Option<JoinHandle<()>>,
}

impl EventStream {
    /// `None` once stopped.
    pub async fn next(&mut self) -> Option<Result<MonitorEvent>> {
        if self.stop.is_stopped() {
            return None;
        }
        self.rx.recv().await
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Raise the stop flag and wait for the loop to exit.
    pub async fn stop(mut self) {
        self.stop.stop();
        self.rx.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Stream for EventStream {
    type Item = Result<MonitorEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.stop.is_stopped() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

async fn route(
    reader: &AccountReader,
    notification: AccountNotification,
    log: &Arc<dyn Log>,
) -> Option<Result<MonitorEvent>> {
    let address = notification.address;
    let account = match classify(&notification) {
        Ok(Some(account)) => account,
        Ok(None) => {
            log.debug(format!("account {} closed", address));
            return None;
        }
        Err(e) => return Some(Err(e.into())),
    };

    let event = match account {
        AnyAccount::Market(market) => Ok(MonitorEvent::Market(Record::new(address, market))),
        AnyAccount::Job(job) => Ok(job_update(reader, address, job, log).await),
        AnyAccount::Run(run) => run_update(reader, run).await,
    };
    Some(event)
}

/// A failed run lookup only costs the enrichment; the job is still emitted.
async fn job_update(
    reader: &AccountReader,
    address: Pubkey,
    job: Job,
    log: &Arc<dyn Log>,
) -> MonitorEvent {
    if job.state != JobState::Queued {
        return MonitorEvent::Job(Record::new(address, job));
    }
    let job = match reader.run_for_job(&address).await {
        Ok(run) => reconcile(job, run.as_ref().map(|r| &r.account)),
        Err(e) => {
            log.warn(format!(
                "failed to look up run for job {}, emitting it unreconciled: {}",
                address, e
            ));
            job
        }
    };
    MonitorEvent::Job(Record::new(address, job))
}

async fn run_update(reader: &AccountReader, run: Run) -> Result<MonitorEvent> {
    let record: Record<Job> = reader.get(&run.job).await.map_err(|e| {
        let kind = e.kind();
        monitor_error_with_source!(kind, e, "failed to fetch job {} for run", run.job)
    })?;
    let job = reconcile(record.account, Some(&run));
    Ok(MonitorEvent::Job(Record::new(record.address, job)))
}

pub(super) fn spawn(
    mut subscription: Subscription,
    stop: StopHandle,
    reader: AccountReader,
    log: Arc<dyn Log>,
    bound: usize,
) -> EventStream {
    let (tx, rx) = mpsc::channel(bound);
    let cancel = stop.token();

    let task = tokio::spawn(async move {
        log.info(format!("streaming events of program {}", subscription.program()));
        while let Some(notification) = subscription.next().await {
            let Some(item) = route(&reader, notification, &log).await else {
                continue;
            };
            if cancel.is_cancelled() {
                break;
            }
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                res = tx.send(item) => res.is_ok(),
            };
            if !sent {
                break;
            }
        }
        subscription.stop();
        log.info(format!("stopped streaming events of program {}", subscription.program()));
    });

    EventStream {
        rx,
        stop,
        task: Some(task),
    }
}
