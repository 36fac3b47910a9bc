use super::classify;
use crate::codec::{AnyAccount, Job, Market, Pubkey, Record, Run};
use crate::err::{ErrorKind, MonitorError, Result};
use crate::rpc::AccountNotification;
use crate::subscription::{StopHandle, Subscription};
use crate::utilities::logger::Log;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::task::JoinHandle;

type Handler<T> = Box<dyn FnMut(Record<T>) -> Result<()> + Send>;
type ErrorHandler = Box<dyn FnMut(MonitorError) + Send>;

/// Typed callbacks for [`Monitor::watch`](super::Monitor::watch). Kinds
/// without a handler are logged and skipped.
#[derive(Default)]
pub struct Handlers {
    on_job: Option<Handler<Job>>,
    on_market: Option<Handler<Market>>,
    on_run: Option<Handler<Run>>,
    on_error: Option<ErrorHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_job<F>(mut self, f: F) -> Self
    where
        F: FnMut(Record<Job>) -> Result<()> + Send + 'static,
    {
        self.on_job = Some(Box::new(f));
        self
    }

    pub fn on_market<F>(mut self, f: F) -> Self
    where
        F: FnMut(Record<Market>) -> Result<()> + Send + 'static,
    {
        self.on_market = Some(Box::new(f));
        self
    }

    pub fn on_run<F>(mut self, f: F) -> Self
    where
        F: FnMut(Record<Run>) -> Result<()> + Send + 'static,
    {
        self.on_run = Some(Box::new(f));
        self
    }

    /// Receives decode failures and failing or panicking handlers.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(MonitorError) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    fn dispatch(&mut self, notification: AccountNotification, log: &Arc<dyn Log>) {
        let address = notification.address;
        let account = match classify(&notification) {
            Ok(Some(account)) => account,
            Ok(None) => {
                log.debug(format!("account {} closed", address));
                return;
            }
            Err(e) => {
                self.report(e.into(), log);
                return;
            }
        };

        let failure = match account {
            AnyAccount::Job(job) => invoke(&mut self.on_job, address, job, log),
            AnyAccount::Market(market) => invoke(&mut self.on_market, address, market, log),
            AnyAccount::Run(run) => invoke(&mut self.on_run, address, run, log),
        };
        if let Some(e) = failure {
            self.report(e, log);
        }
    }

    fn report(&mut self, e: MonitorError, log: &Arc<dyn Log>) {
        let Some(on_error) = self.on_error.as_mut() else {
            log.error(format!("monitor error: {:?}", e));
            return;
        };
        let msg = format!("{:?}", e);
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| on_error(e))) {
            log.error(format!(
                "error handler panicked ({}) while handling: {}",
                panic_message(&*panic),
                msg
            ));
        }
    }
}

fn invoke<T: crate::codec::Account>(
    handler: &mut Option<Handler<T>>,
    address: Pubkey,
    account: T,
    log: &Arc<dyn Log>,
) -> Option<MonitorError> {
    let kind = T::KIND;
    let Some(handler) = handler.as_mut() else {
        log.debug(format!("no handler for {} account {}", kind, address));
        return None;
    };

    match catch_unwind(AssertUnwindSafe(|| handler(Record::new(address, account)))) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(monitor_error_with_source!(
            ErrorKind::Handler,
            e,
            "{} handler failed for {}",
            kind,
            address
        )),
        Err(panic) => Some(monitor_error!(
            ErrorKind::Handler,
            "{} handler panicked for {}: {}",
            kind,
            address,
            panic_message(&*panic)
        )),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Running detailed-mode loop. Dropping the handle raises the stop flag
/// without waiting.
pub struct MonitorHandle {
    stop: StopHandle,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Raise the stop flag and wait for the loop to exit. A handler already
    /// running completes first; none runs after this returns.
    pub async fn stop(mut self) {
        self.stop.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

pub(super) fn spawn(
    mut subscription: Subscription,
    stop: StopHandle,
    mut handlers: Handlers,
    log: Arc<dyn Log>,
) -> MonitorHandle {
    let task = tokio::spawn(async move {
        log.info(format!("watching program {}", subscription.program()));
        while let Some(notification) = subscription.next().await {
            handlers.dispatch(notification, &log);
        }
        log.info(format!("stopped watching program {}", subscription.program()));
    });
    MonitorHandle {
        stop,
        task: Some(task),
    }
}
