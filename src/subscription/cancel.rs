use std::sync::Arc;
use tokio::sync::watch;

/// Owner side of a stop flag. Clones share the same flag.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observer side of a stop flag, handed to network operations so they can
/// abort a pending call.
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub fn stop_pair() -> (StopHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

impl StopHandle {
    /// Raise the flag. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the flag is raised, or once every `StopHandle` is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}
