#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use marketwatch::codec::layout::{JOB_DISCRIMINATOR, MARKET_DISCRIMINATOR, RUN_DISCRIMINATOR};
use marketwatch::err::{ErrorKind, MonitorError, Result};
use marketwatch::rpc::{
    AccountNotification, AccountSource, MemcmpFilter, NotificationStream, ProgramSubscriber,
};
use marketwatch::subscription::CancelToken;
use marketwatch::{Pubkey, monitor_error};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub fn key(n: u8) -> Pubkey {
    Pubkey::new([n; 32])
}

fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Job fields, written at the documented byte offsets by [`job_blob`].
#[derive(Clone, Debug)]
pub struct JobFields {
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

impl Default for JobFields {
    fn default() -> Self {
        let mut ipfs_job = [0u8; 32];
        for (i, b) in ipfs_job.iter_mut().enumerate() {
            *b = i as u8;
        }
        JobFields {
            ipfs_job,
            ipfs_result: [0u8; 32],
            market: key(0xA0),
            node: Pubkey::default(),
            payer: key(0xB0),
            price: 1_000_000,
            project: key(0xC0),
            state: 0,
            time_end: 0,
            time_start: 0,
        }
    }
}

pub fn job_blob(f: &JobFields) -> Vec<u8> {
    let mut b = vec![0u8; 225];
    put(&mut b, 0, &JOB_DISCRIMINATOR);
    put(&mut b, 8, &f.ipfs_job);
    put(&mut b, 40, &f.ipfs_result);
    put(&mut b, 72, f.market.as_bytes());
    put(&mut b, 104, f.node.as_bytes());
    put(&mut b, 136, f.payer.as_bytes());
    put(&mut b, 168, &f.price.to_le_bytes());
    put(&mut b, 176, f.project.as_bytes());
    b[208] = f.state;
    put(&mut b, 209, &f.time_end.to_le_bytes());
    put(&mut b, 217, &f.time_start.to_le_bytes());
    b
}

pub fn run_blob(job: Pubkey, node: Pubkey, time: i64) -> Vec<u8> {
    let mut b = vec![0u8; 113];
    put(&mut b, 0, &RUN_DISCRIMINATOR);
    put(&mut b, 8, job.as_bytes());
    put(&mut b, 40, node.as_bytes());
    put(&mut b, 72, key(0xB0).as_bytes());
    b[104] = 0;
    put(&mut b, 105, &time.to_le_bytes());
    b
}

pub fn market_blob(job_price: u64, queue_type: u8, queue: &[Pubkey]) -> Vec<u8> {
    let mut b = vec![0u8; 151];
    put(&mut b, 0, &MARKET_DISCRIMINATOR);
    put(&mut b, 8, key(0xD0).as_bytes());
    put(&mut b, 40, &86_400i64.to_le_bytes());
    put(&mut b, 48, &job_price.to_le_bytes());
    put(&mut b, 56, &3_600i64.to_le_bytes());
    b[64] = 0;
    put(&mut b, 65, key(0xD1).as_bytes());
    b[97] = 255;
    put(&mut b, 98, key(0xD2).as_bytes());
    put(&mut b, 130, &5_000u128.to_le_bytes());
    b[146] = queue_type;
    put(&mut b, 147, &(queue.len() as u32).to_le_bytes());
    for k in queue {
        b.extend_from_slice(k.as_bytes());
    }
    // allocation padding
    b.extend_from_slice(&[0u8; 64]);
    b
}

/// In-memory account set. Predicates are evaluated byte for byte, the way a
/// node does, so a wrong offset yields a wrong result here too.
#[derive(Default)]
pub struct FakeLedger {
    accounts: Mutex<BTreeMap<Pubkey, Bytes>>,
    predicates: Mutex<Vec<Vec<MemcmpFilter>>>,
    failing: Mutex<bool>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts
            .lock()
            .unwrap()
            .insert(address, Bytes::from(data));
    }

    pub fn remove(&self, address: &Pubkey) {
        self.accounts.lock().unwrap().remove(address);
    }

    /// Every following call fails with a transport error.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn predicates(&self) -> Vec<Vec<MemcmpFilter>> {
        self.predicates.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err(monitor_error!(ErrorKind::Transport, "connection reset by fake ledger"));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountSource for FakeLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Bytes>> {
        self.check()?;
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Bytes>>> {
        self.check()?;
        let accounts = self.accounts.lock().unwrap();
        Ok(addresses.iter().map(|a| accounts.get(a).cloned()).collect())
    }

    async fn get_program_accounts(
        &self,
        _program: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Bytes)>> {
        self.predicates.lock().unwrap().push(filters.to_vec());
        self.check()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }
}

pub fn notification(address: Pubkey, data: Vec<u8>) -> AccountNotification {
    AccountNotification {
        address,
        data: Bytes::from(data),
    }
}

/// What one `subscribe` call does.
pub enum Script {
    /// The open fails.
    Refuse,
    /// Yields the items and then stays open.
    Open(Vec<AccountNotification>),
    /// Yields the items and then drops the channel with an error.
    Drop(Vec<AccountNotification>),
    /// Yields whatever the test pushes into the sender.
    Live(mpsc::UnboundedReceiver<AccountNotification>),
}

/// Plays one [`Script`] per connect attempt; refuses once the scripts run
/// out.
#[derive(Default)]
pub struct ScriptedSubscriber {
    scripts: Mutex<VecDeque<Script>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedSubscriber {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// A subscriber whose first channel is fed by the returned sender.
    pub fn live() -> (Self, mpsc::UnboundedSender<AccountNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(vec![Script::Live(rx)]), tx)
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgramSubscriber for ScriptedSubscriber {
    async fn subscribe(&self, program: &Pubkey, _cancel: CancelToken) -> Result<NotificationStream> {
        let n = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len()
        };
        let script = self.scripts.lock().unwrap().pop_front();

        let stream: NotificationStream = match script {
            None | Some(Script::Refuse) => {
                return Err(monitor_error!(
                    ErrorKind::Transport,
                    "attempt {} to subscribe to {} refused",
                    n,
                    program
                ));
            }
            Some(Script::Open(items)) => futures::stream::iter(items.into_iter().map(Ok))
                .chain(futures::stream::pending())
                .boxed(),
            Some(Script::Drop(items)) => {
                let dropped: Result<AccountNotification> =
                    Err(monitor_error!(ErrorKind::Transport, "channel dropped"));
                futures::stream::iter(items.into_iter().map(Ok))
                    .chain(futures::stream::once(async move { dropped }))
                    .boxed()
            }
            Some(Script::Live(rx)) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|n| (Ok::<_, MonitorError>(n), rx))
            })
            .boxed(),
        };
        Ok(stream)
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
