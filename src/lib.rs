#[macro_use]
pub mod err;

pub mod address;
pub mod codec;
pub mod config;
pub mod constants;
pub mod monitor;
pub mod observer;
pub mod query;
pub mod reconcile;
pub mod rpc;
pub mod subscription;
pub mod utilities;

pub use codec::{Job, JobState, Market, Pubkey, QueueType, Record, Run};
pub use err::{ErrorKind, MonitorError, Result};
pub use monitor::{EventStream, Handlers, Monitor, MonitorEvent, MonitorHandle};
pub use observer::Observer;
pub use query::{AccountReader, JobFilter, RunFilter};
pub use reconcile::reconcile;

/// Package version plus the commit and build time stamped by build.rs.
pub fn version() -> String {
    let pkg_version = env!("CARGO_PKG_VERSION");
    let commit = option_env!("GIT_COMMIT").unwrap_or("unknown");
    let state = option_env!("GIT_STATE").unwrap_or("unknown");
    let built = option_env!("BUILD_TIME").unwrap_or("unknown time");
    format!(
        "{} (commit: {}, state: {}, built: {})",
        pkg_version, commit, state, built
    )
}
