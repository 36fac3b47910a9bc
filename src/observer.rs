use crate::address::{DerivedAddressCache, ProgramIds};
use crate::config::{Config, MonitorSettings};
use crate::err::Result;
use crate::monitor::Monitor;
use crate::query::AccountReader;
use crate::rpc::{AccountSource, HttpRpc, ProgramSubscriber, WsProgramSubscriber};
use crate::subscription::SubscriptionManager;
use crate::utilities::logger::Log;
use std::sync::Arc;

/// Reader and monitor over one deployment, sharing a derived-address cache.
#[derive(Clone)]
pub struct Observer {
    ids: ProgramIds,
    reader: AccountReader,
    monitor: Monitor,
    cache: Arc<DerivedAddressCache>,
}

impl Observer {
    /// Talk to the node named in `config` over HTTP and WebSocket.
    pub fn from_config(config: &Config, log: Arc<dyn Log>) -> Result<Self> {
        let ids = config.programs.ids()?;
        let http = HttpRpc::new(
            config.network.rpc_url.clone(),
            config.network.commitment.clone(),
            config.network.request_timeout(),
        )?;
        let ws = WsProgramSubscriber::new(config.network.ws_url()?, config.network.commitment.clone());
        log.info(format!(
            "observing program {} via {} / {}",
            ids.jobs,
            http.url(),
            ws.url()
        ));
        Ok(Self::with_capabilities(
            ids,
            &config.monitor,
            Arc::new(http),
            Arc::new(ws),
            log,
        ))
    }

    pub fn with_capabilities(
        ids: ProgramIds,
        settings: &MonitorSettings,
        source: Arc<dyn AccountSource>,
        subscriber: Arc<dyn ProgramSubscriber>,
        log: Arc<dyn Log>,
    ) -> Self {
        let cache = Arc::new(DerivedAddressCache::new());
        let reader = AccountReader::new(source, ids, log.clone()).with_cache(cache.clone());
        let subscriptions = SubscriptionManager::new(subscriber, log.clone())
            .with_reconnect_delay(settings.reconnect_delay());
        let monitor = Monitor::new(subscriptions, reader.clone(), log)
            .with_channel_bound(settings.unified_channel_bound);
        Self {
            ids,
            reader,
            monitor,
            cache,
        }
    }

    pub fn ids(&self) -> &ProgramIds {
        &self.ids
    }

    pub fn reader(&self) -> &AccountReader {
        &self.reader
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn cache(&self) -> &Arc<DerivedAddressCache> {
        &self.cache
    }
}
