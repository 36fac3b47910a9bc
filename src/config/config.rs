use crate::address::ProgramIds;
use crate::constants::{
    DEFAULT_COMMITMENT, DEFAULT_RECONNECT_DELAY, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RPC_URL,
    DEFAULT_UNIFIED_CHANNEL_BOUND, JOBS_PROGRAM_ID, NOS_MINT, REWARDS_PROGRAM_ID,
};
use crate::err::{ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub rpc_url: String,
    /// Derived from `rpc_url` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Programs {
    pub jobs: String,
    pub rewards: String,
    pub nos_mint: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_unified_channel_bound")]
    pub unified_channel_bound: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub network: Network,
    #[serde(default)]
    pub programs: Programs,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

fn default_commitment() -> String {
    DEFAULT_COMMITMENT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_reconnect_delay_secs() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_secs()
}

fn default_unified_channel_bound() -> usize {
    DEFAULT_UNIFIED_CHANNEL_BOUND
}

impl Default for Network {
    fn default() -> Self {
        Network {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            ws_url: None,
            commitment: default_commitment(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for Programs {
    fn default() -> Self {
        Programs {
            jobs: JOBS_PROGRAM_ID.to_string(),
            rewards: REWARDS_PROGRAM_ID.to_string(),
            nos_mint: NOS_MINT.to_string(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            unified_channel_bound: DEFAULT_UNIFIED_CHANNEL_BOUND,
        }
    }
}

fn expand_home(p: &str) -> String {
    match p.strip_prefix("~/") {
        Some(rest) => match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home, rest),
            Err(_) => p.to_string(),
        },
        None => p.to_string(),
    }
}

impl Network {
    /// `ws_url`, or `rpc_url` with its scheme switched to ws/wss.
    pub fn ws_url(&self) -> Result<String> {
        if let Some(url) = &self.ws_url {
            return Ok(url.clone());
        }
        if let Some(rest) = self.rpc_url.strip_prefix("https://") {
            return Ok(format!("wss://{}", rest));
        }
        if let Some(rest) = self.rpc_url.strip_prefix("http://") {
            return Ok(format!("ws://{}", rest));
        }
        Err(monitor_error!(
            ErrorKind::Config,
            "cannot derive a websocket url from '{}'",
            self.rpc_url
        ))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Programs {
    pub fn ids(&self) -> Result<ProgramIds> {
        ProgramIds::parse(&self.jobs, &self.rewards, &self.nos_mint).map_err(|e| {
            monitor_error_with_source!(ErrorKind::Config, e, "invalid program address in config")
        })
    }
}

impl MonitorSettings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl Config {
    pub fn from_config(config_path: Option<&str>) -> Result<Self> {
        let Some(p) = config_path else {
            return Err(monitor_error!(ErrorKind::Config, "No config file provided"));
        };
        let path = expand_home(p);
        let content = fs::read_to_string(&path).map_err(|e| {
            monitor_error_with_source!(ErrorKind::Config, e, "failed to read config {}", path)
        })?;
        toml::from_str(&content).map_err(|e| {
            monitor_error_with_source!(ErrorKind::Config, e, "failed to parse config {}", path)
        })
    }

    pub fn dump(&self, config_path: &str) -> Result<()> {
        let path_str = expand_home(config_path);
        let path = Path::new(&path_str);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    monitor_error_with_source!(ErrorKind::Config, e, "failed to create {:?}", parent)
                })?;
            }
        }
        let content = toml::to_string(&self).map_err(|e| {
            monitor_error_with_source!(ErrorKind::Config, e, "failed to serialize config")
        })?;
        let p = fs::File::create(path).map_err(|e| {
            monitor_error_with_source!(ErrorKind::Config, e, "failed to create {}", path_str)
        })?;
        let mut f_writer = std::io::BufWriter::new(p);
        f_writer
            .write_all(content.as_bytes())
            .and_then(|_| f_writer.flush())
            .map_err(|e| {
                monitor_error_with_source!(ErrorKind::Config, e, "failed to write {}", path_str)
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::path::PathBuf;

    fn unique_temp_path(file: &str) -> PathBuf {
        let mut p = env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("marketwatch_test_{}", nanos));
        p.push(file);
        p
    }

    #[test]
    fn minimal_file_fills_in_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [network]
            rpc_url = "http://127.0.0.1:8899"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.network.commitment, "confirmed");
        assert_eq!(cfg.network.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.network.ws_url().unwrap(), "ws://127.0.0.1:8899");
        assert_eq!(cfg.programs, Programs::default());
        assert_eq!(cfg.monitor.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(cfg.monitor.unified_channel_bound, 1024);
    }

    #[test]
    fn ws_url_derivation() {
        let mut net = Network::default();
        assert_eq!(net.ws_url().unwrap(), "wss://api.mainnet-beta.solana.com");

        net.ws_url = Some("wss://stream.example.org".into());
        assert_eq!(net.ws_url().unwrap(), "wss://stream.example.org");

        net.ws_url = None;
        net.rpc_url = "ftp://nowhere".into();
        assert_eq!(net.ws_url().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn program_ids_parse_or_fail_as_config() {
        let ids = Programs::default().ids().unwrap();
        assert_eq!(ids.jobs.to_string(), JOBS_PROGRAM_ID);

        let bad = Programs {
            jobs: "not-base58!".into(),
            ..Programs::default()
        };
        assert_eq!(bad.ids().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn dump_creates_parent_dirs_and_writes_toml() {
        let mut cfg = Config::default();
        cfg.network.rpc_url = "http://localhost:8899".into();
        cfg.monitor.reconnect_delay_secs = 2;

        let path = unique_temp_path("nested/config.toml");
        cfg.dump(path.to_str().unwrap()).expect("dump should succeed");
        assert!(path.exists());

        let loaded = Config::from_config(path.to_str()).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_or_broken_file_is_config_error() {
        assert_eq!(
            Config::from_config(None).unwrap_err().kind(),
            ErrorKind::Config
        );
        let path = unique_temp_path("absent.toml");
        assert_eq!(
            Config::from_config(path.to_str()).unwrap_err().kind(),
            ErrorKind::Config
        );

        let broken = unique_temp_path("broken.toml");
        fs::create_dir_all(broken.parent().unwrap()).unwrap();
        fs::write(&broken, "[network\nrpc_url=").unwrap();
        assert_eq!(
            Config::from_config(broken.to_str()).unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    #[serial]
    fn from_config_expands_tilde_with_home() {
        let tmp_home = unique_temp_path("home_root");
        fs::create_dir_all(&tmp_home).unwrap();
        let prev_home = env::var_os("HOME");
        unsafe {
            env::set_var("HOME", &tmp_home);
        }

        let mut cfg = Config::default();
        cfg.network.commitment = "finalized".into();
        cfg.dump("~/marketwatch.toml").unwrap();
        assert!(tmp_home.join("marketwatch.toml").exists());

        let loaded = Config::from_config(Some("~/marketwatch.toml"))
            .expect("should load via ~ expansion");
        assert_eq!(loaded.network.commitment, "finalized");

        if let Some(prev) = prev_home {
            unsafe {
                env::set_var("HOME", prev);
            }
        } else {
            unsafe {
                env::remove_var("HOME");
            }
        }
    }
}
