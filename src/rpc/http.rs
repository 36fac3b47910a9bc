use crate::codec::Pubkey;
use crate::constants::MAX_MULTIPLE_ACCOUNTS;
use crate::err::{ErrorKind, Result};
use crate::rpc::{AccountSource, MemcmpFilter};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC client for a ledger node's HTTP endpoint.
#[derive(Debug)]
pub struct HttpRpc {
    client: Client,
    url: String,
    commitment: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Deserialize)]
pub(crate) struct WithContext<T> {
    pub value: T,
}

/// `data` is `[payload, encoding]`.
#[derive(Deserialize)]
pub(crate) struct UiAccount {
    data: (String, String),
}

#[derive(Deserialize)]
pub(crate) struct KeyedUiAccount {
    pubkey: String,
    account: UiAccount,
}

impl UiAccount {
    pub(crate) fn decode_data(&self) -> Result<Bytes> {
        let (payload, encoding) = &self.data;
        if encoding != "base64" {
            return Err(monitor_error!(
                ErrorKind::Transport,
                "unexpected account encoding '{}'",
                encoding
            ));
        }
        let raw = STANDARD.decode(payload).map_err(|e| {
            monitor_error_with_source!(ErrorKind::Transport, e, "account data is not valid base64")
        })?;
        Ok(Bytes::from(raw))
    }
}

impl KeyedUiAccount {
    pub(crate) fn into_parts(self) -> Result<(Pubkey, Bytes)> {
        let address = Pubkey::from_str(&self.pubkey).map_err(|e| {
            monitor_error_with_source!(ErrorKind::Transport, e, "node returned a malformed address")
        })?;
        Ok((address, self.account.decode_data()?))
    }
}

fn memcmp_json(filters: &[MemcmpFilter]) -> Vec<Value> {
    filters
        .iter()
        .map(|f| {
            json!({
                "memcmp": {
                    "offset": f.offset,
                    "bytes": bs58::encode(&f.bytes).into_string(),
                }
            })
        })
        .collect()
}

impl HttpRpc {
    pub fn new(
        url: impl Into<String>,
        commitment: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("marketwatch/{}", crate::version()))
            .build()
            .map_err(|e| {
                monitor_error_with_source!(ErrorKind::Transport, e, "failed to create HTTP client")
            })?;

        Ok(Self {
            client,
            url: url.into(),
            commitment: commitment.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                monitor_error_with_source!(ErrorKind::Transport, e, "{} request failed", method)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(monitor_error!(
                ErrorKind::Transport,
                "{} returned HTTP {}: {}",
                method,
                status,
                text
            ));
        }

        let envelope: RpcEnvelope<T> = response.json().await.map_err(|e| {
            monitor_error_with_source!(ErrorKind::Transport, e, "{} response is malformed", method)
        })?;
        unwrap_envelope(method, envelope)
    }

    fn account_config(&self) -> Value {
        json!({ "encoding": "base64", "commitment": self.commitment })
    }
}

fn unwrap_envelope<T>(method: &str, envelope: RpcEnvelope<T>) -> Result<T> {
    if let Some(err) = envelope.error {
        return Err(monitor_error!(
            ErrorKind::Transport,
            "{} failed with code {}: {}",
            method,
            err.code,
            err.message
        ));
    }
    envelope.result.ok_or_else(|| {
        monitor_error!(
            ErrorKind::Transport,
            "{} returned neither result nor error",
            method
        )
    })
}

#[async_trait]
impl AccountSource for HttpRpc {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Bytes>> {
        let params = json!([address.to_string(), self.account_config()]);
        let res: WithContext<Option<UiAccount>> = self.call("getAccountInfo", params).await?;
        res.value.map(|account| account.decode_data()).transpose()
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Bytes>>> {
        let mut out = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let keys: Vec<String> = chunk.iter().map(|k| k.to_string()).collect();
            let params = json!([keys, self.account_config()]);
            let res: WithContext<Vec<Option<UiAccount>>> =
                self.call("getMultipleAccounts", params).await?;
            for account in res.value {
                out.push(account.map(|a| a.decode_data()).transpose()?);
            }
        }
        Ok(out)
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Bytes)>> {
        let params = json!([
            program.to_string(),
            {
                "encoding": "base64",
                "commitment": self.commitment,
                "filters": memcmp_json(filters),
            }
        ]);
        let res: Vec<KeyedUiAccount> = self.call("getProgramAccounts", params).await?;
        res.into_iter().map(KeyedUiAccount::into_parts).collect()
    }
}
