use super::http::{KeyedUiAccount, RpcErrorObject, WithContext};
use crate::codec::Pubkey;
use crate::err::{ErrorKind, Result};
use crate::rpc::{AccountNotification, NotificationStream, ProgramSubscriber};
use crate::subscription::CancelToken;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// `programSubscribe` over a ledger node's WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WsProgramSubscriber {
    url: String,
    commitment: String,
}

#[derive(Deserialize)]
struct Frame {
    method: Option<String>,
    params: Option<NotificationParams>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct NotificationParams {
    result: WithContext<KeyedUiAccount>,
}

struct Reader {
    socket: Socket,
    cancel: CancelToken,
    program: Pubkey,
    done: bool,
}

impl WsProgramSubscriber {
    pub fn new(url: impl Into<String>, commitment: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            commitment: commitment.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// `Ok(None)` for frames that carry no account change, such as the
/// subscription confirmation.
fn parse_frame(text: &str) -> Result<Option<AccountNotification>> {
    let frame: Frame = serde_json::from_str(text).map_err(|e| {
        monitor_error_with_source!(ErrorKind::Transport, e, "malformed subscription frame")
    })?;

    if let Some(err) = frame.error {
        return Err(monitor_error!(
            ErrorKind::Transport,
            "subscription rejected with code {}: {}",
            err.code,
            err.message
        ));
    }

    match (frame.method.as_deref(), frame.params) {
        (Some("programNotification"), Some(params)) => {
            let (address, data) = params.result.value.into_parts()?;
            Ok(Some(AccountNotification { address, data }))
        }
        (Some("programNotification"), None) => Err(monitor_error!(
            ErrorKind::Transport,
            "program notification without params"
        )),
        _ => Ok(None),
    }
}

async fn next_notification(mut reader: Reader) -> Option<(Result<AccountNotification>, Reader)> {
    loop {
        if reader.done {
            return None;
        }

        let msg = tokio::select! {
            biased;
            _ = reader.cancel.cancelled() => None,
            msg = reader.socket.next() => Some(msg),
        };
        let Some(msg) = msg else {
            let _ = reader.socket.close(None).await;
            return None;
        };

        let failure = match msg {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(Some(notification)) => return Some((Ok(notification), reader)),
                Ok(None) => continue,
                Err(e) => e,
            },
            Some(Ok(Message::Close(frame))) => monitor_error!(
                ErrorKind::Transport,
                "subscription to {} closed by remote: {:?}",
                reader.program,
                frame
            ),
            // tungstenite answers pings on its own
            Some(Ok(_)) => continue,
            Some(Err(e)) => monitor_error_with_source!(
                ErrorKind::Transport,
                e,
                "subscription to {} failed",
                reader.program
            ),
            None => monitor_error!(
                ErrorKind::Transport,
                "subscription to {} ended",
                reader.program
            ),
        };

        reader.done = true;
        return Some((Err(failure), reader));
    }
}

#[async_trait]
impl ProgramSubscriber for WsProgramSubscriber {
    async fn subscribe(&self, program: &Pubkey, cancel: CancelToken) -> Result<NotificationStream> {
        let (mut socket, _) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(monitor_error!(
                    ErrorKind::Transport,
                    "connect to {} cancelled",
                    self.url
                ));
            }
            res = connect_async(self.url.as_str()) => res.map_err(|e| {
                monitor_error_with_source!(ErrorKind::Transport, e, "failed to connect to {}", self.url)
            })?,
        };

        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "programSubscribe",
            "params": [
                program.to_string(),
                { "encoding": "base64", "commitment": self.commitment },
            ],
        });
        socket
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|e| {
                monitor_error_with_source!(ErrorKind::Transport, e, "failed to send programSubscribe")
            })?;

        let reader = Reader {
            socket,
            cancel,
            program: *program,
            done: false,
        };
        Ok(futures::stream::unfold(reader, next_notification).boxed())
    }
}
