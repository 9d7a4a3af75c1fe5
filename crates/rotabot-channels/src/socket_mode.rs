//! Slack Socket Mode listener.
//!
//! Opens a websocket via `apps.connections.open`, acknowledges every
//! events-api envelope, and forwards message events into an mpsc-backed
//! stream. The connection loop reconnects on close or error —
//! reconnection policy lives here, not in callers.

use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, TimeZone, Utc};
use futures::{SinkExt, StreamExt};
use futures::stream::Stream;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use rotabot_core::config::SlackConfig;
use rotabot_core::error::{Result, RotaBotError};
use rotabot_core::types::InboundMessage;

/// What a Socket Mode frame asks of us.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// Server greeting after connect.
    Hello,
    /// Server is about to drop the connection; reconnect.
    Disconnect,
    /// A message event to surface (ack + forward).
    Message {
        envelope_id: String,
        message: InboundMessage,
    },
    /// An envelope we must ack but not forward (non-message event,
    /// bot's own messages, edits, ...).
    Ack { envelope_id: String },
    /// Anything else.
    Ignore,
}

/// Parse one websocket text frame.
pub fn parse_frame(text: &str) -> SocketEvent {
    let json: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return SocketEvent::Ignore,
    };

    match json["type"].as_str() {
        Some("hello") => SocketEvent::Hello,
        Some("disconnect") => SocketEvent::Disconnect,
        Some("events_api") => {
            let envelope_id = json["envelope_id"].as_str().unwrap_or("").to_string();
            let event = &json["payload"]["event"];

            // Only plain user messages are surfaced. Bot posts (ours
            // included) and message edits/deletes carry bot_id or a
            // subtype and would loop the bot onto itself.
            let is_plain_message = event["type"].as_str() == Some("message")
                && event["bot_id"].is_null()
                && event["subtype"].is_null();

            if !is_plain_message {
                return SocketEvent::Ack { envelope_id };
            }

            SocketEvent::Message {
                envelope_id,
                message: InboundMessage {
                    channel_id: event["channel"].as_str().unwrap_or("").into(),
                    sender_id: event["user"].as_str().unwrap_or("").into(),
                    text: event["text"].as_str().unwrap_or("").into(),
                    timestamp: parse_ts(event["ts"].as_str().unwrap_or("")),
                },
            }
        }
        _ => SocketEvent::Ignore,
    }
}

/// Slack ts is "<epoch seconds>.<suffix>".
fn parse_ts(ts: &str) -> DateTime<Utc> {
    ts.split('.')
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now)
}

/// Stream of inbound Slack messages from Socket Mode.
pub struct SocketModeStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<InboundMessage>,
}

impl Stream for SocketModeStream {
    type Item = InboundMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for SocketModeStream {}

/// Start the Socket Mode connection loop and return its stream.
pub fn start(config: SlackConfig) -> SocketModeStream {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        tracing::info!("socket mode loop started");
        loop {
            match run_connection(&config, &tx).await {
                Ok(()) => tracing::info!("socket mode connection closed, reconnecting"),
                Err(e) => tracing::error!("socket mode error: {e}, reconnecting"),
            }
            if tx.is_closed() {
                tracing::info!("socket mode loop stopped (receiver dropped)");
                return;
            }
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    });

    SocketModeStream { rx }
}

/// One websocket session: open, read, ack, forward, until the server
/// drops us.
async fn run_connection(
    config: &SlackConfig,
    tx: &tokio::sync::mpsc::UnboundedSender<InboundMessage>,
) -> Result<()> {
    let ws_url = open_connection(config).await?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(ws_url.as_str())
        .await
        .map_err(|e| RotaBotError::Channel(format!("websocket connect failed: {e}")))?;
    tracing::info!("socket mode connected");

    let (mut write, mut read) = ws_stream.split();

    while let Some(frame) = read.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => match parse_frame(&text) {
                SocketEvent::Hello => tracing::debug!("socket mode hello"),
                SocketEvent::Disconnect => {
                    tracing::info!("server requested disconnect");
                    return Ok(());
                }
                SocketEvent::Message {
                    envelope_id,
                    message,
                } => {
                    ack(&mut write, &envelope_id).await;
                    if tx.send(message).is_err() {
                        return Ok(());
                    }
                }
                SocketEvent::Ack { envelope_id } => {
                    ack(&mut write, &envelope_id).await;
                }
                SocketEvent::Ignore => {}
            },
            Ok(WsMessage::Ping(data)) => {
                let _ = write.send(WsMessage::Pong(data)).await;
            }
            Ok(WsMessage::Close(frame)) => {
                tracing::info!("socket mode closed: {frame:?}");
                return Ok(());
            }
            Err(e) => {
                return Err(RotaBotError::Channel(format!("websocket read failed: {e}")));
            }
            _ => {}
        }
    }
    Ok(())
}

async fn ack<S>(write: &mut S, envelope_id: &str)
where
    S: SinkExt<WsMessage> + Unpin,
{
    if envelope_id.is_empty() {
        return;
    }
    let payload = serde_json::json!({ "envelope_id": envelope_id }).to_string();
    if write.send(WsMessage::Text(payload.into())).await.is_err() {
        tracing::warn!("failed to ack envelope {envelope_id}");
    }
}

/// Ask the Web API for a fresh websocket URL.
async fn open_connection(config: &SlackConfig) -> Result<String> {
    let client = reqwest::Client::new();
    let response = client
        .post("https://slack.com/api/apps.connections.open")
        .bearer_auth(&config.app_token)
        .send()
        .await
        .map_err(|e| RotaBotError::Channel(format!("apps.connections.open failed: {e}")))?;

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| RotaBotError::Channel(format!("invalid connections.open response: {e}")))?;

    if body["ok"].as_bool() != Some(true) {
        return Err(RotaBotError::Channel(format!(
            "connections.open rejected: {}",
            body["error"].as_str().unwrap_or("unknown")
        )));
    }
    body["url"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| RotaBotError::Channel("connections.open returned no url".into()))
}
