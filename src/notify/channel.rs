use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::codec::{self, EnginePacket, SocketPacket};
use crate::config::endpoint;
use crate::error::Error;
use crate::types::NotificationEvent;

/// Event name the server uses to push authentication codes.
pub const AUTH_CODE_EVENT: &str = "authCode";

type Latest = Option<NotificationEvent>;

/// Long-lived push connection surfacing [`AUTH_CODE_EVENT`] events.
///
/// One background task owns the socket. [`close`](Self::close) or dropping
/// the handle stops it, sending a Socket.IO disconnect and a WebSocket close.
/// There is no reconnection: once the connection ends, subscriptions yield
/// `None`.
#[derive(Debug)]
pub struct NotificationChannel {
    latest: watch::Receiver<Latest>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Scoped subscription to `authCode` events.
///
/// Only the most recent event is kept; events that arrive while the holder
/// is not polling are superseded. Dropping the subscription detaches it.
#[derive(Debug)]
pub struct Subscription {
    latest: watch::Receiver<Latest>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the channel has closed.
    pub async fn next(&mut self) -> Option<NotificationEvent> {
        loop {
            self.latest.changed().await.ok()?;
            if let Some(event) = self.latest.borrow_and_update().clone() {
                return Some(event);
            }
        }
    }

    /// Most recent event received so far, without waiting.
    #[must_use]
    pub fn latest(&self) -> Option<NotificationEvent> {
        self.latest.borrow().clone()
    }
}

impl NotificationChannel {
    /// Open the channel against the server's base address.
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` if the WebSocket handshake fails, or
    /// `Error::Config` if the address cannot be turned into a socket URL.
    pub async fn connect(base: &Url) -> Result<Self, Error> {
        let url = socket_url(base)?;
        tracing::info!(url = %url, "Connecting realtime channel");

        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::Channel(format!("{url}: {e}")))?;

        let (tx, latest) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(stream, tx, shutdown.clone()));

        Ok(Self {
            latest,
            shutdown,
            task: Some(task),
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            latest: self.latest.clone(),
        }
    }

    /// False once the connection has ended for any reason.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Disconnect and wait for the background task to finish.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Realtime channel task failed");
            }
        }
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        // The task sees the cancellation and closes the socket itself.
        self.shutdown.cancel();
    }
}

/// `{base}/socket.io/?EIO=4&transport=websocket` with a WebSocket scheme.
pub(crate) fn socket_url(base: &Url) -> Result<Url, Error> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::Config(format!(
                "unsupported realtime scheme {other:?}"
            )));
        }
    };

    let mut url = endpoint(base, "/socket.io")?;
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_scheme(scheme)
        .map_err(|()| Error::Config(format!("cannot use {scheme} for {base}")))?;
    Ok(url)
}

enum Step {
    Continue,
    Reply(EnginePacket),
    Stop,
}

async fn run<S>(stream: S, latest: watch::Sender<Latest>, shutdown: CancellationToken)
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut source) = stream.split::<Message>();
    let mut heartbeat: Option<Duration> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let step = tokio::select! {
            () = shutdown.cancelled() => {
                let bye = codec::encode(&EnginePacket::Message(SocketPacket::disconnect()));
                if let Err(e) = sink.send(Message::Text(bye)).await {
                    tracing::debug!(error = %e, "Disconnect packet not sent");
                }
                if let Err(e) = sink.close().await {
                    tracing::debug!(error = %e, "WebSocket close failed");
                }
                tracing::info!("Realtime channel closed");
                break;
            }
            () = expire(deadline) => {
                tracing::warn!("Realtime channel heartbeat timed out");
                break;
            }
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => match codec::decode(&text) {
                    Ok(packet) => handle(packet, &latest, &mut heartbeat),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring undecodable realtime packet");
                        Step::Continue
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Realtime channel closed by server");
                    Step::Stop
                }
                Some(Ok(_)) => Step::Continue,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Realtime channel failed");
                    Step::Stop
                }
            },
        };

        // Any traffic after the handshake proves the server is alive.
        if let Some(window) = heartbeat {
            deadline = Some(Instant::now() + window);
        }

        match step {
            Step::Continue => {}
            Step::Reply(packet) => {
                if let Err(e) = sink.send(Message::Text(codec::encode(&packet))).await {
                    tracing::warn!(error = %e, "Realtime channel write failed");
                    break;
                }
            }
            Step::Stop => break,
        }
    }
}

fn handle(packet: EnginePacket, latest: &watch::Sender<Latest>, heartbeat: &mut Option<Duration>) -> Step {
    match packet {
        EnginePacket::Open(handshake) => {
            tracing::debug!(sid = %handshake.sid, "Realtime transport open");
            *heartbeat = Some(Duration::from_millis(
                handshake.ping_interval.saturating_add(handshake.ping_timeout),
            ));
            Step::Reply(EnginePacket::Message(SocketPacket::connect()))
        }
        EnginePacket::Ping => Step::Reply(EnginePacket::Pong),
        EnginePacket::Close => Step::Stop,
        EnginePacket::Pong | EnginePacket::Upgrade | EnginePacket::Noop => Step::Continue,
        EnginePacket::Message(SocketPacket::Connect { .. }) => {
            tracing::info!("Realtime channel connected");
            Step::Continue
        }
        EnginePacket::Message(SocketPacket::ConnectError { data, .. }) => {
            tracing::warn!(detail = ?data, "Realtime namespace refused");
            Step::Stop
        }
        EnginePacket::Message(SocketPacket::Disconnect { .. }) => Step::Stop,
        EnginePacket::Message(SocketPacket::Event { name, args, .. }) if name == AUTH_CODE_EVENT => {
            let Some(payload) = args.into_iter().next() else {
                tracing::warn!("authCode event without payload");
                return Step::Continue;
            };
            match serde_json::from_value::<NotificationEvent>(payload) {
                Ok(event) => {
                    tracing::debug!("authCode event received");
                    latest.send_replace(Some(event));
                }
                Err(e) => tracing::warn!(error = %e, "Malformed authCode event"),
            }
            Step::Continue
        }
        EnginePacket::Message(SocketPacket::Event { name, .. }) => {
            tracing::trace!(event = %name, "Ignoring realtime event");
            Step::Continue
        }
        EnginePacket::Message(SocketPacket::Ack { .. }) => Step::Continue,
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
