//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Over a WebSocket transport every frame carries exactly one Engine.IO
//! packet: a single type digit followed by its payload. Engine.IO `message`
//! packets (`4`) wrap a Socket.IO packet:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][<json>]
//! 42["authCode",{"message":"...","code":"123456"}]
//! 42/admin,7["event",1]
//! ```
//!
//! Binary packets (Socket.IO types 5 and 6) are not supported.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::Error;

const DEFAULT_NAMESPACE: &str = "/";

/// Session parameters from the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<JsonValue>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<JsonValue>,
    },
    Ack {
        namespace: String,
        id: u64,
        args: Vec<JsonValue>,
    },
    ConnectError {
        namespace: String,
        data: Option<JsonValue>,
    },
}

impl SocketPacket {
    /// Connect request for the default namespace.
    #[must_use]
    pub fn connect() -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            data: None,
        }
    }

    /// Disconnect from the default namespace.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::Disconnect {
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

/// Parses one text frame.
///
/// # Errors
///
/// Returns `Error::Decode` for unknown packet types, binary Socket.IO
/// packets, or malformed JSON payloads.
pub fn decode(frame: &str) -> Result<EnginePacket, Error> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Decode("empty packet".into()))?;
    let payload = chars.as_str();

    match kind {
        '0' => serde_json::from_str(payload)
            .map(EnginePacket::Open)
            .map_err(|e| Error::Decode(format!("open packet: {e}"))),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => decode_socket(payload).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(Error::Decode(format!("unknown engine packet type {other:?}"))),
    }
}

fn decode_socket(frame: &str) -> Result<SocketPacket, Error> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Decode("empty socket packet".into()))?;
    let mut rest = chars.as_str();

    if matches!(kind, '5' | '6') {
        return Err(Error::Decode("binary packets are not supported".into()));
    }

    let namespace = if rest.starts_with('/') {
        let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
        rest = tail;
        ns.to_owned()
    } else {
        DEFAULT_NAMESPACE.to_owned()
    };

    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let id = if digits > 0 {
        Some(
            rest[..digits]
                .parse::<u64>()
                .map_err(|e| Error::Decode(format!("ack id: {e}")))?,
        )
    } else {
        None
    };
    rest = &rest[digits..];

    let data: Option<JsonValue> = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str(rest).map_err(|e| Error::Decode(format!("payload: {e}")))?)
    };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace, data }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let mut args = match data {
                Some(JsonValue::Array(items)) => items,
                _ => return Err(Error::Decode("event payload must be an array".into())),
            };
            if args.is_empty() {
                return Err(Error::Decode("event without a name".into()));
            }
            let name = match args.remove(0) {
                JsonValue::String(name) => name,
                _ => return Err(Error::Decode("event name must be a string".into())),
            };
            Ok(SocketPacket::Event {
                namespace,
                id,
                name,
                args,
            })
        }
        '3' => {
            let id = id.ok_or_else(|| Error::Decode("ack without id".into()))?;
            let args = match data {
                Some(JsonValue::Array(items)) => items,
                None => Vec::new(),
                _ => return Err(Error::Decode("ack payload must be an array".into())),
            };
            Ok(SocketPacket::Ack { namespace, id, args })
        }
        '4' => Ok(SocketPacket::ConnectError { namespace, data }),
        other => Err(Error::Decode(format!("unknown socket packet type {other:?}"))),
    }
}

/// Serializes a packet into one text frame.
#[must_use]
pub fn encode(packet: &EnginePacket) -> String {
    match packet {
        // Servers never receive `open`; encode the type digit only.
        EnginePacket::Open(_) => "0".to_owned(),
        EnginePacket::Close => "1".to_owned(),
        EnginePacket::Ping => "2".to_owned(),
        EnginePacket::Pong => "3".to_owned(),
        EnginePacket::Message(socket) => format!("4{}", encode_socket(socket)),
        EnginePacket::Upgrade => "5".to_owned(),
        EnginePacket::Noop => "6".to_owned(),
    }
}

fn encode_socket(packet: &SocketPacket) -> String {
    fn prefix(kind: char, namespace: &str) -> String {
        if namespace == DEFAULT_NAMESPACE {
            kind.to_string()
        } else {
            format!("{kind}{namespace},")
        }
    }

    match packet {
        SocketPacket::Connect { namespace, data } => {
            let mut out = prefix('0', namespace);
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
            out
        }
        SocketPacket::Disconnect { namespace } => prefix('1', namespace),
        SocketPacket::Event {
            namespace,
            id,
            name,
            args,
        } => {
            let mut out = prefix('2', namespace);
            if let Some(id) = id {
                out.push_str(&id.to_string());
            }
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(JsonValue::String(name.clone()));
            items.extend(args.iter().cloned());
            out.push_str(&JsonValue::Array(items).to_string());
            out
        }
        SocketPacket::Ack { namespace, id, args } => {
            let mut out = prefix('3', namespace);
            out.push_str(&id.to_string());
            out.push_str(&JsonValue::Array(args.clone()).to_string());
            out
        }
        SocketPacket::ConnectError { namespace, data } => {
            let mut out = prefix('4', namespace);
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
            out
        }
    }
}
