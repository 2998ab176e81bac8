//! Engine.IO v4 / Socket.IO v5 text frame codec.
//!
//! The analysis service speaks Socket.IO over a WebSocket. Only the text framing
//! needed by a single-namespace client is handled: the engine open handshake,
//! ping/pong, and socket connect / disconnect / event / ack / connect-error
//! packets. Binary packets are recognised and surfaced as `Binary` so the client
//! can skip them.
//!
//! ```text
//! 0{"sid":"abc","pingInterval":25000,...}    engine OPEN
//! 2                                          engine PING  -> reply 3
//! 40                                         socket CONNECT, namespace "/"
//! 42["analysis_update",{"status":"started"}] socket EVENT
//! 42/admin,7["x",1]                          EVENT, namespace /admin, ack id 7
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// Default namespace.
pub const ROOT_NAMESPACE: &str = "/";

/// Payload of the engine OPEN packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Outer Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Inner Socket.IO packet carried by an engine MESSAGE.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect { namespace: String, sid: Option<String> },
    Disconnect { namespace: String },
    Event { namespace: String, ack_id: Option<u64>, name: String, data: Value },
    Ack { namespace: String, ack_id: u64, data: Value },
    ConnectError { namespace: String, message: String },
    /// BINARY_EVENT / BINARY_ACK; attachments are not supported.
    Binary { namespace: String },
}

impl SocketPacket {
    /// EVENT on the root namespace without an ack id.
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        SocketPacket::Event {
            namespace: ROOT_NAMESPACE.to_owned(),
            ack_id: None,
            name: name.into(),
            data,
        }
    }
}

/// Decodes one text frame.
///
/// # Errors
///
/// [`CodecError`] for empty frames, unknown packet types, event packets without a
/// name, and payloads that are not valid JSON.
pub fn decode(frame: &str) -> Result<EnginePacket, CodecError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();
    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_owned())),
        '3' => Ok(EnginePacket::Pong(rest.to_owned())),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(CodecError::UnknownPacketType { layer: "engine", kind: other }),
    }
}

fn decode_socket(body: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let mut rest = chars.as_str();

    // Binary packets prefix the attachment count: `51-[...]`.
    if matches!(kind, '5' | '6') {
        if let Some(dash) = rest.find('-') {
            rest = &rest[dash + 1..];
        }
    }

    let namespace = if rest.starts_with('/') {
        let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
        rest = tail;
        ns.to_owned()
    } else {
        ROOT_NAMESPACE.to_owned()
    };

    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let ack_id = rest[..digits].parse::<u64>().ok();
    rest = &rest[digits..];

    let payload: Option<Value> = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str(rest)?)
    };

    match kind {
        '0' => {
            let sid = payload
                .as_ref()
                .and_then(|v| v.get("sid"))
                .and_then(Value::as_str)
                .map(str::to_owned);
            Ok(SocketPacket::Connect { namespace, sid })
        }
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let mut args = match payload {
                Some(Value::Array(args)) => args.into_iter(),
                _ => return Err(CodecError::MissingEventName),
            };
            let name = match args.next() {
                Some(Value::String(name)) => name,
                _ => return Err(CodecError::MissingEventName),
            };
            let data = args.next().unwrap_or(Value::Null);
            Ok(SocketPacket::Event { namespace, ack_id, name, data })
        }
        '3' => {
            let data = match payload {
                Some(Value::Array(mut args)) if !args.is_empty() => args.swap_remove(0),
                _ => Value::Null,
            };
            Ok(SocketPacket::Ack { namespace, ack_id: ack_id.unwrap_or_default(), data })
        }
        '4' => {
            let message = match payload {
                Some(Value::String(s)) => s,
                Some(v) => v
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                None => String::new(),
            };
            Ok(SocketPacket::ConnectError { namespace, message })
        }
        '5' | '6' => Ok(SocketPacket::Binary { namespace }),
        other => Err(CodecError::UnknownPacketType { layer: "socket", kind: other }),
    }
}

/// Encodes one packet as a text frame.
pub fn encode(packet: &EnginePacket) -> String {
    match packet {
        EnginePacket::Open(handshake) => {
            // Handshake only holds strings and integers.
            format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
        }
        EnginePacket::Close => "1".to_owned(),
        EnginePacket::Ping(data) => format!("2{data}"),
        EnginePacket::Pong(data) => format!("3{data}"),
        EnginePacket::Message(socket) => format!("4{}", encode_socket(socket)),
        EnginePacket::Upgrade => "5".to_owned(),
        EnginePacket::Noop => "6".to_owned(),
    }
}

fn encode_socket(packet: &SocketPacket) -> String {
    let (kind, namespace) = match packet {
        SocketPacket::Connect { namespace, .. } => ('0', namespace),
        SocketPacket::Disconnect { namespace } => ('1', namespace),
        SocketPacket::Event { namespace, .. } => ('2', namespace),
        SocketPacket::Ack { namespace, .. } => ('3', namespace),
        SocketPacket::ConnectError { namespace, .. } => ('4', namespace),
        SocketPacket::Binary { namespace } => ('5', namespace),
    };

    let mut out = String::new();
    out.push(kind);
    if namespace != ROOT_NAMESPACE {
        out.push_str(namespace);
        out.push(',');
    }

    match packet {
        SocketPacket::Connect { sid: Some(sid), .. } => {
            out.push_str(&serde_json::json!({ "sid": sid }).to_string());
        }
        SocketPacket::Event { ack_id, name, data, .. } => {
            if let Some(id) = ack_id {
                out.push_str(&id.to_string());
            }
            out.push_str(&serde_json::json!([name, data]).to_string());
        }
        SocketPacket::Ack { ack_id, data, .. } => {
            out.push_str(&ack_id.to_string());
            out.push_str(&serde_json::json!([data]).to_string());
        }
        SocketPacket::ConnectError { message, .. } => {
            out.push_str(&serde_json::json!({ "message": message }).to_string());
        }
        _ => {}
    }
    out
}

/// Frame for emitting `name` with `data` on the root namespace.
pub fn event_frame(name: &str, data: Value) -> String {
    encode(&EnginePacket::Message(SocketPacket::event(name, data)))
}

/// Frame that joins the root namespace after the engine handshake.
pub fn connect_frame() -> String {
    encode(&EnginePacket::Message(SocketPacket::Connect {
        namespace: ROOT_NAMESPACE.to_owned(),
        sid: None,
    }))
}
