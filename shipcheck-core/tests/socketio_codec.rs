//! Integration tests for the Engine.IO / Socket.IO text frame codec.

use serde_json::json;
use shipcheck_core::error::CodecError;
use shipcheck_core::socketio::{self, EnginePacket, Handshake, SocketPacket};

fn socket(frame: &str) -> SocketPacket {
    match socketio::decode(frame).unwrap() {
        EnginePacket::Message(packet) => packet,
        other => panic!("expected a message packet, got {other:?}"),
    }
}

#[test]
fn engine_open_handshake() {
    let frame = concat!(
        r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"#,
        r#""pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
    );
    assert_eq!(
        socketio::decode(frame).unwrap(),
        EnginePacket::Open(Handshake {
            sid: "lv_VI97HAXpY6yYWAAAC".into(),
            upgrades: vec![],
            ping_interval: 25000,
            ping_timeout: 20000,
        })
    );
}

#[test]
fn ping_is_answered_with_matching_pong() {
    assert_eq!(socketio::decode("2").unwrap(), EnginePacket::Ping(String::new()));
    assert_eq!(socketio::decode("2keepalive").unwrap(), EnginePacket::Ping("keepalive".into()));
    assert_eq!(socketio::encode(&EnginePacket::Pong("keepalive".into())), "3keepalive");
    assert_eq!(socketio::encode(&EnginePacket::Pong(String::new())), "3");
}

#[test]
fn simple_engine_packets() {
    assert_eq!(socketio::decode("1").unwrap(), EnginePacket::Close);
    assert_eq!(socketio::decode("5").unwrap(), EnginePacket::Upgrade);
    assert_eq!(socketio::decode("6").unwrap(), EnginePacket::Noop);
}

#[test]
fn namespace_connect_with_and_without_sid() {
    assert_eq!(socketio::connect_frame(), "40");
    assert_eq!(socket("40"), SocketPacket::Connect { namespace: "/".into(), sid: None });
    assert_eq!(
        socket(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#),
        SocketPacket::Connect { namespace: "/".into(), sid: Some("wZX3oN0bSVIhsaknAAAI".into()) }
    );
}

#[test]
fn event_packet_carries_name_and_first_argument() {
    assert_eq!(
        socket(r#"42["analysis_update",{"status":"started","message":"go"}]"#),
        SocketPacket::Event {
            namespace: "/".into(),
            ack_id: None,
            name: "analysis_update".into(),
            data: json!({ "status": "started", "message": "go" }),
        }
    );
    assert_eq!(
        socket(r#"42["ping"]"#),
        SocketPacket::Event {
            namespace: "/".into(),
            ack_id: None,
            name: "ping".into(),
            data: serde_json::Value::Null,
        }
    );
}

#[test]
fn namespaced_event_with_ack_id() {
    let packet = SocketPacket::Event {
        namespace: "/admin".into(),
        ack_id: Some(7),
        name: "x".into(),
        data: json!(1),
    };
    assert_eq!(socket(r#"42/admin,7["x",1]"#), packet);
    assert_eq!(
        socketio::encode(&EnginePacket::Message(packet)),
        r#"42/admin,7["x",1]"#
    );
}

#[test]
fn emit_frame_matches_socketio_wire_format() {
    assert_eq!(
        socketio::event_frame(
            "start_analysis",
            json!({ "repository_url": "https://github.com/acme/api" })
        ),
        r#"42["start_analysis",{"repository_url":"https://github.com/acme/api"}]"#
    );
}

#[test]
fn connect_error_and_disconnect() {
    assert_eq!(
        socket(r#"44{"message":"Not authorized"}"#),
        SocketPacket::ConnectError { namespace: "/".into(), message: "Not authorized".into() }
    );
    assert_eq!(socket("41"), SocketPacket::Disconnect { namespace: "/".into() });
}

#[test]
fn binary_packets_are_recognised_but_not_decoded() {
    assert_eq!(
        socket(r#"451-["upload",{"_placeholder":true,"num":0}]"#),
        SocketPacket::Binary { namespace: "/".into() }
    );
}

#[test]
fn malformed_frames_are_errors() {
    assert!(matches!(socketio::decode(""), Err(CodecError::Empty)));
    assert!(matches!(
        socketio::decode("9"),
        Err(CodecError::UnknownPacketType { layer: "engine", kind: '9' })
    ));
    assert!(matches!(
        socketio::decode("49"),
        Err(CodecError::UnknownPacketType { layer: "socket", kind: '9' })
    ));
    assert!(matches!(socketio::decode("42[]"), Err(CodecError::MissingEventName)));
    assert!(matches!(socketio::decode("42[1,2]"), Err(CodecError::MissingEventName)));
    assert!(matches!(socketio::decode("42[\"x\""), Err(CodecError::Json(_))));
}
