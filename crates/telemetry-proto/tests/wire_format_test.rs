// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use telemetry_proto::{Kind, Message, TelemetryEvent, Timestamp, REPORT_PROCEDURE, TELEMETRY_SERVICE};

#[test]
fn test_report_procedure_path() {
    assert_eq!(REPORT_PROCEDURE, format!("/{TELEMETRY_SERVICE}/Report"));
}

#[test]
fn test_default_event_encodes_to_nothing() {
    // proto3 omits default scalars, so an untouched event is zero bytes on the wire
    assert!(TelemetryEvent::default().encode_to_vec().is_empty());
}

#[test]
fn test_field_numbers_match_proto() {
    let event = TelemetryEvent {
        session_id: "ab".into(),
        kind: Kind::Info as i32,
        tags: vec!["t".into()],
        ..Default::default()
    };

    // session_id: field 1, wire type 2; kind: field 3, varint; tags: field 8, wire type 2
    let expected: Vec<u8> = vec![0x0a, 0x02, b'a', b'b', 0x18, 0x01, 0x42, 0x01, b't'];
    assert_eq!(event.encode_to_vec(), expected);
}

#[test]
fn test_timestamp_survives_the_wire() {
    let event = TelemetryEvent {
        timestamp: Some(Timestamp {
            seconds: 1_700_000_000,
            nanos: 42,
        }),
        ..TelemetryEvent::info("test", "")
    };

    let decoded = TelemetryEvent::decode(event.encode_to_vec().as_slice()).expect("decode");
    let ts = decoded.timestamp.expect("timestamp present");
    assert_eq!(ts.seconds, 1_700_000_000);
    assert_eq!(ts.nanos, 42);
    assert_eq!(decoded.kind(), Kind::Info);
}

#[test]
fn test_empty_ack_decodes_from_empty_body() {
    // google.protobuf.Empty maps onto prost's unit message
    assert!(<()>::decode(&b""[..]).is_ok());
}

proptest! {
    #[test]
    fn decoding_arbitrary_bytes_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = TelemetryEvent::decode(bytes.as_slice());
    }

    #[test]
    fn tag_order_is_preserved(tags in proptest::collection::vec("[a-z]{1,8}", 0..16)) {
        let event = TelemetryEvent { tags: tags.clone(), ..Default::default() };
        let decoded = TelemetryEvent::decode(event.encode_to_vec().as_slice()).unwrap();
        prop_assert_eq!(decoded.tags, tags);
    }
}
