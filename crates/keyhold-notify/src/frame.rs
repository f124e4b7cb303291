// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hub message framing.
//!
//! Every binary message from the notification hub is a varint length prefix
//! followed by one MessagePack value. The value is a hub invocation array
//! whose fifth element is the argument list; the first argument is a map
//! carrying the event `Type` and, usually, a `Payload` map with an `Id`.
//!
//! Decoding validates that shape and rejects anything else as
//! [`KeyholdError::Decode`]. Callers drop such frames and keep reading.

use keyhold_core::{EventKind, KeyholdError, NotificationEvent};
use rmpv::Value;

/// First frame sent after connecting; selects the MessagePack sub-protocol.
pub const HANDSHAKE: &str = r#"{"protocol":"messagepack","version":1}"#;

/// Messages shorter than this are keep-alives (including the hub's
/// handshake acknowledgement) and are skipped without decoding.
pub const MIN_FRAME_LEN: usize = 5;

/// Index of the argument list inside a hub invocation.
const ARGUMENTS_INDEX: usize = 4;

/// Drop the varint length prefix and return the payload.
///
/// The prefix ends at the first byte whose high bit is clear. Its value is
/// not needed: one websocket message carries exactly one hub message. A
/// message with no terminating byte is returned whole.
pub fn strip_length_prefix(message: &[u8]) -> &[u8] {
    match message.iter().position(|byte| byte & 0x80 == 0) {
        Some(last) => &message[last + 1..],
        None => message,
    }
}

/// Decode one raw hub message.
///
/// Returns `Ok(None)` for keep-alives and an error for any structural
/// deviation.
pub fn decode_frame(message: &[u8]) -> Result<Option<NotificationEvent>, KeyholdError> {
    if message.len() < MIN_FRAME_LEN {
        return Ok(None);
    }
    decode_payload(strip_length_prefix(message)).map(Some)
}

/// Decode a MessagePack hub invocation into an event.
pub fn decode_payload(payload: &[u8]) -> Result<NotificationEvent, KeyholdError> {
    let mut reader = payload;
    let value = rmpv::decode::read_value(&mut reader)
        .map_err(|e| malformed(format!("invalid MessagePack: {e}")))?;

    let Value::Array(invocation) = value else {
        return Err(malformed("top-level value is not an array"));
    };
    if invocation.len() <= ARGUMENTS_INDEX {
        return Err(malformed(format!(
            "invocation has {} elements, expected at least {}",
            invocation.len(),
            ARGUMENTS_INDEX + 1
        )));
    }
    let Some(arguments) = invocation[ARGUMENTS_INDEX].as_array() else {
        return Err(malformed("argument list is not an array"));
    };
    let Some(first) = arguments.first() else {
        return Err(malformed("argument list is empty"));
    };
    let Some(fields) = first.as_map() else {
        return Err(malformed("first argument is not a map"));
    };

    let code = match lookup(fields, "Type") {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| malformed("Type is not an integer"))?,
        None => return Err(malformed("message has no Type")),
    };
    let kind =
        EventKind::from_code(code).ok_or_else(|| malformed(format!("unknown event type {code}")))?;

    // A missing or non-map payload means the event concerns no item.
    let id = match lookup(fields, "Payload").and_then(Value::as_map) {
        Some(payload) => match lookup(payload, "Id") {
            Some(Value::String(id)) => id
                .as_str()
                .ok_or_else(|| malformed("Id is not valid UTF-8"))?
                .to_string(),
            Some(_) => return Err(malformed("Id is not a string")),
            None => return Err(malformed("payload has no Id")),
        },
        None => String::new(),
    };

    Ok(NotificationEvent::new(kind, id))
}

fn lookup<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn malformed(detail: impl Into<String>) -> KeyholdError {
    KeyholdError::Decode(detail.into())
}
