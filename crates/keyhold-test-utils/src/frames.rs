// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hub messages as the notification server frames them, for feeding the
//! push channel in tests.

use keyhold_core::{KeyholdError, NotificationEvent};
use rmpv::Value;

/// Build a hub message carrying `event`, shaped like the server sends it.
pub fn encode_frame(event: &NotificationEvent) -> Result<Vec<u8>, KeyholdError> {
    let mut argument = vec![
        (Value::from("ContextId"), Value::Nil),
        (Value::from("Type"), Value::from(event.kind.code())),
    ];
    if !event.id.is_empty() {
        argument.push((
            Value::from("Payload"),
            Value::Map(vec![(Value::from("Id"), Value::from(event.id.as_str()))]),
        ));
    }
    let invocation = Value::Array(vec![
        Value::from(1),
        Value::Map(Vec::new()),
        Value::Nil,
        Value::from("ReceiveMessage"),
        Value::Array(vec![Value::Map(argument)]),
    ]);

    let mut payload = Vec::new();
    rmpv::encode::write_value(&mut payload, &invocation)
        .map_err(|e| KeyholdError::Internal(format!("failed to encode frame: {e}")))?;

    let mut message = encode_length_prefix(payload.len());
    message.extend_from_slice(&payload);
    Ok(message)
}

/// Base-128 little-endian length prefix.
pub fn encode_length_prefix(mut len: usize) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(5);
    loop {
        let byte = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            prefix.push(byte);
            return prefix;
        }
        prefix.push(byte | 0x80);
    }
}
