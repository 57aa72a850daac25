//! Mapping between message metadata and tar PAX attributes.
//!
//! Attributes live under the `SCHILY.xattr.` PAX namespace (the same records GNU tar and
//! Go's `archive/tar` use for extended attributes). `amqp.routingKey` carries the routing
//! key; every other attribute is a message header of the same name.

use std::collections::HashMap;
use std::io;

use crate::Message;

pub const XATTR_PREFIX: &str = "SCHILY.xattr.";
pub const ROUTING_KEY_ATTR: &str = "amqp.routingKey";

/// Build a message from an entry body and its attributes (prefix already stripped).
/// A missing routing key becomes the empty string.
pub fn message_from_attrs(body: Vec<u8>, mut attrs: HashMap<String, String>) -> Message {
    let routing_key = attrs.remove(ROUTING_KEY_ATTR).unwrap_or_default();
    Message {
        body,
        routing_key,
        headers: attrs,
        delivery_tag: None,
    }
}

/// PAX records for one message, sorted by key so identical messages encode identically.
///
/// A PAX key ends at the first `=` and records are read back line by line, so names
/// containing `=`, `\n` or NUL and values containing `\n` cannot be stored faithfully.
/// Those are rejected with `InvalidInput`.
pub fn to_pax_records(message: &Message) -> io::Result<Vec<(String, Vec<u8>)>> {
    let mut records = Vec::with_capacity(message.headers.len() + 1);
    for (key, value) in &message.headers {
        if key == ROUTING_KEY_ATTR {
            continue;
        }
        if key.contains(['=', '\n', '\0']) {
            return Err(unstorable("header name", key));
        }
        if value.contains('\n') {
            return Err(unstorable("header value", value));
        }
        records.push((format!("{XATTR_PREFIX}{key}"), value.as_bytes().to_vec()));
    }
    records.sort_by(|a, b| a.0.cmp(&b.0));
    if message.routing_key.contains('\n') {
        return Err(unstorable("routing key", &message.routing_key));
    }
    if !message.routing_key.is_empty() {
        records.insert(
            0,
            (
                format!("{XATTR_PREFIX}{ROUTING_KEY_ATTR}"),
                message.routing_key.as_bytes().to_vec(),
            ),
        );
    }
    Ok(records)
}

fn unstorable(what: &str, text: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{what} {text:?} cannot be stored as a PAX attribute"),
    )
}
