//! Structural decoding of resolved flight text
//!
//! Payload values are often documents serialized into strings, sometimes more
//! than once. Decoding keeps parsing strings until they stop being JSON and
//! descends into every array element and object value.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FlightError, Result};

/// Parse one complete JSON document without serde_json's nesting limit.
///
/// Component trees in flight lines can nest past 128 levels; the default
/// limit would make such valid JSON look like bare text.
pub(crate) fn parse_document(text: &str) -> serde_json::Result<Value> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = Value::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// Decode `text` into a value tree, unwrapping every string-encoded document.
///
/// Text that is not JSON comes back as a plain string. `max_depth` bounds how
/// many encoded documents may sit inside one another; container nesting is
/// not counted.
pub(crate) fn materialize(text: String, max_depth: usize) -> Result<Value> {
    decode(Value::String(text), 0, max_depth)
}

fn decode(value: Value, unwraps: usize, max_depth: usize) -> Result<Value> {
    Ok(match value {
        Value::String(s) => match parse_document(&s) {
            Ok(parsed) => {
                if unwraps >= max_depth {
                    return Err(FlightError::DepthLimitExceeded { limit: max_depth });
                }
                decode(parsed, unwraps + 1, max_depth)?
            }
            Err(_) => Value::String(s),
        },
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| decode(item, unwraps, max_depth))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| Ok((k, decode(v, unwraps, max_depth)?)))
                .collect::<Result<_>>()?,
        ),
        other => other,
    })
}
