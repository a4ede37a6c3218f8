//! Pointer resolution for flight line values
//!
//! A value may reference another line with a `$<hex>` token, either as bare
//! text or hidden inside a JSON string field. Resolution expands every token
//! into the (recursively resolved) text of the line it names.
//!
//! Missing targets are left as the literal token. A key that re-enters its own
//! expansion chain fails with [`FlightError::CycleDetected`]; expanding the same
//! key twice side by side is fine.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{FlightError, Result};
use crate::lines::LineStore;
use crate::materialize::parse_document;

static POINTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[0-9a-fA-F]+").expect("valid pointer pattern"));

// A pointer written as a JSON escape inside a string literal
static ESCAPED_POINTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u0024[0-9a-fA-F]").expect("valid escaped pointer pattern"));

/// Resolves pointer tokens against one line store. Single use per lookup.
pub(crate) struct Resolver<'a> {
    lines: &'a LineStore,
    max_depth: usize,
    depth: usize,
    chain: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(lines: &'a LineStore, max_depth: usize) -> Self {
        Self {
            lines,
            max_depth,
            depth: 0,
            chain: Vec::new(),
        }
    }

    /// Resolve the raw value of `key`, treating `key` as already on the chain
    /// so a line that points back at itself is reported as a cycle.
    pub fn resolve_key(&mut self, key: &str, raw: &str) -> Result<String> {
        self.enter(key)?;
        let resolved = self.resolve(raw);
        self.chain.pop();
        resolved
    }

    /// Expand every pointer token in `text`
    pub fn resolve(&mut self, text: &str) -> Result<String> {
        if !may_hold_pointer(text) {
            return Ok(text.to_string());
        }

        if self.depth >= self.max_depth {
            return Err(FlightError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let resolved = match parse_document(text) {
            Ok(value @ (Value::Object(_) | Value::Array(_) | Value::String(_))) => {
                self.resolve_strings(value).map(|walked| walked.to_string())
            }
            _ => self.expand_tokens(text),
        };
        self.depth -= 1;

        resolved
    }

    /// Resolve the contents of every string leaf; object keys stay untouched
    fn resolve_strings(&mut self, value: Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.resolve(&s)?),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.resolve_strings(item))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| Ok((k, self.resolve_strings(v)?)))
                    .collect::<Result<_>>()?,
            ),
            other => other,
        })
    }

    /// Substitute bare pointer tokens in non-JSON text
    fn expand_tokens(&mut self, text: &str) -> Result<String> {
        let lines = self.lines;
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for token in POINTER.find_iter(text) {
            out.push_str(&text[last..token.start()]);
            last = token.end();

            let key = &token.as_str()[1..];
            match lines.get(key) {
                Some(target) if has_pointer(target) => {
                    let expanded = self.resolve_key(key, target)?;
                    out.push_str(&expanded);
                }
                Some(target) => out.push_str(target),
                None => {
                    tracing::trace!(
                        target: "flight_parser::resolver",
                        key,
                        "Leaving unresolved pointer in place"
                    );
                    out.push_str(token.as_str());
                }
            }
        }

        out.push_str(&text[last..]);
        Ok(out)
    }

    fn enter(&mut self, key: &str) -> Result<()> {
        if self.chain.iter().any(|k| k == key) {
            let chain = self
                .chain
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(key))
                .map(|k| format!("${k}"))
                .collect::<Vec<_>>()
                .join(" -> ");
            tracing::debug!(
                target: "flight_parser::resolver",
                key,
                chain = %chain,
                "Pointer cycle detected"
            );
            return Err(FlightError::CycleDetected {
                key: key.to_string(),
                chain,
            });
        }
        self.chain.push(key.to_string());
        Ok(())
    }
}

/// Whether `text` could contain a pointer, either literally or JSON-escaped.
/// Anything else is returned byte-for-byte, never re-serialized.
fn may_hold_pointer(text: &str) -> bool {
    has_pointer(text) || ESCAPED_POINTER.is_match(text)
}

/// Whether `text` contains at least one pointer token
pub(crate) fn has_pointer(text: &str) -> bool {
    POINTER.is_match(text)
}
