//! Per-page flight payload: the public entry point
//!
//! A [`FlightPayload`] is built once from page markup and is read-only
//! afterwards. Objects are materialized lazily, one key at a time.

use serde::Serialize;
use serde_json::Value;

use crate::chunks::collect_chunks;
use crate::error::{FlightError, Result};
use crate::lines::LineStore;
use crate::materialize::materialize;
use crate::options::FlightOptions;
use crate::reference::find_reference;
use crate::resolver::Resolver;

/// Counters for the conditions tolerated while building a payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PayloadStats {
    /// Scripts containing the push marker
    pub scripts: usize,
    /// Marker scripts that could not be parsed
    pub skipped_scripts: usize,
    /// Data-tag payloads appended to the raw buffer
    pub chunks: usize,
    /// Chunks with lone surrogates that were decoded with replacement characters
    pub lossy_chunks: usize,
    /// Lines with a key delimiter
    pub lines: usize,
    /// Non-empty lines without a key delimiter
    pub malformed_lines: usize,
}

/// Indexed flight payload of one page
#[derive(Debug)]
pub struct FlightPayload {
    raw: String,
    lines: LineStore,
    max_depth: usize,
    stats: PayloadStats,
}

impl FlightPayload {
    /// Build from page markup with default options, remembering the first
    /// defining key of each `watched` property.
    ///
    /// # Errors
    /// [`FlightError::StructuralAbsence`] when the page has no flight script.
    pub fn build(html: &str, watched: &[&str]) -> Result<Self> {
        Self::build_with(html, &FlightOptions::watching(watched.iter().copied()))
    }

    /// Build from page markup with explicit options
    pub fn build_with(html: &str, options: &FlightOptions) -> Result<Self> {
        let collected = collect_chunks(html, options)?;
        let mut payload = Self::from_raw(collected.raw, options);
        payload.stats.scripts = collected.scripts;
        payload.stats.skipped_scripts = collected.skipped_scripts;
        payload.stats.chunks = collected.chunks;
        payload.stats.lossy_chunks = collected.lossy_chunks;
        Ok(payload)
    }

    /// Build from an already concatenated raw buffer
    pub fn from_raw(raw: String, options: &FlightOptions) -> Self {
        let lines = LineStore::build(&raw, &options.watched);
        let stats = PayloadStats {
            lines: lines.lines(),
            malformed_lines: lines.malformed_lines(),
            ..PayloadStats::default()
        };

        Self {
            raw,
            lines,
            max_depth: options.max_depth,
            stats,
        }
    }

    /// First line key whose value mentions a watched property
    pub fn key_for_property(&self, name: &str) -> Option<&str> {
        self.lines.key_for_property(name)
    }

    /// Key that `"<name>":"$<key>"` points at, anywhere in the raw buffer
    pub fn reference_key_for_property(&self, name: &str) -> Option<&str> {
        find_reference(&self.raw, name)
    }

    /// Raw, unresolved value of a line
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.get(key)
    }

    /// Resolve and fully decode the value of `key`.
    ///
    /// Pointers to missing lines stay in the result as literal `$<hex>` text.
    ///
    /// # Errors
    /// [`FlightError::KeyNotFound`] if the key has no line,
    /// [`FlightError::CycleDetected`] if its pointers loop back on themselves,
    /// [`FlightError::DepthLimitExceeded`] past the configured depth.
    pub fn object_by_key(&self, key: &str) -> Result<Value> {
        let raw = self.get(key).ok_or_else(|| FlightError::key_not_found(key))?;
        let resolved = Resolver::new(&self.lines, self.max_depth).resolve_key(key, raw)?;
        materialize(resolved, self.max_depth)
    }

    /// Materialize the object a value-level reference points at
    pub fn object_for_reference(&self, name: &str) -> Result<Option<Value>> {
        self.reference_key_for_property(name)
            .map(|key| self.object_by_key(key))
            .transpose()
    }

    /// Materialize the line first found for a watched property
    pub fn object_for_property(&self, name: &str) -> Result<Option<Value>> {
        self.key_for_property(name)
            .map(|key| self.object_by_key(key))
            .transpose()
    }

    /// Concatenated payload text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn stats(&self) -> PayloadStats {
        self.stats
    }

    /// Number of distinct line keys
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 0
    }
}
