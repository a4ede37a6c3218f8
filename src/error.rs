//! Error types for flight payload parsing

/// Fatal failures while building a payload or materializing a key.
///
/// Tolerated conditions (unresolved pointers, malformed lines, text that is
/// not a JSON document, scripts that fail to parse) never surface here; they
/// degrade to partial results and are only logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlightError {
    #[error("no script containing `{marker}` found in page markup")]
    StructuralAbsence { marker: String },
    #[error("key `{0}` not found in flight payload")]
    KeyNotFound(String),
    #[error("pointer cycle detected at `${key}` (chain: {chain})")]
    CycleDetected { key: String, chain: String },
    #[error("resolution depth exceeded limit of {limit}")]
    DepthLimitExceeded { limit: usize },
}

impl FlightError {
    /// Create a new KeyNotFound error
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound(key.into())
    }

    /// Whether the error only means "nothing there", as opposed to a broken payload
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}

pub type Result<T, E = FlightError> = std::result::Result<T, E>;
