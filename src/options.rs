//! Parser configuration

use serde::{Deserialize, Serialize};

/// Options controlling how a page's flight payload is collected and resolved.
///
/// Deserializable so hosts can pass it as part of an extraction request; every
/// field has a default matching what Next.js emits today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightOptions {
    /// Property names whose first defining line key should be remembered
    #[serde(default)]
    pub watched: Vec<String>,
    /// Text a script must contain to be considered a data script
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Global object the queue hangs off (`<root>.<queue>.push`)
    #[serde(default = "default_root")]
    pub root: String,
    /// Name of the queue array the scripts push onto (`<root>.<queue>.push`)
    #[serde(default = "default_queue")]
    pub queue: String,
    /// Push tag that carries page data; other tags are bootstrap/form state
    #[serde(default = "default_data_tag")]
    pub data_tag: u64,
    /// Upper bound on nested pointer expansion and document unwrapping
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_marker() -> String {
    "self.__next_f.push".to_string()
}

fn default_root() -> String {
    "self".to_string()
}

fn default_queue() -> String {
    "__next_f".to_string()
}

fn default_data_tag() -> u64 {
    1
}

fn default_max_depth() -> usize {
    256
}

impl Default for FlightOptions {
    fn default() -> Self {
        Self {
            watched: Vec::new(),
            marker: default_marker(),
            root: default_root(),
            queue: default_queue(),
            data_tag: default_data_tag(),
            max_depth: default_max_depth(),
        }
    }
}

impl FlightOptions {
    /// Default options watching the given property names
    pub fn watching<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watched: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}
