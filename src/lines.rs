//! Line store: `key:value` records of a flight payload

use std::collections::HashMap;

/// Key → raw value table built from a raw flight buffer, plus the watched
/// property cache filled during the same pass.
#[derive(Debug, Default)]
pub(crate) struct LineStore {
    entries: HashMap<String, String>,
    property_keys: HashMap<String, String>,
    lines: usize,
    malformed_lines: usize,
}

impl LineStore {
    /// Index every line of `raw`. Later lines overwrite earlier ones with the
    /// same key; watched names remember the first key whose value mentions them.
    pub fn build(raw: &str, watched: &[String]) -> Self {
        let mut store = Self::default();
        let mut pending: Vec<&str> = watched.iter().map(String::as_str).collect();

        for line in raw.split('\n') {
            let Some((key, value)) = line.split_once(':') else {
                if !line.is_empty() {
                    store.malformed_lines += 1;
                    tracing::trace!(
                        target: "flight_parser::lines",
                        line_len = line.len(),
                        "Skipping line without key delimiter"
                    );
                }
                continue;
            };
            store.lines += 1;

            if !pending.is_empty() {
                pending.retain(|name| {
                    if value.contains(*name) {
                        store
                            .property_keys
                            .entry((*name).to_string())
                            .or_insert_with(|| key.to_string());
                        false
                    } else {
                        true
                    }
                });
            }

            store.entries.insert(key.to_string(), value.to_string());
        }

        tracing::debug!(
            target: "flight_parser::lines",
            keys = store.entries.len(),
            lines = store.lines,
            malformed = store.malformed_lines,
            unmatched_properties = pending.len(),
            "Indexed flight lines"
        );

        store
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn key_for_property(&self, name: &str) -> Option<&str> {
        self.property_keys.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn watched(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_splits_on_first_colon() {
        let store = LineStore::build("1a:{\"a\":\"b:c\"}\n", &[]);
        assert_eq!(store.get("1a"), Some("{\"a\":\"b:c\"}"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let store = LineStore::build("k:first\nother:x\nk:second", &[]);
        assert_eq!(store.get("k"), Some("second"));
        assert_eq!(store.get("other"), Some("x"));
        assert_eq!(store.lines(), 3);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let store = LineStore::build("a:1\nno delimiter here\n\nb:2\n", &[]);
        assert_eq!(store.get("a"), Some("1"));
        assert_eq!(store.get("b"), Some("2"));
        assert_eq!(store.malformed_lines(), 1);
        assert_eq!(store.get("no delimiter here"), None);
    }

    #[test]
    fn test_watched_property_first_match() {
        let raw = [
            "1:[]",
            "2:{}",
            "3:null",
            "4:\"x\"",
            "5:{\"chapters\":[1]}",
            "6:{}",
            "7:{}",
            "8:{}",
            "9:{\"chapters\":[2]}",
        ]
        .join("\n");

        let store = LineStore::build(&raw, &watched(&["chapters"]));
        assert_eq!(store.key_for_property("chapters"), Some("5"));
    }

    #[rstest]
    #[case::matched("comic", Some("c1"))]
    #[case::second_watched("chapters", Some("c2"))]
    #[case::never_mentioned("pages", None)]
    #[case::not_watched("name", None)]
    fn test_key_for_property(#[case] name: &str, #[case] expected: Option<&str>) {
        let raw = "c1:{\"comic\":{\"name\":\"x\"}}\nc2:{\"chapters\":[],\"comic\":1}";
        let store = LineStore::build(raw, &watched(&["comic", "chapters", "pages"]));
        assert_eq!(store.key_for_property(name), expected);
    }

    #[test]
    fn test_watched_match_survives_overwrite() {
        let store = LineStore::build("a:has comic\na:plain", &watched(&["comic"]));
        assert_eq!(store.key_for_property("comic"), Some("a"));
        assert_eq!(store.get("a"), Some("plain"));
    }
}
