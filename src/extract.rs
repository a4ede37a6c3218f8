//! Request-driven extraction over a page's flight payload
//!
//! A request names the objects a caller wants (by line key, watched property,
//! or value-level reference), optionally a path into each, and an alias for
//! the result. Alternatives are tried in order when a lookup misses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::options::FlightOptions;
use crate::payload::{FlightPayload, PayloadStats};

/// Extraction request, usually deserialized from a host's JSON
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionRequest {
    #[serde(default)]
    pub options: FlightOptions,
    pub specs: Vec<ExtractSpec>,
}

/// How a spec finds the line key of its object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// `name` is the line key itself
    Key,
    /// First line whose value mentions `name` (watched property)
    Property,
    /// Line that `"name":"$<key>"` points at
    Reference,
}

/// Single extraction specification
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractSpec {
    pub lookup: Lookup,
    pub name: String,
    /// Output alias
    pub alias: String,
    /// Path segments into the materialized object (keys or array indexes)
    #[serde(default)]
    pub path: Vec<String>,
    /// For COALESCE: alternative specs to try
    #[serde(default)]
    pub alternatives: Vec<ExtractSpec>,
}

/// Extraction result
#[derive(Debug, Serialize)]
pub struct ExtractionResult {
    /// Map of alias -> extracted value, None when every alternative missed
    pub values: HashMap<String, Option<Value>>,
    /// Map of alias -> error for lookups that hit a broken payload
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub errors: HashMap<String, String>,
    pub stats: PayloadStats,
}

/// Build the page's payload once and evaluate every spec against it.
///
/// Property lookups are added to the watched set automatically.
///
/// # Errors
/// Only [`crate::FlightError::StructuralAbsence`]; per-spec failures land in
/// [`ExtractionResult::errors`].
pub fn extract_all(html: &str, request: &ExtractionRequest) -> Result<ExtractionResult> {
    let mut options = request.options.clone();
    for spec in &request.specs {
        collect_watched(spec, &mut options.watched);
    }

    let payload = FlightPayload::build_with(html, &options)?;
    Ok(extract_from_payload(&payload, &request.specs))
}

/// Evaluate specs against an already built payload
pub fn extract_from_payload(payload: &FlightPayload, specs: &[ExtractSpec]) -> ExtractionResult {
    let mut values = HashMap::new();
    let mut errors = HashMap::new();

    for spec in specs {
        match extract_single(payload, spec) {
            Ok(value) => {
                values.insert(spec.alias.clone(), value);
            }
            Err(e) => {
                tracing::debug!(
                    target: "flight_parser::extract",
                    alias = %spec.alias,
                    error = %e,
                    "Extraction failed"
                );
                values.insert(spec.alias.clone(), None);
                errors.insert(spec.alias.clone(), e.to_string());
            }
        }
    }

    ExtractionResult {
        values,
        errors,
        stats: payload.stats(),
    }
}

fn collect_watched(spec: &ExtractSpec, watched: &mut Vec<String>) {
    if spec.lookup == Lookup::Property && !watched.contains(&spec.name) {
        watched.push(spec.name.clone());
    }
    for alt in &spec.alternatives {
        collect_watched(alt, watched);
    }
}

/// Extract a single value based on spec, falling back to alternatives on a miss
fn extract_single(payload: &FlightPayload, spec: &ExtractSpec) -> Result<Option<Value>> {
    let result = lookup_value(payload, spec)?;

    // If no result and we have alternatives (COALESCE), try them
    if result.is_none() {
        for alt in &spec.alternatives {
            let alt_result = extract_single(payload, alt)?;
            if alt_result.is_some() {
                return Ok(alt_result);
            }
        }
    }

    Ok(result)
}

fn lookup_value(payload: &FlightPayload, spec: &ExtractSpec) -> Result<Option<Value>> {
    let key = match spec.lookup {
        Lookup::Key => Some(spec.name.as_str()),
        Lookup::Property => payload.key_for_property(&spec.name),
        Lookup::Reference => payload.reference_key_for_property(&spec.name),
    };
    let Some(key) = key else {
        return Ok(None);
    };

    let object = match payload.object_by_key(key) {
        Ok(object) => object,
        Err(e) if e.is_miss() => return Ok(None),
        Err(e) => return Err(e),
    };

    Ok(navigate(object, &spec.path))
}

/// Follow path segments: object key first, then array index
fn navigate(value: Value, path: &[String]) -> Option<Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(mut map) => map.remove(segment)?,
            Value::Array(mut items) => {
                let idx = segment.parse::<usize>().ok()?;
                if idx >= items.len() {
                    return None;
                }
                items.swap_remove(idx)
            }
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlightError;
    use serde_json::json;

    const PAGE: &str = r##"
    <html>
    <body>
        <script>self.__next_f.push([1,"0:[\"$\",\"main\",null,{\"comic\":\"$2b\"}]\n2b:{\"name\":\"Sample\",\"slug\":\"sample-title\",\"genres\":[{\"id\":1,\"name\":\"Action\"}]}\n"])</script>
        <script>self.__next_f.push([1,"7:{\"chapters\":[{\"number\":3,\"title\":\"Three\"}]}\n8:{\"loop\":\"$9\"}\n9:\"$8\"\n"])</script>
    </body>
    </html>
    "##;

    fn spec(lookup: Lookup, name: &str, alias: &str, path: &[&str]) -> ExtractSpec {
        ExtractSpec {
            lookup,
            name: name.to_string(),
            alias: alias.to_string(),
            path: path.iter().map(|s| s.to_string()).collect(),
            alternatives: vec![],
        }
    }

    #[test]
    fn test_extract_all_lookups() {
        let request = ExtractionRequest {
            options: FlightOptions::default(),
            specs: vec![
                spec(Lookup::Reference, "comic", "title", &["name"]),
                spec(Lookup::Property, "chapters", "first_chapter", &["chapters", "0", "title"]),
                spec(Lookup::Key, "2b", "genre", &["genres", "0", "name"]),
                spec(Lookup::Key, "2b", "comic", &[]),
            ],
        };

        let result = extract_all(PAGE, &request).unwrap();
        assert_eq!(result.values["title"], Some(json!("Sample")));
        assert_eq!(result.values["first_chapter"], Some(json!("Three")));
        assert_eq!(result.values["genre"], Some(json!("Action")));
        assert_eq!(result.values["comic"].as_ref().unwrap()["slug"], "sample-title");
        assert!(result.errors.is_empty());
        assert_eq!(result.stats.scripts, 2);
    }

    #[test]
    fn test_misses_and_alternatives() {
        let mut with_alt = spec(Lookup::Reference, "series", "name", &["name"]);
        with_alt.alternatives = vec![
            spec(Lookup::Key, "nope", "unused", &[]),
            spec(Lookup::Reference, "comic", "unused", &["name"]),
        ];

        let request = ExtractionRequest {
            options: FlightOptions::default(),
            specs: vec![
                with_alt,
                spec(Lookup::Key, "zz", "missing_key", &[]),
                spec(Lookup::Key, "2b", "missing_path", &["genres", "5"]),
            ],
        };

        let result = extract_all(PAGE, &request).unwrap();
        assert_eq!(result.values["name"], Some(json!("Sample")));
        assert_eq!(result.values["missing_key"], None);
        assert_eq!(result.values["missing_path"], None);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_cycle_reported_per_alias() {
        let request = ExtractionRequest {
            options: FlightOptions::default(),
            specs: vec![
                spec(Lookup::Key, "8", "looping", &[]),
                spec(Lookup::Reference, "comic", "title", &["name"]),
            ],
        };

        let result = extract_all(PAGE, &request).unwrap();
        assert_eq!(result.values["looping"], None);
        assert!(result.errors["looping"].contains("cycle"));
        assert_eq!(result.values["title"], Some(json!("Sample")));
    }

    #[test]
    fn test_request_from_json() {
        let request: ExtractionRequest = serde_json::from_str(
            r#"{
                "options": {"max_depth": 32},
                "specs": [
                    {"lookup": "property", "name": "chapters", "alias": "chapters", "path": ["chapters"]},
                    {"lookup": "reference", "name": "comic", "alias": "comic"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(request.options.max_depth, 32);
        assert_eq!(request.specs[0].lookup, Lookup::Property);

        let result = extract_all(PAGE, &request).unwrap();
        assert_eq!(result.values["chapters"], Some(json!([{"number": 3, "title": "Three"}])));

        let serialized = serde_json::to_value(&result).unwrap();
        assert!(serialized.get("errors").is_none());
        assert_eq!(serialized["stats"]["chunks"], 2);
    }

    #[test]
    fn test_no_flight_data_fails_request() {
        let request = ExtractionRequest {
            options: FlightOptions::default(),
            specs: vec![spec(Lookup::Key, "0", "root", &[])],
        };
        let err = extract_all("<html><script>var x = 1;</script></html>", &request).unwrap_err();
        assert!(matches!(err, FlightError::StructuralAbsence { .. }));
    }
}
