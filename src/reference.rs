//! Value-level pointer lookup over the raw flight buffer

/// Find the first `"<property>":"$<hex>"` in `raw` and return the hex key.
///
/// This looks for a property whose value *is* a pointer, wherever that
/// property sits inside another line's payload. It does not depend on the
/// watched-property cache.
pub(crate) fn find_reference<'a>(raw: &'a str, property: &str) -> Option<&'a str> {
    let pattern = format!(r#""{}":"\$([0-9a-fA-F]+)""#, regex::escape(property));
    let re = regex::Regex::new(&pattern).ok()?;
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
