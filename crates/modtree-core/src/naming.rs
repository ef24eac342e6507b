use crate::Document;

/// Label keys tried in order; the first non-empty string wins.
const LABEL_KEYS: [&str; 2] = ["Nickname", "Name"];

/// File-safe, collision-resistant name: `<label>.<guid>`, or the bare guid
/// when no label is set.
pub fn good_name(guid: &str, data: &Document) -> String {
    let label = LABEL_KEYS
        .iter()
        .find_map(|k| data.get(*k).and_then(|v| v.as_str()).filter(|s| !s.is_empty()));
    match label {
        Some(l) => format!("{}.{}", sanitize(l), guid),
        None => guid.to_string(),
    }
}

// only let alphanumerics, _ and - through
fn sanitize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
