// Typed, destructive accessors over a `Document`.
// - `take_*` are strict: a missing key or wrong type is an error, and the
//   document is left as it was.
// - `try_take_*` are best-effort: `None` on any failure, document untouched.
// - On success the key is removed, so generic pass-through never sees it.
use crate::Document;
use crate::error::{Error, Result, kind_name};
use serde_json::Value;

fn lookup<'d>(doc: &'d Document, key: &str) -> Result<&'d Value> {
    doc.get(key).ok_or_else(|| Error::MissingField { key: key.to_string() })
}

fn mismatch(key: &str, expected: &'static str, found: &Value) -> Error {
    Error::TypeMismatch {
        key: key.to_string(),
        expected,
        found: kind_name(found),
    }
}

/// Non-destructive strict string read.
pub fn get_str<'d>(doc: &'d Document, key: &str) -> Result<&'d str> {
    let raw = lookup(doc, key)?;
    raw.as_str().ok_or_else(|| mismatch(key, "string", raw))
}

pub fn take_str(doc: &mut Document, key: &str) -> Result<String> {
    get_str(doc, key)?;
    match doc.remove(key) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(Error::MissingField { key: key.to_string() }),
    }
}

pub fn try_take_str(doc: &mut Document, key: &str) -> Option<String> {
    take_str(doc, key).ok()
}

pub fn take_str_array(doc: &mut Document, key: &str) -> Result<Vec<String>> {
    let raw = lookup(doc, key)?;
    let items = raw.as_array().ok_or_else(|| mismatch(key, "array", raw))?;
    let mut out = Vec::with_capacity(items.len());
    for (index, it) in items.iter().enumerate() {
        match it {
            Value::String(s) => out.push(s.clone()),
            other => {
                return Err(Error::ElementTypeMismatch {
                    key: key.to_string(),
                    index,
                    expected: "string",
                    found: kind_name(other),
                });
            }
        }
    }
    doc.remove(key);
    Ok(out)
}

pub fn try_take_str_array(doc: &mut Document, key: &str) -> Option<Vec<String>> {
    take_str_array(doc, key).ok()
}

/// Integral numbers are taken as-is; floats are truncated toward zero.
pub fn take_int(doc: &mut Document, key: &str) -> Result<i64> {
    let raw = lookup(doc, key)?;
    let n = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        _ => None,
    };
    let n = n.ok_or_else(|| mismatch(key, "int or float", raw))?;
    doc.remove(key);
    Ok(n)
}

pub fn try_take_int(doc: &mut Document, key: &str) -> Option<i64> {
    take_int(doc, key).ok()
}
