// luabundle packed-script support. A bundled script carries a marker on its
// first line and registers each module through `__bundle_register`; the
// editable source is the body of the `__root` module.
use crate::error::{Error, Result};

pub const BUNDLE_MARKER: &str = "-- Bundled by luabundle";
const ROOT_OPEN: &str =
    "__bundle_register(\"__root\", function(require, _LOADED, __bundle_register, __bundle_modules)";
const MODULE_CLOSE: &str = "\nend)";

pub fn is_bundled(script: &str) -> bool {
    script.trim_start().starts_with(BUNDLE_MARKER)
}

/// Expand a bundled script into its root module body. Text without the
/// marker is returned unchanged.
pub fn unbundle(script: &str) -> Result<String> {
    if !is_bundled(script) {
        return Ok(script.to_string());
    }
    let start = script
        .find(ROOT_OPEN)
        .ok_or_else(|| Error::Bundle("no __root module in bundled script".into()))?;
    let body = &script[start + ROOT_OPEN.len()..];
    let body = body.strip_prefix("\r\n").or_else(|| body.strip_prefix('\n')).unwrap_or(body);
    // an empty root module closes immediately
    if body.starts_with("end)") {
        return Ok(String::new());
    }
    let end = root_end(body).ok_or_else(|| Error::Bundle("unterminated __root module".into()))?;
    Ok(body[..end].to_string())
}

// A module closes at an `end)` line followed by the next registration, the
// final require, or end of input. Nested `end)` lines inside the body are
// skipped.
fn root_end(body: &str) -> Option<usize> {
    body.match_indices(MODULE_CLOSE).map(|(i, _)| i).find(|&i| {
        let after = body[i + MODULE_CLOSE.len()..].trim_start();
        after.is_empty()
            || after.starts_with("__bundle_register(")
            || after.starts_with("return __bundle_require(")
    })
}
