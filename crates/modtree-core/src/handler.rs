use crate::Document;
use crate::error::{Error, Result, ResultExt, kind_name};
use crate::store::SidecarReader;

pub const SCRIPT_KEY: &str = "LuaScript";
pub const SCRIPT_PATH_KEY: &str = "LuaScript_path";

/// What to do with the script field of an assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptAction {
    Noop,
    Set { key: String, value: String },
}

pub trait ScriptHandler {
    fn resolve(&self, fragment: &Document) -> Result<ScriptAction>;
}

/// Pulls the script back in from its sidecar when the fragment points at one;
/// an inline script is left alone.
pub struct LuaHandler<'a> {
    pub reader: &'a dyn SidecarReader,
}

impl<'a> LuaHandler<'a> {
    pub fn new(reader: &'a dyn SidecarReader) -> Self {
        Self { reader }
    }
}

impl ScriptHandler for LuaHandler<'_> {
    fn resolve(&self, fragment: &Document) -> Result<ScriptAction> {
        let Some(raw) = fragment.get(SCRIPT_PATH_KEY) else {
            return Ok(ScriptAction::Noop);
        };
        let path = raw.as_str().ok_or_else(|| Error::TypeMismatch {
            key: SCRIPT_PATH_KEY.to_string(),
            expected: "string",
            found: kind_name(raw),
        })?;
        let value = self
            .reader
            .read_sidecar(path)
            .context(|| format!("reading script for {}", SCRIPT_KEY))?;
        Ok(ScriptAction::Set {
            key: SCRIPT_KEY.to_string(),
            value,
        })
    }
}
