// One object of the save hierarchy, and the two directions it travels:
// - parse: document fragment (or file + sidecars) -> ObjectNode tree
// - print: ObjectNode tree -> one assembled document, or a directory of files
use serde_json::Value;

use crate::Document;
use crate::bundler;
use crate::error::{Error, Result, ResultExt, kind_name};
use crate::extract::{get_str, try_take_str, try_take_str_array};
use crate::handler::{SCRIPT_KEY, SCRIPT_PATH_KEY, ScriptAction, ScriptHandler};
use crate::naming;
use crate::smooth::{smooth, smooth_angle, smooth_snap_points};
use crate::store::{
    DirCreator, DocumentReader, DocumentWriter, SidecarReader, SidecarWriter, join, parent,
};

/// Text longer than this many characters is moved to a sidecar file.
pub const EXTERNALIZE_THRESHOLD: usize = 80;

pub const GUID_KEY: &str = "GUID";
pub const SCRIPT_STATE_KEY: &str = "LuaScriptState";
pub const SCRIPT_STATE_PATH_KEY: &str = "LuaScriptState_path";
pub const NOTES_KEY: &str = "GMNotes";
pub const NOTES_PATH_KEY: &str = "GMNotes_path";
pub const CHILDREN_KEY: &str = "ContainedObjects";
pub const CHILD_DIR_KEY: &str = "ContainedObjects_path";
pub const CHILD_ORDER_KEY: &str = "ContainedObjects_order";
const SMOOTHED_KEYS: [&str; 2] = ["Transform", "ColorDiffuse"];
const ANGLE_KEY: &str = "AltLookAngle";
const SNAP_POINTS_KEY: &str = "AttachedSnapPoints";

pub const DOC_SUFFIX: &str = ".json";
pub const SCRIPT_SUFFIX: &str = ".ttslua";
pub const SCRIPT_STATE_SUFFIX: &str = ".luascriptstate";
pub const NOTES_SUFFIX: &str = ".gmnotes";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectNode {
    pub guid: String,
    /// Every field not pulled out below; passed through verbatim.
    pub data: Document,
    pub script_state_path: Option<String>,
    pub notes_path: Option<String>,
    pub child_dir: Option<String>,
    /// Child file stems, always as long as `children`.
    pub child_order: Vec<String>,
    pub children: Vec<ObjectNode>,
}

impl ObjectNode {
    /// Interpret an in-memory fragment, including any inline children.
    pub fn from_document(doc: Document) -> Result<Self> {
        let node = Self::interpret(doc)?;
        node.check_order()?;
        Ok(node)
    }

    /// Read `path` and, when it declares a child directory, every child file
    /// listed in its order, recursively.
    pub fn parse_from_file(path: &str, reader: &dyn DocumentReader) -> Result<Self> {
        tracing::debug!(path, "parsing object file");
        let doc = reader.read_document(path)?;
        let mut node = Self::interpret(doc).context(|| format!("<{}> interpreting", path))?;
        if node.children.is_empty()
            && let Some(dir) = &node.child_dir
        {
            let base = join(parent(path), dir);
            let mut children = Vec::with_capacity(node.child_order.len());
            for name in &node.child_order {
                let p = join(&base, &format!("{}{}", name, DOC_SUFFIX));
                let child = Self::parse_from_file(&p, reader)
                    .context(|| format!("parsing child {}", p))?;
                children.push(child);
            }
            node.children = children;
        }
        node.check_order().context(|| path.to_string())?;
        Ok(node)
    }

    fn interpret(mut data: Document) -> Result<Self> {
        // nothing is touched until the identifier checks out
        let guid = get_str(&data, GUID_KEY)?.to_string();

        let script_state_path = try_take_str(&mut data, SCRIPT_STATE_PATH_KEY);
        let notes_path = try_take_str(&mut data, NOTES_PATH_KEY);
        let child_dir = try_take_str(&mut data, CHILD_DIR_KEY);
        let declared_order = try_take_str_array(&mut data, CHILD_ORDER_KEY).unwrap_or_default();

        for key in SMOOTHED_KEYS {
            if let Some(v) = data.get_mut(key) {
                *v = smooth(v.take());
            }
        }
        if let Some(v) = data.get_mut(ANGLE_KEY) {
            *v = smooth_angle(v.take())
                .context(|| format!("<{}> smoothing {}", guid, ANGLE_KEY))?;
        }
        if let Some(v) = data.get_mut(SNAP_POINTS_KEY) {
            *v = smooth_snap_points(v.take())
                .context(|| format!("<{}> smoothing {}", guid, SNAP_POINTS_KEY))?;
        }

        let mut children = Vec::new();
        let mut inline_order = Vec::new();
        if let Some(raw) = data.remove(CHILDREN_KEY) {
            let items = match raw {
                Value::Array(items) => items,
                other => {
                    return Err(Error::TypeMismatch {
                        key: CHILDREN_KEY.to_string(),
                        expected: "array",
                        found: kind_name(&other),
                    });
                }
            };
            for (index, item) in items.into_iter().enumerate() {
                let sub = match item {
                    Value::Object(sub) => sub,
                    other => {
                        return Err(Error::ElementTypeMismatch {
                            key: CHILDREN_KEY.to_string(),
                            index,
                            expected: "object",
                            found: kind_name(&other),
                        });
                    }
                };
                let child = Self::from_document(sub)
                    .context(|| format!("parsing sub object {} of {}", index, guid))?;
                // named only after the child finished interpreting itself
                inline_order.push(child.good_name());
                children.push(child);
            }
        }

        let child_order = if children.is_empty() {
            declared_order
        } else {
            if !declared_order.is_empty() && declared_order.len() != children.len() {
                return Err(Error::OrderLengthMismatch {
                    what: format!("inline children of {} vs {}", guid, CHILD_ORDER_KEY),
                    expected: declared_order.len(),
                    found: children.len(),
                });
            }
            if let Some(dir) = &child_dir {
                tracing::warn!(
                    %guid,
                    dir = %dir,
                    "inline children present; child directory not read"
                );
            }
            inline_order
        };

        Ok(Self {
            guid,
            data,
            script_state_path,
            notes_path,
            child_dir,
            child_order,
            children,
        })
    }

    pub fn good_name(&self) -> String {
        naming::good_name(&self.guid, &self.data)
    }

    fn check_order(&self) -> Result<()> {
        if self.child_order.len() != self.children.len() {
            return Err(Error::OrderLengthMismatch {
                what: format!("child order of {}", self.good_name()),
                expected: self.child_order.len(),
                found: self.children.len(),
            });
        }
        Ok(())
    }

    /// Fold this node and its children back into one document.
    pub fn assemble(
        self,
        sidecars: &dyn SidecarReader,
        handler: &dyn ScriptHandler,
    ) -> Result<Document> {
        self.check_order()?;
        let guid = self.guid;
        let mut out = self.data;

        match handler.resolve(&out).context(|| format!("<{}> resolving script", guid))? {
            ScriptAction::Noop => {}
            ScriptAction::Set { key, value } => {
                out.remove(SCRIPT_KEY);
                out.remove(SCRIPT_PATH_KEY);
                out.insert(key, Value::String(value));
            }
        }
        if let Some(p) = &self.notes_path {
            let notes = sidecars
                .read_sidecar(p)
                .context(|| format!("<{}> reading sidecar {}", guid, p))?;
            out.insert(NOTES_KEY.to_string(), Value::String(notes));
        }
        if let Some(p) = &self.script_state_path {
            let state = sidecars
                .read_sidecar(p)
                .context(|| format!("<{}> reading sidecar {}", guid, p))?;
            out.insert(SCRIPT_STATE_KEY.to_string(), Value::String(state));
        }

        let mut subs = Vec::with_capacity(self.children.len());
        for child in self.children {
            subs.push(Value::Object(child.assemble(sidecars, handler)?));
        }
        if !subs.is_empty() {
            out.insert(CHILDREN_KEY.to_string(), Value::Array(subs));
        }
        Ok(out)
    }

    /// Write this node as `<dir>/<good_name>.json`, its large text fields as
    /// sidecars next to it, and its children into a same-named subdirectory.
    pub fn emit(
        mut self,
        dir: &str,
        sidecars: &dyn SidecarWriter,
        writer: &dyn DocumentWriter,
        dirs: &dyn DirCreator,
    ) -> Result<()> {
        self.check_order()?;
        let name = self.good_name();
        tracing::debug!(guid = %self.guid, dir, "emitting object");

        if let Some(Value::String(raw)) = self.data.get(SCRIPT_KEY) {
            let script = bundler::unbundle(raw)
                .context(|| format!("<{}> unbundling script", self.guid))?;
            if bundler::is_bundled(&script) {
                return Err(Error::BundledScriptLeak {
                    dir: dir.to_string(),
                    name,
                });
            }
            if exceeds_threshold(&script) {
                let p = join(dir, &format!("{}{}", name, SCRIPT_SUFFIX));
                sidecars
                    .write_sidecar(&script, &p)
                    .context(|| format!("<{}> writing script", self.guid))?;
                self.data.remove(SCRIPT_KEY);
                self.data.insert(SCRIPT_PATH_KEY.to_string(), Value::String(p));
            } else {
                self.data.insert(SCRIPT_KEY.to_string(), Value::String(script));
                self.data.remove(SCRIPT_PATH_KEY);
            }
        }
        let state = (SCRIPT_STATE_KEY, SCRIPT_STATE_PATH_KEY, SCRIPT_STATE_SUFFIX);
        if let Some(p) = self.externalize(state, dir, &name, sidecars)? {
            self.script_state_path = Some(p);
        }
        let notes = (NOTES_KEY, NOTES_PATH_KEY, NOTES_SUFFIX);
        if let Some(p) = self.externalize(notes, dir, &name, sidecars)? {
            self.notes_path = Some(p);
        }

        if !self.children.is_empty() {
            let sub = dirs
                .create_dir(dir, &name)
                .context(|| format!("<{}> creating {} under {:?}", self.guid, name, dir))?;
            self.data.insert(CHILD_DIR_KEY.to_string(), Value::String(sub.clone()));
            let sub_path = join(dir, &sub);
            self.child_dir = Some(sub);

            let children = std::mem::take(&mut self.children);
            let count = children.len();
            for child in children {
                child
                    .emit(&sub_path, sidecars, writer, dirs)
                    .context(|| format!("printing file {}", sub_path))?;
            }
            if count != self.child_order.len() {
                return Err(Error::OrderLengthMismatch {
                    what: format!("child order of {}", name),
                    expected: self.child_order.len(),
                    found: count,
                });
            }
            let order = self.child_order.iter().cloned().map(Value::String).collect();
            self.data.insert(CHILD_ORDER_KEY.to_string(), Value::Array(order));
        }

        let fname = join(dir, &format!("{}{}", name, DOC_SUFFIX));
        writer.write_document(&self.data, &fname)
    }

    // Moves a long string field out to `<dir>/<name><suffix>` and records the
    // path under `path_key`. Returns the path when it did.
    fn externalize(
        &mut self,
        (key, path_key, suffix): (&str, &str, &str),
        dir: &str,
        name: &str,
        sidecars: &dyn SidecarWriter,
    ) -> Result<Option<String>> {
        let Some(Value::String(text)) = self.data.get(key) else {
            return Ok(None);
        };
        if !exceeds_threshold(text) {
            return Ok(None);
        }
        let p = join(dir, &format!("{}{}", name, suffix));
        sidecars
            .write_sidecar(text, &p)
            .context(|| format!("<{}> writing {}", self.guid, key))?;
        self.data.remove(key);
        self.data.insert(path_key.to_string(), Value::String(p.clone()));
        Ok(Some(p))
    }
}

fn exceeds_threshold(text: &str) -> bool {
    text.chars().count() > EXTERNALIZE_THRESHOLD
}
