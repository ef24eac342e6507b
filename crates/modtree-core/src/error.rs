use std::fmt::Display;

/// Errors from parsing or printing an object tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("key {key} not found")]
    MissingField { key: String },

    #[error("key {key} is not a {expected}; is {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("element {index} of {key} is not a {expected}; is {found}")]
    ElementTypeMismatch {
        key: String,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// Child count disagrees with the order list, or the top-level order
    /// disagrees with the forest size.
    #[error("{what}: expected {expected} entries, found {found}")]
    OrderLengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("order expected {name}, not found in db")]
    UnknownOrderEntry { name: String },

    #[error("bundled code must never be written to src ({dir}; {name})")]
    BundledScriptLeak { dir: String, name: String },

    #[error("smoothing {field}: {reason}")]
    Smoothing { field: String, reason: String },

    #[error("unbundle: {0}")]
    Bundle(String),

    #[error("{path} does not hold a json object")]
    NotAnObject { path: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Innermost error beneath any `Context` layers.
    pub fn root_cause(&self) -> &Error {
        let mut cur = self;
        while let Error::Context { source, .. } = cur {
            cur = source;
        }
        cur
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub(crate) trait ResultExt<T> {
    fn context<C: Display>(self, f: impl FnOnce() -> C) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<C: Display>(self, f: impl FnOnce() -> C) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: f().to_string(),
            source: Box::new(e),
        })
    }
}

pub(crate) fn kind_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
