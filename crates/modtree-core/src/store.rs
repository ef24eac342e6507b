// Collaborators the codec reads and writes through, plus `FileStore`, the
// filesystem implementation of all of them.
//
// Paths are `/`-separated and relative to the store base. They end up
// recorded inside documents (`LuaScript_path` and friends), so they must not
// depend on the host platform.
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::Document;
use crate::error::{Error, Result};

pub trait DocumentReader {
    fn read_document(&self, path: &str) -> Result<Document>;
}

pub trait DocumentWriter {
    fn write_document(&self, doc: &Document, path: &str) -> Result<()>;
}

pub trait SidecarReader {
    /// Raw file content as an embeddable string.
    fn read_sidecar(&self, path: &str) -> Result<String>;
}

pub trait SidecarWriter {
    /// Writes `content` verbatim.
    fn write_sidecar(&self, content: &str, path: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<String>,
    pub folders: Vec<String>,
}

pub trait DirExplorer {
    /// Names (not paths) of the files and folders directly under `path`.
    fn list(&self, path: &str) -> Result<Listing>;
}

pub trait DirCreator {
    /// Creates `name` under `parent` and returns the name actually used.
    fn create_dir(&self, parent: &str, name: &str) -> Result<String>;
}

/// Join store-relative path segments with `/`.
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Directory part of a store-relative path; empty for top-level entries.
pub fn parent(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

#[derive(Clone, Copy, Debug)]
pub struct WriteOpts {
    pub pretty: bool,
}

impl Default for WriteOpts {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// All collaborators backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    base: PathBuf,
    opts: WriteOpts,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            opts: WriteOpts::default(),
        }
    }

    pub fn with_opts(base: impl Into<PathBuf>, opts: WriteOpts) -> Self {
        Self {
            base: base.into(),
            opts,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.base.clone(), |acc, seg| acc.join(seg))
    }

    fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()> {
        let p = self.resolve(path);
        if let Some(dir) = p.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(path, e))?;
        }
        fs::write(&p, data).map_err(|e| Error::io(path, e))
    }
}

impl DocumentReader for FileStore {
    fn read_document(&self, path: &str) -> Result<Document> {
        let data = fs::read(self.resolve(path)).map_err(|e| Error::io(path, e))?;
        let v: serde_json::Value = serde_json::from_slice(&data).map_err(|e| Error::Json {
            path: path.to_string(),
            source: e,
        })?;
        match v {
            serde_json::Value::Object(m) => Ok(m),
            _ => Err(Error::NotAnObject {
                path: path.to_string(),
            }),
        }
    }
}

impl DocumentWriter for FileStore {
    fn write_document(&self, doc: &Document, path: &str) -> Result<()> {
        let to_json = |e: serde_json::Error| Error::Json {
            path: path.to_string(),
            source: e,
        };
        let mut s = if self.opts.pretty {
            serde_json::to_string_pretty(doc).map_err(to_json)?
        } else {
            serde_json::to_string(doc).map_err(to_json)?
        };
        s.push('\n');
        tracing::debug!(path, "writing document");
        self.write_bytes(path, s.as_bytes())
    }
}

impl SidecarReader for FileStore {
    fn read_sidecar(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.resolve(path)).map_err(|e| Error::io(path, e))
    }
}

impl SidecarWriter for FileStore {
    fn write_sidecar(&self, content: &str, path: &str) -> Result<()> {
        tracing::debug!(path, len = content.len(), "writing sidecar");
        self.write_bytes(path, content.as_bytes())
    }
}

impl DirExplorer for FileStore {
    fn list(&self, path: &str) -> Result<Listing> {
        let mut out = Listing::default();
        let walker = WalkDir::new(self.resolve(path))
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| Error::io(path, std::io::Error::other(e.to_string())))?;
            let Some(name) = entry.file_name().to_str() else {
                tracing::warn!(path = %entry.path().display(), "skipping non-utf8 entry");
                continue;
            };
            if entry.file_type().is_dir() {
                out.folders.push(name.to_string());
            } else {
                out.files.push(name.to_string());
            }
        }
        Ok(out)
    }
}

impl DirCreator for FileStore {
    fn create_dir(&self, parent: &str, name: &str) -> Result<String> {
        let mut chosen = name.to_string();
        let mut n = 0;
        // reuse an existing directory; step around anything else in the way
        loop {
            let p = self.resolve(&join(parent, &chosen));
            if !p.exists() || p.is_dir() {
                fs::create_dir_all(&p).map_err(|e| Error::io(join(parent, &chosen), e))?;
                return Ok(chosen);
            }
            n += 1;
            chosen = format!("{}_{}", name, n);
        }
    }
}
