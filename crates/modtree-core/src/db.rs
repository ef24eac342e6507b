// Whole-forest parse and print.
//
// A decomposed folder looks like:
//   objects/
//   --Deck.1a2b3c.json           (GUID=1a2b3c)
//   --Deck.1a2b3c.ttslua         sidecar, found only through the json
//   --Deck.1a2b3c/               children of the deck
//     --Card.999aaa.json
//   --Board.888bbb.json
//
// Directory order carries no meaning, so `print_all` returns the top-level
// order and `parse_all` needs it back.
use std::collections::{BTreeMap, BTreeSet};

use crate::Document;
use crate::error::{Error, Result, ResultExt};
use crate::handler::{LuaHandler, ScriptHandler};
use crate::node::{DOC_SUFFIX, ObjectNode};
use crate::store::{
    DirCreator, DirExplorer, DocumentReader, DocumentWriter, SidecarReader, SidecarWriter, join,
};

pub struct Db<'a> {
    roots: BTreeMap<String, ObjectNode>,
    reader: &'a dyn DocumentReader,
    dir: &'a dyn DirExplorer,
}

impl<'a> Db<'a> {
    pub fn new(reader: &'a dyn DocumentReader, dir: &'a dyn DirExplorer) -> Self {
        Self {
            roots: BTreeMap::new(),
            reader,
            dir,
        }
    }

    /// Parse every `.json` file directly under `relpath` as a root object.
    /// Other files are sidecars and subfolders hold children; both are only
    /// reached through the documents that reference them.
    pub fn parse_from_folder(&mut self, relpath: &str) -> Result<()> {
        let listing = self
            .dir
            .list(relpath)
            .context(|| format!("listing {:?}", relpath))?;
        for file in listing.files.iter().filter(|f| f.ends_with(DOC_SUFFIX)) {
            let path = join(relpath, file);
            let node = ObjectNode::parse_from_file(&path, self.reader)
                .context(|| format!("parsing root {}", path))?;
            let name = node.good_name();
            tracing::debug!(%name, %path, "parsed root object");
            if self.roots.insert(name.clone(), node).is_some() {
                tracing::warn!(%name, %path, "duplicate root name; keeping the later file");
            }
        }
        Ok(())
    }

    pub fn roots(&self) -> &BTreeMap<String, ObjectNode> {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Assemble every root in `order`. The order is checked in full before
    /// anything is assembled.
    pub fn assemble(
        mut self,
        sidecars: &dyn SidecarReader,
        handler: &dyn ScriptHandler,
        order: &[String],
    ) -> Result<Vec<Document>> {
        if order.len() != self.roots.len() {
            return Err(Error::OrderLengthMismatch {
                what: "top-level order vs db roots".into(),
                expected: order.len(),
                found: self.roots.len(),
            });
        }
        if let Some(missing) = order.iter().find(|n| !self.roots.contains_key(*n)) {
            return Err(Error::UnknownOrderEntry {
                name: missing.clone(),
            });
        }
        let distinct: BTreeSet<&String> = order.iter().collect();
        if distinct.len() != order.len() {
            return Err(Error::OrderLengthMismatch {
                what: "distinct names in top-level order vs db roots".into(),
                expected: self.roots.len(),
                found: distinct.len(),
            });
        }

        let mut out = Vec::with_capacity(order.len());
        for name in order {
            let node = self
                .roots
                .remove(name)
                .ok_or_else(|| Error::UnknownOrderEntry { name: name.clone() })?;
            let doc = node
                .assemble(sidecars, handler)
                .context(|| format!("obj ({}) did not print", name))?;
            out.push(doc);
        }
        Ok(out)
    }
}

/// Read the folder `root` and assemble its objects, in `order`, into full
/// documents.
pub fn parse_all(
    root: &str,
    sidecars: &dyn SidecarReader,
    reader: &dyn DocumentReader,
    dir: &dyn DirExplorer,
    order: &[String],
) -> Result<Vec<Document>> {
    let mut db = Db::new(reader, dir);
    db.parse_from_folder(root)
        .context(|| format!("parsing folder {:?}", root))?;
    let handler = LuaHandler::new(sidecars);
    db.assemble(sidecars, &handler, order)
}

/// Split each document into files under `root`. Returns the names needed to
/// restore the top-level order with [`parse_all`].
pub fn print_all(
    root: &str,
    sidecars: &dyn SidecarWriter,
    writer: &dyn DocumentWriter,
    dirs: &dyn DirCreator,
    docs: &[Document],
) -> Result<Vec<String>> {
    let mut order = Vec::with_capacity(docs.len());
    for (i, doc) in docs.iter().enumerate() {
        let node = ObjectNode::from_document(doc.clone())
            .context(|| format!("interpreting top-level object {}", i))?;
        let name = node.good_name();
        node.emit(root, sidecars, writer, dirs)
            .context(|| format!("printing {}", name))?;
        order.push(name);
    }
    Ok(order)
}
