//! modtree-core: split tabletop-simulation save objects into a file tree and
//! assemble them back.
//!
//! This crate focuses on a small, well-factored surface:
//! - `ObjectNode`: one object, its sidecar paths and its owned children
//! - Parse (document or file tree -> nodes) and print (nodes -> document or
//!   file tree), with `Db`, `parse_all` and `print_all` driving whole forests
//! - Destructive field extraction over generic JSON documents
//! - Collaborator traits for reading/writing, with a filesystem `FileStore`
//! - Default script unbundling and numeric smoothing
//!
pub mod bundler;
pub mod db;
pub mod error;
pub mod extract;
pub mod handler;
pub mod naming;
pub mod node;
pub mod smooth;
pub mod store;

/// A generic, string-keyed JSON object. Fields are removed as they are
/// interpreted, so whatever remains passes through untouched.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use db::{Db, parse_all, print_all};
pub use error::{Error, Result};
pub use handler::{LuaHandler, ScriptAction, ScriptHandler};
pub use node::ObjectNode;
pub use store::{
    DirCreator, DirExplorer, DocumentReader, DocumentWriter, FileStore, Listing, SidecarReader,
    SidecarWriter, WriteOpts,
};
