//! Format-agnostic tag tree.
//!
//! Save files are parsed by a [`TagReader`] into a [`Tag`] tree of three
//! node kinds:
//! - Compound: named-key map of sub-nodes
//! - List: ordered sequence of sub-nodes
//! - Scalar: leaf value
//!
//! The scanner only ever sees this tree, so a new on-disk format needs a new
//! reader and nothing else.

pub mod json;
pub mod nbt;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HoardError, Result};

pub use json::JsonReader;
pub use nbt::NbtReader;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Compound(HashMap<String, Tag>),
    List(Vec<Tag>),
    Scalar(Scalar),
}

impl Tag {
    /// Child of a compound by key. `None` for lists, scalars and missing keys.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(map) => map.get(key),
            _ => None,
        }
    }

    /// Walks a chain of compound keys, e.g. `["Data", "Player", "Inventory"]`.
    pub fn path(&self, keys: &[&str]) -> Option<&Tag> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn as_compound(&self) -> Option<&HashMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Tag::Scalar(Scalar::Str(value.into()))
    }

    pub fn compound<K: Into<String>>(entries: impl IntoIterator<Item = (K, Tag)>) -> Self {
        Tag::Compound(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Parses raw file bytes into a [`Tag`] tree.
pub trait TagReader: Send + Sync {
    fn name(&self) -> &'static str;

    fn read(&self, bytes: &[u8]) -> Result<Tag>;

    fn read_file(&self, path: &Path) -> Result<Tag> {
        let bytes = fs::read(path).map_err(|e| HoardError::io(path, e))?;
        self.read(&bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagFormat {
    #[default]
    Nbt,
    Json,
}

impl TagFormat {
    pub fn reader(self) -> Box<dyn TagReader> {
        match self {
            TagFormat::Nbt => Box::new(NbtReader),
            TagFormat::Json => Box::new(JsonReader),
        }
    }
}
