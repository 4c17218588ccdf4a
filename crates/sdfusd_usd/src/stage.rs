//! The stage: an arena of prims plus document-level metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::parser::{ParseError, UsdaParser};
use crate::path::{self as prim_path, ROOT};
use crate::types::{Prim, Reference, UpAxis};
use crate::writer::UsdaWriter;

/// Errors raised by stage I/O and authoring.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid prim path: {0}")]
    InvalidPath(String),

    #[error("No prim at path: {0}")]
    NoSuchPrim(String),
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;

/// A scene-graph document.
#[derive(Debug, Clone)]
pub struct Stage {
    prims: Vec<Prim>,
    index: HashMap<String, usize>,
    pub up_axis: UpAxis,
    pub meters_per_unit: f64,
    pub default_prim: Option<String>,
    pub doc: Option<String>,
    identifier: Option<PathBuf>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::create_in_memory()
    }
}

impl Stage {
    /// An empty stage holding only the pseudo-root.
    pub fn create_in_memory() -> Self {
        let root = Prim::new(ROOT.to_string(), String::new(), None);
        let mut index = HashMap::new();
        index.insert(ROOT.to_string(), 0);
        Self {
            prims: vec![root],
            index,
            up_axis: UpAxis::Z,
            meters_per_unit: 1.0,
            default_prim: None,
            doc: None,
            identifier: None,
        }
    }

    /// Load a `.usda` file.
    pub fn open<P: AsRef<Path>>(path: P) -> StageResult<Self> {
        let path = path.as_ref();
        log::debug!("Opening stage {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut stage = Self::from_usda_str(&content).map_err(|e| match e {
            StageError::Parse { source, .. } => StageError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        stage.identifier = Some(path.to_path_buf());
        Ok(stage)
    }

    /// Parse `.usda` text.
    pub fn from_usda_str(content: &str) -> StageResult<Self> {
        UsdaParser::new(content)
            .parse()
            .map_err(|source| StageError::Parse {
                path: "<string>".to_string(),
                source,
            })
    }

    /// File this stage was opened from.
    pub fn identifier(&self) -> Option<&Path> {
        self.identifier.as_deref()
    }

    pub fn set_identifier(&mut self, path: impl Into<PathBuf>) {
        self.identifier = Some(path.into());
    }

    /// Directory relative asset paths resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.identifier.as_deref().and_then(Path::parent)
    }

    pub fn pseudo_root(&self) -> &Prim {
        &self.prims[0]
    }

    pub fn prim(&self, path: &str) -> Option<&Prim> {
        self.index.get(path).map(|&i| &self.prims[i])
    }

    pub fn prim_mut(&mut self, path: &str) -> Option<&mut Prim> {
        match self.index.get(path) {
            Some(&i) => Some(&mut self.prims[i]),
            None => None,
        }
    }

    pub fn has_prim(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Number of prims, excluding the pseudo-root.
    pub fn prim_count(&self) -> usize {
        self.prims.len() - 1
    }

    /// Define a prim, creating untyped ancestors as needed.
    ///
    /// Redefining an existing prim keeps its contents and updates the type
    /// when `type_name` is not empty.
    pub fn define_prim(&mut self, path: &str, type_name: &str) -> StageResult<&mut Prim> {
        if path == ROOT || !prim_path::is_absolute_prim_path(path) {
            return Err(StageError::InvalidPath(path.to_string()));
        }

        let index = self.ensure_prim(path);
        let prim = &mut self.prims[index];
        if !type_name.is_empty() {
            prim.type_name = type_name.to_string();
        }
        Ok(prim)
    }

    fn ensure_prim(&mut self, path: &str) -> usize {
        if let Some(&i) = self.index.get(path) {
            return i;
        }
        let parent = prim_path::parent_path(path).unwrap_or(ROOT);
        let parent_index = self.ensure_prim(parent);
        self.insert_child(parent_index, prim_path::prim_name(path).to_string())
    }

    /// Attach a fresh prim named `name` under the prim at `parent_index`.
    pub(crate) fn insert_child(&mut self, parent_index: usize, name: String) -> usize {
        let path = prim_path::append_child(&self.prims[parent_index].path, &name);
        if let Some(&existing) = self.index.get(&path) {
            return existing;
        }
        let index = self.prims.len();
        self.prims.push(Prim::new(path.clone(), name, Some(parent_index)));
        self.prims[parent_index].children.push(index);
        self.index.insert(path, index);
        index
    }

    pub(crate) fn prim_at_mut(&mut self, index: usize) -> &mut Prim {
        &mut self.prims[index]
    }

    /// Children of the prim at `path`, in definition order.
    pub fn children(&self, path: &str) -> Vec<&Prim> {
        self.prim(path)
            .map(|p| p.children.iter().map(|&i| &self.prims[i]).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, prim: &Prim) -> Option<&Prim> {
        prim.parent.map(|i| &self.prims[i])
    }

    pub fn root_prims(&self) -> Vec<&Prim> {
        self.children(ROOT)
    }

    /// The `defaultPrim`, if it names an existing root prim.
    pub fn default_prim(&self) -> Option<&Prim> {
        let name = self.default_prim.as_deref()?;
        self.prim(&prim_path::append_child(ROOT, name))
    }

    /// Depth-first walk of every prim, parents before children.
    pub fn range(&self) -> PrimRange<'_> {
        let mut range = PrimRange::empty(self);
        range.stack.extend(self.prims[0].children.iter().rev());
        range
    }

    /// Depth-first walk of the subtree at `path`, including `path` itself.
    pub fn range_from(&self, path: &str) -> PrimRange<'_> {
        let mut range = PrimRange::empty(self);
        match self.index.get(path) {
            Some(0) => range.stack.extend(self.prims[0].children.iter().rev()),
            Some(&i) => range.stack.push(i),
            None => {}
        }
        range
    }

    /// Every reference and payload arc, with the prim that carries it.
    pub fn composition_arcs(&self) -> Vec<(&Prim, &Reference)> {
        self.range()
            .flat_map(|prim| prim.references.iter().map(move |r| (prim, r)))
            .collect()
    }

    pub fn export_to_string(&self) -> String {
        UsdaWriter::new(self).write()
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> StageResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.export_to_string()).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Wrote stage {}", path.display());
        Ok(())
    }
}

/// Depth-first prim iterator supporting subtree pruning.
pub struct PrimRange<'a> {
    stage: &'a Stage,
    stack: Vec<usize>,
    pushed: usize,
}

impl<'a> PrimRange<'a> {
    fn empty(stage: &'a Stage) -> Self {
        Self {
            stage,
            stack: Vec::new(),
            pushed: 0,
        }
    }

    /// Skip the descendants of the prim most recently returned.
    pub fn prune_children(&mut self) {
        let keep = self.stack.len() - self.pushed;
        self.stack.truncate(keep);
        self.pushed = 0;
    }
}

impl<'a> Iterator for PrimRange<'a> {
    type Item = &'a Prim;

    fn next(&mut self) -> Option<&'a Prim> {
        let index = self.stack.pop()?;
        let prim = &self.stage.prims[index];
        self.stack.extend(prim.children.iter().rev());
        self.pushed = prim.children.len();
        Some(prim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_define_creates_ancestors() {
        let mut stage = Stage::create_in_memory();
        stage.define_prim("/world/box/link", "Xform").unwrap();

        assert!(stage.prim("/world").is_some());
        assert_eq!(stage.prim("/world/box").unwrap().type_name, "");
        assert_eq!(stage.prim("/world/box/link").unwrap().type_name, "Xform");
        assert_eq!(stage.prim_count(), 3);
    }

    #[test]
    fn test_define_rejects_bad_paths() {
        let mut stage = Stage::create_in_memory();
        assert!(stage.define_prim("relative", "Xform").is_err());
        assert!(stage.define_prim("/bad name", "Xform").is_err());
        assert!(stage.define_prim("/", "Xform").is_err());
    }

    #[test]
    fn test_redefine_keeps_contents() {
        let mut stage = Stage::create_in_memory();
        stage
            .define_prim("/a", "Xform")
            .unwrap()
            .set("x", "float", Value::Double(1.0));
        stage.define_prim("/a", "").unwrap();
        let prim = stage.prim("/a").unwrap();
        assert_eq!(prim.type_name, "Xform");
        assert_eq!(prim.value("x"), Some(&Value::Double(1.0)));
    }

    #[test]
    fn test_range_order_and_prune() {
        let mut stage = Stage::create_in_memory();
        for path in ["/a", "/a/b", "/a/b/c", "/a/d", "/e"] {
            stage.define_prim(path, "Xform").unwrap();
        }

        let all: Vec<_> = stage.range().map(|p| p.path.as_str()).collect();
        assert_eq!(all, vec!["/a", "/a/b", "/a/b/c", "/a/d", "/e"]);

        let mut range = stage.range();
        let mut seen = Vec::new();
        while let Some(prim) = range.next() {
            if prim.name == "b" {
                range.prune_children();
            }
            seen.push(prim.path.clone());
        }
        assert_eq!(seen, vec!["/a", "/a/b", "/a/d", "/e"]);
    }

    #[test]
    fn test_range_from_subtree() {
        let mut stage = Stage::create_in_memory();
        for path in ["/a/b", "/a/c", "/z"] {
            stage.define_prim(path, "").unwrap();
        }
        let sub: Vec<_> = stage.range_from("/a").map(|p| p.name.as_str()).collect();
        assert_eq!(sub, vec!["a", "b", "c"]);
        assert_eq!(stage.range_from("/missing").count(), 0);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let err = Stage::open("/definitely/not/here.usda").unwrap_err();
        assert!(matches!(err, StageError::Io { .. }));
    }
}
