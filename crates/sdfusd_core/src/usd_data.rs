//! Stage reference resolution.
//!
//! [`UsdData`] opens a root document, follows its reference and payload arcs
//! into other documents, and keeps one composed namespace over all of them.
//! Every composed prim path maps to one or more layers, strongest first; the
//! last layer is the deepest mounted document and owns the prim.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use sdfusd_sdf::Material;
use sdfusd_usd::path::{self as prim_path, ROOT};
use sdfusd_usd::tokens::types;
use sdfusd_usd::{Attribute, Prim, Reference, Stage, UpAxis, Value};

use crate::error::{UsdError, UsdErrors};
use crate::material::parse_scene_material;

/// One loaded document.
#[derive(Debug)]
pub struct StageReference {
    pub file_path: String,
    pub stage: Stage,
    pub up_axis: UpAxis,
    pub meters_per_unit: f64,
    /// Composed paths this document is mounted at.
    pub mount_points: Vec<String>,
    /// Materials defined in this document, by prim name.
    pub materials: BTreeMap<String, Material>,
}

impl StageReference {
    fn new(file_path: String, stage: Stage) -> Self {
        Self {
            file_path,
            up_axis: stage.up_axis,
            meters_per_unit: stage.meters_per_unit,
            stage,
            mount_points: Vec::new(),
            materials: BTreeMap::new(),
        }
    }

    pub fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    pub fn meters_per_unit(&self) -> f64 {
        self.meters_per_unit
    }
}

/// A subtree of one document placed at a composed path.
#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    pub composed_prefix: String,
    pub local_prefix: String,
    pub doc: usize,
}

#[derive(Debug, Clone)]
struct Layer {
    doc: usize,
    local_path: String,
    mount: Option<usize>,
}

#[derive(Debug, Default)]
struct Entry {
    layers: Vec<Layer>,
    children: Vec<String>,
}

/// An arc found while registering a subtree, composed after the walk.
struct PendingArc {
    composed_path: String,
    doc: usize,
    reference: Reference,
}

/// Documents reachable from a root file and their composed namespace.
#[derive(Debug)]
pub struct UsdData {
    root_path: PathBuf,
    references: Vec<StageReference>,
    doc_index: HashMap<PathBuf, usize>,
    failed_docs: HashSet<PathBuf>,
    mounts: Vec<Mount>,
    entries: HashMap<String, Entry>,
    unresolved: Vec<String>,
    materials: BTreeMap<String, Material>,
}

impl UsdData {
    pub fn new<P: AsRef<Path>>(root_path: P) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
            references: Vec::new(),
            doc_index: HashMap::new(),
            failed_docs: HashSet::new(),
            mounts: Vec::new(),
            entries: HashMap::new(),
            unresolved: Vec::new(),
            materials: BTreeMap::new(),
        }
    }

    /// Open the root document and every document it references.
    pub fn init(&mut self) -> UsdErrors {
        let mut errors = UsdErrors::new();

        let stage = match Stage::open(&self.root_path) {
            Ok(stage) => stage,
            Err(e) => {
                log::warn!("Unable to open {}: {}", self.root_path.display(), e);
                return vec![UsdError::document_open(e.to_string())];
            }
        };
        log::info!("Loaded root stage {}", self.root_path.display());

        let mut reference = StageReference::new(self.root_path.display().to_string(), stage);
        reference.mount_points.push(ROOT.to_string());
        self.references.push(reference);
        self.doc_index.insert(doc_key(&self.root_path), 0);

        self.entries.entry(ROOT.to_string()).or_default().layers.push(Layer {
            doc: 0,
            local_path: ROOT.to_string(),
            mount: None,
        });
        let mut ancestry = vec![(doc_key(&self.root_path), ROOT.to_string())];
        self.register_subtree(0, ROOT, ROOT, None, &mut ancestry, &mut errors);

        errors
    }

    /// Walk `local_root` of `doc`, placing it at `composed_root`, then
    /// compose the arcs found inside it.
    fn register_subtree(
        &mut self,
        doc: usize,
        local_root: &str,
        composed_root: &str,
        mount: Option<usize>,
        ancestry: &mut Vec<(PathBuf, String)>,
        errors: &mut UsdErrors,
    ) {
        let stage = &self.references[doc].stage;
        let prims: Vec<(String, Vec<Reference>)> = stage
            .range_from(local_root)
            .map(|p| (p.path.clone(), p.references.clone()))
            .collect();

        let mut pending = Vec::new();
        for (local_path, arcs) in prims {
            let Some(composed_path) = prim_path::replace_prefix(&local_path, local_root, composed_root)
            else {
                continue;
            };
            if composed_path != composed_root {
                self.add_layer(&composed_path, doc, &local_path, mount);
            }
            pending.extend(arcs.into_iter().map(|reference| PendingArc {
                composed_path: composed_path.clone(),
                doc,
                reference,
            }));
        }

        for arc in pending {
            self.compose_arc(arc, ancestry, errors);
        }
    }

    fn add_layer(&mut self, composed_path: &str, doc: usize, local_path: &str, mount: Option<usize>) {
        if let Some(parent) = prim_path::parent_path(composed_path) {
            let siblings = &mut self.entries.entry(parent.to_string()).or_default().children;
            if !siblings.iter().any(|c| c == composed_path) {
                siblings.push(composed_path.to_string());
            }
        }
        self.entries
            .entry(composed_path.to_string())
            .or_default()
            .layers
            .push(Layer {
                doc,
                local_path: local_path.to_string(),
                mount,
            });
    }

    fn compose_arc(&mut self, arc: PendingArc, ancestry: &mut Vec<(PathBuf, String)>, errors: &mut UsdErrors) {
        let PendingArc {
            composed_path,
            doc,
            reference,
        } = arc;

        let source = &self.references[doc];
        let asset = if reference.asset_path.is_empty() {
            PathBuf::from(&source.file_path)
        } else {
            source
                .stage
                .base_dir()
                .map(|dir| dir.join(&reference.asset_path))
                .unwrap_or_else(|| PathBuf::from(&reference.asset_path))
        };
        let key = doc_key(&asset);

        if self.failed_docs.contains(&key) {
            self.unresolved.push(composed_path);
            return;
        }

        let target_doc = match self.doc_index.get(&key) {
            Some(&index) => index,
            None => match Stage::open(&asset) {
                Ok(stage) => {
                    log::debug!("Loaded referenced stage {}", asset.display());
                    let index = self.references.len();
                    self.references
                        .push(StageReference::new(asset.display().to_string(), stage));
                    self.doc_index.insert(key.clone(), index);
                    index
                }
                Err(e) => {
                    log::warn!("Unable to open referenced {}: {}", asset.display(), e);
                    errors.push(UsdError::document_open(e.to_string()));
                    self.failed_docs.insert(key);
                    self.unresolved.push(composed_path);
                    return;
                }
            },
        };

        let target_stage = &self.references[target_doc].stage;
        let target = match &reference.prim_path {
            Some(path) => target_stage.prim(path).map(|p| p.path.clone()),
            None => target_stage
                .default_prim()
                .or_else(|| target_stage.root_prims().into_iter().next())
                .map(|p| p.path.clone()),
        };
        let Some(target) = target else {
            errors.push(UsdError::resolution_miss(format!(
                "{} references {}{} which does not exist",
                composed_path,
                asset.display(),
                reference
                    .prim_path
                    .as_deref()
                    .map(|p| format!("<{}>", p))
                    .unwrap_or_default()
            )));
            self.unresolved.push(composed_path);
            return;
        };

        if ancestry.iter().any(|(k, p)| *k == key && *p == target) {
            errors.push(UsdError::resolution_miss(format!(
                "reference cycle at {} through {}<{}>",
                composed_path,
                asset.display(),
                target
            )));
            return;
        }

        if let Some(existing) = self.mounts.iter().find(|m| m.composed_prefix == composed_path) {
            errors.push(UsdError::duplicate_registration(format!(
                "{} is already mounted from {}<{}>",
                composed_path, self.references[existing.doc].file_path, existing.local_prefix
            )));
            return;
        }

        let mount = self.mounts.len();
        self.mounts.push(Mount {
            composed_prefix: composed_path.clone(),
            local_prefix: target.clone(),
            doc: target_doc,
        });
        self.references[target_doc]
            .mount_points
            .push(composed_path.clone());
        self.add_layer(&composed_path, target_doc, &target, Some(mount));

        ancestry.push((key, target.clone()));
        self.register_subtree(target_doc, &target, &composed_path, Some(mount), ancestry, errors);
        ancestry.pop();
    }

    /// Translate every `Material` prim of every loaded document.
    pub fn parse_materials(&mut self) -> UsdErrors {
        let mut errors = UsdErrors::new();
        for reference in &mut self.references {
            let parsed: Vec<(String, Material, UsdErrors)> = reference
                .stage
                .range()
                .filter(|p| p.is_a(types::MATERIAL))
                .map(|p| {
                    let (material, material_errors) = parse_scene_material(&reference.stage, p);
                    (p.name.clone(), material, material_errors)
                })
                .collect();

            for (name, material, material_errors) in parsed {
                errors.extend(material_errors);
                self.materials
                    .entry(name.clone())
                    .or_insert_with(|| material.clone());
                reference.materials.entry(name).or_insert(material);
            }
        }
        log::debug!("Parsed {} materials", self.materials.len());
        errors
    }

    /// Document owning `path`. A path without a leading `/` is taken as
    /// relative to the root. A miss returns `("", None)`.
    pub fn find_stage(&self, path: &str) -> (String, Option<&StageReference>) {
        let normalized = normalize(path);
        match self.owner_of(prim_path::prim_part(&normalized)) {
            Some(doc) => {
                let reference = &self.references[doc];
                (reference.file_path.clone(), Some(reference))
            }
            None => (String::new(), None),
        }
    }

    /// Strongest document of the deepest registered path at or above `path`.
    /// The pseudo-root covers nothing.
    fn owner_of(&self, path: &str) -> Option<usize> {
        let mut current = path;
        while current != ROOT && !current.is_empty() {
            if let Some(layer) = self.entries.get(current).and_then(|e| e.layers.last()) {
                return Some(layer.doc);
            }
            current = prim_path::parent_path(current)?;
        }
        None
    }

    pub fn all_references(&self) -> &[StageReference] {
        &self.references
    }

    pub fn materials(&self) -> &BTreeMap<String, Material> {
        &self.materials
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// The root document, if `init` opened it.
    pub fn root_stage(&self) -> Option<&Stage> {
        self.references.first().map(|r| &r.stage)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Whether `path` sits at or below an arc that failed to resolve.
    pub fn is_unresolved_mount(&self, path: &str) -> bool {
        let path = normalize(path);
        self.unresolved.iter().any(|u| prim_path::has_prefix(&path, u))
    }

    pub fn prim(&self, path: &str) -> Option<ComposedPrim<'_>> {
        let path = normalize(path);
        let entry = self.entries.get(&path)?;
        if entry.layers.is_empty() {
            return None;
        }
        Some(ComposedPrim {
            data: self,
            path,
            entry,
        })
    }

    /// Composed child paths of `path`, in definition order.
    pub fn children(&self, path: &str) -> &[String] {
        self.entries
            .get(path)
            .map(|e| e.children.as_slice())
            .unwrap_or_default()
    }

    /// Depth-first walk of the composed subtree at `path`. For `/` the
    /// pseudo-root itself is not returned.
    pub fn range_from(&self, path: &str) -> ComposedRange<'_> {
        let path = normalize(path);
        let mut range = ComposedRange {
            data: self,
            stack: Vec::new(),
            pushed: 0,
        };
        if path == ROOT {
            range.stack.extend(self.children(ROOT).iter().rev().cloned());
        } else if self.entries.contains_key(&path) {
            range.stack.push(path);
        }
        range
    }
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        prim_path::append_child(ROOT, path)
    }
}

fn doc_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// A prim of the composed namespace.
pub struct ComposedPrim<'a> {
    data: &'a UsdData,
    path: String,
    entry: &'a Entry,
}

impl<'a> ComposedPrim<'a> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        prim_path::prim_name(&self.path)
    }

    /// Authored prims contributing to this one, strongest first.
    pub fn layers(&self) -> impl Iterator<Item = &'a Prim> + 'a {
        let data = self.data;
        let entry = self.entry;
        entry
            .layers
            .iter()
            .filter_map(move |l| data.references[l.doc].stage.prim(&l.local_path))
    }

    /// The deepest layer's prim.
    pub fn local_prim(&self) -> Option<&'a Prim> {
        self.layers().last()
    }

    pub fn owner_index(&self) -> usize {
        self.entry.layers.last().map_or(0, |l| l.doc)
    }

    pub fn owner(&self) -> &'a StageReference {
        &self.data.references[self.owner_index()]
    }

    /// Type of the strongest layer that declares one.
    pub fn type_name(&self) -> &'a str {
        self.layers()
            .map(|p| p.type_name.as_str())
            .find(|t| !t.is_empty())
            .unwrap_or("")
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name() == type_name
    }

    pub fn has_api(&self, api: &str) -> bool {
        self.layers().any(|p| p.has_api(api))
    }

    pub fn attribute(&self, name: &str) -> Option<&'a Attribute> {
        self.layers().find_map(|p| p.attribute(name))
    }

    pub fn value(&self, name: &str) -> Option<&'a Value> {
        self.layers().find_map(|p| p.value(name))
    }

    /// Strongest value of `name` together with the document that authored it.
    pub fn authored_value(&self, name: &str) -> Option<(&'a Value, &'a StageReference)> {
        let data = self.data;
        self.entry.layers.iter().find_map(|layer| {
            let reference = &data.references[layer.doc];
            let value = reference.stage.prim(&layer.local_path)?.value(name)?;
            Some((value, reference))
        })
    }

    /// Every attribute, strongest opinion per name, in declaration order.
    pub fn attributes(&self) -> Vec<&'a Attribute> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for prim in self.layers() {
            for attribute in &prim.attributes {
                if seen.insert(attribute.name.as_str()) {
                    out.push(attribute);
                }
            }
        }
        out
    }

    /// Relationship targets mapped into the composed namespace.
    pub fn relationship_targets(&self, name: &str) -> Option<Vec<String>> {
        self.entry.layers.iter().find_map(|layer| {
            let prim = self.data.references[layer.doc].stage.prim(&layer.local_path)?;
            let relationship = prim.relationship(name)?;
            Some(
                relationship
                    .targets
                    .iter()
                    .map(|t| self.data.map_target(layer, t))
                    .collect(),
            )
        })
    }

    pub fn children(&self) -> &'a [String] {
        &self.entry.children
    }
}

impl UsdData {
    fn map_target(&self, layer: &Layer, target: &str) -> String {
        layer
            .mount
            .map(|m| &self.mounts[m])
            .and_then(|m| prim_path::replace_prefix(target, &m.local_prefix, &m.composed_prefix))
            .unwrap_or_else(|| target.to_string())
    }
}

/// Composed depth-first range supporting subtree pruning.
pub struct ComposedRange<'a> {
    data: &'a UsdData,
    stack: Vec<String>,
    pushed: usize,
}

impl<'a> ComposedRange<'a> {
    /// Skip the descendants of the prim most recently returned.
    pub fn prune_children(&mut self) {
        let keep = self.stack.len() - self.pushed;
        self.stack.truncate(keep);
        self.pushed = 0;
    }
}

impl<'a> Iterator for ComposedRange<'a> {
    type Item = ComposedPrim<'a>;

    fn next(&mut self) -> Option<ComposedPrim<'a>> {
        loop {
            let path = self.stack.pop()?;
            let Some(entry) = self.data.entries.get(&path) else {
                continue;
            };
            self.stack.extend(entry.children.iter().rev().cloned());
            self.pushed = entry.children.len();
            return Some(ComposedPrim {
                data: self.data,
                path,
                entry,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UsdErrorKind;
    use crate::test_asset_path;
    use approx::assert_relative_eq;
    use sdfusd_sdf::{Color, PbrWorkflowType};

    #[test]
    fn test_invalid_file() {
        let mut data = UsdData::new(test_asset_path("assets/usd/invalid_name"));
        let errors = data.init();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, UsdErrorKind::DocumentOpen);
        assert!(data.all_references().is_empty());
        assert!(data.root_stage().is_none());
    }

    #[test]
    fn test_up_axis_z_materials() {
        let filename = test_asset_path("assets/usd/upAxisZ.usda");
        let mut data = UsdData::new(&filename);
        assert!(data.init().is_empty());
        assert!(data.parse_materials().is_empty());

        assert_eq!(data.all_references().len(), 1);
        assert_eq!(data.materials().len(), 7);

        let materials = data.materials();
        let expected = [
            ("Material_0", Color::rgb(0.8, 0.8, 0.8)),
            ("Material_1", Color::rgb(1.0, 0.0, 0.0)),
            ("Material_2", Color::rgb(0.0, 1.0, 0.0)),
            ("Material_3", Color::rgb(0.0, 0.0, 1.0)),
            ("Material_4", Color::rgb(1.0, 1.0, 0.0)),
            ("Material_5", Color::rgb(1.0, 0.0, 1.0)),
        ];
        for (name, diffuse) in expected {
            let material = &materials[name];
            assert_eq!(material.diffuse, diffuse, "{}", name);
            assert_eq!(material.emissive, Color::BLACK, "{}", name);
        }

        let textures = &materials["Material_textures"];
        assert_eq!(textures.diffuse, Color::WHITE);
        assert_eq!(textures.emissive, Color::BLACK);
        let workflow = textures
            .pbr
            .as_ref()
            .and_then(|p| p.workflow(PbrWorkflowType::Metal))
            .unwrap();
        assert_eq!(workflow.albedo_map.as_deref(), Some("materials/textures/FANS_Albedo.png"));
        assert_relative_eq!(workflow.metalness, 0.5);
        assert_eq!(
            workflow.metalness_map.as_deref(),
            Some("materials/textures/FANS_Metalness.png")
        );
        assert_relative_eq!(workflow.roughness, 0.5);
        assert_eq!(
            workflow.roughness_map.as_deref(),
            Some("materials/textures/FANS_Roughness.png")
        );
        assert_eq!(workflow.normal_map.as_deref(), Some("materials/textures/FANS_Normal.png"));
    }

    #[test]
    fn test_find_stage() {
        let filename = test_asset_path("assets/usd/upAxisZ.usda");
        let mut data = UsdData::new(&filename);
        assert!(data.init().is_empty());

        let (path, reference) = data.find_stage("box");
        assert_eq!(path, filename.display().to_string());
        let reference = reference.unwrap();
        assert_eq!(reference.up_axis(), UpAxis::Z);
        assert_relative_eq!(reference.meters_per_unit(), 0.01);

        let (path, reference) = data.find_stage("invalid");
        assert_eq!(path, "");
        assert!(reference.is_none());
    }

    #[test]
    fn test_references_compose() {
        let filename = test_asset_path("assets/usd/references/scene.usda");
        let mut data = UsdData::new(&filename);
        let errors = data.init();

        // missing.usda fails to open once; the second arc on /world/dup is a
        // duplicate mount.
        let kinds: Vec<_> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds.iter().filter(|k| **k == UsdErrorKind::DocumentOpen).count(),
            1,
            "{:?}",
            errors
        );
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == UsdErrorKind::DuplicateRegistration)
                .count(),
            1,
            "{:?}",
            errors
        );

        // scene.usda and box.usda
        assert_eq!(data.all_references().len(), 2);

        let (owner, reference) = data.find_stage("/world/box_a/link");
        assert!(owner.ends_with("box.usda"));
        assert_relative_eq!(reference.unwrap().meters_per_unit(), 0.01);
        let (owner, _) = data.find_stage("/world/box_a");
        assert!(owner.ends_with("box.usda"));
        let (owner, _) = data.find_stage("/world");
        assert!(owner.ends_with("scene.usda"));
        let (owner, reference) = data.find_stage("/world/box_a/link/not_a_prim");
        assert!(owner.ends_with("box.usda"));
        assert!(reference.is_some());
        let (owner, reference) = data.find_stage("/nowhere/at/all");
        assert_eq!(owner, "");
        assert!(reference.is_none());

        // Local opinions on the referencing prim are stronger.
        let box_a = data.prim("/world/box_a").unwrap();
        assert_eq!(box_a.layers().count(), 2);
        assert!(box_a.value("xformOp:translate").is_some());
        assert_eq!(box_a.type_name(), "Xform");

        // The same document mounted twice shares one record.
        assert!(data.prim("/world/box_b/link/geometry").is_some());
        let link = data.prim("/world/box_b/link").unwrap();
        assert!(link.has_api("PhysicsRigidBodyAPI"));

        assert!(data.is_unresolved_mount("/world/ghost"));
        assert!(data.is_unresolved_mount("/world/ghost/anything"));
        assert!(!data.is_unresolved_mount("/world/box_a"));

        let paths: Vec<String> = data
            .range_from("/world/box_b")
            .take(3)
            .map(|p| p.path().to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["/world/box_b", "/world/box_b/link", "/world/box_b/link/geometry"]
        );
    }

    #[test]
    fn test_relationship_targets_are_remapped() {
        let filename = test_asset_path("assets/usd/references/scene.usda");
        let mut data = UsdData::new(&filename);
        data.init();

        let geometry = data.prim("/world/box_a/link/geometry").unwrap();
        assert_eq!(
            geometry.relationship_targets("material:binding"),
            Some(vec!["/world/box_a/Looks/Red".to_string()])
        );
    }

    #[test]
    fn test_range_prunes() {
        let filename = test_asset_path("assets/usd/references/scene.usda");
        let mut data = UsdData::new(&filename);
        data.init();

        let mut range = data.range_from("/");
        let mut seen = Vec::new();
        while let Some(prim) = range.next() {
            if prim.name() == "box_a" {
                range.prune_children();
            }
            seen.push(prim.path().to_string());
        }
        assert!(seen.contains(&"/world/box_a".to_string()));
        assert!(!seen.iter().any(|p| p.starts_with("/world/box_a/")));
        assert!(seen.contains(&"/world/box_b/link".to_string()));
    }
}
