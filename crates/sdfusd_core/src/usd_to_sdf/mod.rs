//! Reverse conversion: scene graph (and its references) to a
//! physics-description tree.
//!
//! The composed namespace is walked once, depth first. Each prim's role is
//! decided by its parent's role and its [`PrimKind`](kind::PrimKind); links,
//! models and joints are collected flat and assembled into the tree after the
//! walk, so joints may name bodies defined anywhere in the stage.

mod geometry;
mod joints;
mod kind;
mod lights;
mod links;
mod physics;
mod sensors;
mod transforms;

use std::collections::HashMap;
use std::path::Path;

use sdfusd_math::Pose;
use sdfusd_sdf::{Joint, Link, Model, Root, World};
use sdfusd_usd::path::{self as prim_path, ROOT};
use sdfusd_usd::tokens::{apis, types};

use crate::config::ConversionConfig;
use crate::error::{UsdError, UsdErrors};
use crate::usd_data::{ComposedPrim, UsdData};
use kind::{classify, is_body, PrimKind};

/// Open `path` with everything it references and rebuild its world.
///
/// When the root document cannot be opened the result is an empty [`Root`]
/// and the single error describing why.
pub fn usd_to_sdf<P: AsRef<Path>>(path: P, config: &ConversionConfig) -> (Root, UsdErrors) {
    let path = path.as_ref();
    let mut data = UsdData::new(path);
    let mut errors = data.init();
    if data.root_stage().is_none() {
        return (Root::default(), errors);
    }
    errors.extend(data.parse_materials());

    let container = world_container(&data);
    let (world, world_errors) = parse_usd_world(&data, &container, config);
    errors.extend(world_errors);

    let mut root = Root::default();
    root.add_world(world);
    log::info!("Converted {} with {} problems", path.display(), errors.len());
    (root, errors)
}

/// The default prim when it holds a physics scene, otherwise the pseudo-root.
pub(crate) fn world_container(data: &UsdData) -> String {
    let Some(default) = data.root_stage().and_then(|s| s.default_prim()) else {
        return ROOT.to_string();
    };
    let has_scene = data
        .children(&default.path)
        .iter()
        .filter_map(|c| data.prim(c))
        .any(|p| p.is_a(types::PHYSICS_SCENE));
    if has_scene {
        default.path.clone()
    } else {
        ROOT.to_string()
    }
}

/// Rebuild the world rooted at the composed path `root_path`.
pub fn parse_usd_world(data: &UsdData, root_path: &str, config: &ConversionConfig) -> (World, UsdErrors) {
    let mut builder = SdfBuilder::new(data, config);
    builder.world.name = world_name(data, root_path);
    builder.traverse(root_path);
    builder.add_plugins();
    builder.assemble()
}

fn world_name(data: &UsdData, root_path: &str) -> String {
    if root_path != ROOT && !root_path.is_empty() {
        return prim_path::prim_name(root_path).to_string();
    }
    data.root_path()
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "world".to_string())
}

/// Where a prim sits in the tree being rebuilt.
#[derive(Debug, Clone, Copy)]
enum Role {
    World,
    Model(usize),
    Link(usize),
    /// An `Xform` under a link grouping geometry; `pose` is relative to the link.
    Group { link: usize, pose: Pose },
}

struct ModelSlot {
    parent: Option<usize>,
    model: Model,
    rigid: bool,
}

struct LinkSlot {
    path: String,
    model: usize,
    link: Link,
    rigid: bool,
}

/// A joint whose bodies are resolved once every link is known.
pub(crate) struct PendingJoint {
    pub(crate) path: String,
    pub(crate) joint: Joint,
    pub(crate) body0: Option<String>,
    pub(crate) body1: Option<String>,
}

pub(crate) struct SdfBuilder<'a> {
    pub(crate) data: &'a UsdData,
    pub(crate) config: &'a ConversionConfig,
    container: String,
    world: World,
    models: Vec<ModelSlot>,
    links: Vec<LinkSlot>,
    joints: Vec<PendingJoint>,
    errors: UsdErrors,
}

impl<'a> SdfBuilder<'a> {
    fn new(data: &'a UsdData, config: &'a ConversionConfig) -> Self {
        Self {
            data,
            config,
            container: ROOT.to_string(),
            world: World::default(),
            models: Vec::new(),
            links: Vec::new(),
            joints: Vec::new(),
            errors: UsdErrors::new(),
        }
    }

    pub(crate) fn error(&mut self, error: UsdError) {
        log::warn!("{}", error);
        self.errors.push(error);
    }

    fn traverse(&mut self, container: &str) {
        let data = self.data;
        self.container = container.to_string();
        let mut roles: HashMap<String, Role> = HashMap::new();
        roles.insert(container.to_string(), Role::World);

        let mut range = data.range_from(container);
        while let Some(prim) = range.next() {
            if prim.path() == container {
                continue;
            }
            let parent = prim_path::parent_path(prim.path()).unwrap_or(ROOT);
            let Some(parent_role) = roles.get(parent).copied() else {
                range.prune_children();
                continue;
            };
            if data.is_unresolved_mount(prim.path()) {
                self.error(UsdError::resolution_miss(format!(
                    "{} could not be resolved, skipping its subtree",
                    prim.path()
                )));
                range.prune_children();
                continue;
            }

            match self.visit(&prim, parent_role) {
                Some(role) => {
                    roles.insert(prim.path().to_string(), role);
                }
                None => range.prune_children(),
            }
        }
    }

    /// Record `prim`; returns its role when its children should be walked.
    fn visit(&mut self, prim: &ComposedPrim<'_>, parent: Role) -> Option<Role> {
        let kind = classify(prim);
        match kind {
            PrimKind::Joint => {
                self.collect_joint(prim);
                return None;
            }
            PrimKind::Shading => return None,
            PrimKind::Light => {
                let pose = self.up_axis_correction(prim) * self.world_pose(prim.path());
                if let Some(light) = self.read_light(prim, pose) {
                    self.world.lights.push(light);
                }
                return None;
            }
            _ => {}
        }

        match parent {
            Role::World => match kind {
                PrimKind::PhysicsScene => {
                    self.read_gravity(prim);
                    None
                }
                PrimKind::Geometry => {
                    self.wrap_geometry(prim, None);
                    None
                }
                k if k.is_sensor() => {
                    self.wrap_sensor(prim, None, k);
                    None
                }
                _ => Some(Role::Model(self.add_model(prim, None))),
            },
            Role::Model(model) => match kind {
                PrimKind::PhysicsScene => {
                    log::debug!("Ignoring nested physics scene {}", prim.path());
                    None
                }
                PrimKind::Geometry => {
                    self.wrap_geometry(prim, Some(model));
                    None
                }
                k if k.is_sensor() => {
                    self.wrap_sensor(prim, Some(model), k);
                    None
                }
                _ if !is_body(prim) && self.contains_bodies(prim) => {
                    Some(Role::Model(self.add_model(prim, Some(model))))
                }
                _ => Some(Role::Link(self.add_link(prim, model))),
            },
            Role::Link(link) => self.visit_link_child(prim, kind, link, Pose::IDENTITY),
            Role::Group { link, pose } => self.visit_link_child(prim, kind, link, pose),
        }
    }

    fn visit_link_child(
        &mut self,
        prim: &ComposedPrim<'_>,
        kind: PrimKind,
        link: usize,
        offset: Pose,
    ) -> Option<Role> {
        match kind {
            PrimKind::Geometry => {
                self.add_geometry(prim, link, offset);
                None
            }
            k if k.is_sensor() => {
                if let Some(sensor) = self.read_sensor(prim, k, offset) {
                    self.links[link].link.sensors.push(sensor);
                }
                None
            }
            PrimKind::Other if self.holds_geometry(prim) => {
                let (pose, _) = self.local_pose(prim);
                Some(Role::Group {
                    link,
                    pose: offset * pose,
                })
            }
            _ => {
                log::debug!("Ignoring {} under link", prim.path());
                None
            }
        }
    }

    /// Any descendant is a body or a joint.
    fn contains_bodies(&self, prim: &ComposedPrim<'_>) -> bool {
        self.data
            .range_from(prim.path())
            .skip(1)
            .any(|p| is_body(&p) || classify(&p) == PrimKind::Joint)
    }

    fn holds_geometry(&self, prim: &ComposedPrim<'_>) -> bool {
        prim.children()
            .iter()
            .filter_map(|c| self.data.prim(c))
            .any(|p| classify(&p) == PrimKind::Geometry)
    }

    fn add_model(&mut self, prim: &ComposedPrim<'_>, parent: Option<usize>) -> usize {
        let (mut pose, _) = self.local_pose(prim);
        if parent.is_none() {
            pose = self.up_axis_correction(prim) * pose;
        }
        let mut model = Model::new(prim.name());
        model.pose = pose;
        self.models.push(ModelSlot {
            parent,
            model,
            rigid: prim.has_api(apis::RIGID_BODY),
        });
        log::debug!("Model {} from {}", prim.name(), prim.path());
        self.models.len() - 1
    }

    fn add_link(&mut self, prim: &ComposedPrim<'_>, model: usize) -> usize {
        let (pose, _) = self.local_pose(prim);
        let mut link = Link::new(prim.name());
        link.pose = pose;
        self.push_link(prim, model, link)
    }

    fn push_link(&mut self, prim: &ComposedPrim<'_>, model: usize, mut link: Link) -> usize {
        link.inertial = self.read_inertial(prim);
        link.kinematic = self.read_kinematic(prim);
        self.links.push(LinkSlot {
            path: prim.path().to_string(),
            model,
            link,
            rigid: prim.has_api(apis::RIGID_BODY),
        });
        self.links.len() - 1
    }

    /// Wrap a bare geometry prim in a link, and in a model too at world level.
    fn wrap_geometry(&mut self, prim: &ComposedPrim<'_>, model: Option<usize>) {
        let Some((pose, geometry)) = self.read_geometry(prim) else {
            return;
        };
        let link = self.wrapper_link(prim, model, pose);
        self.attach_geometry(prim, link, Pose::IDENTITY, geometry);
    }

    fn wrap_sensor(&mut self, prim: &ComposedPrim<'_>, model: Option<usize>, kind: PrimKind) {
        let Some(mut sensor) = self.read_sensor(prim, kind, Pose::IDENTITY) else {
            return;
        };
        let pose = sensor.pose;
        sensor.pose = Pose::IDENTITY;
        let link = self.wrapper_link(prim, model, pose);
        self.links[link].link.sensors.push(sensor);
    }

    fn wrapper_link(&mut self, prim: &ComposedPrim<'_>, model: Option<usize>, pose: Pose) -> usize {
        match model {
            Some(model) => {
                let mut link = Link::new(prim.name());
                link.pose = pose;
                self.push_link(prim, model, link)
            }
            None => {
                let mut wrapper = Model::new(prim.name());
                wrapper.pose = self.up_axis_correction(prim) * pose;
                self.models.push(ModelSlot {
                    parent: None,
                    model: wrapper,
                    rigid: false,
                });
                let model = self.models.len() - 1;
                self.push_link(prim, model, Link::new("link"))
            }
        }
    }

    /// Pose of `path` relative to the world container.
    fn world_pose(&self, path: &str) -> Pose {
        let mut chain = Vec::new();
        let mut current = path;
        while current != self.container && current != ROOT {
            chain.push(current);
            match prim_path::parent_path(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        // Ancestors were already read once, so their problems are not
        // recorded again.
        let mut scratch = UsdErrors::new();
        chain
            .iter()
            .rev()
            .filter_map(|p| self.data.prim(p))
            .fold(Pose::IDENTITY, |pose, prim| pose * transforms::read_xform(&prim, &mut scratch).0)
    }

    /// Attach links, joints and nested models; drop models without links.
    fn assemble(mut self) -> (World, UsdErrors) {
        let link_index: HashMap<String, usize> = self
            .links
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.path.clone(), i))
            .collect();

        let joints = std::mem::take(&mut self.joints);
        let mut model_joints: Vec<Vec<Joint>> = vec![Vec::new(); self.models.len()];
        for pending in joints {
            if let Some((model, joint)) = self.resolve_joint(pending, &link_index) {
                model_joints[model].push(joint);
            }
        }

        let links = std::mem::take(&mut self.links);
        for slot in links {
            let model = &mut self.models[slot.model];
            model.rigid |= slot.rigid;
            model.model.links.push(slot.link);
        }

        let mut slots: Vec<Option<ModelSlot>> = std::mem::take(&mut self.models).into_iter().map(Some).collect();
        let mut top = Vec::new();
        for index in (0..slots.len()).rev() {
            let Some(mut slot) = slots[index].take() else {
                continue;
            };
            slot.model.is_static = !slot.rigid;
            slot.model.joints = std::mem::take(&mut model_joints[index]);
            if slot.model.links.is_empty() && slot.model.models.is_empty() {
                log::warn!("Dropping model '{}' which has no links", slot.model.name);
                continue;
            }
            match slot.parent.and_then(|p| slots[p].as_mut()) {
                Some(parent) => parent.model.models.insert(0, slot.model),
                None => top.push(slot.model),
            }
        }
        top.reverse();
        self.world.models = top;

        log::debug!(
            "World '{}': {} models, {} lights",
            self.world.name,
            self.world.models.len(),
            self.world.lights.len()
        );
        (self.world, self.errors)
    }
}
