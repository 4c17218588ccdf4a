//! Forward conversion: physics-description tree to scene graph.
//!
//! The builder walks world → model → link → {visual, collision, sensor} and
//! then the model's joints, in document order. Every node becomes one prim;
//! problems are recorded and the walk carries on.

mod geometry;
mod joint;
mod light;
mod link;
mod model;
pub(crate) mod sensor;

use std::f64::consts::FRAC_PI_2;

use sdfusd_math::{DQuat, DVec3, Pose};
use sdfusd_sdf::{Material, Model, Root, World};
use sdfusd_usd::path::{append_child, make_valid_identifier, ROOT};
use sdfusd_usd::tokens::{attrs, types};
use sdfusd_usd::{Attribute, Prim, Stage, UpAxis, Value};

use crate::config::ConversionConfig;
use crate::error::{UsdError, UsdErrors};

/// Build a stage holding every world of `root`, or its lone model.
pub fn sdf_to_usd(root: &Root, config: &ConversionConfig) -> (Stage, UsdErrors) {
    let mut stage = Stage::create_in_memory();
    stage.up_axis = config.up_axis;
    stage.meters_per_unit = config.meters_per_unit;
    let mut errors = UsdErrors::new();

    for world in &root.worlds {
        let path = unique_child_path(&stage, ROOT, &world.name);
        if stage.default_prim.is_none() {
            stage.default_prim = Some(prim_name_of(&path));
        }
        errors.extend(parse_sdf_world(world, &mut stage, &path, config));
    }

    if root.worlds.is_empty() {
        match root.model() {
            Some(model) => {
                let mut builder = UsdBuilder::new(&mut stage, config);
                let path = builder.child_path(ROOT, &model.name);
                builder.stage.default_prim = Some(prim_name_of(&path));
                builder.parse_top_model(model, &path);
                errors.extend(builder.finish());
            }
            None => errors.push(UsdError::invalid_parameter("document has no world or model")),
        }
    }

    log::info!("Built stage with {} prims, {} problems", stage.prim_count(), errors.len());
    (stage, errors)
}

/// Write `world` as an `Xform` at `path` on an existing stage.
pub fn parse_sdf_world(
    world: &World,
    stage: &mut Stage,
    path: &str,
    config: &ConversionConfig,
) -> UsdErrors {
    let mut builder = UsdBuilder::new(stage, config);
    builder.parse_world(world, path);
    builder.finish()
}

fn prim_name_of(path: &str) -> String {
    sdfusd_usd::path::prim_name(path).to_string()
}

/// Sanitised child path of `parent`, suffixed `_1`, `_2`, … on collision.
pub(crate) fn unique_child_path(stage: &Stage, parent: &str, name: &str) -> String {
    let base = make_valid_identifier(name);
    let mut path = append_child(parent, &base);
    let mut suffix = 1;
    while stage.has_prim(&path) {
        path = append_child(parent, &format!("{}_{}", base, suffix));
        suffix += 1;
    }
    path
}

/// Authoring state shared by the per-element writers.
pub(crate) struct UsdBuilder<'a> {
    pub(crate) stage: &'a mut Stage,
    pub(crate) config: &'a ConversionConfig,
    /// Materials already written, with their prim paths.
    materials: Vec<(Material, String)>,
    errors: UsdErrors,
}

impl<'a> UsdBuilder<'a> {
    pub(crate) fn new(stage: &'a mut Stage, config: &'a ConversionConfig) -> Self {
        Self {
            stage,
            config,
            materials: Vec::new(),
            errors: UsdErrors::new(),
        }
    }

    pub(crate) fn finish(self) -> UsdErrors {
        self.errors
    }

    pub(crate) fn error(&mut self, error: UsdError) {
        log::warn!("{}", error);
        self.errors.push(error);
    }

    pub(crate) fn extend_errors(&mut self, errors: UsdErrors) {
        for error in errors {
            self.error(error);
        }
    }

    /// Stage units for a length in metres.
    pub(crate) fn length(&self, metres: f64) -> f64 {
        metres / self.config.meters_per_unit
    }

    pub(crate) fn child_path(&self, parent: &str, name: &str) -> String {
        unique_child_path(self.stage, parent, name)
    }

    /// Define a prim, recording a failure instead of returning it.
    pub(crate) fn define(&mut self, path: &str, type_name: &str) -> Option<&mut Prim> {
        let defined = self.stage.define_prim(path, type_name).map(|_| ());
        if let Err(e) = defined {
            self.error(e.into());
            return None;
        }
        self.stage.prim_mut(path)
    }

    /// Author translate and orient ops for `pose`, plus scale when given.
    pub(crate) fn set_transform(&mut self, path: &str, pose: &Pose, scale: Option<DVec3>) {
        let translate = pose.position / self.config.meters_per_unit;
        let Some(prim) = self.stage.prim_mut(path) else {
            return;
        };
        write_xform_ops(prim, translate, pose, scale);
    }

    fn parse_world(&mut self, world: &World, path: &str) {
        log::debug!("Converting world '{}' to {}", world.name, path);
        if self.define(path, types::XFORM).is_none() {
            return;
        }

        let physics_path = append_child(path, "physics");
        let magnitude = self.length(world.gravity.length());
        let down = world.gravity.try_normalize().unwrap_or(DVec3::NEG_Z);
        let direction = self.up_axis_frame().rotation * down;
        if let Some(scene) = self.define(&physics_path, types::PHYSICS_SCENE) {
            scene.set(attrs::GRAVITY_DIRECTION, "vector3f", Value::Vec3(direction));
            scene.set(attrs::GRAVITY_MAGNITUDE, "float", Value::Double(magnitude));
        }

        for light in &world.lights {
            self.parse_light(light, path);
        }
        for model in &world.models {
            let model_path = self.child_path(path, &model.name);
            self.parse_top_model(model, &model_path);
        }
    }

    /// Rotation taking Z-up content into the stage's up axis.
    pub(crate) fn up_axis_frame(&self) -> Pose {
        match self.config.up_axis {
            UpAxis::Y => Pose::from_rotation(DQuat::from_rotation_x(-FRAC_PI_2)),
            _ => Pose::IDENTITY,
        }
    }

    /// Models directly under the world or the pseudo-root sit in the stage frame.
    fn parse_top_model(&mut self, model: &Model, path: &str) {
        let pose = self.up_axis_frame() * model.pose;
        self.parse_model_at(model, path, &Pose::IDENTITY, pose);
    }
}

fn write_xform_ops(prim: &mut Prim, translate: DVec3, pose: &Pose, scale: Option<DVec3>) {
    prim.set(attrs::TRANSLATE, "double3", Value::Vec3(translate));
    prim.set(attrs::ORIENT, "quatd", Value::Quat(pose.rotation.normalize()));
    let mut order = vec![attrs::TRANSLATE.to_string(), attrs::ORIENT.to_string()];
    if let Some(scale) = scale {
        prim.set(attrs::SCALE, "double3", Value::Vec3(scale));
        order.push(attrs::SCALE.to_string());
    }
    prim.set_attribute(
        Attribute::new(attrs::XFORM_OP_ORDER, "token[]", Value::TokenArray(order)).uniform(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_asset_path;
    use approx::assert_relative_eq;
    use sdfusd_usd::tokens::apis;

    fn translate(stage: &Stage, path: &str) -> DVec3 {
        stage
            .prim(path)
            .and_then(|p| p.value(attrs::TRANSLATE))
            .and_then(Value::as_vec3)
            .unwrap()
    }

    fn orient(stage: &Stage, path: &str) -> DQuat {
        stage
            .prim(path)
            .and_then(|p| p.value(attrs::ORIENT))
            .and_then(Value::as_quat)
            .unwrap()
    }

    fn basic_shapes() -> Root {
        sdfusd_sdf::parse_sdf_file(test_asset_path("assets/sdf/basic_shapes.sdf")).unwrap()
    }

    #[test]
    fn test_basic_shapes_converts_cleanly() {
        let root = basic_shapes();
        let (stage, errors) = sdf_to_usd(&root, &ConversionConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(stage.default_prim.as_deref(), Some("shapes"));
        assert!(stage.prim("/shapes").unwrap().is_a(types::XFORM));
        assert!(stage.prim("/shapes/physics").unwrap().is_a(types::PHYSICS_SCENE));
        assert!(stage.prim("/shapes/sun").unwrap().is_a(types::DISTANT_LIGHT));
    }

    #[test]
    fn test_link_poses_and_rigid_bodies() {
        let root = basic_shapes();
        let world = root.world_by_index(0).unwrap();
        let mut stage = Stage::create_in_memory();
        let errors = parse_sdf_world(world, &mut stage, "/shapes", &ConversionConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);

        let ground = stage.prim("/shapes/ground_plane/link").unwrap();
        assert!(!ground.has_api(apis::RIGID_BODY));
        assert!(!ground.has_api(apis::MASS));
        assert!(translate(&stage, "/shapes/ground_plane").abs_diff_eq(DVec3::new(0.0, 0.0, -0.125), 1e-12));
        assert!(translate(&stage, "/shapes/ground_plane/link").abs_diff_eq(DVec3::ZERO, 1e-12));

        let expected = [
            ("box", 0.0),
            ("cylinder", 2.0),
            ("sphere", 4.0),
            ("capsule", 6.0),
            ("mesh", 8.0),
        ];
        for (name, x) in expected {
            let model = format!("/shapes/{}", name);
            let link = format!("{}/link", model);
            assert!(translate(&stage, &model).abs_diff_eq(DVec3::new(x, 0.0, 2.5), 1e-12));
            assert!(orient(&stage, &model).abs_diff_eq(DQuat::IDENTITY, 1e-12));

            let prim = stage.prim(&link).unwrap();
            assert!(prim.has_api(apis::RIGID_BODY), "{} should be a rigid body", link);
            assert!(prim.has_api(apis::MASS));
            assert_relative_eq!(prim.value(attrs::MASS).and_then(Value::as_f64).unwrap(), 1.0);
            assert_eq!(
                prim.value(attrs::DIAGONAL_INERTIA),
                Some(&Value::Vec3(DVec3::ONE))
            );
            assert_eq!(
                prim.value(attrs::PRINCIPAL_AXES),
                Some(&Value::Quat(DQuat::IDENTITY))
            );
            assert_eq!(
                prim.value(attrs::CENTER_OF_MASS),
                Some(&Value::Vec3(DVec3::ZERO))
            );
        }
    }

    #[test]
    fn test_units_scale_translations() {
        let root = basic_shapes();
        let config = ConversionConfig {
            meters_per_unit: 0.01,
            ..Default::default()
        };
        let (stage, errors) = sdf_to_usd(&root, &config);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_relative_eq!(stage.meters_per_unit, 0.01);
        assert!(translate(&stage, "/shapes/cylinder").abs_diff_eq(DVec3::new(200.0, 0.0, 250.0), 1e-9));
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let mut world = World::new("w");
        world.models.push(sdfusd_sdf::Model::new("a b"));
        world.models.push(sdfusd_sdf::Model::new("a_b"));
        let mut stage = Stage::create_in_memory();
        let errors = parse_sdf_world(&world, &mut stage, "/w", &ConversionConfig::default());
        assert!(errors.is_empty());
        assert!(stage.has_prim("/w/a_b"));
        assert!(stage.has_prim("/w/a_b_1"));
    }

    #[test]
    fn test_model_only_document() {
        let mut root = Root::default();
        root.model = Some(sdfusd_sdf::Model::new("robot"));
        let (stage, errors) = sdf_to_usd(&root, &ConversionConfig::default());
        assert!(errors.is_empty());
        assert_eq!(stage.default_prim.as_deref(), Some("robot"));
        assert!(stage.has_prim("/robot"));

        let (_, errors) = sdf_to_usd(&Root::default(), &ConversionConfig::default());
        assert_eq!(errors.len(), 1);
    }
}
