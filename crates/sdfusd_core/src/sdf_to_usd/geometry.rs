use std::path::Path;

use sdfusd_math::{DQuat, DVec3, Pose, EPSILON};
use sdfusd_sdf::{Geometry, MeshShape};
use sdfusd_usd::tokens::{attrs, custom, types};
use sdfusd_usd::{Attribute, Value};

use super::UsdBuilder;
use crate::error::UsdError;

/// Axis token for a unit vector along +X, +Y or +Z.
pub(crate) fn axis_token(axis: DVec3) -> Option<&'static str> {
    let axis = axis.try_normalize()?;
    if axis.abs_diff_eq(DVec3::X, EPSILON) {
        Some("X")
    } else if axis.abs_diff_eq(DVec3::Y, EPSILON) {
        Some("Y")
    } else if axis.abs_diff_eq(DVec3::Z, EPSILON) {
        Some("Z")
    } else {
        None
    }
}

impl UsdBuilder<'_> {
    /// Define the geometry prim at `path`. Returns false when no prim could
    /// be authored at all.
    pub(crate) fn define_geometry(&mut self, geometry: &Geometry, path: &str, pose: &Pose) -> bool {
        let mut pose = *pose;
        let mut scale = None;
        let mut attributes: Vec<Attribute> = Vec::new();

        let type_name = match geometry {
            Geometry::Empty => {
                self.error(UsdError::invalid_parameter(format!("{} has no geometry", path)));
                types::XFORM
            }
            Geometry::Box { size } => {
                if size.min_element() > 0.0 {
                    attributes.push(Attribute::new(attrs::SIZE, "double", Value::Double(1.0)));
                    scale = Some(*size / self.config.meters_per_unit);
                } else {
                    self.invalid_dimension(path, "box size", format!("{:?}", size.to_array()));
                }
                types::CUBE
            }
            Geometry::Sphere { radius } => {
                self.positive(path, attrs::RADIUS, *radius, &mut attributes);
                types::SPHERE
            }
            Geometry::Cylinder { radius, length } => {
                self.positive(path, attrs::RADIUS, *radius, &mut attributes);
                self.positive(path, attrs::HEIGHT, *length, &mut attributes);
                attributes.push(axis_attribute("Z"));
                types::CYLINDER
            }
            Geometry::Capsule { radius, length } => {
                self.positive(path, attrs::RADIUS, *radius, &mut attributes);
                self.positive(path, attrs::HEIGHT, *length, &mut attributes);
                attributes.push(axis_attribute("Z"));
                types::CAPSULE
            }
            Geometry::Plane { normal, size } => {
                self.positive(path, attrs::WIDTH, size.x, &mut attributes);
                self.positive(path, attrs::LENGTH, size.y, &mut attributes);
                match (axis_token(*normal), normal.try_normalize()) {
                    (Some(axis), _) => attributes.push(axis_attribute(axis)),
                    (None, Some(n)) => {
                        pose.rotation = (pose.rotation * DQuat::from_rotation_arc(DVec3::Z, n)).normalize();
                        attributes.push(axis_attribute("Z"));
                    }
                    (None, None) => {
                        self.invalid_dimension(path, "plane normal", format!("{:?}", normal.to_array()));
                    }
                }
                types::PLANE
            }
            Geometry::Mesh(mesh) => {
                self.mesh_attributes(path, mesh, &mut attributes);
                if !mesh.scale.abs_diff_eq(DVec3::ONE, EPSILON) {
                    scale = Some(mesh.scale);
                }
                types::MESH
            }
        };

        let Some(prim) = self.define(path, type_name) else {
            return false;
        };
        for attribute in attributes {
            prim.set_attribute(attribute);
        }
        self.set_transform(path, &pose, scale);
        true
    }

    fn positive(&mut self, path: &str, name: &str, metres: f64, out: &mut Vec<Attribute>) {
        if metres > 0.0 {
            out.push(Attribute::new(name, "double", Value::Double(self.length(metres))));
        } else {
            self.invalid_dimension(path, name, metres.to_string());
        }
    }

    fn invalid_dimension(&mut self, path: &str, what: &str, value: String) {
        self.error(UsdError::invalid_parameter(format!(
            "{} has invalid {} {}",
            path, what, value
        )));
    }

    fn mesh_attributes(&mut self, path: &str, mesh: &MeshShape, out: &mut Vec<Attribute>) {
        if mesh.uri.trim().is_empty() {
            self.error(UsdError::invalid_parameter(format!("mesh {} has an empty uri", path)));
        } else {
            let uri = resolve_uri(&mesh.uri, self.config.source_dir.as_deref());
            out.push(Attribute::new(custom::URI, "asset", Value::Asset(uri)).custom());
        }
        if let Some(submesh) = &mesh.submesh {
            out.push(Attribute::new(custom::SUBMESH, "string", Value::String(submesh.clone())).custom());
        }
    }
}

fn axis_attribute(axis: &str) -> Attribute {
    Attribute::new(attrs::AXIS, "token", Value::Token(axis.to_string())).uniform()
}

/// `file://` is stripped, other schemes are kept, and relative paths are
/// joined onto `source_dir` when one is configured.
pub(crate) fn resolve_uri(uri: &str, source_dir: Option<&Path>) -> String {
    let uri = uri.trim();
    let uri = uri.strip_prefix("file://").unwrap_or(uri);
    if uri.contains("://") {
        return uri.to_string();
    }
    match source_dir {
        Some(dir) if Path::new(uri).is_relative() => dir.join(uri).display().to_string(),
        _ => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::error::UsdErrors;
    use sdfusd_math::DVec2;
    use sdfusd_usd::Stage;

    fn convert(geometry: Geometry, config: &ConversionConfig) -> (Stage, UsdErrors) {
        let mut stage = Stage::create_in_memory();
        let mut builder = UsdBuilder::new(&mut stage, config);
        builder.define_geometry(&geometry, "/geometry", &Pose::IDENTITY);
        let errors = builder.finish();
        (stage, errors)
    }

    #[test]
    fn test_box_becomes_scaled_cube() {
        let (stage, errors) = convert(
            Geometry::Box {
                size: DVec3::new(1.0, 2.0, 3.0),
            },
            &ConversionConfig::default(),
        );
        assert!(errors.is_empty());
        let prim = stage.prim("/geometry").unwrap();
        assert!(prim.is_a(types::CUBE));
        assert_eq!(prim.value(attrs::SIZE), Some(&Value::Double(1.0)));
        assert_eq!(
            prim.value(attrs::SCALE),
            Some(&Value::Vec3(DVec3::new(1.0, 2.0, 3.0)))
        );
    }

    #[test]
    fn test_cylinder_in_centimetres() {
        let config = ConversionConfig {
            meters_per_unit: 0.01,
            ..Default::default()
        };
        let (stage, errors) = convert(Geometry::Cylinder { radius: 0.5, length: 2.0 }, &config);
        assert!(errors.is_empty());
        let prim = stage.prim("/geometry").unwrap();
        assert!(prim.is_a(types::CYLINDER));
        assert_eq!(prim.value(attrs::RADIUS), Some(&Value::Double(50.0)));
        assert_eq!(prim.value(attrs::HEIGHT), Some(&Value::Double(200.0)));
        assert_eq!(prim.value(attrs::AXIS), Some(&Value::Token("Z".into())));
    }

    #[test]
    fn test_invalid_dimension_is_recorded() {
        let (stage, errors) = convert(Geometry::Sphere { radius: -1.0 }, &ConversionConfig::default());
        assert_eq!(errors.len(), 1);
        let prim = stage.prim("/geometry").unwrap();
        assert!(prim.is_a(types::SPHERE));
        assert!(prim.value(attrs::RADIUS).is_none());
    }

    #[test]
    fn test_empty_geometry_is_an_xform() {
        let (stage, errors) = convert(Geometry::Empty, &ConversionConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(stage.prim("/geometry").unwrap().is_a(types::XFORM));
    }

    #[test]
    fn test_tilted_plane_folds_normal() {
        let normal = DVec3::new(0.0, 1.0, 1.0);
        let (stage, errors) = convert(
            Geometry::Plane {
                normal,
                size: DVec2::new(4.0, 2.0),
            },
            &ConversionConfig::default(),
        );
        assert!(errors.is_empty());
        let prim = stage.prim("/geometry").unwrap();
        assert_eq!(prim.value(attrs::AXIS), Some(&Value::Token("Z".into())));
        let orient = prim.value(attrs::ORIENT).and_then(Value::as_quat).unwrap();
        assert!((orient * DVec3::Z).abs_diff_eq(normal.normalize(), 1e-12));
    }

    #[test]
    fn test_mesh_uri_resolution() {
        let config = ConversionConfig::default().with_source_dir("/models/robot");
        let mesh = MeshShape {
            uri: "meshes/arm.dae".into(),
            submesh: Some("upper".into()),
            scale: DVec3::splat(0.5),
        };
        let (stage, errors) = convert(Geometry::Mesh(mesh), &config);
        assert!(errors.is_empty());
        let prim = stage.prim("/geometry").unwrap();
        let uri = prim.attribute(custom::URI).unwrap();
        assert!(uri.custom);
        assert_eq!(
            uri.value,
            Some(Value::Asset(
                Path::new("/models/robot").join("meshes/arm.dae").display().to_string()
            ))
        );
        assert_eq!(prim.value(custom::SUBMESH), Some(&Value::String("upper".into())));
        assert_eq!(prim.value(attrs::SCALE), Some(&Value::Vec3(DVec3::splat(0.5))));

        assert_eq!(resolve_uri("file:///abs/a.dae", None), "/abs/a.dae");
        assert_eq!(resolve_uri("model://robot/a.dae", None), "model://robot/a.dae");

        let (_, errors) = convert(Geometry::Mesh(MeshShape::default()), &config);
        assert_eq!(errors.len(), 1);
    }
}
