use std::f64::consts::FRAC_PI_2;

use sdfusd_math::{DQuat, DVec2, DVec3, Pose};
use sdfusd_sdf::{Geometry, MeshShape};
use sdfusd_usd::tokens::{attrs, custom, types};

use super::SdfBuilder;
use crate::error::UsdError;
use crate::usd_data::ComposedPrim;

/// Rotation taking +Z onto the named axis.
fn axis_rotation(axis: &str) -> DQuat {
    match axis {
        "X" => DQuat::from_rotation_y(FRAC_PI_2),
        "Y" => DQuat::from_rotation_x(-FRAC_PI_2),
        _ => DQuat::IDENTITY,
    }
}

fn axis_vector(axis: &str) -> DVec3 {
    match axis {
        "X" => DVec3::X,
        "Y" => DVec3::Y,
        _ => DVec3::Z,
    }
}

impl SdfBuilder<'_> {
    /// Shape and link-relative pose of a gprim. Unit-less fallbacks follow
    /// the schema defaults.
    pub(crate) fn read_geometry(&mut self, prim: &ComposedPrim<'_>) -> Option<(Pose, Geometry)> {
        let (mut pose, scale) = self.local_pose(prim);
        let scale = scale.abs();

        let geometry = match prim.type_name() {
            types::CUBE => Geometry::Box {
                size: self.length(prim, attrs::SIZE, 2.0) * scale,
            },
            types::SPHERE => Geometry::Sphere {
                radius: self.length(prim, attrs::RADIUS, 1.0) * scale.max_element(),
            },
            types::CYLINDER | types::CAPSULE => {
                let capsule = prim.is_a(types::CAPSULE);
                let (radius, height) = if capsule { (0.5, 1.0) } else { (1.0, 2.0) };
                let axis = self.token(prim, attrs::AXIS).unwrap_or("Z");
                let along = axis_vector(axis);
                let across = ((DVec3::ONE - along) * scale).max_element();
                let radius = self.length(prim, attrs::RADIUS, radius) * across;
                let length = self.length(prim, attrs::HEIGHT, height) * (scale * along).max_element();
                pose.rotation = (pose.rotation * axis_rotation(axis)).normalize();
                if capsule {
                    Geometry::Capsule { radius, length }
                } else {
                    Geometry::Cylinder { radius, length }
                }
            }
            types::PLANE => {
                let axis = self.token(prim, attrs::AXIS).unwrap_or("Z");
                Geometry::Plane {
                    normal: axis_vector(axis),
                    size: DVec2::new(
                        self.length(prim, attrs::WIDTH, 2.0),
                        self.length(prim, attrs::LENGTH, 2.0),
                    ),
                }
            }
            types::MESH => Geometry::Mesh(self.read_mesh(prim, scale)),
            other => {
                self.error(UsdError::schema_mismatch(format!(
                    "{} has unsupported geometry type '{}'",
                    prim.path(),
                    other
                )));
                return None;
            }
        };
        Some((pose, geometry))
    }

    /// Meshes keep a pointer to their source: the authored `sdf:uri`, or the
    /// document and prim they live in.
    fn read_mesh(&mut self, prim: &ComposedPrim<'_>, scale: DVec3) -> MeshShape {
        let uri = self.token(prim, custom::URI).map(str::to_string);
        let submesh = self.token(prim, custom::SUBMESH).map(str::to_string);
        match uri {
            Some(uri) => MeshShape { uri, scale, submesh },
            None => MeshShape {
                uri: prim.owner().file_path.clone(),
                scale,
                submesh: Some(prim.name().to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::usd_data::UsdData;
    use approx::assert_relative_eq;

    const SHAPES: &str = r#"#usda 1.0
(
    metersPerUnit = 0.01
)

def Cube "cube"
{
    double3 xformOp:scale = (1, 2, 3)
    uniform token[] xformOpOrder = ["xformOp:scale"]
}

def Cylinder "rod"
{
    uniform token axis = "X"
    double radius = 10
    double height = 100
}

def Capsule "pill"
{
}

def Plane "floor"
{
    uniform token axis = "Y"
    double width = 500
    double length = 300
}

def Mesh "blob"
{
}

def Mesh "linked"
{
    custom asset sdf:uri = @meshes/blob.dae@
    custom string sdf:submesh = "Blob"
}
"#;

    fn read_all(check: impl FnOnce(&mut SdfBuilder<'_>, &UsdData)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shapes.usda");
        std::fs::write(&path, SHAPES).unwrap();
        let mut data = UsdData::new(&path);
        assert!(data.init().is_empty());
        let config = ConversionConfig::default();
        let mut builder = SdfBuilder::new(&data, &config);
        check(&mut builder, &data);
        assert!(builder.errors.is_empty(), "{:?}", builder.errors);
    }

    #[test]
    fn test_cube_uses_default_size_and_scale() {
        read_all(|builder, data| {
            let (pose, geometry) = builder.read_geometry(&data.prim("/cube").unwrap()).unwrap();
            assert!(pose.is_identity());
            match geometry {
                Geometry::Box { size } => assert!(size.abs_diff_eq(DVec3::new(0.02, 0.04, 0.06), 1e-12)),
                other => panic!("unexpected geometry {:?}", other),
            }
        });
    }

    #[test]
    fn test_cylinder_axis_is_folded_into_pose() {
        read_all(|builder, data| {
            let (pose, geometry) = builder.read_geometry(&data.prim("/rod").unwrap()).unwrap();
            assert!((pose.rotation * DVec3::Z).abs_diff_eq(DVec3::X, 1e-12));
            match geometry {
                Geometry::Cylinder { radius, length } => {
                    assert_relative_eq!(radius, 0.1, epsilon = 1e-12);
                    assert_relative_eq!(length, 1.0, epsilon = 1e-12);
                }
                other => panic!("unexpected geometry {:?}", other),
            }
        });
    }

    #[test]
    fn test_capsule_and_plane_defaults() {
        read_all(|builder, data| {
            let (_, capsule) = builder.read_geometry(&data.prim("/pill").unwrap()).unwrap();
            match capsule {
                Geometry::Capsule { radius, length } => {
                    assert_relative_eq!(radius, 0.005, epsilon = 1e-12);
                    assert_relative_eq!(length, 0.01, epsilon = 1e-12);
                }
                other => panic!("unexpected geometry {:?}", other),
            }

            let (_, plane) = builder.read_geometry(&data.prim("/floor").unwrap()).unwrap();
            match plane {
                Geometry::Plane { normal, size } => {
                    assert_eq!(normal, DVec3::Y);
                    assert!(size.abs_diff_eq(DVec2::new(5.0, 3.0), 1e-12));
                }
                other => panic!("unexpected geometry {:?}", other),
            }
        });
    }

    #[test]
    fn test_mesh_uri_or_source_document() {
        read_all(|builder, data| {
            let (_, blob) = builder.read_geometry(&data.prim("/blob").unwrap()).unwrap();
            match blob {
                Geometry::Mesh(mesh) => {
                    assert!(mesh.uri.ends_with("shapes.usda"));
                    assert_eq!(mesh.submesh.as_deref(), Some("blob"));
                }
                other => panic!("unexpected geometry {:?}", other),
            }

            let (_, linked) = builder.read_geometry(&data.prim("/linked").unwrap()).unwrap();
            match linked {
                Geometry::Mesh(mesh) => {
                    assert_eq!(mesh.uri, "meshes/blob.dae");
                    assert_eq!(mesh.submesh.as_deref(), Some("Blob"));
                    assert!(mesh.scale.abs_diff_eq(DVec3::ONE, 1e-12));
                }
                other => panic!("unexpected geometry {:?}", other),
            }
        });
    }
}
