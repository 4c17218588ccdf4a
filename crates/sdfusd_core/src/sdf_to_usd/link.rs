use sdfusd_math::{principal_moments, DMat3};
use sdfusd_sdf::{Collision, Color, Link, Material, Visual};
use sdfusd_usd::path::append_child;
use sdfusd_usd::tokens::{apis, attrs, types};
use sdfusd_usd::{Attribute, Value};

use super::UsdBuilder;
use crate::error::UsdError;
use crate::material::to_scene_material;

impl UsdBuilder<'_> {
    pub(crate) fn parse_link(&mut self, link: &Link, path: &str, model_static: bool) {
        if self.define(path, types::XFORM).is_none() {
            return;
        }
        self.set_transform(path, &link.pose, None);

        if link.kinematic {
            if let Some(prim) = self.stage.prim_mut(path) {
                prim.set(attrs::KINEMATIC_ENABLED, "bool", Value::Bool(true));
            }
        }

        if let Some(inertial) = &link.inertial {
            if inertial.mass < 0.0 {
                self.error(UsdError::invalid_parameter(format!(
                    "link {} has negative mass {}",
                    path, inertial.mass
                )));
            } else if !model_static && inertial.mass > 0.0 {
                self.write_mass_properties(path, inertial);
            }
        }

        for visual in &link.visuals {
            self.parse_visual(visual, path);
        }
        for collision in &link.collisions {
            self.parse_collision(collision, path);
        }
        for sensor in &link.sensors {
            self.parse_sensor(sensor, path);
        }
    }

    /// Rigid-body and mass APIs with the tensor diagonalised in the link frame.
    fn write_mass_properties(&mut self, path: &str, inertial: &sdfusd_sdf::Inertial) {
        let rotation = DMat3::from_quat(inertial.pose.rotation.normalize());
        let tensor = rotation * inertial.tensor() * rotation.transpose();
        let (moments, axes) = principal_moments(tensor);

        // Inertia scales with length squared.
        let unit = self.config.meters_per_unit;
        let moments = moments / (unit * unit);
        let center = inertial.pose.position / unit;

        let Some(prim) = self.stage.prim_mut(path) else {
            return;
        };
        prim.apply_api(apis::RIGID_BODY);
        prim.apply_api(apis::MASS);
        prim.set(attrs::MASS, "float", Value::Double(inertial.mass));
        prim.set(attrs::DIAGONAL_INERTIA, "float3", Value::Vec3(moments));
        prim.set(attrs::PRINCIPAL_AXES, "quatf", Value::Quat(axes));
        prim.set(attrs::CENTER_OF_MASS, "point3f", Value::Vec3(center));
    }

    fn parse_visual(&mut self, visual: &Visual, link_path: &str) {
        let path = self.child_path(link_path, &visual.name);
        if !self.define_geometry(&visual.geometry, &path, &visual.pose) {
            return;
        }
        if let Some(material) = &visual.material {
            self.bind_material(material, &path);
        }
    }

    fn parse_collision(&mut self, collision: &Collision, link_path: &str) {
        let path = self.child_path(link_path, &collision.name);
        if !self.define_geometry(&collision.geometry, &path, &collision.pose) {
            return;
        }
        if let Some(prim) = self.stage.prim_mut(&path) {
            prim.apply_api(apis::COLLISION);
            prim.set_attribute(
                Attribute::new(attrs::PURPOSE, "token", Value::Token("guide".into())).uniform(),
            );
        }
    }

    /// Bind `material` to the geometry at `path`, writing it once per stage.
    fn bind_material(&mut self, material: &Material, path: &str) {
        if material.script.is_some()
            && material.pbr.is_none()
            && material.diffuse == Color::BLACK
            && material.ambient == Color::BLACK
        {
            let script = material.script.as_ref().map_or("", |s| s.name.as_str());
            self.error(UsdError::resolution_miss(format!(
                "material script '{}' on {} cannot be resolved",
                script, path
            )));
            return;
        }

        let existing = self
            .materials
            .iter()
            .find(|(m, _)| m == material)
            .map(|(_, p)| p.clone());
        let material_path = match existing {
            Some(p) => p,
            None => match self.write_material(material) {
                Some(p) => p,
                None => return,
            },
        };

        if let Some(prim) = self.stage.prim_mut(path) {
            prim.apply_api(apis::MATERIAL_BINDING);
            prim.set_relationship(attrs::MATERIAL_BINDING, vec![material_path]);
            prim.set(
                attrs::DISPLAY_COLOR,
                "color3f[]",
                Value::Vec3Array(vec![material.diffuse.to_dvec3()]),
            );
        }
    }

    fn write_material(&mut self, material: &Material) -> Option<String> {
        let scope = self.config.material_scope.clone();
        if !self.stage.has_prim(&scope) {
            self.define(&scope, types::SCOPE)?;
        }

        let mut index = self.materials.len();
        let mut path = append_child(&scope, &format!("Material_{}", index));
        while self.stage.has_prim(&path) {
            index += 1;
            path = append_child(&scope, &format!("Material_{}", index));
        }

        let errors = to_scene_material(material, self.stage, &path);
        self.extend_errors(errors);
        self.materials.push((material.clone(), path.clone()));
        log::debug!("Wrote material {}", path);
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::error::UsdErrorKind;
    use sdfusd_math::{DQuat, DVec3, Pose};
    use sdfusd_sdf::{Geometry, Inertial, MaterialScript};
    use sdfusd_usd::Stage;

    fn red() -> Material {
        Material {
            diffuse: Color::rgb(1.0, 0.0, 0.0),
            ambient: Color::rgb(1.0, 0.0, 0.0),
            ..Default::default()
        }
    }

    fn box_visual(name: &str, material: Material) -> Visual {
        Visual {
            name: name.to_string(),
            geometry: Geometry::Box {
                size: DVec3::ONE,
            },
            material: Some(material),
            ..Default::default()
        }
    }

    fn convert(link: &Link) -> (Stage, crate::error::UsdErrors) {
        let mut stage = Stage::create_in_memory();
        let config = ConversionConfig::default();
        let mut builder = UsdBuilder::new(&mut stage, &config);
        builder.parse_link(link, "/link", false);
        let errors = builder.finish();
        (stage, errors)
    }

    #[test]
    fn test_negative_mass_is_rejected() {
        let mut link = Link::new("link");
        link.inertial = Some(Inertial {
            mass: -1.0,
            ..Default::default()
        });
        let (stage, errors) = convert(&link);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, UsdErrorKind::InvalidParameter);
        assert!(!stage.prim("/link").unwrap().has_api(apis::RIGID_BODY));
    }

    #[test]
    fn test_rotated_inertial_is_diagonalised() {
        let mut link = Link::new("link");
        link.inertial = Some(Inertial {
            mass: 2.0,
            pose: Pose::new(DVec3::new(0.1, 0.0, 0.0), DQuat::from_rotation_z(0.3)),
            ixx: 1.0,
            iyy: 2.0,
            izz: 3.0,
            ..Default::default()
        });
        let (stage, errors) = convert(&link);
        assert!(errors.is_empty());
        let prim = stage.prim("/link").unwrap();
        let moments = prim.value(attrs::DIAGONAL_INERTIA).and_then(Value::as_vec3).unwrap();
        let axes = prim.value(attrs::PRINCIPAL_AXES).and_then(Value::as_quat).unwrap();
        let rebuilt = sdfusd_math::inertia_tensor(moments, axes);
        let expected = sdfusd_math::inertia_tensor(DVec3::new(1.0, 2.0, 3.0), DQuat::from_rotation_z(0.3));
        assert!(rebuilt.abs_diff_eq(expected, 1e-9));
        assert_eq!(
            prim.value(attrs::CENTER_OF_MASS),
            Some(&Value::Vec3(DVec3::new(0.1, 0.0, 0.0)))
        );
    }

    #[test]
    fn test_materials_are_shared() {
        let mut link = Link::new("link");
        link.visuals.push(box_visual("a", red()));
        link.visuals.push(box_visual("b", red()));
        link.visuals.push(box_visual("c", Material::default()));
        let (stage, errors) = convert(&link);
        assert!(errors.is_empty(), "{:?}", errors);

        let binding = |path: &str| stage.prim(path).unwrap().relationship(attrs::MATERIAL_BINDING).unwrap().targets.clone();
        assert_eq!(binding("/link/a"), vec!["/Looks/Material_0".to_string()]);
        assert_eq!(binding("/link/b"), vec!["/Looks/Material_0".to_string()]);
        assert_eq!(binding("/link/c"), vec!["/Looks/Material_1".to_string()]);
        assert!(stage.prim("/Looks").unwrap().is_a(types::SCOPE));
        assert!(stage.prim("/Looks/Material_0").unwrap().is_a(types::MATERIAL));
    }

    #[test]
    fn test_script_material_is_unresolved() {
        let mut link = Link::new("link");
        let script = Material {
            script: Some(MaterialScript {
                uri: "file://media/materials/scripts/gazebo.material".into(),
                name: "Gazebo/Grey".into(),
            }),
            ..Default::default()
        };
        link.visuals.push(box_visual("a", script));
        let (stage, errors) = convert(&link);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, UsdErrorKind::ResolutionMiss);
        let prim = stage.prim("/link/a").unwrap();
        assert!(prim.is_a(types::CUBE));
        assert!(prim.relationship(attrs::MATERIAL_BINDING).is_none());
    }

    #[test]
    fn test_collision_is_guide() {
        let mut link = Link::new("link");
        link.collisions.push(Collision {
            name: "collision".into(),
            pose: Pose::IDENTITY,
            geometry: Geometry::Sphere { radius: 0.5 },
        });
        let (stage, errors) = convert(&link);
        assert!(errors.is_empty());
        let prim = stage.prim("/link/collision").unwrap();
        assert!(prim.has_api(apis::COLLISION));
        assert_eq!(prim.value(attrs::PURPOSE), Some(&Value::Token("guide".into())));
    }
}
