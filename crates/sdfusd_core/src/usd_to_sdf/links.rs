use sdfusd_math::{DQuat, Pose};
use sdfusd_sdf::{Collision, Color, Geometry, Inertial, Material, Visual};
use sdfusd_usd::path as prim_path;
use sdfusd_usd::tokens::{apis, attrs};
use sdfusd_usd::Value;

use super::SdfBuilder;
use crate::error::UsdError;
use crate::usd_data::ComposedPrim;

impl SdfBuilder<'_> {
    /// Mass properties of a prim with the mass API applied. The stored
    /// diagonal and principal axes describe the tensor in the link frame.
    pub(crate) fn read_inertial(&mut self, prim: &ComposedPrim<'_>) -> Option<Inertial> {
        if !prim.has_api(apis::MASS) {
            return None;
        }
        let mut inertial = Inertial::default();
        if let Some(mass) = self.scalar(prim, attrs::MASS) {
            inertial.mass = mass;
        }
        if let Some(diagonal) = self.vec3(prim, attrs::DIAGONAL_INERTIA) {
            let unit = self.unit_of(prim, attrs::DIAGONAL_INERTIA);
            let diagonal = diagonal * unit * unit;
            inertial.ixx = diagonal.x;
            inertial.iyy = diagonal.y;
            inertial.izz = diagonal.z;
        }
        let axes = self.quat(prim, attrs::PRINCIPAL_AXES).unwrap_or(DQuat::IDENTITY);
        let center = self.point(prim, attrs::CENTER_OF_MASS).unwrap_or_default();
        inertial.pose = Pose::new(center, axes);
        Some(inertial)
    }

    pub(crate) fn read_kinematic(&mut self, prim: &ComposedPrim<'_>) -> bool {
        self.boolean(prim, attrs::KINEMATIC_ENABLED).unwrap_or(false)
    }

    pub(crate) fn add_geometry(&mut self, prim: &ComposedPrim<'_>, link: usize, offset: Pose) {
        if let Some((pose, geometry)) = self.read_geometry(prim) {
            self.attach_geometry(prim, link, offset * pose, geometry);
        }
    }

    /// Colliders become collisions. Anything not marked as a guide is
    /// rendered too, so a plain collider yields both.
    pub(crate) fn attach_geometry(&mut self, prim: &ComposedPrim<'_>, link: usize, pose: Pose, geometry: Geometry) {
        let name = prim.name().to_string();
        let collider = prim.has_api(apis::COLLISION);
        let guide = self.token(prim, attrs::PURPOSE) == Some("guide");

        if collider && guide {
            self.links[link].link.collisions.push(Collision { name, pose, geometry });
            return;
        }

        let material = self.read_material(prim);
        if collider {
            self.links[link].link.collisions.push(Collision {
                name: name.clone(),
                pose,
                geometry: geometry.clone(),
            });
        }
        self.links[link].link.visuals.push(Visual {
            name,
            pose,
            geometry,
            material,
            ..Default::default()
        });
    }

    /// The bound material, else one made from the display colour.
    fn read_material(&mut self, prim: &ComposedPrim<'_>) -> Option<Material> {
        if let Some(target) = prim
            .relationship_targets(attrs::MATERIAL_BINDING)
            .and_then(|targets| targets.into_iter().next())
        {
            match self.lookup_material(&target) {
                Some(material) => return Some(material),
                None => self.error(UsdError::resolution_miss(format!(
                    "material {} bound to {} was not found",
                    target,
                    prim.path()
                ))),
            }
        }

        let color = prim
            .value(attrs::DISPLAY_COLOR)
            .and_then(Value::as_vec3_array)
            .and_then(|colors| colors.first().copied())?;
        let color = Color::from_dvec3(color);
        Some(Material {
            diffuse: color,
            ambient: color,
            ..Default::default()
        })
    }

    fn lookup_material(&self, target: &str) -> Option<Material> {
        let name = prim_path::prim_name(target);
        if let Some(found) = self
            .data
            .prim(target)
            .and_then(|p| p.owner().materials.get(name).cloned())
        {
            return Some(found);
        }
        self.data.materials().get(name).cloned()
    }
}
