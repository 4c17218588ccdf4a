use sdfusd_usd::tokens::{apis, custom, types};

use crate::usd_data::ComposedPrim;

/// What a composed prim is, before its parent decides its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrimKind {
    PhysicsScene,
    Light,
    /// Materials, shaders and the `Looks` scope holding them.
    Shading,
    Geometry,
    Camera,
    Lidar,
    /// Any other prim tagged with a sensor type.
    Sensor,
    Joint,
    Other,
}

impl PrimKind {
    pub(crate) fn is_sensor(self) -> bool {
        matches!(self, PrimKind::Camera | PrimKind::Lidar | PrimKind::Sensor)
    }
}

pub(crate) fn classify(prim: &ComposedPrim<'_>) -> PrimKind {
    match prim.type_name() {
        types::PHYSICS_SCENE => PrimKind::PhysicsScene,
        types::DISTANT_LIGHT | types::SPHERE_LIGHT | types::DISK_LIGHT | types::RECT_LIGHT => {
            PrimKind::Light
        }
        types::MATERIAL | types::SHADER => PrimKind::Shading,
        types::SCOPE if prim.name() == "Looks" => PrimKind::Shading,
        types::CUBE | types::SPHERE | types::CYLINDER | types::CAPSULE | types::PLANE | types::MESH => {
            PrimKind::Geometry
        }
        types::CAMERA => PrimKind::Camera,
        types::LIDAR => PrimKind::Lidar,
        types::REVOLUTE_JOINT
        | types::PRISMATIC_JOINT
        | types::FIXED_JOINT
        | types::SPHERICAL_JOINT
        | types::JOINT => PrimKind::Joint,
        _ if prim.value(custom::SENSOR_TYPE).is_some() => PrimKind::Sensor,
        _ => PrimKind::Other,
    }
}

/// Carries rigid-body or mass properties.
pub(crate) fn is_body(prim: &ComposedPrim<'_>) -> bool {
    prim.has_api(apis::RIGID_BODY) || prim.has_api(apis::MASS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_asset_path;
    use crate::usd_data::UsdData;

    #[test]
    fn test_classify_fixture_prims() {
        let mut data = UsdData::new(test_asset_path("assets/usd/upAxisZ.usda"));
        assert!(data.init().is_empty());

        let kind = |path: &str| classify(&data.prim(path).unwrap());
        assert_eq!(kind("/physics"), PrimKind::PhysicsScene);
        assert_eq!(kind("/box"), PrimKind::Other);
        assert_eq!(kind("/box/link/geometry"), PrimKind::Geometry);
        assert_eq!(kind("/Looks"), PrimKind::Shading);
        assert_eq!(kind("/Looks/Material_0"), PrimKind::Shading);

        assert!(is_body(&data.prim("/box/link").unwrap()));
        assert!(!is_body(&data.prim("/ground_plane/link").unwrap()));
    }
}
