use sdfusd_math::{DQuat, DVec3, Pose};
use sdfusd_sdf::{Light, LightType};
use sdfusd_usd::tokens::{apis, attrs, types};
use sdfusd_usd::Value;

use super::UsdBuilder;

impl UsdBuilder<'_> {
    pub(crate) fn parse_light(&mut self, light: &Light, parent: &str) {
        let path = self.child_path(parent, &light.name);
        let type_name = match light.light_type {
            LightType::Directional => types::DISTANT_LIGHT,
            LightType::Point | LightType::Spot => types::SPHERE_LIGHT,
        };

        // Scene-graph lights shine down their local -Z.
        let mut pose = light.pose;
        if light.light_type != LightType::Point {
            let direction = light.direction.try_normalize().unwrap_or(DVec3::NEG_Z);
            pose = Pose::new(
                pose.position,
                (pose.rotation * DQuat::from_rotation_arc(DVec3::NEG_Z, direction)).normalize(),
            );
        }

        let pose = self.up_axis_frame() * pose;

        let Some(prim) = self.define(&path, type_name) else {
            return;
        };
        log::debug!("Converting {} light '{}' to {}", light.light_type.as_str(), light.name, path);

        prim.set(attrs::LIGHT_INTENSITY, "float", Value::Double(light.intensity));
        prim.set(attrs::LIGHT_COLOR, "color3f", Value::Vec3(light.diffuse.to_dvec3()));
        prim.set(attrs::LIGHT_SHADOW_ENABLE, "bool", Value::Bool(light.cast_shadows));
        if light.light_type == LightType::Spot {
            prim.apply_api(apis::SHAPING);
            prim.set(
                attrs::SHAPING_CONE_ANGLE,
                "float",
                Value::Double(light.spot_outer_angle.to_degrees()),
            );
            prim.set(attrs::SHAPING_CONE_SOFTNESS, "float", Value::Double(light.spot_falloff));
        }

        self.set_transform(&path, &pose, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use sdfusd_sdf::Color;
    use sdfusd_usd::Stage;

    fn convert(light: &Light) -> Stage {
        let mut stage = Stage::create_in_memory();
        let config = ConversionConfig::default();
        let mut builder = UsdBuilder::new(&mut stage, &config);
        builder.parse_light(light, "/world");
        assert!(builder.finish().is_empty());
        stage
    }

    #[test]
    fn test_directional_light_points_along_direction() {
        let mut light = Light::new("sun", LightType::Directional);
        light.direction = DVec3::new(-0.5, 0.1, -0.9);
        light.diffuse = Color::rgb(0.8, 0.8, 0.8);
        light.cast_shadows = true;
        let stage = convert(&light);

        let prim = stage.prim("/world/sun").unwrap();
        assert!(prim.is_a(types::DISTANT_LIGHT));
        let orient = prim.value(attrs::ORIENT).and_then(Value::as_quat).unwrap();
        assert!((orient * DVec3::NEG_Z).abs_diff_eq(light.direction.normalize(), 1e-12));
        assert_eq!(prim.value(attrs::LIGHT_SHADOW_ENABLE), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_spot_light_is_shaped() {
        let mut light = Light::new("lamp", LightType::Spot);
        light.spot_outer_angle = std::f64::consts::FRAC_PI_4;
        light.spot_falloff = 0.5;
        light.pose = Pose::from_translation(DVec3::new(0.0, 0.0, 3.0));
        let stage = convert(&light);

        let prim = stage.prim("/world/lamp").unwrap();
        assert!(prim.is_a(types::SPHERE_LIGHT));
        assert!(prim.has_api(apis::SHAPING));
        let angle = prim.value(attrs::SHAPING_CONE_ANGLE).and_then(Value::as_f64).unwrap();
        assert!((angle - 45.0).abs() < 1e-9);
        assert_eq!(
            prim.value(attrs::TRANSLATE),
            Some(&Value::Vec3(DVec3::new(0.0, 0.0, 3.0)))
        );
    }
}
