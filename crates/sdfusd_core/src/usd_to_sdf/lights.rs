use sdfusd_math::{DVec3, Pose};
use sdfusd_sdf::{Color, Light, LightType};
use sdfusd_usd::tokens::{apis, attrs, types};

use super::SdfBuilder;
use crate::usd_data::ComposedPrim;

impl SdfBuilder<'_> {
    /// `pose` is the light's pose in the world. Directional and spot lights
    /// keep only its position; their orientation becomes the direction they
    /// shine along (the prim's local -Z).
    pub(crate) fn read_light(&mut self, prim: &ComposedPrim<'_>, pose: Pose) -> Option<Light> {
        let light_type = match prim.type_name() {
            types::DISTANT_LIGHT => LightType::Directional,
            types::SPHERE_LIGHT | types::DISK_LIGHT | types::RECT_LIGHT if prim.has_api(apis::SHAPING) => {
                LightType::Spot
            }
            types::SPHERE_LIGHT | types::DISK_LIGHT | types::RECT_LIGHT => LightType::Point,
            other => {
                log::debug!("Ignoring light {} of type '{}'", prim.path(), other);
                return None;
            }
        };

        let mut light = Light::new(prim.name(), light_type);
        if let Some(intensity) = self.scalar(prim, attrs::LIGHT_INTENSITY) {
            light.intensity = intensity;
        }
        if let Some(color) = self.vec3(prim, attrs::LIGHT_COLOR) {
            light.diffuse = Color::from_dvec3(color);
        }
        if let Some(shadows) = self.boolean(prim, attrs::LIGHT_SHADOW_ENABLE) {
            light.cast_shadows = shadows;
        }

        if light_type == LightType::Point {
            light.pose = pose;
        } else {
            light.pose = Pose::from_translation(pose.position);
            light.direction = (pose.rotation * DVec3::NEG_Z).normalize();
        }

        if light_type == LightType::Spot {
            if let Some(angle) = self.scalar(prim, attrs::SHAPING_CONE_ANGLE) {
                light.spot_outer_angle = angle.to_radians();
            }
            if let Some(softness) = self.scalar(prim, attrs::SHAPING_CONE_SOFTNESS) {
                light.spot_falloff = softness;
            }
        }
        log::debug!("Light '{}' ({}) from {}", light.name, light_type.as_str(), prim.path());
        Some(light)
    }
}
