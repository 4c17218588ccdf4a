use sdfusd_math::DVec3;
use sdfusd_sdf::{Plugin, XmlElement};
use sdfusd_usd::tokens::attrs;

use super::SdfBuilder;
use crate::usd_data::ComposedPrim;

/// Earth gravity in m/s², used when the scene leaves the magnitude unset.
const STANDARD_GRAVITY: f64 = 9.8;

/// System plugins a simulator needs to run the world, with their libraries.
const SYSTEM_PLUGINS: [(&str, &str); 4] = [
    ("gz::sim::systems::Physics", "gz-sim-physics-system"),
    ("gz::sim::systems::UserCommands", "gz-sim-user-commands-system"),
    ("gz::sim::systems::SceneBroadcaster", "gz-sim-scene-broadcaster-system"),
    ("gz::sim::systems::Sensors", "gz-sim-sensors-system"),
];

impl SdfBuilder<'_> {
    pub(crate) fn read_gravity(&mut self, prim: &ComposedPrim<'_>) {
        // Unset direction means "down" along the document's up axis.
        let correction = self.up_axis_correction(prim).rotation;
        let direction = self
            .vec3(prim, attrs::GRAVITY_DIRECTION)
            .and_then(DVec3::try_normalize)
            .map(|d| correction * d)
            .unwrap_or(DVec3::NEG_Z);
        let magnitude = match self.scalar(prim, attrs::GRAVITY_MAGNITUDE) {
            // Negative means "use the default".
            Some(m) if m >= 0.0 => m * self.unit_of(prim, attrs::GRAVITY_MAGNITUDE),
            _ => STANDARD_GRAVITY,
        };
        self.world.gravity = direction * magnitude;
        log::debug!("Gravity {:?} from {}", self.world.gravity, prim.path());
    }

    pub(crate) fn add_plugins(&mut self) {
        if !self.config.use_gazebo_plugins {
            return;
        }
        for (name, filename) in SYSTEM_PLUGINS {
            let mut plugin = Plugin::new(name, filename);
            if name.ends_with("Sensors") {
                plugin
                    .contents
                    .push(XmlElement::new("render_engine").with_text("ogre2"));
            }
            self.world.plugins.push(plugin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::usd_data::UsdData;

    const SCENES: &str = r#"#usda 1.0
(
    metersPerUnit = 0.01
)

def PhysicsScene "sideways"
{
    vector3f physics:gravityDirection = (0, -2, 0)
    float physics:gravityMagnitude = 500
}

def PhysicsScene "unset"
{
    float physics:gravityMagnitude = -1
}
"#;

    fn builder_for(check: impl FnOnce(&mut SdfBuilder<'_>, &UsdData)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenes.usda");
        std::fs::write(&path, SCENES).unwrap();
        let mut data = UsdData::new(&path);
        assert!(data.init().is_empty());
        let config = ConversionConfig::default();
        let mut builder = SdfBuilder::new(&data, &config);
        check(&mut builder, &data);
    }

    #[test]
    fn test_gravity_in_metres() {
        builder_for(|builder, data| {
            builder.read_gravity(&data.prim("/sideways").unwrap());
            assert!(builder.world.gravity.abs_diff_eq(DVec3::new(0.0, -5.0, 0.0), 1e-9));

            builder.read_gravity(&data.prim("/unset").unwrap());
            assert!(builder.world.gravity.abs_diff_eq(DVec3::new(0.0, 0.0, -STANDARD_GRAVITY), 1e-12));
        });
    }

    #[test]
    fn test_system_plugins() {
        builder_for(|builder, _| {
            builder.add_plugins();
            let filenames: Vec<_> = builder.world.plugins.iter().map(|p| p.filename.as_str()).collect();
            assert_eq!(
                filenames,
                vec![
                    "gz-sim-physics-system",
                    "gz-sim-user-commands-system",
                    "gz-sim-scene-broadcaster-system",
                    "gz-sim-sensors-system"
                ]
            );
            let sensors = &builder.world.plugins[3];
            assert_eq!(sensors.name, "gz::sim::systems::Sensors");
            assert_eq!(sensors.contents[0].text, "ogre2");
        });
    }
}
