use sdfusd_math::{DMat3, DQuat, DVec2, DVec3, Pose};
use sdfusd_sdf::Sensor;
use sdfusd_usd::tokens::{attrs, custom, types};
use sdfusd_usd::{Attribute, Prim, Value};

use super::UsdBuilder;

/// Horizontal aperture (mm) written on every camera.
pub(crate) const CAMERA_APERTURE: f64 = 20.955;

/// Rotation taking the scene-graph camera frame (looking down -Z, +Y up)
/// to the physics-description one (looking down +X, +Z up).
pub(crate) fn camera_frame_fix() -> DQuat {
    DQuat::from_mat3(&DMat3::from_cols(
        DVec3::new(0.0, -1.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
        DVec3::new(-1.0, 0.0, 0.0),
    ))
}

impl UsdBuilder<'_> {
    pub(crate) fn parse_sensor(&mut self, sensor: &Sensor, link_path: &str) {
        let path = self.child_path(link_path, &sensor.name);
        let unit = self.config.meters_per_unit;

        let (type_name, pose) = if sensor.sensor_type.is_camera() {
            let pose = Pose::new(sensor.pose.position, (sensor.pose.rotation * camera_frame_fix()).normalize());
            (types::CAMERA, pose)
        } else if sensor.sensor_type.is_lidar() {
            (types::LIDAR, sensor.pose)
        } else {
            (types::XFORM, sensor.pose)
        };

        let Some(prim) = self.define(&path, type_name) else {
            return;
        };
        log::debug!("Converting {} sensor '{}' to {}", sensor.sensor_type, sensor.name, path);

        prim.set_attribute(
            Attribute::new(custom::SENSOR_TYPE, "token", Value::Token(sensor.sensor_type.as_str().into()))
                .custom(),
        );
        prim.set_attribute(
            Attribute::new(custom::UPDATE_RATE, "double", Value::Double(sensor.update_rate)).custom(),
        );

        if sensor.sensor_type.is_camera() {
            write_camera(prim, &sensor.camera.unwrap_or_default(), unit);
        } else if sensor.sensor_type.is_lidar() {
            write_lidar(prim, &sensor.lidar.unwrap_or_default(), unit);
        }

        self.set_transform(&path, &pose, None);
    }
}

fn write_camera(prim: &mut Prim, camera: &sdfusd_sdf::CameraSensor, unit: f64) {
    let focal = CAMERA_APERTURE / (2.0 * (camera.horizontal_fov / 2.0).tan());
    let aspect = if camera.image_width > 0 {
        camera.image_height as f64 / camera.image_width as f64
    } else {
        1.0
    };
    prim.set(attrs::FOCAL_LENGTH, "float", Value::Double(focal));
    prim.set(attrs::HORIZONTAL_APERTURE, "float", Value::Double(CAMERA_APERTURE));
    prim.set(attrs::VERTICAL_APERTURE, "float", Value::Double(CAMERA_APERTURE * aspect));
    prim.set(
        attrs::CLIPPING_RANGE,
        "float2",
        Value::Vec2(DVec2::new(camera.near_clip / unit, camera.far_clip / unit)),
    );
    prim.set_attribute(
        Attribute::new(custom::IMAGE_WIDTH, "int", Value::Int(camera.image_width as i64)).custom(),
    );
    prim.set_attribute(
        Attribute::new(custom::IMAGE_HEIGHT, "int", Value::Int(camera.image_height as i64)).custom(),
    );
}

/// Fields of view in degrees, resolutions in degrees per sample.
fn write_lidar(prim: &mut Prim, lidar: &sdfusd_sdf::LidarSensor, unit: f64) {
    let horizontal_fov = (lidar.horizontal_max_angle - lidar.horizontal_min_angle).to_degrees();
    let vertical_fov = (lidar.vertical_max_angle - lidar.vertical_min_angle).to_degrees();
    let resolution = |fov: f64, samples: u32| if samples > 0 { fov / samples as f64 } else { 0.0 };

    prim.set(custom::LIDAR_HORIZONTAL_FOV, "float", Value::Double(horizontal_fov));
    prim.set(custom::LIDAR_VERTICAL_FOV, "float", Value::Double(vertical_fov));
    prim.set(
        custom::LIDAR_HORIZONTAL_RESOLUTION,
        "float",
        Value::Double(resolution(horizontal_fov, lidar.horizontal_samples)),
    );
    prim.set(
        custom::LIDAR_VERTICAL_RESOLUTION,
        "float",
        Value::Double(resolution(vertical_fov, lidar.vertical_samples)),
    );
    prim.set(custom::LIDAR_MIN_RANGE, "float", Value::Double(lidar.range_min / unit));
    prim.set(custom::LIDAR_MAX_RANGE, "float", Value::Double(lidar.range_max / unit));
}
