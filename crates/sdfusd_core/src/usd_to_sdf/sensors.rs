use sdfusd_math::{DVec2, Pose};
use sdfusd_sdf::{CameraSensor, LidarSensor, Sensor, SensorType};
use sdfusd_usd::tokens::{attrs, custom};

use super::kind::PrimKind;
use super::SdfBuilder;
use crate::error::UsdError;
use crate::sdf_to_usd::sensor::{camera_frame_fix, CAMERA_APERTURE};
use crate::usd_data::ComposedPrim;

/// Schema fallback for `focalLength`, in millimetres.
const DEFAULT_FOCAL_LENGTH: f64 = 50.0;

impl SdfBuilder<'_> {
    /// Read a camera, lidar or tagged prim as a sensor posed relative to
    /// its link, `offset` being the pose of the group it sits in.
    pub(crate) fn read_sensor(&mut self, prim: &ComposedPrim<'_>, kind: PrimKind, offset: Pose) -> Option<Sensor> {
        let sensor_type = match self.token(prim, custom::SENSOR_TYPE) {
            Some(token) => match token.parse::<SensorType>() {
                Ok(t) => t,
                Err(e) => {
                    self.error(UsdError::schema_mismatch(format!("{}: {}", prim.path(), e)));
                    return None;
                }
            },
            None if kind == PrimKind::Lidar => SensorType::GpuLidar,
            None => SensorType::Camera,
        };

        let (mut pose, _) = self.local_pose(prim);
        let mut sensor = Sensor::new(prim.name(), sensor_type);
        if let Some(rate) = self.scalar(prim, custom::UPDATE_RATE) {
            sensor.update_rate = rate;
        }

        match kind {
            PrimKind::Camera => {
                pose.rotation = (pose.rotation * camera_frame_fix().inverse()).normalize();
                sensor.camera = Some(self.read_camera(prim));
            }
            PrimKind::Lidar => sensor.lidar = Some(self.read_lidar(prim)),
            _ => {}
        }
        sensor.pose = offset * pose;
        log::debug!("Sensor '{}' ({}) from {}", sensor.name, sensor.sensor_type, prim.path());
        Some(sensor)
    }

    fn read_camera(&mut self, prim: &ComposedPrim<'_>) -> CameraSensor {
        let mut camera = CameraSensor::default();
        let focal = self.scalar(prim, attrs::FOCAL_LENGTH).unwrap_or(DEFAULT_FOCAL_LENGTH);
        let aperture = self.scalar(prim, attrs::HORIZONTAL_APERTURE).unwrap_or(CAMERA_APERTURE);
        if focal > 0.0 {
            camera.horizontal_fov = 2.0 * (aperture / (2.0 * focal)).atan();
        }

        let size = |value: Option<f64>| value.filter(|v| *v > 0.0).map(|v| v as u32);
        if let Some(width) = size(self.scalar(prim, custom::IMAGE_WIDTH)) {
            camera.image_width = width;
        }
        if let Some(height) = size(self.scalar(prim, custom::IMAGE_HEIGHT)) {
            camera.image_height = height;
        }

        let unit = self.unit_of(prim, attrs::CLIPPING_RANGE);
        if let Some(range) = self.vec2(prim, attrs::CLIPPING_RANGE) {
            let range: DVec2 = range * unit;
            camera.near_clip = range.x;
            camera.far_clip = range.y;
        }
        camera
    }

    /// Fields of view are centred on the sensor axis.
    fn read_lidar(&mut self, prim: &ComposedPrim<'_>) -> LidarSensor {
        let mut lidar = LidarSensor::default();
        let samples = |fov: f64, resolution: Option<f64>| match resolution {
            Some(r) if r > 0.0 => (fov / r).round().max(1.0) as u32,
            _ => 1,
        };

        if let Some(fov) = self.scalar(prim, custom::LIDAR_HORIZONTAL_FOV) {
            let resolution = self.scalar(prim, custom::LIDAR_HORIZONTAL_RESOLUTION);
            lidar.horizontal_samples = samples(fov, resolution);
            lidar.horizontal_min_angle = -(fov / 2.0).to_radians();
            lidar.horizontal_max_angle = (fov / 2.0).to_radians();
        }
        if let Some(fov) = self.scalar(prim, custom::LIDAR_VERTICAL_FOV) {
            let resolution = self.scalar(prim, custom::LIDAR_VERTICAL_RESOLUTION);
            lidar.vertical_samples = samples(fov, resolution);
            lidar.vertical_min_angle = -(fov / 2.0).to_radians();
            lidar.vertical_max_angle = (fov / 2.0).to_radians();
        }

        let unit = self.unit_of(prim, custom::LIDAR_MAX_RANGE);
        if let Some(min) = self.scalar(prim, custom::LIDAR_MIN_RANGE) {
            lidar.range_min = min * unit;
        }
        if let Some(max) = self.scalar(prim, custom::LIDAR_MAX_RANGE) {
            lidar.range_max = max * unit;
        }
        lidar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::sdf_to_usd::UsdBuilder;
    use crate::usd_data::UsdData;
    use approx::assert_relative_eq;
    use sdfusd_math::{DQuat, DVec3};
    use sdfusd_usd::Stage;

    /// Write `sensor` through the forward builder and read it back.
    fn round_trip(sensor: &Sensor, kind: PrimKind) -> Sensor {
        let mut stage = Stage::create_in_memory();
        let config = ConversionConfig::default();
        let mut builder = UsdBuilder::new(&mut stage, &config);
        builder.define("/link", sdfusd_usd::tokens::types::XFORM);
        builder.parse_sensor(sensor, "/link");
        assert!(builder.finish().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensor.usda");
        stage.export(&path).unwrap();
        let mut data = UsdData::new(&path);
        assert!(data.init().is_empty());

        let mut reader = SdfBuilder::new(&data, &config);
        let prim = data.prim(&format!("/link/{}", sensor.name)).unwrap();
        let back = reader.read_sensor(&prim, kind, Pose::IDENTITY).unwrap();
        assert!(reader.errors.is_empty(), "{:?}", reader.errors);
        back
    }

    #[test]
    fn test_camera_round_trip() {
        let mut sensor = Sensor::new("cam", SensorType::Camera);
        sensor.pose = Pose::new(DVec3::new(0.1, 0.0, 0.2), DQuat::from_rotation_z(0.4));
        sensor.update_rate = 30.0;
        sensor.camera = Some(CameraSensor {
            horizontal_fov: 1.2,
            image_width: 800,
            image_height: 600,
            near_clip: 0.05,
            far_clip: 50.0,
        });
        let back = round_trip(&sensor, PrimKind::Camera);
        assert_eq!(back.sensor_type, SensorType::Camera);
        assert!(back.pose.abs_diff_eq(&sensor.pose, 1e-9));
        assert_relative_eq!(back.update_rate, 30.0);
        let camera = back.camera.unwrap();
        assert_relative_eq!(camera.horizontal_fov, 1.2, epsilon = 1e-9);
        assert_eq!((camera.image_width, camera.image_height), (800, 600));
        assert_relative_eq!(camera.near_clip, 0.05, epsilon = 1e-9);
        assert_relative_eq!(camera.far_clip, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lidar_round_trip() {
        let mut sensor = Sensor::new("scan", SensorType::GpuLidar);
        sensor.lidar = Some(LidarSensor {
            horizontal_samples: 360,
            horizontal_min_angle: -std::f64::consts::PI,
            horizontal_max_angle: std::f64::consts::PI,
            range_max: 30.0,
            ..Default::default()
        });
        let back = round_trip(&sensor, PrimKind::Lidar);
        assert_eq!(back.sensor_type, SensorType::GpuLidar);
        let lidar = back.lidar.unwrap();
        assert_eq!(lidar.horizontal_samples, 360);
        assert_relative_eq!(lidar.horizontal_max_angle, std::f64::consts::PI, epsilon = 1e-9);
        assert_eq!(lidar.vertical_samples, 1);
        assert_relative_eq!(lidar.range_max, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tagged_xform_sensor() {
        let mut sensor = Sensor::new("imu", SensorType::Imu);
        sensor.update_rate = 100.0;
        let back = round_trip(&sensor, PrimKind::Sensor);
        assert_eq!(back.sensor_type, SensorType::Imu);
        assert!(back.camera.is_none() && back.lidar.is_none());
        assert_relative_eq!(back.update_rate, 100.0);
    }
}
