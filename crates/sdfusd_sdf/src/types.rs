//! Physics-description object model.
//!
//! The tree mirrors the SDF element hierarchy. Collections keep document
//! order; accessors by index and by name are provided where the converter
//! walks them.

use std::fmt;
use std::str::FromStr;

use sdfusd_math::{DVec2, DVec3, Pose};

use crate::error::SdfError;
use crate::xml::XmlElement;

/// RGBA colour, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn to_dvec3(self) -> DVec3 {
        DVec3::new(self.r as f64, self.g as f64, self.b as f64)
    }

    pub fn from_dvec3(v: DVec3) -> Self {
        Self::rgb(v.x as f32, v.y as f32, v.z as f32)
    }
}

/// Top of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub version: String,
    pub worlds: Vec<World>,
    /// A document may describe a single model instead of worlds.
    pub model: Option<Model>,
}

impl Default for Root {
    fn default() -> Self {
        Self {
            version: "1.9".to_string(),
            worlds: Vec::new(),
            model: None,
        }
    }
}

impl Root {
    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    pub fn world_by_index(&self, index: usize) -> Option<&World> {
        self.worlds.get(index)
    }

    pub fn add_world(&mut self, world: World) {
        self.worlds.push(world);
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }
}

/// A system plugin with its raw configuration elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plugin {
    pub name: String,
    pub filename: String,
    pub contents: Vec<XmlElement>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            contents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub name: String,
    pub gravity: DVec3,
    pub models: Vec<Model>,
    pub lights: Vec<Light>,
    pub plugins: Vec<Plugin>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            gravity: DVec3::new(0.0, 0.0, -9.8),
            models: Vec::new(),
            lights: Vec::new(),
            plugins: Vec::new(),
        }
    }
}

impl World {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn model_by_index(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn light_by_index(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub name: String,
    pub pose: Pose,
    pub is_static: bool,
    pub self_collide: bool,
    pub links: Vec<Link>,
    pub joints: Vec<Joint>,
    /// Nested models.
    pub models: Vec<Model>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_by_index(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub fn link_by_name(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint_by_index(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn model_by_index(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }
}

/// Mass properties. `pose` locates the centre of mass and orients the
/// inertia tensor relative to the link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertial {
    pub mass: f64,
    pub pose: Pose,
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyz: f64,
}

impl Default for Inertial {
    fn default() -> Self {
        Self {
            mass: 1.0,
            pose: Pose::IDENTITY,
            ixx: 1.0,
            iyy: 1.0,
            izz: 1.0,
            ixy: 0.0,
            ixz: 0.0,
            iyz: 0.0,
        }
    }
}

impl Inertial {
    pub fn has_products(&self) -> bool {
        self.ixy != 0.0 || self.ixz != 0.0 || self.iyz != 0.0
    }

    pub fn diagonal(&self) -> DVec3 {
        DVec3::new(self.ixx, self.iyy, self.izz)
    }

    /// Full tensor in the inertial frame.
    pub fn tensor(&self) -> sdfusd_math::DMat3 {
        sdfusd_math::DMat3::from_cols(
            DVec3::new(self.ixx, self.ixy, self.ixz),
            DVec3::new(self.ixy, self.iyy, self.iyz),
            DVec3::new(self.ixz, self.iyz, self.izz),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Link {
    pub name: String,
    pub pose: Pose,
    /// `None` when the document leaves mass unset.
    pub inertial: Option<Inertial>,
    pub kinematic: bool,
    pub visuals: Vec<Visual>,
    pub collisions: Vec<Collision>,
    pub sensors: Vec<Sensor>,
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Mass, zero when unset.
    pub fn mass(&self) -> f64 {
        self.inertial.map_or(0.0, |i| i.mass)
    }

    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }

    pub fn visual_by_index(&self, index: usize) -> Option<&Visual> {
        self.visuals.get(index)
    }

    pub fn collision_count(&self) -> usize {
        self.collisions.len()
    }

    pub fn collision_by_index(&self, index: usize) -> Option<&Collision> {
        self.collisions.get(index)
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn sensor_by_index(&self, index: usize) -> Option<&Sensor> {
        self.sensors.get(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshShape {
    pub uri: String,
    pub scale: DVec3,
    pub submesh: Option<String>,
}

impl Default for MeshShape {
    fn default() -> Self {
        Self {
            uri: String::new(),
            scale: DVec3::ONE,
            submesh: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Geometry {
    #[default]
    Empty,
    Box { size: DVec3 },
    Sphere { radius: f64 },
    Cylinder { radius: f64, length: f64 },
    Capsule { radius: f64, length: f64 },
    Plane { normal: DVec3, size: DVec2 },
    Mesh(MeshShape),
}

impl Geometry {
    /// Element name used in documents.
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Empty => "empty",
            Geometry::Box { .. } => "box",
            Geometry::Sphere { .. } => "sphere",
            Geometry::Cylinder { .. } => "cylinder",
            Geometry::Capsule { .. } => "capsule",
            Geometry::Plane { .. } => "plane",
            Geometry::Mesh(_) => "mesh",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub name: String,
    pub pose: Pose,
    pub geometry: Geometry,
    pub material: Option<Material>,
    pub cast_shadows: bool,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            name: String::new(),
            pose: Pose::IDENTITY,
            geometry: Geometry::Empty,
            material: None,
            cast_shadows: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collision {
    pub name: String,
    pub pose: Pose,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Ball,
    Universal,
    Revolute2,
    Screw,
    Gearbox,
}

impl JointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Fixed => "fixed",
            JointType::Revolute => "revolute",
            JointType::Continuous => "continuous",
            JointType::Prismatic => "prismatic",
            JointType::Ball => "ball",
            JointType::Universal => "universal",
            JointType::Revolute2 => "revolute2",
            JointType::Screw => "screw",
            JointType::Gearbox => "gearbox",
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(JointType::Fixed),
            "revolute" => Ok(JointType::Revolute),
            "continuous" => Ok(JointType::Continuous),
            "prismatic" => Ok(JointType::Prismatic),
            "ball" => Ok(JointType::Ball),
            "universal" => Ok(JointType::Universal),
            "revolute2" => Ok(JointType::Revolute2),
            "screw" => Ok(JointType::Screw),
            "gearbox" => Ok(JointType::Gearbox),
            other => Err(SdfError::UnknownJointType(other.to_string())),
        }
    }
}

/// Values this large mean "no limit".
pub const UNLIMITED: f64 = 1e16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAxis {
    pub xyz: DVec3,
    pub lower: f64,
    pub upper: f64,
    /// Negative means unlimited.
    pub effort: f64,
    /// Negative means unlimited.
    pub max_velocity: f64,
    pub damping: f64,
    pub friction: f64,
    pub stiffness: f64,
}

impl Default for JointAxis {
    fn default() -> Self {
        Self {
            xyz: DVec3::Z,
            lower: -UNLIMITED,
            upper: UNLIMITED,
            effort: -1.0,
            max_velocity: -1.0,
            damping: 0.0,
            friction: 0.0,
            stiffness: 0.0,
        }
    }
}

impl JointAxis {
    pub fn has_limits(&self) -> bool {
        self.lower.abs() < UNLIMITED && self.upper.abs() < UNLIMITED
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    /// Parent link name, `world` for the world frame.
    pub parent: String,
    pub child: String,
    /// Joint frame relative to the child link.
    pub pose: Pose,
    pub axis: Option<JointAxis>,
}

impl Joint {
    pub fn new(name: impl Into<String>, joint_type: JointType) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: String::new(),
            child: String::new(),
            pose: Pose::IDENTITY,
            axis: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Camera,
    DepthCamera,
    RgbdCamera,
    Lidar,
    GpuLidar,
    Imu,
    Altimeter,
    Contact,
    ForceTorque,
    Magnetometer,
    NavSat,
}

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Camera => "camera",
            SensorType::DepthCamera => "depth_camera",
            SensorType::RgbdCamera => "rgbd_camera",
            SensorType::Lidar => "lidar",
            SensorType::GpuLidar => "gpu_lidar",
            SensorType::Imu => "imu",
            SensorType::Altimeter => "altimeter",
            SensorType::Contact => "contact",
            SensorType::ForceTorque => "force_torque",
            SensorType::Magnetometer => "magnetometer",
            SensorType::NavSat => "navsat",
        }
    }

    pub fn is_camera(&self) -> bool {
        matches!(
            self,
            SensorType::Camera | SensorType::DepthCamera | SensorType::RgbdCamera
        )
    }

    pub fn is_lidar(&self) -> bool {
        matches!(self, SensorType::Lidar | SensorType::GpuLidar)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camera" => Ok(SensorType::Camera),
            "depth_camera" | "depth" => Ok(SensorType::DepthCamera),
            "rgbd_camera" | "rgbd" => Ok(SensorType::RgbdCamera),
            "lidar" | "ray" => Ok(SensorType::Lidar),
            "gpu_lidar" | "gpu_ray" => Ok(SensorType::GpuLidar),
            "imu" => Ok(SensorType::Imu),
            "altimeter" => Ok(SensorType::Altimeter),
            "contact" => Ok(SensorType::Contact),
            "force_torque" => Ok(SensorType::ForceTorque),
            "magnetometer" => Ok(SensorType::Magnetometer),
            "navsat" => Ok(SensorType::NavSat),
            other => Err(SdfError::invalid_value("sensor", format!("unknown type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSensor {
    /// Radians.
    pub horizontal_fov: f64,
    pub image_width: u32,
    pub image_height: u32,
    pub near_clip: f64,
    pub far_clip: f64,
}

impl Default for CameraSensor {
    fn default() -> Self {
        Self {
            horizontal_fov: 1.047,
            image_width: 320,
            image_height: 240,
            near_clip: 0.1,
            far_clip: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LidarSensor {
    pub horizontal_samples: u32,
    pub horizontal_min_angle: f64,
    pub horizontal_max_angle: f64,
    pub vertical_samples: u32,
    pub vertical_min_angle: f64,
    pub vertical_max_angle: f64,
    pub range_min: f64,
    pub range_max: f64,
}

impl Default for LidarSensor {
    fn default() -> Self {
        Self {
            horizontal_samples: 640,
            horizontal_min_angle: -std::f64::consts::FRAC_PI_2,
            horizontal_max_angle: std::f64::consts::FRAC_PI_2,
            vertical_samples: 1,
            vertical_min_angle: 0.0,
            vertical_max_angle: 0.0,
            range_min: 0.1,
            range_max: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub name: String,
    pub sensor_type: SensorType,
    pub pose: Pose,
    /// Hz; zero means "as fast as possible".
    pub update_rate: f64,
    pub topic: Option<String>,
    pub camera: Option<CameraSensor>,
    pub lidar: Option<LidarSensor>,
}

impl Sensor {
    pub fn new(name: impl Into<String>, sensor_type: SensorType) -> Self {
        Self {
            name: name.into(),
            sensor_type,
            pose: Pose::IDENTITY,
            update_rate: 0.0,
            topic: None,
            camera: None,
            lidar: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Point,
    Directional,
    Spot,
}

impl LightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightType::Point => "point",
            LightType::Directional => "directional",
            LightType::Spot => "spot",
        }
    }
}

impl FromStr for LightType {
    type Err = SdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(LightType::Point),
            "directional" => Ok(LightType::Directional),
            "spot" => Ok(LightType::Spot),
            other => Err(SdfError::invalid_value("light", format!("unknown type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    pub light_type: LightType,
    pub pose: Pose,
    pub diffuse: Color,
    pub specular: Color,
    pub intensity: f64,
    /// Light-frame direction; used by directional and spot lights.
    pub direction: DVec3,
    pub cast_shadows: bool,
    pub attenuation_range: f64,
    /// Radians.
    pub spot_inner_angle: f64,
    /// Radians.
    pub spot_outer_angle: f64,
    pub spot_falloff: f64,
}

impl Light {
    pub fn new(name: impl Into<String>, light_type: LightType) -> Self {
        Self {
            name: name.into(),
            light_type,
            pose: Pose::IDENTITY,
            diffuse: Color::WHITE,
            specular: Color::rgb(0.1, 0.1, 0.1),
            intensity: 1.0,
            direction: DVec3::new(0.0, 0.0, -1.0),
            cast_shadows: false,
            attenuation_range: 10.0,
            spot_inner_angle: 0.0,
            spot_outer_angle: 0.0,
            spot_falloff: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PbrWorkflowType {
    Metal,
    Specular,
}

/// One PBR workflow. Map paths are opaque strings.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrWorkflow {
    pub albedo_map: Option<String>,
    pub normal_map: Option<String>,
    pub metalness_map: Option<String>,
    pub roughness_map: Option<String>,
    pub glossiness_map: Option<String>,
    pub specular_map: Option<String>,
    pub emissive_map: Option<String>,
    pub metalness: f64,
    pub roughness: f64,
    pub glossiness: f64,
}

impl Default for PbrWorkflow {
    fn default() -> Self {
        Self {
            albedo_map: None,
            normal_map: None,
            metalness_map: None,
            roughness_map: None,
            glossiness_map: None,
            specular_map: None,
            emissive_map: None,
            metalness: 0.5,
            roughness: 0.5,
            glossiness: 0.0,
        }
    }
}

/// PBR block holding at most one workflow per type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pbr {
    workflows: Vec<(PbrWorkflowType, PbrWorkflow)>,
}

impl Pbr {
    pub fn workflow(&self, kind: PbrWorkflowType) -> Option<&PbrWorkflow> {
        self.workflows
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| w)
    }

    pub fn workflow_mut(&mut self, kind: PbrWorkflowType) -> Option<&mut PbrWorkflow> {
        self.workflows
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| w)
    }

    /// Insert or replace the workflow of `kind`.
    pub fn set_workflow(&mut self, kind: PbrWorkflowType, workflow: PbrWorkflow) {
        match self.workflow_mut(kind) {
            Some(existing) => *existing = workflow,
            None => self.workflows.push((kind, workflow)),
        }
    }

    pub fn workflows(&self) -> impl Iterator<Item = (PbrWorkflowType, &PbrWorkflow)> {
        self.workflows.iter().map(|(k, w)| (*k, w))
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// OGRE material script reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialScript {
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub diffuse: Color,
    pub ambient: Color,
    pub specular: Color,
    pub emissive: Color,
    pub pbr: Option<Pbr>,
    pub script: Option<MaterialScript>,
    pub double_sided: bool,
}
