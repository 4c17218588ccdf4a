//! SDF XML parser.
//!
//! Builds the typed tree from an [`XmlElement`] document. Unknown elements
//! are ignored; required attributes and malformed numbers are errors.

use std::path::Path;

use sdfusd_math::{DVec2, DVec3, Pose};

use crate::error::{SdfError, SdfResult};
use crate::types::{
    CameraSensor, Collision, Color, Geometry, Inertial, Joint, JointAxis, JointType, LidarSensor,
    Light, LightType, Link, Material, MaterialScript, MeshShape, Model, Pbr, PbrWorkflow,
    PbrWorkflowType, Plugin, Root, Sensor, SensorType, Visual, World,
};
use crate::xml::XmlElement;

/// Parse an SDF document from a string.
///
/// # Errors
///
/// Returns an error if the XML is malformed or missing required elements.
pub fn parse_sdf_str(xml: &str) -> SdfResult<Root> {
    let document = XmlElement::parse(xml)?;
    if document.name != "sdf" {
        return Err(SdfError::missing_element("sdf", "SDF document"));
    }
    parse_root(&document)
}

/// Parse an SDF document from a file.
pub fn parse_sdf_file<P: AsRef<Path>>(path: P) -> SdfResult<Root> {
    let path = path.as_ref();
    log::debug!("Reading SDF {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_sdf_str(&content)
}

fn parse_root(element: &XmlElement) -> SdfResult<Root> {
    let mut root = Root::default();
    if let Some(version) = element.attr("version") {
        root.version = version.to_string();
    }
    for world in element.children_named("world") {
        root.worlds.push(parse_world(world)?);
    }
    if let Some(model) = element.child("model") {
        root.model = Some(parse_model(model)?);
    }
    Ok(root)
}

fn parse_world(element: &XmlElement) -> SdfResult<World> {
    let mut world = World::new(required_attr(element, "name")?);
    if let Some(gravity) = element.child("gravity") {
        world.gravity = parse_vec3(gravity)?;
    }
    for child in &element.children {
        match child.name.as_str() {
            "model" => world.models.push(parse_model(child)?),
            "light" => world.lights.push(parse_light(child)?),
            "plugin" => world.plugins.push(parse_plugin(child)),
            "include" => log::debug!("Skipping <include> in world '{}'", world.name),
            _ => {}
        }
    }
    Ok(world)
}

fn parse_plugin(element: &XmlElement) -> Plugin {
    Plugin {
        name: element.attr("name").unwrap_or_default().to_string(),
        filename: element.attr("filename").unwrap_or_default().to_string(),
        contents: element.children.clone(),
    }
}

fn parse_model(element: &XmlElement) -> SdfResult<Model> {
    let mut model = Model::new(required_attr(element, "name")?);
    model.pose = parse_pose_child(element)?;
    model.is_static = parse_bool_child(element, "static")?.unwrap_or(false);
    model.self_collide = parse_bool_child(element, "self_collide")?.unwrap_or(false);

    for child in &element.children {
        match child.name.as_str() {
            "link" => model.links.push(parse_link(child)?),
            "joint" => model.joints.push(parse_joint(child)?),
            "model" => model.models.push(parse_model(child)?),
            _ => {}
        }
    }
    Ok(model)
}

fn parse_link(element: &XmlElement) -> SdfResult<Link> {
    let mut link = Link::new(required_attr(element, "name")?);
    link.pose = parse_pose_child(element)?;
    link.kinematic = parse_bool_child(element, "kinematic")?.unwrap_or(false);
    if let Some(inertial) = element.child("inertial") {
        link.inertial = Some(parse_inertial(inertial)?);
    }

    for child in &element.children {
        match child.name.as_str() {
            "visual" => link.visuals.push(parse_visual(child)?),
            "collision" => link.collisions.push(parse_collision(child)?),
            "sensor" => link.sensors.push(parse_sensor(child)?),
            _ => {}
        }
    }
    Ok(link)
}

fn parse_inertial(element: &XmlElement) -> SdfResult<Inertial> {
    let mut inertial = Inertial {
        pose: parse_pose_child(element)?,
        ..Default::default()
    };
    if let Some(mass) = parse_f64_child(element, "mass")? {
        inertial.mass = mass;
    }
    if let Some(inertia) = element.child("inertia") {
        let fields: [(&str, &mut f64); 6] = [
            ("ixx", &mut inertial.ixx),
            ("iyy", &mut inertial.iyy),
            ("izz", &mut inertial.izz),
            ("ixy", &mut inertial.ixy),
            ("ixz", &mut inertial.ixz),
            ("iyz", &mut inertial.iyz),
        ];
        for (name, slot) in fields {
            if let Some(value) = parse_f64_child(inertia, name)? {
                *slot = value;
            }
        }
    }
    Ok(inertial)
}

fn parse_visual(element: &XmlElement) -> SdfResult<Visual> {
    let mut visual = Visual {
        name: required_attr(element, "name")?,
        pose: parse_pose_child(element)?,
        ..Default::default()
    };
    if let Some(geometry) = element.child("geometry") {
        visual.geometry = parse_geometry(geometry)?;
    }
    if let Some(material) = element.child("material") {
        visual.material = Some(parse_material(material)?);
    }
    if let Some(cast) = parse_bool_child(element, "cast_shadows")? {
        visual.cast_shadows = cast;
    }
    Ok(visual)
}

fn parse_collision(element: &XmlElement) -> SdfResult<Collision> {
    let mut collision = Collision {
        name: required_attr(element, "name")?,
        pose: parse_pose_child(element)?,
        ..Default::default()
    };
    if let Some(geometry) = element.child("geometry") {
        collision.geometry = parse_geometry(geometry)?;
    }
    Ok(collision)
}

/// Parse the first shape inside a `<geometry>` element.
fn parse_geometry(element: &XmlElement) -> SdfResult<Geometry> {
    let Some(shape) = element.children.first() else {
        return Ok(Geometry::Empty);
    };

    let geometry = match shape.name.as_str() {
        "box" => Geometry::Box {
            size: parse_vec3_child(shape, "size")?.unwrap_or(DVec3::ONE),
        },
        "sphere" => Geometry::Sphere {
            radius: parse_f64_child(shape, "radius")?.unwrap_or(1.0),
        },
        "cylinder" => Geometry::Cylinder {
            radius: parse_f64_child(shape, "radius")?.unwrap_or(1.0),
            length: parse_f64_child(shape, "length")?.unwrap_or(1.0),
        },
        "capsule" => Geometry::Capsule {
            radius: parse_f64_child(shape, "radius")?.unwrap_or(0.5),
            length: parse_f64_child(shape, "length")?.unwrap_or(1.0),
        },
        "plane" => Geometry::Plane {
            normal: parse_vec3_child(shape, "normal")?.unwrap_or(DVec3::Z),
            size: match shape.child("size") {
                Some(size) => parse_vec2(size)?,
                None => DVec2::ONE,
            },
        },
        "mesh" => Geometry::Mesh(MeshShape {
            uri: shape
                .child("uri")
                .map(|u| u.text().to_string())
                .ok_or_else(|| SdfError::missing_element("uri", "mesh"))?,
            scale: parse_vec3_child(shape, "scale")?.unwrap_or(DVec3::ONE),
            submesh: shape
                .child("submesh")
                .and_then(|s| s.child("name"))
                .map(|n| n.text().to_string()),
        }),
        "empty" => Geometry::Empty,
        other => {
            log::warn!("Unsupported geometry <{}>, treating as empty", other);
            Geometry::Empty
        }
    };
    Ok(geometry)
}

fn parse_material(element: &XmlElement) -> SdfResult<Material> {
    let mut material = Material::default();
    let colors: [(&str, &mut Color); 4] = [
        ("ambient", &mut material.ambient),
        ("diffuse", &mut material.diffuse),
        ("specular", &mut material.specular),
        ("emissive", &mut material.emissive),
    ];
    for (name, slot) in colors {
        if let Some(child) = element.child(name) {
            *slot = parse_color(child)?;
        }
    }
    material.double_sided = parse_bool_child(element, "double_sided")?.unwrap_or(false);

    if let Some(script) = element.child("script") {
        material.script = Some(MaterialScript {
            uri: text_child(script, "uri").unwrap_or_default(),
            name: text_child(script, "name").unwrap_or_default(),
        });
    }

    if let Some(pbr_element) = element.child("pbr") {
        let mut pbr = Pbr::default();
        for (tag, kind) in [
            ("metal", PbrWorkflowType::Metal),
            ("specular", PbrWorkflowType::Specular),
        ] {
            if let Some(workflow) = pbr_element.child(tag) {
                pbr.set_workflow(kind, parse_workflow(workflow)?);
            }
        }
        material.pbr = Some(pbr);
    }
    Ok(material)
}

fn parse_workflow(element: &XmlElement) -> SdfResult<PbrWorkflow> {
    let mut workflow = PbrWorkflow {
        albedo_map: text_child(element, "albedo_map"),
        normal_map: text_child(element, "normal_map"),
        metalness_map: text_child(element, "metalness_map"),
        roughness_map: text_child(element, "roughness_map"),
        glossiness_map: text_child(element, "glossiness_map"),
        specular_map: text_child(element, "specular_map"),
        emissive_map: text_child(element, "emissive_map"),
        ..Default::default()
    };
    if let Some(v) = parse_f64_child(element, "metalness")? {
        workflow.metalness = v;
    }
    if let Some(v) = parse_f64_child(element, "roughness")? {
        workflow.roughness = v;
    }
    if let Some(v) = parse_f64_child(element, "glossiness")? {
        workflow.glossiness = v;
    }
    Ok(workflow)
}

fn parse_joint(element: &XmlElement) -> SdfResult<Joint> {
    let name = required_attr(element, "name")?;
    let joint_type: JointType = required_attr(element, "type")?.parse()?;
    let mut joint = Joint::new(name, joint_type);
    joint.parent = text_child(element, "parent")
        .ok_or_else(|| SdfError::missing_element("parent", format!("joint {}", joint.name)))?;
    joint.child = text_child(element, "child")
        .ok_or_else(|| SdfError::missing_element("child", format!("joint {}", joint.name)))?;
    joint.pose = parse_pose_child(element)?;

    if let Some(axis_element) = element.child("axis") {
        let mut axis = JointAxis::default();
        if let Some(xyz) = parse_vec3_child(axis_element, "xyz")? {
            axis.xyz = xyz;
        }
        if let Some(limit) = axis_element.child("limit") {
            let fields: [(&str, &mut f64); 4] = [
                ("lower", &mut axis.lower),
                ("upper", &mut axis.upper),
                ("effort", &mut axis.effort),
                ("velocity", &mut axis.max_velocity),
            ];
            for (tag, slot) in fields {
                if let Some(v) = parse_f64_child(limit, tag)? {
                    *slot = v;
                }
            }
        }
        if let Some(dynamics) = axis_element.child("dynamics") {
            let fields: [(&str, &mut f64); 3] = [
                ("damping", &mut axis.damping),
                ("friction", &mut axis.friction),
                ("spring_stiffness", &mut axis.stiffness),
            ];
            for (tag, slot) in fields {
                if let Some(v) = parse_f64_child(dynamics, tag)? {
                    *slot = v;
                }
            }
        }
        joint.axis = Some(axis);
    }
    Ok(joint)
}

fn parse_sensor(element: &XmlElement) -> SdfResult<Sensor> {
    let name = required_attr(element, "name")?;
    let sensor_type: SensorType = required_attr(element, "type")?.parse()?;
    let mut sensor = Sensor::new(name, sensor_type);
    sensor.pose = parse_pose_child(element)?;
    sensor.update_rate = parse_f64_child(element, "update_rate")?.unwrap_or(0.0);
    sensor.topic = text_child(element, "topic");

    if sensor_type.is_camera() {
        let mut camera = CameraSensor::default();
        if let Some(camera_element) = element.child("camera") {
            if let Some(fov) = parse_f64_child(camera_element, "horizontal_fov")? {
                camera.horizontal_fov = fov;
            }
            if let Some(image) = camera_element.child("image") {
                if let Some(w) = parse_f64_child(image, "width")? {
                    camera.image_width = w as u32;
                }
                if let Some(h) = parse_f64_child(image, "height")? {
                    camera.image_height = h as u32;
                }
            }
            if let Some(clip) = camera_element.child("clip") {
                if let Some(near) = parse_f64_child(clip, "near")? {
                    camera.near_clip = near;
                }
                if let Some(far) = parse_f64_child(clip, "far")? {
                    camera.far_clip = far;
                }
            }
        }
        sensor.camera = Some(camera);
    }

    if sensor_type.is_lidar() {
        let mut lidar = LidarSensor::default();
        if let Some(lidar_element) = element.child("lidar").or_else(|| element.child("ray")) {
            if let Some(scan) = lidar_element.child("scan") {
                if let Some(h) = scan.child("horizontal") {
                    read_scan_axis(
                        h,
                        &mut lidar.horizontal_samples,
                        &mut lidar.horizontal_min_angle,
                        &mut lidar.horizontal_max_angle,
                    )?;
                }
                if let Some(v) = scan.child("vertical") {
                    read_scan_axis(
                        v,
                        &mut lidar.vertical_samples,
                        &mut lidar.vertical_min_angle,
                        &mut lidar.vertical_max_angle,
                    )?;
                }
            }
            if let Some(range) = lidar_element.child("range") {
                if let Some(min) = parse_f64_child(range, "min")? {
                    lidar.range_min = min;
                }
                if let Some(max) = parse_f64_child(range, "max")? {
                    lidar.range_max = max;
                }
            }
        }
        sensor.lidar = Some(lidar);
    }
    Ok(sensor)
}

fn read_scan_axis(
    element: &XmlElement,
    samples: &mut u32,
    min_angle: &mut f64,
    max_angle: &mut f64,
) -> SdfResult<()> {
    if let Some(v) = parse_f64_child(element, "samples")? {
        *samples = v as u32;
    }
    if let Some(v) = parse_f64_child(element, "min_angle")? {
        *min_angle = v;
    }
    if let Some(v) = parse_f64_child(element, "max_angle")? {
        *max_angle = v;
    }
    Ok(())
}

fn parse_light(element: &XmlElement) -> SdfResult<Light> {
    let name = required_attr(element, "name")?;
    let light_type: LightType = element.attr("type").unwrap_or("point").parse()?;
    let mut light = Light::new(name, light_type);
    light.pose = parse_pose_child(element)?;
    if let Some(diffuse) = element.child("diffuse") {
        light.diffuse = parse_color(diffuse)?;
    }
    if let Some(specular) = element.child("specular") {
        light.specular = parse_color(specular)?;
    }
    if let Some(intensity) = parse_f64_child(element, "intensity")? {
        light.intensity = intensity;
    }
    if let Some(direction) = parse_vec3_child(element, "direction")? {
        light.direction = direction;
    }
    light.cast_shadows = parse_bool_child(element, "cast_shadows")?.unwrap_or(false);
    if let Some(attenuation) = element.child("attenuation") {
        if let Some(range) = parse_f64_child(attenuation, "range")? {
            light.attenuation_range = range;
        }
    }
    if let Some(spot) = element.child("spot") {
        light.spot_inner_angle = parse_f64_child(spot, "inner_angle")?.unwrap_or(0.0);
        light.spot_outer_angle = parse_f64_child(spot, "outer_angle")?.unwrap_or(0.0);
        light.spot_falloff = parse_f64_child(spot, "falloff")?.unwrap_or(0.0);
    }
    Ok(light)
}

// Helpers

fn required_attr(element: &XmlElement, name: &'static str) -> SdfResult<String> {
    element
        .attr(name)
        .map(str::to_string)
        .ok_or_else(|| SdfError::missing_attribute(name, element.name.clone()))
}

fn text_child(element: &XmlElement, name: &str) -> Option<String> {
    element.child(name).map(|c| c.text().to_string())
}

fn parse_numbers(element: &XmlElement) -> SdfResult<Vec<f64>> {
    element
        .text()
        .split_whitespace()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|e| SdfError::invalid_value(element.name.clone(), format!("'{}': {}", s, e)))
        })
        .collect()
}

fn parse_f64(element: &XmlElement) -> SdfResult<f64> {
    match parse_numbers(element)?.as_slice() {
        [v] => Ok(*v),
        other => Err(SdfError::invalid_value(
            element.name.clone(),
            format!("expected 1 number, got {}", other.len()),
        )),
    }
}

fn parse_vec2(element: &XmlElement) -> SdfResult<DVec2> {
    match parse_numbers(element)?.as_slice() {
        [x, y] => Ok(DVec2::new(*x, *y)),
        other => Err(SdfError::invalid_value(
            element.name.clone(),
            format!("expected 2 numbers, got {}", other.len()),
        )),
    }
}

fn parse_vec3(element: &XmlElement) -> SdfResult<DVec3> {
    match parse_numbers(element)?.as_slice() {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        other => Err(SdfError::invalid_value(
            element.name.clone(),
            format!("expected 3 numbers, got {}", other.len()),
        )),
    }
}

/// Three or four components; alpha defaults to 1.
fn parse_color(element: &XmlElement) -> SdfResult<Color> {
    match parse_numbers(element)?.as_slice() {
        [r, g, b] => Ok(Color::rgb(*r as f32, *g as f32, *b as f32)),
        [r, g, b, a] => Ok(Color::new(*r as f32, *g as f32, *b as f32, *a as f32)),
        other => Err(SdfError::invalid_value(
            element.name.clone(),
            format!("expected 3 or 4 numbers, got {}", other.len()),
        )),
    }
}

fn parse_f64_child(element: &XmlElement, name: &str) -> SdfResult<Option<f64>> {
    element.child(name).map(parse_f64).transpose()
}

fn parse_vec3_child(element: &XmlElement, name: &str) -> SdfResult<Option<DVec3>> {
    element.child(name).map(parse_vec3).transpose()
}

fn parse_bool_child(element: &XmlElement, name: &str) -> SdfResult<Option<bool>> {
    let Some(child) = element.child(name) else {
        return Ok(None);
    };
    match child.text() {
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        other => Err(SdfError::invalid_value(name, format!("'{}' is not a boolean", other))),
    }
}

/// `<pose>x y z roll pitch yaw</pose>`, angles in radians unless the
/// `degrees` attribute is true. Missing means identity.
fn parse_pose_child(element: &XmlElement) -> SdfResult<Pose> {
    let Some(pose) = element.child("pose") else {
        return Ok(Pose::IDENTITY);
    };
    if pose.attr("relative_to").is_some_and(|r| !r.is_empty()) {
        log::debug!("Ignoring relative_to on pose of <{}>", element.name);
    }
    let values = parse_numbers(pose)?;
    let degrees = matches!(pose.attr("degrees"), Some("true") | Some("1"));
    let angle = |v: f64| if degrees { v.to_radians() } else { v };
    match values.as_slice() {
        [] => Ok(Pose::IDENTITY),
        [x, y, z, roll, pitch, yaw] => Ok(Pose::from_xyz_rpy(
            *x,
            *y,
            *z,
            angle(*roll),
            angle(*pitch),
            angle(*yaw),
        )),
        other => Err(SdfError::invalid_value(
            "pose",
            format!("expected 6 numbers, got {}", other.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SHAPES: &str = r#"<?xml version="1.0"?>
<sdf version="1.9">
  <world name="shapes">
    <gravity>0 0 -9.8</gravity>
    <plugin filename="gz-sim-physics-system" name="gz::sim::systems::Physics"/>
    <light type="directional" name="sun">
      <pose>0 0 10 0 0 0</pose>
      <diffuse>0.8 0.8 0.8 1</diffuse>
      <direction>-0.5 0.1 -0.9</direction>
      <cast_shadows>true</cast_shadows>
    </light>
    <model name="ground_plane">
      <static>true</static>
      <link name="link">
        <collision name="collision">
          <geometry><plane><normal>0 0 1</normal><size>100 100</size></plane></geometry>
        </collision>
      </link>
    </model>
    <model name="box">
      <pose>0 0 2.5 0 0 0</pose>
      <link name="link">
        <inertial>
          <mass>1</mass>
          <inertia><ixx>1</ixx><iyy>1</iyy><izz>1</izz></inertia>
        </inertial>
        <visual name="visual">
          <geometry><box><size>1 2 3</size></box></geometry>
          <material>
            <diffuse>1 0 0 1</diffuse>
            <pbr><metal><metalness>0.2</metalness><albedo_map>a.png</albedo_map></metal></pbr>
          </material>
        </visual>
        <sensor name="cam" type="camera">
          <pose degrees="true">0 0 0 0 0 90</pose>
          <update_rate>30</update_rate>
          <camera><horizontal_fov>1.2</horizontal_fov><image><width>640</width><height>480</height></image></camera>
        </sensor>
      </link>
    </model>
  </world>
</sdf>"#;

    #[test]
    fn test_parse_world_contents() {
        let root = parse_sdf_str(SHAPES).unwrap();
        assert_eq!(root.version, "1.9");
        assert_eq!(root.world_count(), 1);

        let world = root.world_by_index(0).unwrap();
        assert_eq!(world.name, "shapes");
        assert_eq!(world.model_count(), 2);
        assert_eq!(world.plugins.len(), 1);
        assert_eq!(world.plugins[0].filename, "gz-sim-physics-system");

        let sun = world.light_by_index(0).unwrap();
        assert_eq!(sun.light_type, LightType::Directional);
        assert!(sun.cast_shadows);
        assert_relative_eq!(sun.pose.position.z, 10.0);
    }

    #[test]
    fn test_parse_links_and_geometry() {
        let root = parse_sdf_str(SHAPES).unwrap();
        let world = root.world_by_index(0).unwrap();

        let ground = world.model_by_name("ground_plane").unwrap();
        assert!(ground.is_static);
        let plane_link = ground.link_by_index(0).unwrap();
        assert!(plane_link.inertial.is_none());
        assert_eq!(
            plane_link.collisions[0].geometry,
            Geometry::Plane {
                normal: DVec3::Z,
                size: DVec2::new(100.0, 100.0)
            }
        );

        let model = world.model_by_name("box").unwrap();
        assert_relative_eq!(model.pose.position.z, 2.5);
        let link = model.link_by_name("link").unwrap();
        assert_relative_eq!(link.mass(), 1.0);
        let visual = link.visual_by_index(0).unwrap();
        assert_eq!(
            visual.geometry,
            Geometry::Box {
                size: DVec3::new(1.0, 2.0, 3.0)
            }
        );

        let material = visual.material.as_ref().unwrap();
        assert_eq!(material.diffuse, Color::rgb(1.0, 0.0, 0.0));
        let metal = material
            .pbr
            .as_ref()
            .and_then(|p| p.workflow(PbrWorkflowType::Metal))
            .unwrap();
        assert_relative_eq!(metal.metalness, 0.2);
        assert_eq!(metal.albedo_map.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_parse_sensor_with_degree_pose() {
        let root = parse_sdf_str(SHAPES).unwrap();
        let link = root.worlds[0].model_by_name("box").unwrap().link_by_index(0).unwrap();
        let sensor = link.sensor_by_index(0).unwrap();
        assert_eq!(sensor.sensor_type, SensorType::Camera);
        assert_relative_eq!(sensor.update_rate, 30.0);
        assert_relative_eq!(sensor.pose.rpy().z, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);

        let camera = sensor.camera.unwrap();
        assert_eq!((camera.image_width, camera.image_height), (640, 480));
        assert_relative_eq!(camera.horizontal_fov, 1.2);
    }

    #[test]
    fn test_parse_joint() {
        let xml = r#"<sdf version="1.9"><model name="arm">
            <link name="base"/><link name="upper"/>
            <joint name="shoulder" type="revolute">
              <parent>base</parent><child>upper</child>
              <axis><xyz>0 1 0</xyz><limit><lower>-1</lower><upper>1</upper><effort>10</effort></limit>
                <dynamics><damping>0.5</damping></dynamics></axis>
            </joint>
        </model></sdf>"#;
        let root = parse_sdf_str(xml).unwrap();
        let model = root.model().unwrap();
        assert_eq!(model.link_count(), 2);

        let joint = model.joint_by_name("shoulder").unwrap();
        assert_eq!(joint.joint_type, JointType::Revolute);
        assert_eq!((joint.parent.as_str(), joint.child.as_str()), ("base", "upper"));
        let axis = joint.axis.unwrap();
        assert_eq!(axis.xyz, DVec3::Y);
        assert!(axis.has_limits());
        assert_relative_eq!(axis.effort, 10.0);
        assert_relative_eq!(axis.damping, 0.5);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_sdf_str("<sdf><world/></sdf>"),
            Err(SdfError::MissingAttribute { .. })
        ));
        assert!(matches!(
            parse_sdf_str(r#"<sdf><model name="m"><pose>1 2</pose></model></sdf>"#),
            Err(SdfError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_sdf_str(
                r#"<sdf><model name="m"><joint name="j" type="hinge"><parent>a</parent><child>b</child></joint></model></sdf>"#
            ),
            Err(SdfError::UnknownJointType(_))
        ));
        assert!(parse_sdf_str("<robot/>").is_err());
    }
}
