//! SDF XML writer.

use sdfusd_math::{DVec3, Pose};

use crate::error::SdfResult;
use crate::types::{
    Collision, Color, Geometry, Inertial, Joint, Light, LightType, Link, Material, Model,
    PbrWorkflowType, Plugin, Root, Sensor, Visual, World, UNLIMITED,
};
use crate::xml::XmlElement;

/// Serialize a tree as an SDF document.
pub fn to_sdf_string(root: &Root) -> SdfResult<String> {
    root_element(root).to_document_string()
}

fn root_element(root: &Root) -> XmlElement {
    let mut element = XmlElement::new("sdf").with_attr("version", root.version.as_str());
    for world in &root.worlds {
        element.push(world_element(world));
    }
    if let Some(model) = &root.model {
        element.push(model_element(model));
    }
    element
}

fn world_element(world: &World) -> XmlElement {
    let mut element = XmlElement::new("world")
        .with_attr("name", world.name.as_str())
        .with_child(leaf("gravity", vec3(world.gravity)));
    for plugin in &world.plugins {
        element.push(plugin_element(plugin));
    }
    for light in &world.lights {
        element.push(light_element(light));
    }
    for model in &world.models {
        element.push(model_element(model));
    }
    element
}

fn plugin_element(plugin: &Plugin) -> XmlElement {
    let mut element = XmlElement::new("plugin")
        .with_attr("filename", plugin.filename.as_str())
        .with_attr("name", plugin.name.as_str());
    element.children = plugin.contents.clone();
    element
}

fn model_element(model: &Model) -> XmlElement {
    let mut element = XmlElement::new("model").with_attr("name", model.name.as_str());
    if model.is_static {
        element.push(leaf("static", "true"));
    }
    if model.self_collide {
        element.push(leaf("self_collide", "true"));
    }
    push_pose(&mut element, &model.pose);
    for link in &model.links {
        element.push(link_element(link));
    }
    for joint in &model.joints {
        element.push(joint_element(joint));
    }
    for nested in &model.models {
        element.push(model_element(nested));
    }
    element
}

fn link_element(link: &Link) -> XmlElement {
    let mut element = XmlElement::new("link").with_attr("name", link.name.as_str());
    push_pose(&mut element, &link.pose);
    if link.kinematic {
        element.push(leaf("kinematic", "true"));
    }
    if let Some(inertial) = &link.inertial {
        element.push(inertial_element(inertial));
    }
    for visual in &link.visuals {
        element.push(visual_element(visual));
    }
    for collision in &link.collisions {
        element.push(collision_element(collision));
    }
    for sensor in &link.sensors {
        element.push(sensor_element(sensor));
    }
    element
}

fn inertial_element(inertial: &Inertial) -> XmlElement {
    let mut element = XmlElement::new("inertial");
    push_pose(&mut element, &inertial.pose);
    element.push(leaf("mass", num(inertial.mass)));
    element.push(
        XmlElement::new("inertia")
            .with_child(leaf("ixx", num(inertial.ixx)))
            .with_child(leaf("ixy", num(inertial.ixy)))
            .with_child(leaf("ixz", num(inertial.ixz)))
            .with_child(leaf("iyy", num(inertial.iyy)))
            .with_child(leaf("iyz", num(inertial.iyz)))
            .with_child(leaf("izz", num(inertial.izz))),
    );
    element
}

fn visual_element(visual: &Visual) -> XmlElement {
    let mut element = XmlElement::new("visual").with_attr("name", visual.name.as_str());
    push_pose(&mut element, &visual.pose);
    element.push(geometry_element(&visual.geometry));
    if let Some(material) = &visual.material {
        element.push(material_element(material));
    }
    if !visual.cast_shadows {
        element.push(leaf("cast_shadows", "false"));
    }
    element
}

fn collision_element(collision: &Collision) -> XmlElement {
    let mut element = XmlElement::new("collision").with_attr("name", collision.name.as_str());
    push_pose(&mut element, &collision.pose);
    element.push(geometry_element(&collision.geometry));
    element
}

fn geometry_element(geometry: &Geometry) -> XmlElement {
    let shape = match geometry {
        Geometry::Empty => XmlElement::new("empty"),
        Geometry::Box { size } => XmlElement::new("box").with_child(leaf("size", vec3(*size))),
        Geometry::Sphere { radius } => {
            XmlElement::new("sphere").with_child(leaf("radius", num(*radius)))
        }
        Geometry::Cylinder { radius, length } => XmlElement::new("cylinder")
            .with_child(leaf("radius", num(*radius)))
            .with_child(leaf("length", num(*length))),
        Geometry::Capsule { radius, length } => XmlElement::new("capsule")
            .with_child(leaf("radius", num(*radius)))
            .with_child(leaf("length", num(*length))),
        Geometry::Plane { normal, size } => XmlElement::new("plane")
            .with_child(leaf("normal", vec3(*normal)))
            .with_child(leaf("size", format!("{} {}", num(size.x), num(size.y)))),
        Geometry::Mesh(mesh) => {
            let mut element = XmlElement::new("mesh").with_child(leaf("uri", mesh.uri.as_str()));
            if let Some(submesh) = &mesh.submesh {
                element.push(XmlElement::new("submesh").with_child(leaf("name", submesh.as_str())));
            }
            if mesh.scale != DVec3::ONE {
                element.push(leaf("scale", vec3(mesh.scale)));
            }
            element
        }
    };
    XmlElement::new("geometry").with_child(shape)
}

fn material_element(material: &Material) -> XmlElement {
    let mut element = XmlElement::new("material")
        .with_child(leaf("ambient", color(material.ambient)))
        .with_child(leaf("diffuse", color(material.diffuse)))
        .with_child(leaf("specular", color(material.specular)))
        .with_child(leaf("emissive", color(material.emissive)));
    if material.double_sided {
        element.push(leaf("double_sided", "true"));
    }
    if let Some(script) = &material.script {
        element.push(
            XmlElement::new("script")
                .with_child(leaf("uri", script.uri.as_str()))
                .with_child(leaf("name", script.name.as_str())),
        );
    }
    if let Some(pbr) = &material.pbr {
        let mut pbr_element = XmlElement::new("pbr");
        for (kind, workflow) in pbr.workflows() {
            let tag = match kind {
                PbrWorkflowType::Metal => "metal",
                PbrWorkflowType::Specular => "specular",
            };
            let mut w = XmlElement::new(tag);
            let maps = [
                ("albedo_map", &workflow.albedo_map),
                ("normal_map", &workflow.normal_map),
                ("metalness_map", &workflow.metalness_map),
                ("roughness_map", &workflow.roughness_map),
                ("glossiness_map", &workflow.glossiness_map),
                ("specular_map", &workflow.specular_map),
                ("emissive_map", &workflow.emissive_map),
            ];
            for (name, map) in maps {
                if let Some(map) = map {
                    w.push(leaf(name, map.as_str()));
                }
            }
            match kind {
                PbrWorkflowType::Metal => {
                    w.push(leaf("metalness", num(workflow.metalness)));
                    w.push(leaf("roughness", num(workflow.roughness)));
                }
                PbrWorkflowType::Specular => {
                    w.push(leaf("glossiness", num(workflow.glossiness)));
                }
            }
            pbr_element.push(w);
        }
        element.push(pbr_element);
    }
    element
}

fn joint_element(joint: &Joint) -> XmlElement {
    let mut element = XmlElement::new("joint")
        .with_attr("name", joint.name.as_str())
        .with_attr("type", joint.joint_type.as_str())
        .with_child(leaf("parent", joint.parent.as_str()))
        .with_child(leaf("child", joint.child.as_str()));
    push_pose(&mut element, &joint.pose);

    if let Some(axis) = &joint.axis {
        let mut axis_element = XmlElement::new("axis").with_child(leaf("xyz", vec3(axis.xyz)));
        let mut limit = XmlElement::new("limit");
        if axis.lower.abs() < UNLIMITED {
            limit.push(leaf("lower", num(axis.lower)));
        }
        if axis.upper.abs() < UNLIMITED {
            limit.push(leaf("upper", num(axis.upper)));
        }
        if axis.effort >= 0.0 {
            limit.push(leaf("effort", num(axis.effort)));
        }
        if axis.max_velocity >= 0.0 {
            limit.push(leaf("velocity", num(axis.max_velocity)));
        }
        if !limit.children.is_empty() {
            axis_element.push(limit);
        }
        axis_element.push(
            XmlElement::new("dynamics")
                .with_child(leaf("damping", num(axis.damping)))
                .with_child(leaf("friction", num(axis.friction)))
                .with_child(leaf("spring_stiffness", num(axis.stiffness))),
        );
        element.push(axis_element);
    }
    element
}

fn sensor_element(sensor: &Sensor) -> XmlElement {
    let mut element = XmlElement::new("sensor")
        .with_attr("name", sensor.name.as_str())
        .with_attr("type", sensor.sensor_type.as_str());
    push_pose(&mut element, &sensor.pose);
    element.push(leaf("update_rate", num(sensor.update_rate)));
    if let Some(topic) = &sensor.topic {
        element.push(leaf("topic", topic.as_str()));
    }
    if let Some(camera) = &sensor.camera {
        element.push(
            XmlElement::new("camera")
                .with_child(leaf("horizontal_fov", num(camera.horizontal_fov)))
                .with_child(
                    XmlElement::new("image")
                        .with_child(leaf("width", camera.image_width.to_string()))
                        .with_child(leaf("height", camera.image_height.to_string())),
                )
                .with_child(
                    XmlElement::new("clip")
                        .with_child(leaf("near", num(camera.near_clip)))
                        .with_child(leaf("far", num(camera.far_clip))),
                ),
        );
    }
    if let Some(lidar) = &sensor.lidar {
        let axis = |tag: &str, samples: u32, min: f64, max: f64| {
            XmlElement::new(tag)
                .with_child(leaf("samples", samples.to_string()))
                .with_child(leaf("min_angle", num(min)))
                .with_child(leaf("max_angle", num(max)))
        };
        element.push(
            XmlElement::new("lidar")
                .with_child(
                    XmlElement::new("scan")
                        .with_child(axis(
                            "horizontal",
                            lidar.horizontal_samples,
                            lidar.horizontal_min_angle,
                            lidar.horizontal_max_angle,
                        ))
                        .with_child(axis(
                            "vertical",
                            lidar.vertical_samples,
                            lidar.vertical_min_angle,
                            lidar.vertical_max_angle,
                        )),
                )
                .with_child(
                    XmlElement::new("range")
                        .with_child(leaf("min", num(lidar.range_min)))
                        .with_child(leaf("max", num(lidar.range_max))),
                ),
        );
    }
    element
}

fn light_element(light: &Light) -> XmlElement {
    let mut element = XmlElement::new("light")
        .with_attr("type", light.light_type.as_str())
        .with_attr("name", light.name.as_str());
    push_pose(&mut element, &light.pose);
    element.push(leaf("cast_shadows", if light.cast_shadows { "true" } else { "false" }));
    element.push(leaf("intensity", num(light.intensity)));
    element.push(leaf("diffuse", color(light.diffuse)));
    element.push(leaf("specular", color(light.specular)));
    element.push(
        XmlElement::new("attenuation").with_child(leaf("range", num(light.attenuation_range))),
    );
    if light.light_type != LightType::Point {
        element.push(leaf("direction", vec3(light.direction)));
    }
    if light.light_type == LightType::Spot {
        element.push(
            XmlElement::new("spot")
                .with_child(leaf("inner_angle", num(light.spot_inner_angle)))
                .with_child(leaf("outer_angle", num(light.spot_outer_angle)))
                .with_child(leaf("falloff", num(light.spot_falloff))),
        );
    }
    element
}

fn leaf(name: &str, text: impl Into<String>) -> XmlElement {
    XmlElement::new(name).with_text(text)
}

fn push_pose(element: &mut XmlElement, pose: &Pose) {
    if pose.is_identity() {
        return;
    }
    let rpy = pose.rpy();
    element.push(leaf(
        "pose",
        format!("{} {}", vec3(pose.position), vec3(rpy)),
    ));
}

/// Shortest text that reads back to the same value, with tiny noise dropped.
fn num(v: f64) -> String {
    let v = if v.abs() < 1e-12 { 0.0 } else { v };
    format!("{}", v)
}

fn vec3(v: DVec3) -> String {
    format!("{} {} {}", num(v.x), num(v.y), num(v.z))
}

fn color(c: Color) -> String {
    format!("{} {} {} {}", c.r, c.g, c.b, c.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sdf_str;
    use crate::types::{JointAxis, JointType, MeshShape, Pbr, PbrWorkflow};
    use sdfusd_math::DVec2;

    fn sample_root() -> Root {
        let mut link = Link::new("link");
        link.inertial = Some(Inertial::default());
        let mut pbr = Pbr::default();
        pbr.set_workflow(
            PbrWorkflowType::Metal,
            PbrWorkflow {
                albedo_map: Some("textures/albedo.png".into()),
                metalness: 0.25,
                ..Default::default()
            },
        );
        link.visuals.push(Visual {
            name: "visual".into(),
            geometry: Geometry::Mesh(MeshShape {
                uri: "meshes/box.dae".into(),
                scale: DVec3::new(2.0, 2.0, 2.0),
                submesh: Some("Cube".into()),
            }),
            material: Some(Material {
                diffuse: Color::rgb(0.0, 1.0, 0.0),
                pbr: Some(pbr),
                ..Default::default()
            }),
            ..Default::default()
        });
        link.collisions.push(Collision {
            name: "collision".into(),
            geometry: Geometry::Plane {
                normal: DVec3::Z,
                size: DVec2::new(4.0, 5.0),
            },
            ..Default::default()
        });

        let mut model = Model::new("robot");
        model.pose = Pose::from_xyz_rpy(1.0, 2.0, 3.0, 0.0, 0.0, 0.5);
        model.links.push(link);
        model.links.push(Link::new("tip"));
        let mut joint = Joint::new("hinge", JointType::Revolute);
        joint.parent = "link".into();
        joint.child = "tip".into();
        joint.axis = Some(JointAxis {
            xyz: DVec3::X,
            lower: -0.5,
            upper: 0.5,
            ..Default::default()
        });
        model.joints.push(joint);

        let mut world = World::new("default");
        world.models.push(model);
        let mut light = Light::new("spot", LightType::Spot);
        light.spot_outer_angle = 0.8;
        world.lights.push(light);
        world.plugins.push(Plugin::new("gz::sim::systems::Physics", "gz-sim-physics-system"));

        let mut root = Root::default();
        root.add_world(world);
        root
    }

    #[test]
    fn test_written_document_reads_back() {
        let root = sample_root();
        let text = to_sdf_string(&root).unwrap();
        assert!(text.contains("<sdf version=\"1.9\">"));

        let back = parse_sdf_str(&text).unwrap();
        let world = back.world_by_index(0).unwrap();
        assert_eq!(world.plugins.len(), 1);
        assert_eq!(world.light_by_index(0).unwrap().spot_outer_angle, 0.8);

        let model = world.model_by_name("robot").unwrap();
        assert!(model.pose.abs_diff_eq(&root.worlds[0].models[0].pose, 1e-12));
        assert_eq!(model.link_count(), 2);
        assert!(model.link_by_name("tip").unwrap().inertial.is_none());

        let visual = model.link_by_name("link").unwrap().visual_by_index(0).unwrap();
        assert_eq!(visual, &root.worlds[0].models[0].links[0].visuals[0]);

        let joint = model.joint_by_name("hinge").unwrap();
        assert_eq!(joint.axis.unwrap().lower, -0.5);
        assert_eq!(joint.axis.unwrap().effort, -1.0);
    }

    #[test]
    fn test_identity_pose_omitted() {
        let mut root = Root::default();
        root.model = Some(Model::new("m"));
        let text = to_sdf_string(&root).unwrap();
        assert!(!text.contains("<pose"));
    }
}
