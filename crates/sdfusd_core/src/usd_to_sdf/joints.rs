use std::collections::HashMap;

use sdfusd_math::{DQuat, DVec3, Pose};
use sdfusd_sdf::{Joint, JointAxis, JointType, UNLIMITED};
use sdfusd_usd::tokens::{apis, attrs, types};

use super::{PendingJoint, SdfBuilder};
use crate::error::UsdError;
use crate::usd_data::ComposedPrim;

fn axis_vector(token: &str) -> Option<DVec3> {
    match token {
        "X" => Some(DVec3::X),
        "Y" => Some(DVec3::Y),
        "Z" => Some(DVec3::Z),
        _ => None,
    }
}

/// Missing or huge limits mean the joint is free.
fn limit(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && v.abs() < UNLIMITED)
}

impl SdfBuilder<'_> {
    /// Record a joint prim; its bodies are resolved during assembly.
    pub(crate) fn collect_joint(&mut self, prim: &ComposedPrim<'_>) {
        let joint_type = match prim.type_name() {
            types::REVOLUTE_JOINT => JointType::Revolute,
            types::PRISMATIC_JOINT => JointType::Prismatic,
            types::SPHERICAL_JOINT => JointType::Ball,
            _ => JointType::Fixed,
        };
        let mut joint = Joint::new(prim.name(), joint_type);

        let position = self.point(prim, attrs::LOCAL_POS1).unwrap_or_default();
        let rotation = self.quat(prim, attrs::LOCAL_ROT1).unwrap_or(DQuat::IDENTITY);
        joint.pose = Pose::new(position, rotation);

        if matches!(joint_type, JointType::Revolute | JointType::Prismatic) {
            let axis = self.read_axis(prim, &mut joint);
            joint.axis = Some(axis);
        }

        let first = |name: &str| {
            prim.relationship_targets(name)
                .and_then(|targets| targets.into_iter().next())
        };
        self.joints.push(PendingJoint {
            path: prim.path().to_string(),
            joint,
            body0: first(attrs::BODY0),
            body1: first(attrs::BODY1),
        });
    }

    fn read_axis(&mut self, prim: &ComposedPrim<'_>, joint: &mut Joint) -> JointAxis {
        let mut axis = JointAxis::default();
        let token = self.token(prim, attrs::JOINT_AXIS).unwrap_or("X");
        match axis_vector(token) {
            Some(xyz) => axis.xyz = xyz,
            None => self.error(UsdError::schema_mismatch(format!(
                "{} has unknown axis '{}'",
                prim.path(),
                token
            ))),
        }

        let lower = limit(self.scalar(prim, attrs::LOWER_LIMIT));
        let upper = limit(self.scalar(prim, attrs::UPPER_LIMIT));
        let (max_force, damping, stiffness) = if joint.joint_type == JointType::Revolute {
            match (lower, upper) {
                (Some(lower), Some(upper)) => {
                    axis.lower = lower.to_radians();
                    axis.upper = upper.to_radians();
                }
                _ => joint.joint_type = JointType::Continuous,
            }
            (
                attrs::ANGULAR_MAX_FORCE,
                attrs::ANGULAR_DAMPING,
                attrs::ANGULAR_STIFFNESS,
            )
        } else {
            let unit = self.unit_of(prim, attrs::LOWER_LIMIT);
            if let (Some(lower), Some(upper)) = (lower, upper) {
                axis.lower = lower * unit;
                axis.upper = upper * unit;
            }
            (attrs::LINEAR_MAX_FORCE, attrs::LINEAR_DAMPING, attrs::LINEAR_STIFFNESS)
        };

        if prim.has_api(apis::DRIVE_ANGULAR) || prim.has_api(apis::DRIVE_LINEAR) {
            if let Some(effort) = self.scalar(prim, max_force) {
                axis.effort = effort;
            }
            if let Some(damping) = self.scalar(prim, damping) {
                axis.damping = damping;
            }
            if let Some(stiffness) = self.scalar(prim, stiffness) {
                axis.stiffness = stiffness;
            }
        }
        axis
    }

    /// Name the joint's links and pick the model it belongs to, the child's.
    /// A parent in another model is named `model::link`.
    pub(crate) fn resolve_joint(
        &mut self,
        pending: PendingJoint,
        link_index: &HashMap<String, usize>,
    ) -> Option<(usize, Joint)> {
        let PendingJoint {
            path,
            mut joint,
            body0,
            body1,
        } = pending;

        let Some(child) = body1.as_deref().and_then(|b| link_index.get(b)).copied() else {
            self.error(UsdError::resolution_miss(format!(
                "joint {} child body {} is not a link",
                path,
                body1.as_deref().unwrap_or("<none>")
            )));
            return None;
        };
        let model = self.links[child].model;
        joint.child = self.links[child].link.name.clone();

        joint.parent = match body0 {
            None => "world".to_string(),
            Some(body) => match link_index.get(&body).copied() {
                Some(parent) if self.links[parent].model == model => self.links[parent].link.name.clone(),
                Some(parent) => format!(
                    "{}::{}",
                    self.models[self.links[parent].model].model.name,
                    self.links[parent].link.name
                ),
                None => {
                    self.error(UsdError::resolution_miss(format!(
                        "joint {} parent body {} is not a link",
                        path, body
                    )));
                    return None;
                }
            },
        };

        log::debug!(
            "Joint '{}' ({}) {} -> {}",
            joint.name,
            joint.joint_type,
            joint.parent,
            joint.child
        );
        Some((model, joint))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConversionConfig;
    use crate::error::UsdErrorKind;
    use crate::usd_to_sdf::usd_to_sdf;
    use approx::assert_relative_eq;
    use sdfusd_math::DVec3;
    use sdfusd_sdf::JointType;

    const ROBOT: &str = r#"#usda 1.0
(
    defaultPrim = "robot"
    metersPerUnit = 0.01
)

def Xform "robot"
{
    def Xform "base" (
        prepend apiSchemas = ["PhysicsRigidBodyAPI", "PhysicsMassAPI"]
    )
    {
        float physics:mass = 5
    }

    def Xform "slider" (
        prepend apiSchemas = ["PhysicsRigidBodyAPI", "PhysicsMassAPI"]
    )
    {
        float physics:mass = 1
    }

    def PhysicsPrismaticJoint "rail" (
        prepend apiSchemas = ["PhysicsDriveAPI:linear"]
    )
    {
        rel physics:body0 = </robot/base>
        rel physics:body1 = </robot/slider>
        uniform token physics:axis = "Y"
        float physics:lowerLimit = -50
        float physics:upperLimit = 50
        point3f physics:localPos1 = (0, 0, 10)
        float drive:linear:physics:maxForce = 20
        float drive:linear:physics:damping = 0.5
    }

    def PhysicsSphericalJoint "shoulder"
    {
        rel physics:body1 = </robot/base>
    }

    def PhysicsFixedJoint "dangling"
    {
        rel physics:body0 = </robot/base>
        rel physics:body1 = </robot/nowhere>
    }
}
"#;

    #[test]
    fn test_joints_are_resolved_after_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robot.usda");
        std::fs::write(&path, ROBOT).unwrap();
        let config = ConversionConfig {
            use_gazebo_plugins: false,
            ..Default::default()
        };
        let (root, errors) = usd_to_sdf(&path, &config);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].kind, UsdErrorKind::ResolutionMiss);

        let model = root.world_by_index(0).unwrap().model_by_name("robot").unwrap();
        assert_eq!(model.joint_count(), 2);

        let rail = model.joint_by_name("rail").unwrap();
        assert_eq!(rail.joint_type, JointType::Prismatic);
        assert_eq!((rail.parent.as_str(), rail.child.as_str()), ("base", "slider"));
        assert!(rail.pose.position.abs_diff_eq(DVec3::new(0.0, 0.0, 0.1), 1e-9));
        let axis = rail.axis.unwrap();
        assert_eq!(axis.xyz, DVec3::Y);
        assert_relative_eq!(axis.lower, -0.5, epsilon = 1e-9);
        assert_relative_eq!(axis.upper, 0.5, epsilon = 1e-9);
        assert_relative_eq!(axis.effort, 20.0);
        assert_relative_eq!(axis.damping, 0.5);

        let shoulder = model.joint_by_name("shoulder").unwrap();
        assert_eq!(shoulder.joint_type, JointType::Ball);
        assert_eq!(shoulder.parent, "world");
        assert!(shoulder.axis.is_none());
    }
}
