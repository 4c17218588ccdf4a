use std::collections::HashMap;

use sdfusd_math::{DQuat, DVec3, Pose};
use sdfusd_sdf::{Joint, JointAxis, JointType, Model};
use sdfusd_usd::tokens::{apis, attrs, types};
use sdfusd_usd::{Attribute, Value};

use super::geometry::axis_token;
use super::UsdBuilder;
use crate::error::UsdError;

/// Scene-graph joint type for a physics-description joint type.
fn joint_prim_type(joint_type: JointType) -> Option<&'static str> {
    match joint_type {
        JointType::Revolute | JointType::Continuous => Some(types::REVOLUTE_JOINT),
        JointType::Prismatic => Some(types::PRISMATIC_JOINT),
        JointType::Fixed => Some(types::FIXED_JOINT),
        JointType::Ball => Some(types::SPHERICAL_JOINT),
        JointType::Universal | JointType::Revolute2 | JointType::Screw | JointType::Gearbox => None,
    }
}

impl UsdBuilder<'_> {
    /// Write `joint` under `model_path`. `model_pose` is the model frame in
    /// the world, used when the parent is the world itself.
    pub(crate) fn parse_joint(
        &mut self,
        joint: &Joint,
        model: &Model,
        model_path: &str,
        model_pose: &Pose,
        link_paths: &HashMap<String, String>,
    ) {
        let Some(type_name) = joint_prim_type(joint.joint_type) else {
            self.error(UsdError::invalid_parameter(format!(
                "joint '{}' has unsupported type {}",
                joint.name, joint.joint_type
            )));
            return;
        };

        let (Some(child_path), Some(child)) = (link_paths.get(&joint.child), model.link_by_name(&joint.child))
        else {
            self.error(UsdError::resolution_miss(format!(
                "joint '{}' child link '{}' not found in model '{}'",
                joint.name, joint.child, model.name
            )));
            return;
        };

        let to_world = joint.parent == "world";
        let parent = if to_world {
            None
        } else {
            match (link_paths.get(&joint.parent), model.link_by_name(&joint.parent)) {
                (Some(path), Some(link)) => Some((path.clone(), link.pose)),
                _ => {
                    self.error(UsdError::resolution_miss(format!(
                        "joint '{}' parent link '{}' not found in model '{}'",
                        joint.name, joint.parent, model.name
                    )));
                    return;
                }
            }
        };

        // Joint frame in the model, then in each body.
        let joint_in_model = child.pose * joint.pose;
        let frame0 = match &parent {
            Some((_, parent_pose)) => parent_pose.inverse() * joint_in_model,
            None => *model_pose * joint_in_model,
        };
        let mut frame1 = joint.pose;
        let mut frame0 = frame0;

        let axis = joint.axis.unwrap_or_default();
        let mut axis_name = "X";
        if matches!(
            joint.joint_type,
            JointType::Revolute | JointType::Continuous | JointType::Prismatic
        ) {
            match axis_token(axis.xyz) {
                Some(token) => axis_name = token,
                None => {
                    let direction = axis.xyz.try_normalize().unwrap_or(DVec3::Z);
                    let fold = DQuat::from_rotation_arc(DVec3::X, direction);
                    frame0.rotation = (frame0.rotation * fold).normalize();
                    frame1.rotation = (frame1.rotation * fold).normalize();
                }
            }
        }

        let path = self.child_path(model_path, &joint.name);
        let unit = self.config.meters_per_unit;
        let Some(prim) = self.define(&path, type_name) else {
            return;
        };
        log::debug!("Converting joint '{}' to {}", joint.name, path);

        if let Some((parent_path, _)) = parent {
            prim.set_relationship(attrs::BODY0, vec![parent_path]);
        }
        prim.set_relationship(attrs::BODY1, vec![child_path.clone()]);
        prim.set(attrs::LOCAL_POS0, "point3f", Value::Vec3(frame0.position / unit));
        prim.set(attrs::LOCAL_ROT0, "quatf", Value::Quat(frame0.rotation));
        prim.set(attrs::LOCAL_POS1, "point3f", Value::Vec3(frame1.position / unit));
        prim.set(attrs::LOCAL_ROT1, "quatf", Value::Quat(frame1.rotation));

        match joint.joint_type {
            JointType::Revolute | JointType::Continuous => {
                prim.set_attribute(axis_attribute(axis_name));
                if joint.joint_type == JointType::Revolute && axis.has_limits() {
                    prim.set(attrs::LOWER_LIMIT, "float", Value::Double(axis.lower.to_degrees()));
                    prim.set(attrs::UPPER_LIMIT, "float", Value::Double(axis.upper.to_degrees()));
                }
                write_drive(prim, &axis, true);
            }
            JointType::Prismatic => {
                prim.set_attribute(axis_attribute(axis_name));
                if axis.has_limits() {
                    prim.set(attrs::LOWER_LIMIT, "float", Value::Double(axis.lower / unit));
                    prim.set(attrs::UPPER_LIMIT, "float", Value::Double(axis.upper / unit));
                }
                write_drive(prim, &axis, false);
            }
            _ => {}
        }
    }
}

fn axis_attribute(axis: &str) -> Attribute {
    Attribute::new(attrs::JOINT_AXIS, "token", Value::Token(axis.to_string())).uniform()
}

fn write_drive(prim: &mut sdfusd_usd::Prim, axis: &JointAxis, angular: bool) {
    if axis.effort <= 0.0 && axis.damping <= 0.0 && axis.stiffness <= 0.0 {
        return;
    }
    let (api, max_force, damping, stiffness) = if angular {
        (
            apis::DRIVE_ANGULAR,
            attrs::ANGULAR_MAX_FORCE,
            attrs::ANGULAR_DAMPING,
            attrs::ANGULAR_STIFFNESS,
        )
    } else {
        (
            apis::DRIVE_LINEAR,
            attrs::LINEAR_MAX_FORCE,
            attrs::LINEAR_DAMPING,
            attrs::LINEAR_STIFFNESS,
        )
    };
    prim.apply_api(api);
    if axis.effort > 0.0 {
        prim.set(max_force, "float", Value::Double(axis.effort));
    }
    prim.set(damping, "float", Value::Double(axis.damping));
    prim.set(stiffness, "float", Value::Double(axis.stiffness));
}
