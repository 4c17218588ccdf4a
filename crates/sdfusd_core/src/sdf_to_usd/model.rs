use std::collections::HashMap;

use sdfusd_math::Pose;
use sdfusd_sdf::Model;
use sdfusd_usd::tokens::types;

use super::UsdBuilder;

impl UsdBuilder<'_> {
    /// Write `model` at `path`. `parent_pose` places the parent frame in the
    /// world and is used for joints attached to the world.
    pub(crate) fn parse_model(&mut self, model: &Model, path: &str, parent_pose: &Pose) {
        self.parse_model_at(model, path, parent_pose, model.pose);
    }

    /// Write `model` with `pose` authored in place of its own.
    pub(crate) fn parse_model_at(&mut self, model: &Model, path: &str, parent_pose: &Pose, pose: Pose) {
        log::debug!("Converting model '{}' to {}", model.name, path);
        if self.define(path, types::XFORM).is_none() {
            return;
        }
        self.set_transform(path, &pose, None);
        let model_pose = *parent_pose * pose;

        let mut link_paths = HashMap::new();
        for link in &model.links {
            let link_path = self.child_path(path, &link.name);
            self.parse_link(link, &link_path, model.is_static);
            link_paths.insert(link.name.clone(), link_path);
        }

        for nested in &model.models {
            let nested_path = self.child_path(path, &nested.name);
            self.parse_model(nested, &nested_path, &model_pose);
        }

        for joint in &model.joints {
            self.parse_joint(joint, model, path, &model_pose, &link_paths);
        }
    }
}
