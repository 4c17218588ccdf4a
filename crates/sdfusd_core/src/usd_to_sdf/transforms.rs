//! Pose and typed-attribute reading for the reverse walk.
//!
//! Values are converted to metres with the `metersPerUnit` of the document
//! that authored them, so a referenced centimetre asset placed by a metre
//! scene comes out right on both counts.

use std::f64::consts::FRAC_PI_2;

use sdfusd_math::{DMat4, DQuat, DVec2, DVec3, Pose};
use sdfusd_usd::tokens::attrs;
use sdfusd_usd::{UpAxis, Value, XformOp};

use super::SdfBuilder;
use crate::error::{UsdError, UsdErrors};
use crate::usd_data::ComposedPrim;

const INVERT_PREFIX: &str = "!invert!";

/// Local pose of `prim` and the scale its ops carried. A prim without ops is
/// at the identity.
pub(crate) fn read_xform(prim: &ComposedPrim<'_>, errors: &mut UsdErrors) -> (Pose, DVec3) {
    let order: Vec<String> = match prim.value(attrs::XFORM_OP_ORDER).map(Value::as_token_array) {
        Some(Some(ops)) => ops.to_vec(),
        Some(None) => {
            errors.push(UsdError::schema_mismatch(format!(
                "{} has a mistyped xformOpOrder",
                prim.path()
            )));
            declared_ops(prim)
        }
        None => declared_ops(prim),
    };

    let mut matrix = DMat4::IDENTITY;
    for entry in &order {
        let (name, invert) = match entry.strip_prefix(INVERT_PREFIX) {
            Some(name) => (name, true),
            None => (entry.as_str(), false),
        };
        let Some((value, owner)) = prim.authored_value(name) else {
            errors.push(UsdError::schema_mismatch(format!(
                "{} orders {} which is not authored",
                prim.path(),
                name
            )));
            continue;
        };
        match XformOp::from_attribute(name, value) {
            Ok(op) => {
                let mut m = op.to_matrix();
                let unit = owner.meters_per_unit();
                m.w_axis.x *= unit;
                m.w_axis.y *= unit;
                m.w_axis.z *= unit;
                if invert {
                    m = m.inverse();
                }
                matrix *= m;
            }
            Err(e) => errors.push(UsdError::schema_mismatch(format!("{}: {}", prim.path(), e))),
        }
    }
    Pose::from_matrix(&matrix)
}

fn declared_ops(prim: &ComposedPrim<'_>) -> Vec<String> {
    prim.attributes()
        .into_iter()
        .filter(|a| a.name.starts_with("xformOp:"))
        .map(|a| a.name.clone())
        .collect()
}

impl SdfBuilder<'_> {
    pub(crate) fn local_pose(&mut self, prim: &ComposedPrim<'_>) -> (Pose, DVec3) {
        let mut errors = UsdErrors::new();
        let result = read_xform(prim, &mut errors);
        for error in errors {
            self.error(error);
        }
        result
    }

    /// Rotation bringing a Y-up document's content into a Z-up world.
    pub(crate) fn up_axis_correction(&self, prim: &ComposedPrim<'_>) -> Pose {
        match prim.owner().up_axis() {
            UpAxis::Y => Pose::from_rotation(DQuat::from_rotation_x(FRAC_PI_2)),
            _ => Pose::IDENTITY,
        }
    }

    fn mistyped(&mut self, prim: &ComposedPrim<'_>, name: &str) {
        self.error(UsdError::schema_mismatch(format!(
            "{}.{} has an unexpected type",
            prim.path(),
            name
        )));
    }

    pub(crate) fn scalar(&mut self, prim: &ComposedPrim<'_>, name: &str) -> Option<f64> {
        let value = prim.value(name)?;
        let scalar = value.as_f64();
        if scalar.is_none() {
            self.mistyped(prim, name);
        }
        scalar
    }

    pub(crate) fn boolean(&mut self, prim: &ComposedPrim<'_>, name: &str) -> Option<bool> {
        let value = prim.value(name)?;
        let flag = value.as_bool();
        if flag.is_none() {
            self.mistyped(prim, name);
        }
        flag
    }

    pub(crate) fn vec2(&mut self, prim: &ComposedPrim<'_>, name: &str) -> Option<DVec2> {
        let value = prim.value(name)?;
        let v = value.as_vec2();
        if v.is_none() {
            self.mistyped(prim, name);
        }
        v
    }

    pub(crate) fn vec3(&mut self, prim: &ComposedPrim<'_>, name: &str) -> Option<DVec3> {
        let value = prim.value(name)?;
        let v = value.as_vec3();
        if v.is_none() {
            self.mistyped(prim, name);
        }
        v
    }

    pub(crate) fn quat(&mut self, prim: &ComposedPrim<'_>, name: &str) -> Option<DQuat> {
        let value = prim.value(name)?;
        let q = value.as_quat();
        if q.is_none() {
            self.mistyped(prim, name);
        }
        q.map(DQuat::normalize)
    }

    pub(crate) fn token<'p>(&mut self, prim: &ComposedPrim<'p>, name: &str) -> Option<&'p str> {
        let value = prim.value(name)?;
        let s = value.as_str();
        if s.is_none() {
            self.mistyped(prim, name);
        }
        s
    }

    /// `metersPerUnit` of the document authoring `name`, else of the owner.
    pub(crate) fn unit_of(&self, prim: &ComposedPrim<'_>, name: &str) -> f64 {
        prim.authored_value(name)
            .map(|(_, owner)| owner.meters_per_unit())
            .unwrap_or_else(|| prim.owner().meters_per_unit())
    }

    /// A length in metres; `fallback` is in stage units.
    pub(crate) fn length(&mut self, prim: &ComposedPrim<'_>, name: &str, fallback: f64) -> f64 {
        let unit = self.unit_of(prim, name);
        self.scalar(prim, name).unwrap_or(fallback) * unit
    }

    /// A point in metres.
    pub(crate) fn point(&mut self, prim: &ComposedPrim<'_>, name: &str) -> Option<DVec3> {
        let unit = self.unit_of(prim, name);
        self.vec3(prim, name).map(|v| v * unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UsdErrorKind;
    use crate::usd_data::UsdData;

    fn load(text: &str) -> (tempfile::TempDir, UsdData) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xform.usda");
        std::fs::write(&path, text).unwrap();
        let mut data = UsdData::new(&path);
        assert!(data.init().is_empty());
        (dir, data)
    }

    #[test]
    fn test_ops_follow_order_and_units() {
        let (_dir, data) = load(
            r#"#usda 1.0
(
    metersPerUnit = 0.01
)

def Xform "a"
{
    double3 xformOp:translate = (100, 0, 0)
    float xformOp:rotateZ = 90
    double3 xformOp:scale = (2, 2, 2)
    uniform token[] xformOpOrder = ["xformOp:translate", "xformOp:rotateZ", "xformOp:scale"]
}
"#,
        );
        let mut errors = UsdErrors::new();
        let (pose, scale) = read_xform(&data.prim("/a").unwrap(), &mut errors);
        assert!(errors.is_empty());
        assert!(pose.position.abs_diff_eq(DVec3::X, 1e-12));
        assert!((pose.rotation * DVec3::X).abs_diff_eq(DVec3::Y, 1e-12));
        assert!(scale.abs_diff_eq(DVec3::splat(2.0), 1e-12));
    }

    #[test]
    fn test_invert_and_declaration_order() {
        let (_dir, data) = load(
            r#"#usda 1.0

def Xform "inverted"
{
    double3 xformOp:translate = (1, 2, 3)
    uniform token[] xformOpOrder = ["!invert!xformOp:translate"]
}

def Xform "unordered"
{
    double3 xformOp:translate = (0, 0, 1)
    quatd xformOp:orient = (0.7071067811865476, 0, 0, 0.7071067811865476)
}
"#,
        );
        let mut errors = UsdErrors::new();
        let (pose, _) = read_xform(&data.prim("/inverted").unwrap(), &mut errors);
        assert!(pose.position.abs_diff_eq(DVec3::new(-1.0, -2.0, -3.0), 1e-12));

        let (pose, _) = read_xform(&data.prim("/unordered").unwrap(), &mut errors);
        assert!(errors.is_empty());
        assert!(pose.position.abs_diff_eq(DVec3::Z, 1e-12));
        assert!((pose.rotation * DVec3::X).abs_diff_eq(DVec3::Y, 1e-9));
    }

    #[test]
    fn test_mistyped_op_is_skipped() {
        let (_dir, data) = load(
            r#"#usda 1.0

def Xform "bad"
{
    double3 xformOp:translate = (1, 0, 0)
    string xformOp:orient = "sideways"
    uniform token[] xformOpOrder = ["xformOp:translate", "xformOp:orient", "xformOp:scale"]
}
"#,
        );
        let mut errors = UsdErrors::new();
        let (pose, _) = read_xform(&data.prim("/bad").unwrap(), &mut errors);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == UsdErrorKind::SchemaMismatch));
        assert!(pose.abs_diff_eq(&Pose::from_translation(DVec3::X), 1e-12));
    }
}
