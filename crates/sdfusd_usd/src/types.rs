//! Scene-graph object model.
//!
//! A stage is an arena of [`Prim`]s; prims carry their authored attributes,
//! relationships and composition arcs exactly as read from (or written to) a
//! `.usda` document.

use std::fmt;
use std::str::FromStr;

use glam::{DMat4, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Prim specifier (`def`, `over` or `class`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Specifier {
    #[default]
    Def,
    Over,
    Class,
}

impl Specifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Specifier::Def => "def",
            Specifier::Over => "over",
            Specifier::Class => "class",
        }
    }
}

/// Stage up axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpAxis {
    X,
    Y,
    #[default]
    Z,
}

impl UpAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpAxis::X => "X",
            UpAxis::Y => "Y",
            UpAxis::Z => "Z",
        }
    }
}

impl fmt::Display for UpAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" | "x" => Ok(UpAxis::X),
            "Y" | "y" => Ok(UpAxis::Y),
            "Z" | "z" => Ok(UpAxis::Z),
            other => Err(format!("unknown up axis '{}'", other)),
        }
    }
}

/// An authored attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attribute {
    pub name: String,
    /// Declared type, e.g. `double3` or `token[]`.
    pub type_name: String,
    /// `None` when only declared or connected.
    pub value: Option<Value>,
    pub uniform: bool,
    pub custom: bool,
    /// `.connect` targets (`/Looks/M/Tex.outputs:rgb`).
    pub connections: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn uniform(mut self) -> Self {
        self.uniform = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }
}

/// An authored relationship (`rel material:binding = </Looks/M>`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relationship {
    pub name: String,
    pub targets: Vec<String>,
    pub custom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceKind {
    #[default]
    Reference,
    Payload,
}

/// A composition arc pulling another document (or prim) under this prim.
/// Syntax: `references = @path/to/file.usda@</PrimPath>`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Empty for an internal reference.
    pub asset_path: String,
    pub prim_path: Option<String>,
}

/// A prim in a stage arena.
#[derive(Debug, Clone, Default)]
pub struct Prim {
    pub path: String,
    pub name: String,
    pub specifier: Specifier,
    /// Empty for untyped prims.
    pub type_name: String,
    pub api_schemas: Vec<String>,
    pub kind: Option<String>,
    pub references: Vec<Reference>,
    pub attributes: Vec<Attribute>,
    pub relationships: Vec<Relationship>,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
}

impl Prim {
    pub(crate) fn new(path: String, name: String, parent: Option<usize>) -> Self {
        Self {
            path,
            name,
            parent,
            ..Default::default()
        }
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }

    pub fn has_api(&self, api: &str) -> bool {
        self.api_schemas.iter().any(|a| a == api)
    }

    pub fn apply_api(&mut self, api: &str) {
        if !self.has_api(api) {
            self.api_schemas.push(api.to_string());
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Authored value of `name`, if any.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.attribute(name).and_then(|a| a.value.as_ref())
    }

    /// Add or replace an attribute, keeping declaration order.
    pub fn set_attribute(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Shorthand for a varying, non-custom attribute.
    pub fn set(&mut self, name: &str, type_name: &str, value: Value) {
        self.set_attribute(Attribute::new(name, type_name, value));
    }

    /// Connect `name` to `target` (an attribute path), declaring it if needed.
    pub fn connect(&mut self, name: &str, type_name: &str, target: String) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.connections = vec![target],
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                type_name: type_name.to_string(),
                connections: vec![target],
                ..Default::default()
            }),
        }
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn set_relationship(&mut self, name: &str, targets: Vec<String>) {
        match self.relationships.iter_mut().find(|r| r.name == name) {
            Some(existing) => existing.targets = targets,
            None => self.relationships.push(Relationship {
                name: name.to_string(),
                targets,
                custom: false,
            }),
        }
    }

    pub fn add_reference(&mut self, reference: Reference) {
        self.references.push(reference);
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Order of the three rotations of a `rotateXYZ`-style op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOrder {
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl RotationOrder {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "XYZ" => Some(RotationOrder::Xyz),
            "XZY" => Some(RotationOrder::Xzy),
            "YXZ" => Some(RotationOrder::Yxz),
            "YZX" => Some(RotationOrder::Yzx),
            "ZXY" => Some(RotationOrder::Zxy),
            "ZYX" => Some(RotationOrder::Zyx),
            _ => None,
        }
    }
}

/// A single transform operation.
#[derive(Debug, Clone, PartialEq)]
pub enum XformOp {
    Translate(DVec3),
    Orient(DQuat),
    /// Degrees about one axis.
    RotateX(f64),
    RotateY(f64),
    RotateZ(f64),
    /// Degrees; the first letter of the order is applied first.
    Rotate3(RotationOrder, DVec3),
    Scale(DVec3),
    Transform(DMat4),
}

impl XformOp {
    /// Interpret an `xformOp:` attribute. `op_name` may carry a `:suffix`.
    pub fn from_attribute(op_name: &str, value: &Value) -> Result<XformOp, String> {
        let kind = op_name
            .strip_prefix("xformOp:")
            .ok_or_else(|| format!("'{}' is not an xformOp", op_name))?;
        let kind = kind.split(':').next().unwrap_or(kind);
        let mismatch = || format!("{} has an unexpected value type", op_name);

        match kind {
            "translate" => value.as_vec3().map(XformOp::Translate).ok_or_else(mismatch),
            "orient" => value.as_quat().map(XformOp::Orient).ok_or_else(mismatch),
            "scale" => value.as_vec3().map(XformOp::Scale).ok_or_else(mismatch),
            "transform" => value.as_matrix4().map(XformOp::Transform).ok_or_else(mismatch),
            "rotateX" => value.as_f64().map(XformOp::RotateX).ok_or_else(mismatch),
            "rotateY" => value.as_f64().map(XformOp::RotateY).ok_or_else(mismatch),
            "rotateZ" => value.as_f64().map(XformOp::RotateZ).ok_or_else(mismatch),
            other => match other.strip_prefix("rotate").and_then(RotationOrder::from_suffix) {
                Some(order) => value
                    .as_vec3()
                    .map(|v| XformOp::Rotate3(order, v))
                    .ok_or_else(mismatch),
                None => Err(format!("unsupported xformOp '{}'", op_name)),
            },
        }
    }

    /// Convert this operation to a transformation matrix.
    pub fn to_matrix(&self) -> DMat4 {
        match self {
            XformOp::Translate(t) => DMat4::from_translation(*t),
            XformOp::Orient(q) => DMat4::from_quat(q.normalize()),
            XformOp::RotateX(deg) => DMat4::from_rotation_x(deg.to_radians()),
            XformOp::RotateY(deg) => DMat4::from_rotation_y(deg.to_radians()),
            XformOp::RotateZ(deg) => DMat4::from_rotation_z(deg.to_radians()),
            XformOp::Rotate3(order, deg) => {
                let (x, y, z) = (deg.x.to_radians(), deg.y.to_radians(), deg.z.to_radians());
                let q = match order {
                    RotationOrder::Xyz => DQuat::from_euler(EulerRot::ZYX, z, y, x),
                    RotationOrder::Xzy => DQuat::from_euler(EulerRot::YZX, y, z, x),
                    RotationOrder::Yxz => DQuat::from_euler(EulerRot::ZXY, z, x, y),
                    RotationOrder::Yzx => DQuat::from_euler(EulerRot::XZY, x, z, y),
                    RotationOrder::Zxy => DQuat::from_euler(EulerRot::YXZ, y, x, z),
                    RotationOrder::Zyx => DQuat::from_euler(EulerRot::XYZ, x, y, z),
                };
                DMat4::from_quat(q)
            }
            XformOp::Scale(s) => DMat4::from_scale(*s),
            XformOp::Transform(m) => *m,
        }
    }
}

/// Combine a list of xformOps into a single matrix.
pub fn compose_xform_ops(ops: &[XformOp]) -> DMat4 {
    let mut result = DMat4::IDENTITY;
    for op in ops {
        result *= op.to_matrix();
    }
    result
}
