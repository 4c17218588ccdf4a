//! Typed attribute values.
//!
//! Only the value shapes the converter needs are modelled. Anything else keeps
//! its literal text in [`Value::Raw`] so that a stage can be written back out
//! without losing data.

use glam::{DMat4, DQuat, DVec2, DVec3};

use crate::text::{quote, split_top_level, strip_enclosing, unquote};

/// An authored attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Token(String),
    String(String),
    Asset(String),
    Vec2(DVec2),
    Vec3(DVec3),
    /// Stored as a glam quaternion; USDA literals are `(w, x, y, z)`.
    Quat(DQuat),
    Matrix4(DMat4),
    IntArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    Vec3Array(Vec<DVec3>),
    TokenArray(Vec<String>),
    /// Literal text of a value whose type is not modelled.
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueClass {
    Bool,
    Int,
    Scalar,
    Token,
    String,
    Asset,
    Vec2,
    Vec3,
    Quat,
    Matrix4,
    Other,
}

fn class_of(type_name: &str) -> ValueClass {
    match type_name {
        "bool" => ValueClass::Bool,
        "int" | "int64" | "uint" | "uint64" | "uchar" => ValueClass::Int,
        "float" | "double" | "half" | "timecode" => ValueClass::Scalar,
        "token" => ValueClass::Token,
        "string" => ValueClass::String,
        "asset" => ValueClass::Asset,
        "float2" | "double2" | "half2" | "texCoord2f" | "texCoord2d" => ValueClass::Vec2,
        "float3" | "double3" | "half3" | "point3f" | "point3d" | "vector3f" | "vector3d"
        | "normal3f" | "normal3d" | "color3f" | "color3d" | "texCoord3f" => ValueClass::Vec3,
        "quatf" | "quatd" | "quath" => ValueClass::Quat,
        "matrix4d" => ValueClass::Matrix4,
        _ => ValueClass::Other,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

fn parse_tuple(s: &str) -> Option<Vec<f64>> {
    let inner = strip_enclosing(s, '(', ')')?;
    split_top_level(inner, ',').into_iter().map(parse_number).collect()
}

fn parse_vec3(s: &str) -> Option<DVec3> {
    match parse_tuple(s)?.as_slice() {
        [x, y, z] => Some(DVec3::new(*x, *y, *z)),
        _ => None,
    }
}

fn parse_single(class: ValueClass, text: &str) -> Option<Value> {
    match class {
        ValueClass::Bool => match text {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        ValueClass::Int => text.parse::<i64>().ok().map(Value::Int),
        ValueClass::Scalar => parse_number(text).map(Value::Double),
        ValueClass::Token => Some(Value::Token(unquote(text))),
        ValueClass::String => Some(Value::String(unquote(text))),
        ValueClass::Asset => strip_enclosing(text, '@', '@').map(|p| Value::Asset(p.to_string())),
        ValueClass::Vec2 => match parse_tuple(text)?.as_slice() {
            [x, y] => Some(Value::Vec2(DVec2::new(*x, *y))),
            _ => None,
        },
        ValueClass::Vec3 => parse_vec3(text).map(Value::Vec3),
        ValueClass::Quat => match parse_tuple(text)?.as_slice() {
            [w, x, y, z] => Some(Value::Quat(DQuat::from_xyzw(*x, *y, *z, *w))),
            _ => None,
        },
        ValueClass::Matrix4 => {
            let rows = split_top_level(strip_enclosing(text, '(', ')')?, ',')
                .into_iter()
                .map(parse_tuple)
                .collect::<Option<Vec<_>>>()?;
            if rows.len() != 4 || rows.iter().any(|r| r.len() != 4) {
                return None;
            }
            let mut cols = [[0.0; 4]; 4];
            for (i, row) in rows.iter().enumerate() {
                cols[i].copy_from_slice(row);
            }
            // USD rows are glam columns (row-vector convention).
            Some(Value::Matrix4(DMat4::from_cols_array_2d(&cols)))
        }
        ValueClass::Other => None,
    }
}

fn format_number(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        format!("{}", v)
    }
}

fn format_tuple(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format_number(*v)).collect();
    format!("({})", parts.join(", "))
}

impl Value {
    /// Parse literal `text` for an attribute declared as `type_name`.
    ///
    /// Returns `None` for `None` (a blocked value). Text that does not match
    /// the declared type comes back as [`Value::Raw`].
    pub fn parse(type_name: &str, text: &str) -> Option<Value> {
        let text = text.trim();
        if text.is_empty() || text == "None" {
            return None;
        }
        let raw = || Value::Raw(text.to_string());

        if let Some(base) = type_name.strip_suffix("[]") {
            let Some(inner) = strip_enclosing(text, '[', ']') else {
                return Some(raw());
            };
            let items = split_top_level(inner, ',');
            let parsed = match class_of(base) {
                ValueClass::Int => items
                    .iter()
                    .map(|s| s.parse::<i64>().ok())
                    .collect::<Option<Vec<_>>>()
                    .map(Value::IntArray),
                ValueClass::Scalar => items
                    .iter()
                    .map(|s| parse_number(s))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::DoubleArray),
                ValueClass::Vec3 => items
                    .iter()
                    .map(|s| parse_vec3(s))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Vec3Array),
                ValueClass::Token | ValueClass::String => {
                    Some(Value::TokenArray(items.iter().map(|s| unquote(s)).collect()))
                }
                _ => None,
            };
            return Some(parsed.unwrap_or_else(raw));
        }

        Some(parse_single(class_of(type_name), text).unwrap_or_else(raw))
    }

    /// Render the value as a USDA literal.
    pub fn to_usda(&self) -> String {
        match self {
            Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => format_number(*d),
            Value::Token(s) | Value::String(s) => quote(s),
            Value::Asset(p) => format!("@{}@", p),
            Value::Vec2(v) => format_tuple(&v.to_array()),
            Value::Vec3(v) => format_tuple(&v.to_array()),
            Value::Quat(q) => format_tuple(&[q.w, q.x, q.y, q.z]),
            Value::Matrix4(m) => {
                let rows: Vec<String> = m.to_cols_array_2d().iter().map(|r| format_tuple(r)).collect();
                format!("( {} )", rows.join(", "))
            }
            Value::IntArray(a) => {
                let parts: Vec<String> = a.iter().map(i64::to_string).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::DoubleArray(a) => {
                let parts: Vec<String> = a.iter().map(|v| format_number(*v)).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Vec3Array(a) => {
                let parts: Vec<String> = a.iter().map(|v| format_tuple(&v.to_array())).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::TokenArray(a) => {
                let parts: Vec<String> = a.iter().map(|s| quote(s)).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Raw(text) => text.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Token, string or asset text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Token(s) | Value::String(s) | Value::Asset(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_asset(&self) -> Option<&str> {
        match self {
            Value::Asset(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<DVec2> {
        match self {
            Value::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<DVec3> {
        match self {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_quat(&self) -> Option<DQuat> {
        match self {
            Value::Quat(q) => Some(*q),
            _ => None,
        }
    }

    pub fn as_matrix4(&self) -> Option<DMat4> {
        match self {
            Value::Matrix4(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_vec3_array(&self) -> Option<&[DVec3]> {
        match self {
            Value::Vec3Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_token_array(&self) -> Option<&[String]> {
        match self {
            Value::TokenArray(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Value::parse("float", "0.01"), Some(Value::Double(0.01)));
        assert_eq!(Value::parse("int", "3"), Some(Value::Int(3)));
        assert_eq!(Value::parse("bool", "true"), Some(Value::Bool(true)));
        assert_eq!(Value::parse("token", "\"Z\""), Some(Value::Token("Z".into())));
        assert_eq!(Value::parse("double", "None"), None);
    }

    #[test]
    fn test_parse_quat_is_wxyz() {
        let value = Value::parse("quatf", "(1, 0, 0, 0)").unwrap();
        assert_eq!(value.as_quat(), Some(DQuat::IDENTITY));
    }

    #[test]
    fn test_parse_asset() {
        let value = Value::parse("asset", "@materials/textures/FANS_Albedo.png@").unwrap();
        assert_eq!(value.as_asset(), Some("materials/textures/FANS_Albedo.png"));
    }

    #[test]
    fn test_parse_matrix_translation_in_last_row() {
        let text = "( (1, 0, 0, 0), (0, 1, 0, 0), (0, 0, 1, 0), (4, 5, 6, 1) )";
        let m = Value::parse("matrix4d", text).unwrap().as_matrix4().unwrap();
        assert_eq!(m.transform_point3(DVec3::ZERO), DVec3::new(4.0, 5.0, 6.0));
        assert_eq!(Value::Matrix4(m).to_usda(), text);
    }

    #[test]
    fn test_parse_arrays() {
        let value = Value::parse("token[]", r#"["xformOp:translate", "xformOp:orient"]"#).unwrap();
        assert_eq!(
            value.as_token_array().unwrap(),
            &["xformOp:translate".to_string(), "xformOp:orient".to_string()]
        );
        let value = Value::parse("color3f[]", "[(0.5, 0.5, 0.5)]").unwrap();
        assert_eq!(value.as_vec3_array().unwrap(), &[DVec3::splat(0.5)]);
    }

    #[test]
    fn test_mismatched_text_is_raw() {
        assert_eq!(
            Value::parse("float3", "(1, 2)"),
            Some(Value::Raw("(1, 2)".into()))
        );
        assert_eq!(Value::parse("float", "\"x\"").unwrap().as_f64(), None);
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(Value::Vec3(DVec3::new(0.0, 0.0, 2.5)).to_usda(), "(0, 0, 2.5)");
        assert_eq!(Value::Double(f64::INFINITY).to_usda(), "inf");
        assert_eq!(Value::Quat(DQuat::IDENTITY).to_usda(), "(1, 0, 0, 0)");
    }
}
