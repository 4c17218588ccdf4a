//! USDA (ASCII) writer.

use std::fmt::Write;

use crate::stage::Stage;
use crate::text::quote;
use crate::types::{Prim, Reference, ReferenceKind};
use crate::value::Value;

const INDENT: &str = "    ";

/// Serializes a [`Stage`] to `.usda` text.
pub struct UsdaWriter<'a> {
    stage: &'a Stage,
    out: String,
}

impl<'a> UsdaWriter<'a> {
    pub fn new(stage: &'a Stage) -> Self {
        Self {
            stage,
            out: String::new(),
        }
    }

    pub fn write(mut self) -> String {
        self.write_header();
        let stage = self.stage;
        for prim in stage.root_prims() {
            self.out.push('\n');
            self.write_prim(prim, 0);
        }
        self.out
    }

    fn write_header(&mut self) {
        let stage = self.stage;
        self.out.push_str("#usda 1.0\n(\n");
        if let Some(default_prim) = &stage.default_prim {
            let _ = writeln!(self.out, "{}defaultPrim = {}", INDENT, quote(default_prim));
        }
        if let Some(doc) = &stage.doc {
            let _ = writeln!(self.out, "{}doc = \"\"\"{}\"\"\"", INDENT, doc);
        }
        let _ = writeln!(
            self.out,
            "{}metersPerUnit = {}",
            INDENT,
            Value::Double(stage.meters_per_unit).to_usda()
        );
        let _ = writeln!(self.out, "{}upAxis = {}", INDENT, quote(stage.up_axis.as_str()));
        self.out.push_str(")\n");
    }

    fn write_prim(&mut self, prim: &Prim, depth: usize) {
        let pad = INDENT.repeat(depth);
        let inner = INDENT.repeat(depth + 1);

        let _ = write!(self.out, "{}{} ", pad, prim.specifier.as_str());
        if !prim.type_name.is_empty() {
            let _ = write!(self.out, "{} ", prim.type_name);
        }
        self.out.push_str(&quote(&prim.name));

        let metadata = prim_metadata(prim);
        if metadata.is_empty() {
            self.out.push('\n');
        } else {
            self.out.push_str(" (\n");
            for line in metadata {
                let _ = writeln!(self.out, "{}{}", inner, line);
            }
            let _ = writeln!(self.out, "{})", pad);
        }
        let _ = writeln!(self.out, "{}{{", pad);

        for attribute in &prim.attributes {
            let mut decl = String::new();
            if attribute.custom {
                decl.push_str("custom ");
            }
            if attribute.uniform {
                decl.push_str("uniform ");
            }
            let _ = write!(decl, "{} {}", attribute.type_name, attribute.name);

            match &attribute.value {
                Some(value) => {
                    let _ = writeln!(self.out, "{}{} = {}", inner, decl, value.to_usda());
                }
                None if attribute.connections.is_empty() => {
                    let _ = writeln!(self.out, "{}{}", inner, decl);
                }
                None => {}
            }
            if !attribute.connections.is_empty() {
                let _ = writeln!(
                    self.out,
                    "{}{}.connect = {}",
                    inner,
                    decl,
                    format_targets(&attribute.connections)
                );
            }
        }

        for relationship in &prim.relationships {
            let custom = if relationship.custom { "custom " } else { "" };
            if relationship.targets.is_empty() {
                let _ = writeln!(self.out, "{}{}rel {}", inner, custom, relationship.name);
            } else {
                let _ = writeln!(
                    self.out,
                    "{}{}rel {} = {}",
                    inner,
                    custom,
                    relationship.name,
                    format_targets(&relationship.targets)
                );
            }
        }

        let stage = self.stage;
        let children = stage.children(&prim.path);
        for (i, child) in children.into_iter().enumerate() {
            if i > 0 || !prim.attributes.is_empty() || !prim.relationships.is_empty() {
                self.out.push('\n');
            }
            self.write_prim(child, depth + 1);
        }

        let _ = writeln!(self.out, "{}}}", pad);
    }
}

fn prim_metadata(prim: &Prim) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(kind) = &prim.kind {
        lines.push(format!("kind = {}", quote(kind)));
    }
    if !prim.api_schemas.is_empty() {
        let apis: Vec<String> = prim.api_schemas.iter().map(|a| quote(a)).collect();
        lines.push(format!("prepend apiSchemas = [{}]", apis.join(", ")));
    }
    for (kind, key) in [
        (ReferenceKind::Reference, "references"),
        (ReferenceKind::Payload, "payload"),
    ] {
        let arcs: Vec<String> = prim
            .references
            .iter()
            .filter(|r| r.kind == kind)
            .map(format_reference)
            .collect();
        match arcs.len() {
            0 => {}
            1 => lines.push(format!("prepend {} = {}", key, arcs[0])),
            _ => lines.push(format!("prepend {} = [{}]", key, arcs.join(", "))),
        }
    }
    lines
}

fn format_reference(reference: &Reference) -> String {
    let mut out = String::new();
    if !reference.asset_path.is_empty() {
        let _ = write!(out, "@{}@", reference.asset_path);
    }
    if let Some(prim_path) = &reference.prim_path {
        let _ = write!(out, "<{}>", prim_path);
    }
    out
}

fn format_targets(targets: &[String]) -> String {
    if targets.len() == 1 {
        format!("<{}>", targets[0])
    } else {
        let parts: Vec<String> = targets.iter().map(|t| format!("<{}>", t)).collect();
        format!("[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_usda;
    use crate::types::{Attribute, UpAxis};
    use approx::assert_relative_eq;
    use glam::{DQuat, DVec3};

    fn sample_stage() -> Stage {
        let mut stage = Stage::create_in_memory();
        stage.default_prim = Some("world".into());
        stage.meters_per_unit = 0.01;
        stage.up_axis = UpAxis::Y;

        let world = stage.define_prim("/world", "Xform").unwrap();
        world.set("xformOp:translate", "double3", Value::Vec3(DVec3::new(0.0, 0.0, 2.5)));
        world.set_attribute(
            Attribute::new(
                "xformOpOrder",
                "token[]",
                Value::TokenArray(vec!["xformOp:translate".into()]),
            )
            .uniform(),
        );

        let link = stage.define_prim("/world/link", "Cube").unwrap();
        link.apply_api("PhysicsRigidBodyAPI");
        link.apply_api("MaterialBindingAPI");
        link.set_relationship("material:binding", vec!["/Looks/M".into()]);
        link.set_attribute(Attribute::new("sdf:uri", "asset", Value::Asset("mesh.dae".into())).custom());
        link.add_reference(Reference {
            kind: ReferenceKind::Reference,
            asset_path: "./other.usda".into(),
            prim_path: Some("/Other".into()),
        });

        let shader = stage.define_prim("/Looks/M/Shader", "Shader").unwrap();
        shader.connect("inputs:diffuseColor", "color3f", "/Looks/M/Tex.outputs:rgb".into());
        stage
    }

    #[test]
    fn test_header() {
        let text = sample_stage().export_to_string();
        assert!(text.starts_with("#usda 1.0\n(\n"));
        assert!(text.contains("defaultPrim = \"world\""));
        assert!(text.contains("metersPerUnit = 0.01"));
        assert!(text.contains("upAxis = \"Y\""));
    }

    #[test]
    fn test_written_stage_reads_back() {
        let stage = sample_stage();
        let text = stage.export_to_string();
        let back = parse_usda(&text).unwrap();

        assert_eq!(back.default_prim.as_deref(), Some("world"));
        assert_eq!(back.up_axis, UpAxis::Y);
        assert_relative_eq!(back.meters_per_unit, 0.01);

        let world = back.prim("/world").unwrap();
        assert_eq!(
            world.value("xformOp:translate"),
            Some(&Value::Vec3(DVec3::new(0.0, 0.0, 2.5)))
        );
        assert!(world.attribute("xformOpOrder").unwrap().uniform);

        let link = back.prim("/world/link").unwrap();
        assert_eq!(link.type_name, "Cube");
        assert_eq!(link.api_schemas, vec!["PhysicsRigidBodyAPI", "MaterialBindingAPI"]);
        assert_eq!(link.relationship("material:binding").unwrap().targets, vec!["/Looks/M"]);
        assert!(link.attribute("sdf:uri").unwrap().custom);
        assert_eq!(link.references[0].asset_path, "./other.usda");
        assert_eq!(link.references[0].prim_path.as_deref(), Some("/Other"));

        let shader = back.prim("/Looks/M/Shader").unwrap();
        assert_eq!(
            shader.attribute("inputs:diffuseColor").unwrap().connections,
            vec!["/Looks/M/Tex.outputs:rgb"]
        );
        assert_eq!(back.prim_count(), stage.prim_count());
    }

    #[test]
    fn test_export_and_open_file() {
        let mut stage = sample_stage();
        let rotation = DQuat::from_rotation_z(0.3);
        let world = stage.prim_mut("/world").unwrap();
        world.set("xformOp:orient", "quatd", Value::Quat(rotation));
        world.set("physics:mass", "float", Value::Double(1.0 / 3.0));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.usda");
        stage.export(&path).unwrap();
        let back = Stage::open(&path).unwrap();

        let world = back.prim("/world").unwrap();
        let orient = world.value("xformOp:orient").and_then(Value::as_quat).unwrap();
        assert!(orient.abs_diff_eq(rotation, 1e-12));
        let mass = world.value("physics:mass").and_then(Value::as_f64).unwrap();
        assert_relative_eq!(mass, 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(back.prim_count(), stage.prim_count());
    }
}
