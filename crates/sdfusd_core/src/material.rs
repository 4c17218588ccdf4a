//! Material translation between physics-description materials, the generic
//! render material, and `UsdPreviewSurface` shading networks.

use sdfusd_math::DVec3;
use sdfusd_sdf::{Color, Material, Pbr, PbrWorkflow, PbrWorkflowType};
use sdfusd_usd::path::{append_child, prim_part};
use sdfusd_usd::tokens::{attrs, shading, types};
use sdfusd_usd::{Attribute, Prim, Stage, Value};

use crate::error::{UsdError, UsdErrors};

/// Name of the surface shader written under every material.
pub const SURFACE_SHADER: &str = "PreviewSurface";

/// PBR parameters of a [`GenericMaterial`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenericPbr {
    pub workflow: PbrWorkflowType,
    pub metalness: f64,
    pub roughness: f64,
    pub glossiness: f64,
    pub albedo_map: Option<String>,
    pub normal_map: Option<String>,
    pub metalness_map: Option<String>,
    pub roughness_map: Option<String>,
    pub glossiness_map: Option<String>,
    pub specular_map: Option<String>,
    pub emissive_map: Option<String>,
}

impl GenericPbr {
    pub fn new(workflow: PbrWorkflowType) -> Self {
        let defaults = PbrWorkflow::default();
        Self {
            workflow,
            metalness: defaults.metalness,
            roughness: defaults.roughness,
            glossiness: defaults.glossiness,
            albedo_map: None,
            normal_map: None,
            metalness_map: None,
            roughness_map: None,
            glossiness_map: None,
            specular_map: None,
            emissive_map: None,
        }
    }

    fn from_workflow(kind: PbrWorkflowType, w: &PbrWorkflow) -> Self {
        Self {
            workflow: kind,
            metalness: w.metalness,
            roughness: w.roughness,
            glossiness: w.glossiness,
            albedo_map: w.albedo_map.clone(),
            normal_map: w.normal_map.clone(),
            metalness_map: w.metalness_map.clone(),
            roughness_map: w.roughness_map.clone(),
            glossiness_map: w.glossiness_map.clone(),
            specular_map: w.specular_map.clone(),
            emissive_map: w.emissive_map.clone(),
        }
    }

    fn to_workflow(&self) -> PbrWorkflow {
        PbrWorkflow {
            albedo_map: self.albedo_map.clone(),
            normal_map: self.normal_map.clone(),
            metalness_map: self.metalness_map.clone(),
            roughness_map: self.roughness_map.clone(),
            glossiness_map: self.glossiness_map.clone(),
            specular_map: self.specular_map.clone(),
            emissive_map: self.emissive_map.clone(),
            metalness: self.metalness,
            roughness: self.roughness,
            glossiness: self.glossiness,
        }
    }
}

/// Flat render material, as produced by mesh loaders.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericMaterial {
    pub name: String,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub emissive: Color,
    pub shininess: f64,
    pub transparency: f64,
    pub texture_image: Option<String>,
    pub pbr: Option<GenericPbr>,
}

impl Default for GenericMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Color::BLACK,
            diffuse: Color::BLACK,
            specular: Color::BLACK,
            emissive: Color::BLACK,
            shininess: 0.0,
            transparency: 0.0,
            texture_image: None,
            pbr: None,
        }
    }
}

impl From<&GenericMaterial> for Material {
    fn from(generic: &GenericMaterial) -> Self {
        let mut material = Material {
            ambient: generic.ambient,
            diffuse: generic.diffuse,
            specular: generic.specular,
            emissive: generic.emissive,
            ..Default::default()
        };

        let mut pbr = Pbr::default();
        if let Some(generic_pbr) = &generic.pbr {
            pbr.set_workflow(generic_pbr.workflow, generic_pbr.to_workflow());
        }
        if let Some(texture) = &generic.texture_image {
            match pbr.workflow_mut(PbrWorkflowType::Metal) {
                Some(metal) => {
                    if metal.albedo_map.is_none() {
                        metal.albedo_map = Some(texture.clone());
                    }
                }
                None => pbr.set_workflow(
                    PbrWorkflowType::Metal,
                    PbrWorkflow {
                        albedo_map: Some(texture.clone()),
                        ..Default::default()
                    },
                ),
            }
        }
        if !pbr.is_empty() {
            material.pbr = Some(pbr);
        }
        material
    }
}

impl From<&Material> for GenericMaterial {
    fn from(material: &Material) -> Self {
        let pbr = material.pbr.as_ref().and_then(|pbr| {
            [PbrWorkflowType::Metal, PbrWorkflowType::Specular]
                .into_iter()
                .find_map(|kind| pbr.workflow(kind).map(|w| GenericPbr::from_workflow(kind, w)))
        });
        Self {
            ambient: material.ambient,
            diffuse: material.diffuse,
            specular: material.specular,
            emissive: material.emissive,
            texture_image: pbr.as_ref().and_then(|p| p.albedo_map.clone()),
            pbr,
            ..Default::default()
        }
    }
}

/// A `UsdUVTexture` shader feeding one surface input.
struct TextureLink {
    name: &'static str,
    file: String,
    input: &'static str,
    input_type: &'static str,
    output: &'static str,
}

impl TextureLink {
    fn new(
        name: &'static str,
        file: String,
        input: &'static str,
        input_type: &'static str,
        output: &'static str,
    ) -> Self {
        Self {
            name,
            file,
            input,
            input_type,
            output,
        }
    }
}

/// Write `material` as a `Material` prim at `path` with a preview-surface
/// network. Texture maps become `UsdUVTexture` shaders connected to the
/// surface inputs.
pub fn to_scene_material(material: &Material, stage: &mut Stage, path: &str) -> UsdErrors {
    let mut errors = UsdErrors::new();
    let shader_path = append_child(path, SURFACE_SHADER);

    match stage.define_prim(path, types::MATERIAL) {
        Ok(prim) => prim.connect(
            attrs::SURFACE_OUTPUT,
            "token",
            format!("{}.{}", shader_path, attrs::SURFACE_OUTPUT),
        ),
        Err(e) => {
            errors.push(e.into());
            return errors;
        }
    }

    let mut textures: Vec<TextureLink> = Vec::new();
    {
        let shader = match stage.define_prim(&shader_path, types::SHADER) {
            Ok(shader) => shader,
            Err(e) => {
                errors.push(e.into());
                return errors;
            }
        };
        shader.set_attribute(
            Attribute::new(attrs::INFO_ID, "token", Value::Token(shading::PREVIEW_SURFACE.into()))
                .uniform(),
        );
        shader.set(shading::DIFFUSE_COLOR, "color3f", Value::Vec3(material.diffuse.to_dvec3()));
        shader.set(shading::EMISSIVE_COLOR, "color3f", Value::Vec3(material.emissive.to_dvec3()));
        shader.set_attribute(Attribute {
            name: attrs::SURFACE_OUTPUT.to_string(),
            type_name: "token".to_string(),
            ..Default::default()
        });

        let workflow = material.pbr.as_ref().and_then(|pbr| {
            pbr.workflow(PbrWorkflowType::Metal)
                .map(|w| (PbrWorkflowType::Metal, w))
                .or_else(|| pbr.workflow(PbrWorkflowType::Specular).map(|w| (PbrWorkflowType::Specular, w)))
        });

        if let Some((kind, w)) = workflow {
            match kind {
                PbrWorkflowType::Metal => {
                    shader.set(shading::METALLIC, "float", Value::Double(w.metalness));
                    shader.set(shading::ROUGHNESS, "float", Value::Double(w.roughness));
                    if let Some(map) = &w.metalness_map {
                        textures.push(TextureLink::new("MetallicTexture", map.clone(), shading::METALLIC, "float", shading::OUTPUT_R));
                    }
                    if let Some(map) = &w.roughness_map {
                        textures.push(TextureLink::new("RoughnessTexture", map.clone(), shading::ROUGHNESS, "float", shading::OUTPUT_R));
                    }
                }
                PbrWorkflowType::Specular => {
                    shader.set(shading::USE_SPECULAR_WORKFLOW, "int", Value::Int(1));
                    shader.set(
                        shading::SPECULAR_COLOR,
                        "color3f",
                        Value::Vec3(material.specular.to_dvec3()),
                    );
                    shader.set(shading::ROUGHNESS, "float", Value::Double(1.0 - w.glossiness));
                    if let Some(map) = &w.specular_map {
                        textures.push(TextureLink::new("SpecularTexture", map.clone(), shading::SPECULAR_COLOR, "color3f", shading::OUTPUT_RGB));
                    }
                }
            }
            if let Some(map) = &w.albedo_map {
                textures.push(TextureLink::new("AlbedoTexture", map.clone(), shading::DIFFUSE_COLOR, "color3f", shading::OUTPUT_RGB));
            }
            if let Some(map) = &w.normal_map {
                textures.push(TextureLink::new("NormalTexture", map.clone(), shading::NORMAL, "normal3f", shading::OUTPUT_RGB));
            }
            if let Some(map) = &w.emissive_map {
                textures.push(TextureLink::new("EmissiveTexture", map.clone(), shading::EMISSIVE_COLOR, "color3f", shading::OUTPUT_RGB));
            }
        }
    }

    for TextureLink {
        name,
        file,
        input,
        input_type,
        output,
    } in textures
    {
        let texture_path = append_child(path, name);
        match stage.define_prim(&texture_path, types::SHADER) {
            Ok(texture) => {
                texture.set_attribute(
                    Attribute::new(attrs::INFO_ID, "token", Value::Token(shading::UV_TEXTURE.into()))
                        .uniform(),
                );
                texture.set(shading::FILE, "asset", Value::Asset(file));
                let output_type = if output == shading::OUTPUT_R { "float" } else { "float3" };
                texture.set_attribute(Attribute {
                    name: output.to_string(),
                    type_name: output_type.to_string(),
                    ..Default::default()
                });
            }
            Err(e) => {
                errors.push(e.into());
                continue;
            }
        }
        if let Some(shader) = stage.prim_mut(&shader_path) {
            shader.connect(input, input_type, format!("{}.{}", texture_path, output));
        }
    }

    errors
}

/// An authored input of the surface shader: its literal value and the file
/// of the texture it is connected to, either of which may be absent.
#[derive(Default)]
struct Input<'a> {
    value: Option<&'a Value>,
    texture: Option<String>,
}

/// Read the first of `values` the shader authors, taking the texture from the
/// first authored of `textures` when that input is not connected to one.
fn read_input<'a>(stage: &'a Stage, shader: &'a Prim, values: &[&str], textures: &[&str]) -> Input<'a> {
    let mut input = first_input(stage, shader, values);
    if input.texture.is_none() {
        input.texture = first_input(stage, shader, textures).texture;
    }
    input
}

fn first_input<'a>(stage: &'a Stage, shader: &'a Prim, names: &[&str]) -> Input<'a> {
    for name in names {
        let Some(attribute) = shader.attribute(name) else {
            continue;
        };
        let mut input = Input::default();
        if let Some(target) = attribute.connections.first() {
            input.texture = stage
                .prim(prim_part(target))
                .and_then(|t| t.value(shading::FILE))
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        match &attribute.value {
            // MDL texture inputs carry the asset directly.
            Some(Value::Asset(file)) => input.texture = Some(file.clone()),
            Some(value) => input.value = Some(value),
            None => {}
        }
        return input;
    }
    Input::default()
}

fn find_surface_shader<'a>(stage: &'a Stage, material: &Prim) -> Option<&'a Prim> {
    let connected = material
        .attributes
        .iter()
        .filter(|a| a.name.starts_with("outputs:") && a.name.ends_with("surface"))
        .flat_map(|a| a.connections.iter())
        .find_map(|target| stage.prim(prim_part(target)))
        .filter(|p| p.is_a(types::SHADER));
    connected.or_else(|| {
        stage
            .children(&material.path)
            .into_iter()
            .find(|child| child.is_a(types::SHADER) && !is_texture_shader(child))
    })
}

fn is_texture_shader(prim: &Prim) -> bool {
    prim.value(attrs::INFO_ID).and_then(Value::as_str) == Some(shading::UV_TEXTURE)
}

/// Read the surface network of the `Material` prim `prim`.
///
/// A material without a surface shader yields a default record and a
/// warning; the record is still usable.
pub fn parse_scene_material(stage: &Stage, prim: &Prim) -> (Material, UsdErrors) {
    let mut errors = UsdErrors::new();
    let mut material = Material::default();

    let Some(shader) = find_surface_shader(stage, prim) else {
        errors.push(UsdError::schema_mismatch(format!(
            "material {} has no surface shader",
            prim.path
        )));
        return (material, errors);
    };

    let mut color_of = |names: &[&str], textures: &[&str], label: &str| -> (Option<DVec3>, Option<String>) {
        let input = read_input(stage, shader, names, textures);
        let color = input.value.and_then(|value| {
            let color = value.as_vec3();
            if color.is_none() {
                errors.push(UsdError::schema_mismatch(format!(
                    "{} of {} is not a colour",
                    label, shader.path
                )));
            }
            color
        });
        (color, input.texture)
    };

    let (diffuse, albedo_map) = color_of(
        &[shading::DIFFUSE_COLOR, shading::omni::DIFFUSE_COLOR],
        &[shading::omni::DIFFUSE_TEXTURE],
        "diffuse colour",
    );
    let (emissive, emissive_map) = color_of(
        &[shading::EMISSIVE_COLOR, shading::omni::EMISSIVE_COLOR],
        &[shading::omni::EMISSIVE_TEXTURE],
        "emissive colour",
    );
    let (specular, specular_map) = color_of(&[shading::SPECULAR_COLOR], &[], "specular colour");

    // A textured surface without a base colour renders the texture as is.
    material.diffuse = match (diffuse, &albedo_map) {
        (Some(c), _) => Color::from_dvec3(c),
        (None, Some(_)) => Color::WHITE,
        (None, None) => Color::BLACK,
    };
    material.emissive = emissive.map(Color::from_dvec3).unwrap_or(Color::BLACK);
    if shader.value(shading::omni::ENABLE_EMISSION).and_then(Value::as_bool) == Some(false) {
        material.emissive = Color::BLACK;
    }
    if let Some(specular) = specular {
        material.specular = Color::from_dvec3(specular);
    }

    let mut scalar_of = |names: &[&str], textures: &[&str], label: &str| -> (Option<f64>, Option<String>) {
        let input = read_input(stage, shader, names, textures);
        let scalar = input.value.and_then(|value| {
            let scalar = value.as_f64();
            if scalar.is_none() {
                errors.push(UsdError::schema_mismatch(format!(
                    "{} of {} is not a number",
                    label, shader.path
                )));
            }
            scalar
        });
        (scalar, input.texture)
    };

    let (metallic, metalness_map) = scalar_of(
        &[shading::METALLIC, shading::omni::METALLIC],
        &[shading::omni::METALLIC_TEXTURE],
        "metallic",
    );
    let (roughness, roughness_map) = scalar_of(
        &[shading::ROUGHNESS, shading::omni::ROUGHNESS],
        &[shading::omni::ROUGHNESS_TEXTURE],
        "roughness",
    );
    let normal_map = read_input(stage, shader, &[shading::NORMAL], &[shading::omni::NORMAL_TEXTURE]).texture;

    let use_specular = shader
        .value(shading::USE_SPECULAR_WORKFLOW)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let has_metal_inputs = metallic.is_some() || metalness_map.is_some();
    let has_pbr = has_metal_inputs
        || roughness.is_some()
        || roughness_map.is_some()
        || albedo_map.is_some()
        || normal_map.is_some()
        || emissive_map.is_some()
        || specular_map.is_some()
        || use_specular;

    if has_pbr {
        let mut workflow = PbrWorkflow {
            albedo_map,
            normal_map,
            emissive_map,
            ..Default::default()
        };
        let kind = if use_specular && !has_metal_inputs {
            workflow.specular_map = specular_map;
            if let Some(r) = roughness {
                workflow.glossiness = 1.0 - r;
            }
            PbrWorkflowType::Specular
        } else {
            if use_specular {
                log::debug!(
                    "{} has both metal and specular inputs, using the metal workflow",
                    shader.path
                );
            }
            workflow.metalness_map = metalness_map;
            workflow.roughness_map = roughness_map;
            if let Some(m) = metallic {
                workflow.metalness = m;
            }
            if let Some(r) = roughness {
                workflow.roughness = r;
            }
            PbrWorkflowType::Metal
        };
        let mut pbr = Pbr::default();
        pbr.set_workflow(kind, workflow);
        material.pbr = Some(pbr);
    }

    (material, errors)
}

/// Read a `Material` prim into a generic render material.
pub fn to_generic_material(stage: &Stage, prim: &Prim) -> (GenericMaterial, UsdErrors) {
    let (material, errors) = parse_scene_material(stage, prim);
    let mut generic = GenericMaterial::from(&material);
    generic.name = prim.name.clone();
    (generic, errors)
}

/// Write a generic material by way of its physics-description form.
pub fn generic_to_scene_material(generic: &GenericMaterial, stage: &mut Stage, path: &str) -> UsdErrors {
    to_scene_material(&Material::from(generic), stage, path)
}
