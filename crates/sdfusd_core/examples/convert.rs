//! Example: Convert between SDF and USDA by file extension.
//!
//! Run with: cargo run --example convert -- assets/sdf/basic_shapes.sdf /tmp/shapes.usda
//!           cargo run --example convert -- assets/usd/upAxisZ.usda /tmp/shapes.sdf [config.json]

use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use sdfusd_core::{sdf_to_usd, usd_to_sdf, ConversionConfig, Severity, UsdErrors};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("Usage: convert <input.sdf|input.usda> <output.usda|output.sdf> [config.json]");
        return Ok(());
    }
    let input = Path::new(&args[1]);
    let output = Path::new(&args[2]);

    let mut config = match args.get(3) {
        Some(path) => ConversionConfig::from_json_file(path)?,
        None => ConversionConfig::default(),
    };

    let errors = match extension(input).as_str() {
        "sdf" | "world" => {
            if config.source_dir.is_none() {
                config.source_dir = input.parent().map(Path::to_path_buf);
            }
            let root = sdfusd_sdf::parse_sdf_file(input)
                .with_context(|| format!("reading {}", input.display()))?;
            let (stage, errors) = sdf_to_usd(&root, &config);
            stage
                .export(output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} prims to {}", stage.prim_count(), output.display());
            errors
        }
        "usda" | "usd" => {
            let (root, errors) = usd_to_sdf(input, &config);
            if root.world_count() == 0 {
                report(&errors);
                bail!("could not open {}", input.display());
            }
            let text = sdfusd_sdf::to_sdf_string(&root)?;
            std::fs::write(output, text).with_context(|| format!("writing {}", output.display()))?;
            if let Some(world) = root.world_by_index(0) {
                println!(
                    "Wrote world '{}' ({} models, {} lights) to {}",
                    world.name,
                    world.model_count(),
                    world.light_count(),
                    output.display()
                );
            }
            errors
        }
        other => bail!("don't know how to convert '.{}' files", other),
    };

    report(&errors);
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn report(errors: &UsdErrors) {
    if errors.is_empty() {
        return;
    }
    println!("\n--- {} problems ---", errors.len());
    for error in errors {
        let level = match error.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!("  [{}] {}", level, error);
    }
}
