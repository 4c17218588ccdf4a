//! Bidirectional conversion between physics descriptions (SDF) and scene
//! graphs (USD).
//!
//! - [`sdf_to_usd`] builds a stage from a physics-description tree.
//! - [`usd_to_sdf`] reconstructs a tree from a stage and the documents it
//!   references, using [`UsdData`] to compose them.
//! - [`material`] maps materials between the two in both directions.
//!
//! Conversion never aborts on bad input. Every entry point returns the
//! problems it met as [`UsdErrors`]; an empty list means a clean conversion.
//!
//! # Example
//!
//! ```ignore
//! use sdfusd_core::{sdf_to_usd, ConversionConfig};
//!
//! let root = sdfusd_sdf::parse_sdf_file("shapes.sdf")?;
//! let (stage, errors) = sdf_to_usd(&root, &ConversionConfig::default());
//! for e in &errors {
//!     log::warn!("{}", e);
//! }
//! stage.export("shapes.usda")?;
//! ```

pub mod config;
pub mod error;
pub mod material;
pub mod sdf_to_usd;
pub mod usd_data;
pub mod usd_to_sdf;

pub use config::{ConfigError, ConversionConfig};
pub use error::{has_errors, Severity, UsdError, UsdErrorKind, UsdErrors};
pub use material::{to_generic_material, to_scene_material, GenericMaterial, GenericPbr};
pub use sdf_to_usd::{parse_sdf_world, sdf_to_usd};
pub use usd_data::{StageReference, UsdData};
pub use usd_to_sdf::{parse_usd_world, usd_to_sdf};

#[cfg(test)]
pub(crate) fn test_asset_path(relative: &str) -> std::path::PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let crate_root = std::path::Path::new(&manifest_dir);
    // Go up to workspace root
    let workspace_root = crate_root.parent().unwrap().parent().unwrap();
    workspace_root.join(relative)
}
