//! Scene-graph documents for the SDF/USD converter.
//!
//! A minimal USD object model: a [`Stage`] arena of [`Prim`]s with typed
//! attributes, relationships, applied API schemas and composition arcs, plus
//! a reader and writer for the `.usda` text format.
//!
//! ## Not Supported
//!
//! - Binary `.usdc` format
//! - Animation / time samples
//! - Variants, inherits and specializes arcs
//!
//! Reference and payload arcs are recorded on the prims that author them;
//! following them across documents is left to the caller.
//!
//! # Example
//!
//! ```ignore
//! use sdfusd_usd::Stage;
//!
//! let stage = Stage::open("path/to/scene.usda")?;
//! for prim in stage.range() {
//!     println!("{} ({})", prim.path, prim.type_name);
//! }
//! ```

mod parser;
pub mod path;
mod stage;
mod text;
pub mod tokens;
mod types;
mod value;
mod writer;

pub use parser::{parse_usda, ParseError, ParseResult, UsdaParser};
pub use stage::{PrimRange, Stage, StageError, StageResult};
pub use types::*;
pub use value::Value;
pub use writer::UsdaWriter;
