//! Physics-description documents (SDFormat) for the SDF/USD converter.
//!
//! Provides the typed tree ([`Root`] → [`World`] → [`Model`] → [`Link`] …),
//! a parser from SDF XML and a writer back to it. Only the elements the
//! converter consumes are modelled; everything else is skipped on read.
//!
//! # Example
//!
//! ```ignore
//! let root = sdfusd_sdf::parse_sdf_file("shapes.sdf")?;
//! for model in &root.worlds[0].models {
//!     println!("{}: {} links", model.name, model.link_count());
//! }
//! ```

mod error;
mod parser;
mod types;
mod writer;
pub mod xml;

pub use error::{SdfError, SdfResult};
pub use parser::{parse_sdf_file, parse_sdf_str};
pub use types::*;
pub use writer::to_sdf_string;
pub use xml::XmlElement;
