//! # stratus_spec
//!
//! Declaration model for Stratus: resource manifests, the kind catalog,
//! and validation.
//!
//! A manifest is the desired state for one run. It declares resource
//! nodes with property maps that may reference other nodes' outputs via
//! `${name.attr}` placeholders, plus read-only data lookups resolved
//! before planning.

pub mod catalog;
pub mod error;
pub mod models;
pub mod reader;
pub mod validator;

// Re-export main types for convenience
pub use catalog::{KindCatalog, KindSchema, ReplaceStrategy};
pub use error::{SpecError, SpecResult};
pub use models::{
    property_hash, scan_references, substitute_references, DataLookup, Lifecycle, Manifest,
    PropertyMap, PropertyRef, ResourceNode,
};
pub use reader::ManifestReader;
pub use validator::{ManifestValidator, ValidationResult};
