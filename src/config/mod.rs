// src/config/mod.rs

//! Build manifest loading and validation.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads a manifest from disk.
//! - [`validate`] checks job references, cycles and `[config]` values.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigSection, JobConfig, Manifest, RawManifest};
pub use validate::topological_order;
