//! Declarative manifests for plugin union hierarchies.
//!
//! A [`HierarchyManifest`] describes variants and named union expressions in
//! YAML or JSON and declares them into a
//! [`Registry`](plugin_union_core::Registry), so a hierarchy can be shipped
//! as configuration rather than code.
//!
//! # Quick start
//!
//! ```
//! use plugin_union_core::{CompiledSchema, FieldTableHandler, Registry};
//! use plugin_union_manifest::HierarchyManifest;
//!
//! let manifest = HierarchyManifest::from_json_str(r#"{
//!     "variants": [
//!         {"name": "Animal"},
//!         {"name": "Dog", "extends": ["Animal"], "value": "dog"},
//!         {"name": "Cat", "extends": ["Animal"], "value": "cat"}
//!     ],
//!     "unions": {"pets": {"hierarchy": "Animal"}}
//! }"#).unwrap();
//!
//! let mut registry = Registry::new();
//! let declared = manifest.declare_into(&mut registry).unwrap();
//! let expr = declared.expr("pets").unwrap().clone();
//! let schema = registry.compile(&expr, &mut FieldTableHandler).unwrap();
//! assert!(matches!(schema, CompiledSchema::TaggedUnion(_)));
//! ```

mod error;
mod manifest;

pub use error::{ManifestError, Result};
pub use manifest::{DeclaredManifest, ExprSpec, HierarchyManifest, VariantEntry};
