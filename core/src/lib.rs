//! Plugin hierarchies resolved into discriminated union schemas.
//!
//! Client code declares a base type and any number of derived types in a
//! [`Registry`]. Types that carry a literal discriminator value are
//! concrete variants; the rest are abstract grouping nodes. The crate then:
//!
//! - resolves the concrete variants under a root ([`Registry::valid_variants`]);
//! - combines hierarchies with AND/OR ([`Expr`], [`and_`], [`or_`]);
//! - compiles a resolved set into a [`CompiledSchema`]: a direct
//!   pass-through, one [`TaggedUnion`], or a union of tagged unions grouped
//!   by discriminator field;
//! - freezes whatever it compiled, so extending a hierarchy afterwards fails
//!   with [`SchemaError::SchemaAlreadyFinalized`].
//!
//! Field-level schemas are produced by a [`SchemaHandler`] supplied by the
//! validation engine. [`FieldTableHandler`] is a small reference engine over
//! JSON values.
//!
//! # Example
//!
//! ```
//! use plugin_union_core::*;
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! let animal = registry.declare(VariantDecl::new("Animal")).unwrap();
//! let dog = registry
//!     .declare(VariantDecl::new("Dog").extends(animal).value("dog"))
//!     .unwrap();
//! registry
//!     .declare(VariantDecl::new("Cat").extends(animal).value("cat"))
//!     .unwrap();
//!
//! let schema = registry
//!     .compile_hierarchy(animal, &mut FieldTableHandler)
//!     .unwrap();
//! let CompiledSchema::TaggedUnion(union) = &schema else { unreachable!() };
//! assert_eq!(union.discriminator, "type");
//! assert_eq!(union.len(), 2);
//!
//! assert_eq!(schema.validate(&json!({"type": "dog"})).unwrap().variant, dog);
//!
//! // The hierarchy is frozen now.
//! let late = registry.declare(VariantDecl::new("Cow").extends(animal).value("cow"));
//! assert!(matches!(late, Err(SchemaError::SchemaAlreadyFinalized { .. })));
//! ```

mod combinator;
mod compile;
mod error;
mod registry;
mod types;
mod validate;

pub use combinator::{Expr, and_, or_};
pub use compile::{Choice, CompiledSchema, SchemaHandler, TaggedUnion};
pub use error::{Result, SchemaError};
pub use registry::Registry;
pub use types::*;
pub use validate::{FieldTableHandler, Instance, ValidationError};
