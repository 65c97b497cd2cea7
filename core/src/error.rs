//! Error types for hierarchy declaration and schema compilation.
//!
//! Every variant is a synchronous programming-error signal: none of them is
//! transient, so callers should surface them rather than retry.

use thiserror::Error;

use crate::VariantId;

/// Errors raised while declaring variants or compiling union schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A new descendant was declared under a type whose schema was already
    /// compiled.
    #[error(
        "schema of {frozen} has already been created; declaring {declared} as a new descendant would leave it stale"
    )]
    SchemaAlreadyFinalized {
        /// Name of the type being declared.
        declared: String,
        /// Name of the frozen ancestor that blocked the declaration.
        frozen: String,
    },

    /// A hierarchy or expression resolved to zero concrete variants.
    #[error("no concrete variants to build a schema from")]
    EmptyVariantSet,

    /// Two concrete variants share a discriminator field and literal.
    #[error("duplicate discriminator value {field}={value:?} declared by {first} and {second}")]
    DuplicateDiscriminatorValue {
        /// Discriminator field name shared by both variants.
        field: String,
        /// Colliding literal value.
        value: String,
        /// Name of the first variant carrying the literal.
        first: String,
        /// Name of the second variant carrying the literal.
        second: String,
    },

    /// A handle does not belong to this registry.
    #[error("unknown variant: {0:?}")]
    UnknownVariant(VariantId),

    /// A variant with the same name is already declared.
    #[error("duplicate variant name: {0}")]
    DuplicateVariantName(String),
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
