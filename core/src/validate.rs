//! Reference validation engine over compiled unions.
//!
//! [`FieldTableHandler`] hands each variant's [`FieldTable`] to the compiler,
//! and [`CompiledSchema<FieldTable>::validate`](CompiledSchema::validate)
//! dispatches JSON input to the matching variant. This is enough to check
//! the discriminator wiring end to end: defaults fill absent fields,
//! literals reject mismatched values, and unions dispatch on the
//! discriminator field.
//!
//! # Examples
//!
//! ```
//! use plugin_union_core::*;
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! let animal = registry.declare(VariantDecl::new("Animal")).unwrap();
//! let dog = registry.declare(VariantDecl::new("Dog").extends(animal).value("dog")).unwrap();
//! registry.declare(VariantDecl::new("Cat").extends(animal).value("cat")).unwrap();
//!
//! // Direct construction fills in the discriminator.
//! let built = registry.construct(dog, &json!({})).unwrap();
//! assert_eq!(built.fields["type"], "dog");
//!
//! let schema = registry.compile_hierarchy(animal, &mut FieldTableHandler).unwrap();
//! let parsed = schema.validate(&json!({"type": "cat"})).unwrap();
//! assert_eq!(registry.get(parsed.variant).unwrap().name(), "Cat");
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

use crate::Registry;
use crate::compile::{CompiledSchema, SchemaHandler, TaggedUnion};
use crate::types::{FieldTable, Variant, VariantId};

/// Field-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input is not a JSON object.
    #[error("expected an object")]
    NotAnObject,
    /// A required field is absent and has no default.
    #[error("missing required field: {0}")]
    MissingField(String),
    /// A field carries a value other than its declared literal.
    #[error("field {field} must be {expected:?}, found {found}")]
    LiteralMismatch {
        field: String,
        expected: String,
        found: String,
    },
    /// A tagged union could not find its discriminator field in the input.
    #[error("missing discriminator field: {0}")]
    MissingDiscriminator(String),
    /// The discriminator value selects no known choice.
    #[error("unknown discriminator {field}={value}")]
    UnknownDiscriminator { field: String, value: String },
    /// Every branch of a union of unions rejected the input.
    #[error("input matched none of {} union branches", .0.len())]
    NoMatchingBranch(Vec<ValidationError>),
    /// A handle does not belong to the registry.
    #[error("unknown variant: {0:?}")]
    UnknownVariant(VariantId),
}

/// A validated value and the variant it was validated as.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub variant: VariantId,
    pub fields: Map<String, Value>,
}

/// [`SchemaHandler`] producing each variant's [`FieldTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTableHandler;

impl SchemaHandler for FieldTableHandler {
    type Schema = FieldTable;

    fn schema_for(&mut self, variant: &Variant) -> FieldTable {
        variant.fields().clone()
    }
}

impl FieldTable {
    /// Validates `input` against the table.
    ///
    /// Absent fields take their default; unknown fields are dropped.
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, ValidationError> {
        let object = input.as_object().ok_or(ValidationError::NotAnObject)?;
        let mut out = Map::new();

        for (name, spec) in self.iter() {
            let value = match object.get(name) {
                Some(value) => value.clone(),
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None if spec.required => {
                        return Err(ValidationError::MissingField(name.to_string()));
                    }
                    None => continue,
                },
            };

            if let Some(literal) = &spec.literal {
                if value.as_str() != Some(literal.as_str()) {
                    return Err(ValidationError::LiteralMismatch {
                        field: name.to_string(),
                        expected: literal.clone(),
                        found: value.to_string(),
                    });
                }
            }
            out.insert(name.to_string(), value);
        }

        Ok(out)
    }
}

impl CompiledSchema<FieldTable> {
    /// Validates `input`, dispatching on the discriminator where the schema
    /// has one.
    pub fn validate(&self, input: &Value) -> Result<Instance, ValidationError> {
        match self {
            CompiledSchema::Direct {
                variant, schema, ..
            } => Ok(Instance {
                variant: *variant,
                fields: schema.validate(input)?,
            }),
            CompiledSchema::TaggedUnion(union) => union.validate(input),
            CompiledSchema::UnionOfUnions { branches } => {
                let mut errors = Vec::with_capacity(branches.len());
                for branch in branches {
                    match branch.validate(input) {
                        Ok(instance) => return Ok(instance),
                        Err(err) => errors.push(err),
                    }
                }
                Err(ValidationError::NoMatchingBranch(errors))
            }
        }
    }
}

impl TaggedUnion<FieldTable> {
    /// Reads the discriminator and validates against the selected choice.
    pub fn validate(&self, input: &Value) -> Result<Instance, ValidationError> {
        let object = input.as_object().ok_or(ValidationError::NotAnObject)?;
        let tag = object
            .get(&self.discriminator)
            .ok_or_else(|| ValidationError::MissingDiscriminator(self.discriminator.clone()))?;
        let choice = tag
            .as_str()
            .and_then(|value| self.choice(value))
            .ok_or_else(|| ValidationError::UnknownDiscriminator {
                field: self.discriminator.clone(),
                value: tag.to_string(),
            })?;

        Ok(Instance {
            variant: choice.variant,
            fields: choice.schema.validate(input)?,
        })
    }
}

impl Registry {
    /// Constructs `id` directly from `input`, outside any union.
    ///
    /// The discriminator may be omitted; it defaults to the declared
    /// literal.
    pub fn construct(&self, id: VariantId, input: &Value) -> Result<Instance, ValidationError> {
        let variant = self.get(id).ok_or(ValidationError::UnknownVariant(id))?;
        Ok(Instance {
            variant: id,
            fields: variant.fields().validate(input)?,
        })
    }
}
