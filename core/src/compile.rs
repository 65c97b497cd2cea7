//! Compilation of resolved variant sets into union schemas.
//!
//! The compiler never inspects field-level schemas itself: for every
//! concrete variant it asks a [`SchemaHandler`] for an opaque schema, then
//! arranges those schemas into one of three shapes:
//!
//! - a single variant passes straight through ([`CompiledSchema::Direct`]);
//! - variants sharing one discriminator field form a
//!   [`CompiledSchema::TaggedUnion`];
//! - variants spread over several field names form a
//!   [`CompiledSchema::UnionOfUnions`], one tagged union per field.
//!
//! Compiling freezes every variant it touches along with their ancestors, so
//! later attempts to extend those hierarchies fail with
//! [`SchemaAlreadyFinalized`](crate::SchemaError::SchemaAlreadyFinalized).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::Registry;
use crate::combinator::Expr;
use crate::error::{Result, SchemaError};
use crate::types::{Variant, VariantId};

/// Builds the schema for one concrete variant.
///
/// Implemented by the validation engine that consumes the compiled union.
/// Closures taking a `&Variant` implement it too.
pub trait SchemaHandler {
    /// Engine-specific schema for one variant.
    type Schema;

    /// Returns the schema for `variant`.
    fn schema_for(&mut self, variant: &Variant) -> Self::Schema;
}

impl<F, S> SchemaHandler for F
where
    F: FnMut(&Variant) -> S,
{
    type Schema = S;

    fn schema_for(&mut self, variant: &Variant) -> S {
        self(variant)
    }
}

/// One entry of a [`TaggedUnion`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice<S> {
    /// Handle of the selected variant.
    pub variant: VariantId,
    /// Type name of the selected variant.
    pub name: String,
    /// Schema returned by the [`SchemaHandler`].
    pub schema: S,
}

/// Choices keyed by discriminator literal under one field name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedUnion<S> {
    /// Field name read to pick a choice.
    pub discriminator: String,
    /// Choices keyed by literal.
    pub choices: BTreeMap<String, Choice<S>>,
}

impl<S> TaggedUnion<S> {
    /// Returns the choice selected by `value`.
    pub fn choice(&self, value: &str) -> Option<&Choice<S>> {
        self.choices.get(value)
    }

    /// Number of choices.
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// Whether the union has no choices.
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

/// Union schema produced by [`Registry::compile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompiledSchema<S> {
    /// Exactly one variant; its schema is used as-is and input need not
    /// carry a discriminator.
    Direct {
        variant: VariantId,
        name: String,
        schema: S,
    },
    /// Fast dispatch on a single discriminator field.
    TaggedUnion(TaggedUnion<S>),
    /// Tagged unions over distinct field names, tried in order.
    UnionOfUnions { branches: Vec<TaggedUnion<S>> },
}

impl<S> CompiledSchema<S> {
    /// Every variant reachable through the schema.
    pub fn variants(&self) -> BTreeSet<VariantId> {
        match self {
            CompiledSchema::Direct { variant, .. } => BTreeSet::from([*variant]),
            CompiledSchema::TaggedUnion(union) => {
                union.choices.values().map(|c| c.variant).collect()
            }
            CompiledSchema::UnionOfUnions { branches } => branches
                .iter()
                .flat_map(|u| u.choices.values().map(|c| c.variant))
                .collect(),
        }
    }

    /// Discriminator field names used for dispatch; empty for
    /// [`Direct`](CompiledSchema::Direct).
    pub fn discriminators(&self) -> Vec<&str> {
        match self {
            CompiledSchema::Direct { .. } => Vec::new(),
            CompiledSchema::TaggedUnion(union) => vec![union.discriminator.as_str()],
            CompiledSchema::UnionOfUnions { branches } => {
                branches.iter().map(|u| u.discriminator.as_str()).collect()
            }
        }
    }

    /// Number of variants in the schema.
    pub fn len(&self) -> usize {
        match self {
            CompiledSchema::Direct { .. } => 1,
            CompiledSchema::TaggedUnion(union) => union.len(),
            CompiledSchema::UnionOfUnions { branches } => {
                branches.iter().map(TaggedUnion::len).sum()
            }
        }
    }

    /// Always `false`: compilation rejects empty variant sets.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Registry {
    /// Compiles an explicit variant set and freezes its members together
    /// with all of their ancestors.
    ///
    /// Abstract types in the set are skipped; they never become choices.
    ///
    /// # Errors
    ///
    /// - [`EmptyVariantSet`](SchemaError::EmptyVariantSet) for an empty set.
    /// - [`DuplicateDiscriminatorValue`](SchemaError::DuplicateDiscriminatorValue)
    ///   when two variants share a field name and literal.
    /// - [`UnknownVariant`](SchemaError::UnknownVariant) for foreign handles.
    ///
    /// Nothing is frozen when an error is returned.
    pub fn compile_variants<H: SchemaHandler>(
        &mut self,
        variants: &BTreeSet<VariantId>,
        handler: &mut H,
    ) -> Result<CompiledSchema<H::Schema>> {
        let mut concrete = BTreeSet::new();
        for &id in variants {
            if self.variant(id)?.is_concrete() {
                concrete.insert(id);
            }
        }
        let variants = &concrete;
        if variants.is_empty() {
            return Err(SchemaError::EmptyVariantSet);
        }

        let mut touched = BTreeSet::new();
        for &id in variants {
            touched.extend(self.ancestors(id)?);
        }

        let compiled = if variants.len() == 1 {
            let id = *variants.iter().next().ok_or(SchemaError::EmptyVariantSet)?;
            let variant = self.variant(id)?;
            CompiledSchema::Direct {
                variant: id,
                name: variant.name.clone(),
                schema: handler.schema_for(variant),
            }
        } else {
            let partitions = self.partition(variants)?;
            let mut unions = Vec::with_capacity(partitions.len());
            for (discriminator, members) in partitions {
                let mut choices = BTreeMap::new();
                for (value, id) in members {
                    let variant = self.variant(id)?;
                    let choice = Choice {
                        variant: id,
                        name: variant.name.clone(),
                        schema: handler.schema_for(variant),
                    };
                    choices.insert(value, choice);
                }
                unions.push(TaggedUnion {
                    discriminator,
                    choices,
                });
            }

            if unions.len() == 1 {
                CompiledSchema::TaggedUnion(unions.remove(0))
            } else {
                CompiledSchema::UnionOfUnions { branches: unions }
            }
        };

        for id in touched {
            self.freeze(id)?;
        }
        debug!(
            variants = variants.len(),
            discriminators = ?compiled.discriminators(),
            "Compiled union schema"
        );
        Ok(compiled)
    }

    /// Evaluates `expr` and compiles the result.
    ///
    /// Besides the resolved variants, every hierarchy root named in the
    /// expression is frozen.
    ///
    /// # Examples
    ///
    /// ```
    /// use plugin_union_core::{CompiledSchema, Registry, VariantDecl, or_};
    ///
    /// let mut registry = Registry::new();
    /// let base1 = registry.declare(VariantDecl::new("Base1")).unwrap();
    /// let base2 = registry
    ///     .declare(VariantDecl::new("Base2").discriminator_field("kind"))
    ///     .unwrap();
    /// registry.declare(VariantDecl::new("A").extends(base1).value("a")).unwrap();
    /// registry.declare(VariantDecl::new("B").extends(base2).value("b")).unwrap();
    ///
    /// let schema = registry
    ///     .compile(&or_(base1, base2), &mut |v: &plugin_union_core::Variant| v.name().to_string())
    ///     .unwrap();
    /// assert!(matches!(schema, CompiledSchema::UnionOfUnions { ref branches } if branches.len() == 2));
    /// ```
    pub fn compile<H: SchemaHandler>(
        &mut self,
        expr: &Expr,
        handler: &mut H,
    ) -> Result<CompiledSchema<H::Schema>> {
        let variants = self.evaluate(expr)?;
        let compiled = self.compile_variants(&variants, handler)?;
        for root in expr.roots() {
            self.freeze(root)?;
        }
        Ok(compiled)
    }

    /// Compiles every concrete variant under `root`.
    pub fn compile_hierarchy<H: SchemaHandler>(
        &mut self,
        root: VariantId,
        handler: &mut H,
    ) -> Result<CompiledSchema<H::Schema>> {
        self.compile(&Expr::Hierarchy(root), handler)
    }

    /// Groups concrete variants by field name, then by literal, rejecting
    /// collisions.
    fn partition(
        &self,
        variants: &BTreeSet<VariantId>,
    ) -> Result<BTreeMap<String, BTreeMap<String, VariantId>>> {
        let mut partitions: BTreeMap<String, BTreeMap<String, VariantId>> = BTreeMap::new();
        for &id in variants {
            let variant = self.variant(id)?;
            let Some(value) = variant.discriminator_value() else {
                continue;
            };
            let members = partitions
                .entry(variant.discriminator_field.clone())
                .or_default();
            if let Some(&existing) = members.get(value) {
                return Err(SchemaError::DuplicateDiscriminatorValue {
                    field: variant.discriminator_field.clone(),
                    value: value.to_string(),
                    first: self.variant(existing)?.name.clone(),
                    second: variant.name.clone(),
                });
            }
            members.insert(value.to_string(), id);
        }
        Ok(partitions)
    }
}
