//! Declaration-side types for plugin hierarchies.
//!
//! A [`VariantDecl`] is the builder handed to
//! [`Registry::declare`](crate::Registry::declare); the registry resolves it
//! once into an immutable [`Variant`] carrying its inherited discriminator
//! field and a precomputed [`FieldTable`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator field name used when no ancestor declares one.
pub const DEFAULT_DISCRIMINATOR_FIELD: &str = "type";

/// Handle to a variant declared in a [`Registry`](crate::Registry).
///
/// Handles are only meaningful for the registry that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub(crate) usize);

impl VariantId {
    /// Returns the arena index backing this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Metadata for one field of a variant.
///
/// # Examples
///
/// ```
/// use plugin_union_core::FieldSpec;
/// use serde_json::json;
///
/// let name = FieldSpec::required().with_description("Display name");
/// let merged = name.merge_default(json!("rex"));
/// assert_eq!(merged.description.as_deref(), Some("Display name"));
/// assert_eq!(merged.default, Some(json!("rex")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value used when the field is absent from input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Literal string the field must equal when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    /// Whether input must supply the field when no default exists.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// Creates a field that must be supplied.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Creates a field that may be omitted.
    pub fn optional() -> Self {
        Self::default()
    }

    /// Creates a field constrained to a single string literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            literal: Some(value.into()),
            required: true,
            ..Self::default()
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Returns a copy carrying `value` as its default.
    ///
    /// Description, literal and requiredness are kept as they are; only the
    /// default changes.
    pub fn merge_default(&self, value: Value) -> Self {
        if self.default.as_ref() == Some(&value) {
            return self.clone();
        }
        Self {
            default: Some(value),
            ..self.clone()
        }
    }
}

/// Immutable per-variant field table, keyed by field name.
///
/// Built once at declaration: base fields first, then the variant's own
/// fields, then the discriminator literal and its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTable {
    fields: BTreeMap<String, FieldSpec>,
}

impl FieldTable {
    /// Returns the spec for `name`, if declared.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Returns `true` if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, spec: FieldSpec) {
        self.fields.insert(name, spec);
    }

    pub(crate) fn extend_missing(&mut self, other: &FieldTable) {
        for (name, spec) in &other.fields {
            self.fields
                .entry(name.clone())
                .or_insert_with(|| spec.clone());
        }
    }
}

/// Declaration-time overrides for discriminator settings.
///
/// Entries present here take priority over the equivalent
/// [`VariantDecl`] builder calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Discriminator field name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_field: Option<String>,
    /// Discriminator literal for this variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Builder describing a variant to declare.
///
/// # Examples
///
/// ```
/// use plugin_union_core::{Registry, VariantDecl};
///
/// let mut registry = Registry::new();
/// let animal = registry.declare(VariantDecl::new("Animal")).unwrap();
/// let dog = registry
///     .declare(VariantDecl::new("Dog").extends(animal).value("dog"))
///     .unwrap();
///
/// let dog = registry.get(dog).unwrap();
/// assert_eq!(dog.discriminator_field(), "type");
/// assert_eq!(dog.discriminator_value(), Some("dog"));
/// ```
#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub(crate) name: String,
    pub(crate) bases: Vec<VariantId>,
    pub(crate) discriminator_field: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) fields: BTreeMap<String, FieldSpec>,
    pub(crate) config: Option<PluginConfig>,
    pub(crate) check_freeze: Option<bool>,
}

impl VariantDecl {
    /// Starts a declaration for a type called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            discriminator_field: None,
            value: None,
            fields: BTreeMap::new(),
            config: None,
            check_freeze: None,
        }
    }

    /// Adds a base type. May be called more than once.
    pub fn extends(mut self, base: VariantId) -> Self {
        if !self.bases.contains(&base) {
            self.bases.push(base);
        }
        self
    }

    /// Overrides the discriminator field name for this type and its
    /// descendants.
    pub fn discriminator_field(mut self, field: impl Into<String>) -> Self {
        self.discriminator_field = Some(field.into());
        self
    }

    /// Declares the discriminator literal, making this type concrete.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Attaches a [`PluginConfig`].
    pub fn config(mut self, config: PluginConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Enables or disables the frozen-hierarchy check for this type and the
    /// descendants that do not set it themselves.
    pub fn check_freeze(mut self, enabled: bool) -> Self {
        self.check_freeze = Some(enabled);
        self
    }

    /// Name of the type being declared.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A declared type, resolved against its bases.
#[derive(Debug, Clone)]
pub struct Variant {
    pub(crate) id: VariantId,
    pub(crate) name: String,
    pub(crate) bases: Vec<VariantId>,
    pub(crate) declared_field: Option<String>,
    pub(crate) discriminator_field: String,
    pub(crate) discriminator_value: Option<String>,
    pub(crate) fields: FieldTable,
    pub(crate) check_freeze: Option<bool>,
}

impl Variant {
    /// Handle of this variant in its registry.
    pub fn id(&self) -> VariantId {
        self.id
    }

    /// Unique type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct bases in declaration order.
    pub fn bases(&self) -> &[VariantId] {
        &self.bases
    }

    /// Field whose value selects this variant, inherited when not declared.
    pub fn discriminator_field(&self) -> &str {
        &self.discriminator_field
    }

    /// Literal identifying this variant, declared or inherited; `None` for
    /// abstract types.
    pub fn discriminator_value(&self) -> Option<&str> {
        self.discriminator_value.as_deref()
    }

    /// Returns `true` if the type can appear as a union choice.
    pub fn is_concrete(&self) -> bool {
        self.discriminator_value.is_some()
    }

    /// Own and inherited fields, discriminator included.
    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }
}
