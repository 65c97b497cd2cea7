//! Declarative hierarchy manifests.
//!
//! A manifest lists variants in declaration order plus named union
//! expressions over them, and applies them to a [`Registry`].
//!
//! # Example YAML
//!
//! ```yaml
//! discriminator_field: type
//! variants:
//!   - name: Animal
//!     fields:
//!       name:
//!         required: true
//!         description: Display name
//!   - name: Dog
//!     extends: [Animal]
//!     value: dog
//!   - name: Cat
//!     extends: [Animal]
//!     value: cat
//! unions:
//!   pets:
//!     hierarchy: Animal
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use plugin_union_core::{Expr, FieldSpec, Registry, VariantDecl, VariantId, and_, or_};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ManifestError, Result};

/// One variant declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantEntry {
    /// Unique type name.
    pub name: String,
    /// Base type names, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    /// Discriminator field override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_field: Option<String>,
    /// Discriminator literal; inherited from the bases when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Fields declared by this type.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldSpec>,
}

/// Union expression over variant names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExprSpec {
    /// All concrete variants at or below the named type.
    Hierarchy(String),
    /// Intersection of every operand.
    And(Vec<ExprSpec>),
    /// Union of every operand.
    Or(Vec<ExprSpec>),
}

/// Hierarchy and union definitions loaded from YAML or JSON.
///
/// # Examples
///
/// ```
/// use plugin_union_core::Registry;
/// use plugin_union_manifest::HierarchyManifest;
///
/// let manifest = HierarchyManifest::from_yaml_str(
///     "variants:\n  - name: Animal\n  - name: Dog\n    extends: [Animal]\n    value: dog\n",
/// )
/// .unwrap();
///
/// let mut registry = Registry::new();
/// let declared = manifest.declare_into(&mut registry).unwrap();
/// assert!(declared.id("Dog").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyManifest {
    /// Discriminator field for root types that do not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_field: Option<String>,
    /// Variants in declaration order; bases must come first.
    #[serde(default)]
    pub variants: Vec<VariantEntry>,
    /// Named union expressions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unions: BTreeMap<String, ExprSpec>,
}

/// Handles produced by [`HierarchyManifest::declare_into`].
#[derive(Debug, Clone, Default)]
pub struct DeclaredManifest {
    variants: BTreeMap<String, VariantId>,
    unions: BTreeMap<String, Expr>,
}

impl DeclaredManifest {
    /// Handle of a variant declared by the manifest.
    pub fn id(&self, name: &str) -> Option<VariantId> {
        self.variants.get(name).copied()
    }

    /// Resolved expression for a named union.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownUnion`](ManifestError::UnknownUnion) if the manifest
    /// does not define `name`.
    pub fn expr(&self, name: &str) -> Result<&Expr> {
        self.unions
            .get(name)
            .ok_or_else(|| ManifestError::UnknownUnion(name.to_string()))
    }
}

impl HierarchyManifest {
    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ManifestError::IoError) if the file cannot be
    /// read, or [`YamlError`](ManifestError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let manifest = serde_yaml::from_reader(reader)?;
        Ok(manifest)
    }

    /// Saves the manifest as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Parses a manifest from YAML text.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Parses a manifest from JSON text.
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Checks the manifest for structural problems without touching a
    /// registry.
    fn validate(&self) -> Result<()> {
        for entry in &self.variants {
            if entry.name.trim().is_empty() {
                return Err(ManifestError::InvalidManifest(
                    "variant name cannot be empty".to_string(),
                ));
            }
        }
        for (name, spec) in &self.unions {
            check_operands(name, spec)?;
        }
        Ok(())
    }

    /// Declares every variant in order and resolves the named unions.
    ///
    /// Base names may refer to variants declared earlier in the manifest or
    /// already present in `registry`.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid entry; variants declared before it stay in
    /// the registry.
    pub fn declare_into(&self, registry: &mut Registry) -> Result<DeclaredManifest> {
        self.validate()?;
        let mut declared = DeclaredManifest::default();

        for entry in &self.variants {
            let mut decl = VariantDecl::new(entry.name.clone());
            for base in &entry.extends {
                let id = registry
                    .lookup(base)
                    .ok_or_else(|| ManifestError::UnknownVariant(base.clone()))?;
                decl = decl.extends(id);
            }

            let field = entry.discriminator_field.clone().or_else(|| {
                entry
                    .extends
                    .is_empty()
                    .then(|| self.discriminator_field.clone())
                    .flatten()
            });
            if let Some(field) = field {
                decl = decl.discriminator_field(field);
            }
            if let Some(value) = &entry.value {
                decl = decl.value(value.clone());
            }
            for (name, spec) in &entry.fields {
                decl = decl.field(name.clone(), spec.clone());
            }

            let id = registry.declare(decl)?;
            declared.variants.insert(entry.name.clone(), id);
        }

        for (name, spec) in &self.unions {
            let expr = resolve(spec, registry)?;
            declared.unions.insert(name.clone(), expr);
        }

        debug!(
            variants = declared.variants.len(),
            unions = declared.unions.len(),
            "Declared manifest"
        );
        Ok(declared)
    }
}

fn check_operands(union: &str, spec: &ExprSpec) -> Result<()> {
    match spec {
        ExprSpec::Hierarchy(_) => Ok(()),
        ExprSpec::And(items) | ExprSpec::Or(items) => {
            if items.is_empty() {
                return Err(ManifestError::InvalidManifest(format!(
                    "union {union} has an operator with no operands"
                )));
            }
            items.iter().try_for_each(|item| check_operands(union, item))
        }
    }
}

fn resolve(spec: &ExprSpec, registry: &Registry) -> Result<Expr> {
    let fold = |items: &[ExprSpec], join: fn(Expr, Expr) -> Expr| -> Result<Expr> {
        let mut resolved = items.iter().map(|item| resolve(item, registry));
        let first = resolved.next().ok_or_else(|| {
            ManifestError::InvalidManifest("operator with no operands".to_string())
        })??;
        resolved.try_fold(first, |acc, next| Ok(join(acc, next?)))
    };

    match spec {
        ExprSpec::Hierarchy(name) => registry
            .lookup(name)
            .map(Expr::Hierarchy)
            .ok_or_else(|| ManifestError::UnknownVariant(name.clone())),
        ExprSpec::And(items) => fold(items, |a, b| and_(a, b)),
        ExprSpec::Or(items) => fold(items, |a, b| or_(a, b)),
    }
}
