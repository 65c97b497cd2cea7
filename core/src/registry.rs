//! Explicit hierarchy registry.
//!
//! The [`Registry`] owns every declared [`Variant`], the parent → children
//! edges used to discover descendants, and the frozen set consulted by the
//! lifecycle guard. Declaration takes `&mut self`, so the freeze check and
//! the insertion of a new descendant happen as one step; share a registry
//! across threads behind a `Mutex` to keep that guarantee.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SchemaError};
use crate::types::{
    DEFAULT_DISCRIMINATOR_FIELD, FieldSpec, FieldTable, Variant, VariantDecl, VariantId,
};

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// Arena of declared variants plus their lifecycle state.
///
/// # Examples
///
/// ```
/// use plugin_union_core::{Registry, VariantDecl};
///
/// let mut registry = Registry::new();
/// let animal = registry.declare(VariantDecl::new("Animal")).unwrap();
/// let dog = registry.declare(VariantDecl::new("Dog").extends(animal).value("dog")).unwrap();
/// let cat = registry.declare(VariantDecl::new("Cat").extends(animal).value("cat")).unwrap();
///
/// let valid = registry.valid_variants(animal).unwrap();
/// assert!(valid.contains(&dog) && valid.contains(&cat));
/// assert!(!valid.contains(&animal));
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    variants: Vec<Variant>,
    children: Vec<Vec<VariantId>>,
    by_name: HashMap<String, VariantId>,
    frozen: HashSet<VariantId>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new variant and returns its handle.
    ///
    /// # Errors
    ///
    /// - [`UnknownVariant`](SchemaError::UnknownVariant) if a base is not
    ///   part of this registry.
    /// - [`DuplicateVariantName`](SchemaError::DuplicateVariantName) if the
    ///   name is taken.
    /// - [`SchemaAlreadyFinalized`](SchemaError::SchemaAlreadyFinalized) if
    ///   any ancestor has been frozen and the freeze check is enabled.
    pub fn declare(&mut self, decl: VariantDecl) -> Result<VariantId> {
        if self.by_name.contains_key(&decl.name) {
            return Err(SchemaError::DuplicateVariantName(decl.name));
        }
        for &base in &decl.bases {
            self.variant(base)?;
        }

        let check_freeze = decl
            .check_freeze
            .unwrap_or_else(|| self.inherited_check_freeze(&decl.bases));
        for &base in &decl.bases {
            self.guard(base, &decl.name, check_freeze)?;
        }

        let config = decl.config.clone().unwrap_or_default();
        let declared_field = config
            .discriminator_field
            .or(decl.discriminator_field.clone());
        let discriminator_field = declared_field
            .clone()
            .or_else(|| self.inherited_field(&decl.bases))
            .unwrap_or_else(|| DEFAULT_DISCRIMINATOR_FIELD.to_string());

        let mut fields = FieldTable::default();
        for (name, spec) in &decl.fields {
            fields.insert(name.clone(), spec.clone());
        }
        for &base in &decl.bases {
            fields.extend_missing(&self.variants[base.0].fields);
        }

        // Own fields come first in the table, so an own literal shadows one
        // inherited from the nearest base.
        let discriminator_value = config.value.or(decl.value.clone()).or_else(|| {
            fields
                .get(&discriminator_field)
                .and_then(|spec| spec.literal.clone())
        });
        wire_discriminator(
            &mut fields,
            &discriminator_field,
            discriminator_value.as_deref(),
        );

        let id = VariantId(self.variants.len());
        debug!(
            variant = %decl.name,
            field = %discriminator_field,
            value = ?discriminator_value,
            bases = decl.bases.len(),
            "Declared variant"
        );
        self.variants.push(Variant {
            id,
            name: decl.name.clone(),
            bases: decl.bases.clone(),
            declared_field,
            discriminator_field,
            discriminator_value,
            fields,
            check_freeze: decl.check_freeze,
        });
        self.children.push(Vec::new());
        for &base in &decl.bases {
            self.children[base.0].push(id);
        }
        self.by_name.insert(decl.name, id);

        Ok(id)
    }

    /// Returns the variant behind `id`.
    pub fn get(&self, id: VariantId) -> Option<&Variant> {
        self.variants.get(id.0)
    }

    /// Finds a variant by name.
    pub fn lookup(&self, name: &str) -> Option<VariantId> {
        self.by_name.get(name).copied()
    }

    /// Number of declared variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns `true` if nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Iterates variants in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    pub(crate) fn variant(&self, id: VariantId) -> Result<&Variant> {
        self.variants
            .get(id.0)
            .ok_or(SchemaError::UnknownVariant(id))
    }

    /// Direct descendants of `id` in declaration order.
    pub fn children(&self, id: VariantId) -> Result<&[VariantId]> {
        self.variant(id)?;
        Ok(&self.children[id.0])
    }

    /// `id` and every transitive descendant, each listed once.
    ///
    /// A type reachable through several bases is visited on the first path
    /// that reaches it.
    pub fn descendants(&self, id: VariantId) -> Result<Vec<VariantId>> {
        self.variant(id)?;
        Ok(self.walk(id, Direction::Down))
    }

    /// `id` followed by its ancestors: bases depth-first in declaration
    /// order, each listed once.
    pub fn ancestors(&self, id: VariantId) -> Result<Vec<VariantId>> {
        self.variant(id)?;
        Ok(self.walk(id, Direction::Up))
    }

    fn walk(&self, start: VariantId, direction: Direction) -> Vec<VariantId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            order.push(node);
            let next = match direction {
                Direction::Down => &self.children[node.0],
                Direction::Up => &self.variants[node.0].bases,
            };
            stack.extend(next.iter().rev());
        }
        order
    }

    /// Concrete variants among `root` and its descendants.
    ///
    /// An empty result is valid: it means nothing under `root` declared a
    /// discriminator literal.
    pub fn valid_variants(&self, root: VariantId) -> Result<BTreeSet<VariantId>> {
        Ok(self
            .descendants(root)?
            .into_iter()
            .filter(|id| self.variants[id.0].is_concrete())
            .collect())
    }

    /// Marks `id` as frozen. Freezing twice is a no-op.
    pub fn freeze(&mut self, id: VariantId) -> Result<()> {
        self.variant(id)?;
        if self.frozen.insert(id) {
            debug!(variant = %self.variants[id.0].name, "Froze variant");
        }
        Ok(())
    }

    /// Returns `true` if `id` or any of its ancestors is frozen.
    pub fn is_frozen(&self, id: VariantId) -> Result<bool> {
        Ok(self.frozen_ancestor(id)?.is_some())
    }

    fn frozen_ancestor(&self, id: VariantId) -> Result<Option<VariantId>> {
        Ok(self
            .ancestors(id)?
            .into_iter()
            .find(|node| self.frozen.contains(node)))
    }

    /// Whether declaring under `id` is checked against the frozen set.
    ///
    /// Resolved from the nearest ancestor that sets the flag; enabled when
    /// none does.
    pub fn freeze_check_enabled(&self, id: VariantId) -> Result<bool> {
        Ok(self
            .ancestors(id)?
            .into_iter()
            .find_map(|node| self.variants[node.0].check_freeze)
            .unwrap_or(true))
    }

    /// Fails if a type named `declared` may not be added under `parent`.
    pub fn check_not_frozen(&self, parent: VariantId, declared: &str) -> Result<()> {
        let enabled = self.freeze_check_enabled(parent)?;
        self.guard(parent, declared, enabled)
    }

    fn guard(&self, parent: VariantId, declared: &str, enabled: bool) -> Result<()> {
        let Some(frozen) = self.frozen_ancestor(parent)? else {
            return Ok(());
        };
        let frozen = self.variants[frozen.0].name.clone();
        if enabled {
            return Err(SchemaError::SchemaAlreadyFinalized {
                declared: declared.to_string(),
                frozen,
            });
        }
        warn!(
            variant = %declared,
            frozen = %frozen,
            "Declaring under a frozen hierarchy with the freeze check disabled; compiled schemas may be stale"
        );
        Ok(())
    }

    fn inherited_check_freeze(&self, bases: &[VariantId]) -> bool {
        bases
            .iter()
            .flat_map(|&base| self.walk(base, Direction::Up))
            .find_map(|node| self.variants[node.0].check_freeze)
            .unwrap_or(true)
    }

    fn inherited_field(&self, bases: &[VariantId]) -> Option<String> {
        bases
            .iter()
            .flat_map(|&base| self.walk(base, Direction::Up))
            .find_map(|node| self.variants[node.0].declared_field.clone())
    }
}

/// Installs the literal constraint and matching default on the
/// discriminator field. Without a literal the field is left as inherited.
fn wire_discriminator(fields: &mut FieldTable, field: &str, value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    let default = Value::String(value.to_string());
    let spec = match fields.get(field).cloned() {
        Some(mut spec) => {
            spec.literal = Some(value.to_string());
            spec.required = true;
            spec.merge_default(default)
        }
        None => FieldSpec::literal(value).merge_default(default),
    };
    fields.insert(field.to_string(), spec);
}
