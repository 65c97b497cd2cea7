//! Boolean composition of hierarchies.
//!
//! An [`Expr`] is a plain value tree. Evaluating it through
//! [`Registry::evaluate`] walks the live hierarchy every time, so variants
//! declared between two evaluations are picked up by the second one.
//!
//! # Examples
//!
//! ```
//! use plugin_union_core::{Registry, VariantDecl, and_, or_};
//!
//! let mut registry = Registry::new();
//! let a = registry.declare(VariantDecl::new("A")).unwrap();
//! let b = registry.declare(VariantDecl::new("B")).unwrap();
//! let both = registry
//!     .declare(VariantDecl::new("Both").extends(a).extends(b).value("both"))
//!     .unwrap();
//! let only_a = registry.declare(VariantDecl::new("OnlyA").extends(a).value("a")).unwrap();
//!
//! assert_eq!(registry.evaluate(&and_(a, b)).unwrap().len(), 1);
//! assert!(registry.evaluate(&or_(a, b)).unwrap().contains(&only_a));
//! # let _ = both;
//! ```

use std::collections::BTreeSet;

use tracing::debug;

use crate::Registry;
use crate::error::Result;
use crate::types::VariantId;

/// AND/OR expression over hierarchy roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Every concrete variant at or below a root.
    Hierarchy(VariantId),
    /// Variants present on both sides.
    And(Box<Expr>, Box<Expr>),
    /// Variants present on either side.
    Or(Box<Expr>, Box<Expr>),
}

impl From<VariantId> for Expr {
    fn from(id: VariantId) -> Self {
        Expr::Hierarchy(id)
    }
}

/// Builds `a AND b`.
pub fn and_(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::And(Box::new(a.into()), Box::new(b.into()))
}

/// Builds `a OR b`.
pub fn or_(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::Or(Box::new(a.into()), Box::new(b.into()))
}

impl Expr {
    /// Left-folds `items` with AND. Returns `None` for no items.
    pub fn all<I>(items: I) -> Option<Expr>
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        items.into_iter().map(Into::<Expr>::into).reduce(|a, b| and_(a, b))
    }

    /// Left-folds `items` with OR. Returns `None` for no items.
    pub fn any<I>(items: I) -> Option<Expr>
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        items.into_iter().map(Into::<Expr>::into).reduce(|a, b| or_(a, b))
    }

    /// Hierarchy roots referenced by the expression, left to right.
    pub fn roots(&self) -> Vec<VariantId> {
        let mut roots = Vec::new();
        self.collect_roots(&mut roots);
        roots
    }

    fn collect_roots(&self, out: &mut Vec<VariantId>) {
        match self {
            Expr::Hierarchy(id) => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_roots(out);
                b.collect_roots(out);
            }
        }
    }
}

impl Registry {
    /// Resolves `expr` to a set of concrete variants.
    ///
    /// AND stops at an empty left operand without visiting the right one.
    pub fn evaluate(&self, expr: &Expr) -> Result<BTreeSet<VariantId>> {
        let resolved = match expr {
            Expr::Hierarchy(root) => self.valid_variants(*root)?,
            Expr::And(a, b) => {
                let left = self.evaluate(a)?;
                if left.is_empty() {
                    return Ok(left);
                }
                let right = self.evaluate(b)?;
                left.intersection(&right).copied().collect()
            }
            Expr::Or(a, b) => {
                let mut left = self.evaluate(a)?;
                left.extend(self.evaluate(b)?);
                left
            }
        };
        debug!(variants = resolved.len(), "Evaluated expression");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariantDecl;

    struct Fixture {
        registry: Registry,
        base1: VariantId,
        base2: VariantId,
        shared: VariantId,
        only1: VariantId,
        only2: VariantId,
    }

    fn fixture() -> Fixture {
        let mut registry = Registry::new();
        let base1 = registry.declare(VariantDecl::new("Base1")).unwrap();
        let base2 = registry.declare(VariantDecl::new("Base2")).unwrap();
        let shared = registry
            .declare(
                VariantDecl::new("Shared")
                    .extends(base1)
                    .extends(base2)
                    .value("shared"),
            )
            .unwrap();
        let only1 = registry
            .declare(VariantDecl::new("Only1").extends(base1).value("one"))
            .unwrap();
        let only2 = registry
            .declare(VariantDecl::new("Only2").extends(base2).value("two"))
            .unwrap();
        Fixture {
            registry,
            base1,
            base2,
            shared,
            only1,
            only2,
        }
    }

    #[test]
    fn test_and_is_intersection() {
        let f = fixture();
        let result = f.registry.evaluate(&and_(f.base1, f.base2)).unwrap();
        assert_eq!(result, BTreeSet::from([f.shared]));
    }

    #[test]
    fn test_or_is_union() {
        let f = fixture();
        let result = f.registry.evaluate(&or_(f.base1, f.base2)).unwrap();
        assert_eq!(result, BTreeSet::from([f.shared, f.only1, f.only2]));
    }

    #[test]
    fn test_operand_order_is_irrelevant() {
        let f = fixture();
        let r = &f.registry;
        assert_eq!(
            r.evaluate(&and_(f.base1, f.base2)).unwrap(),
            r.evaluate(&and_(f.base2, f.base1)).unwrap()
        );
        assert_eq!(
            r.evaluate(&or_(f.base1, f.base2)).unwrap(),
            r.evaluate(&or_(f.base2, f.base1)).unwrap()
        );
    }

    #[test]
    fn test_mixed_nesting() {
        let f = fixture();
        let expr = and_(or_(f.only1, f.only2), f.base2);
        assert_eq!(
            f.registry.evaluate(&expr).unwrap(),
            BTreeSet::from([f.only2])
        );
    }

    #[test]
    fn test_and_with_empty_side_is_empty() {
        let mut f = fixture();
        let empty = f.registry.declare(VariantDecl::new("Empty")).unwrap();
        assert!(f.registry.evaluate(&and_(empty, f.base1)).unwrap().is_empty());
        assert!(f.registry.evaluate(&and_(f.base1, empty)).unwrap().is_empty());
    }

    #[test]
    fn test_folds_chain_left_associatively() {
        let f = fixture();
        let expr = Expr::any([f.only1, f.only2, f.shared]).unwrap();
        assert_eq!(expr, or_(or_(f.only1, f.only2), f.shared));
        assert_eq!(f.registry.evaluate(&expr).unwrap().len(), 3);

        let expr = Expr::all([f.base1, f.base2, f.shared]).unwrap();
        assert_eq!(
            f.registry.evaluate(&expr).unwrap(),
            BTreeSet::from([f.shared])
        );
        assert!(Expr::all(Vec::<VariantId>::new()).is_none());
    }

    #[test]
    fn test_roots_deduplicated_in_order() {
        let f = fixture();
        let expr = or_(and_(f.base1, f.base2), f.base1);
        assert_eq!(expr.roots(), vec![f.base1, f.base2]);
    }

    #[test]
    fn test_evaluate_sees_later_declarations() {
        let mut f = fixture();
        let expr = or_(f.base1, f.base2);
        assert_eq!(f.registry.evaluate(&expr).unwrap().len(), 3);

        let late = f
            .registry
            .declare(VariantDecl::new("Late").extends(f.base1).value("late"))
            .unwrap();
        let second = f.registry.evaluate(&expr).unwrap();
        assert_eq!(second.len(), 4);
        assert!(second.contains(&late));
    }
}
