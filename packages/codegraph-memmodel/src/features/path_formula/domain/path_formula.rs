//! Path formula value type

use crate::features::formula::Formula;
use crate::features::pointer_target_set::PointerTargetSet;
use crate::features::ssa::SsaMap;
use std::fmt;

/// Formula of a set of paths together with the state its last writes left
///
/// All four components are persistent; cloning is O(1) and two path
/// formulas derived from the same prefix share that prefix's structure.
#[derive(Debug, Clone)]
pub struct PathFormula {
    formula: Formula,
    ssa: SsaMap,
    pts: PointerTargetSet,
    length: usize,
}

impl PathFormula {
    /// `true` with no variables, no bases and length zero
    pub fn empty() -> Self {
        Self {
            formula: Formula::tt(),
            ssa: SsaMap::empty(),
            pts: PointerTargetSet::empty(),
            length: 0,
        }
    }

    pub fn new(formula: Formula, ssa: SsaMap, pts: PointerTargetSet, length: usize) -> Self {
        Self {
            formula,
            ssa,
            pts,
            length,
        }
    }

    #[inline]
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    #[inline]
    pub fn ssa(&self) -> &SsaMap {
        &self.ssa
    }

    #[inline]
    pub fn pts(&self) -> &PointerTargetSet {
        &self.pts
    }

    /// Number of non-blank edges the formula covers (maximum over merged paths)
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Same state under a different formula
    pub fn with_formula(&self, formula: Formula) -> Self {
        Self {
            formula,
            ..self.clone()
        }
    }
}

impl Default for PathFormula {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for PathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (length {})", self.formula, self.length)
    }
}
