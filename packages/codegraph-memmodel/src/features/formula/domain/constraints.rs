//! Side constraints accumulated while encoding one edge

use super::formula::Formula;

#[derive(Debug, Clone, Default)]
pub struct Constraints {
    items: Vec<Formula>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint; trivially true ones are dropped
    pub fn add(&mut self, constraint: Formula) {
        if !constraint.is_true() {
            self.items.push(constraint);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Formula> {
        self.items.iter()
    }

    pub fn into_formula(self) -> Formula {
        Formula::and(self.items)
    }
}

impl Extend<Formula> for Constraints {
    fn extend<I: IntoIterator<Item = Formula>>(&mut self, iter: I) {
        for constraint in iter {
            self.add(constraint);
        }
    }
}
