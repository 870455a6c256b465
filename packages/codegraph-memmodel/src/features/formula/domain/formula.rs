//! Quantifier-free bit-vector formulas
//!
//! Terms are immutable and shared through `Arc`, so a formula can be held by
//! many path states at once. Constructors fold trivial cases (literal
//! arithmetic, `true`/`false` absorption, nested conjunctions) so that
//! formulas stay small and substitution can decide simple entailments.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Sort of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sort {
    Bool,
    BitVec(u32),
}

/// Binary bit-vector operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BvOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BvOp {
    fn smt_name(&self) -> &'static str {
        match self {
            Self::Add => "bvadd",
            Self::Sub => "bvsub",
            Self::Mul => "bvmul",
            Self::UDiv => "bvudiv",
            Self::SDiv => "bvsdiv",
            Self::URem => "bvurem",
            Self::SRem => "bvsrem",
            Self::And => "bvand",
            Self::Or => "bvor",
            Self::Xor => "bvxor",
            Self::Shl => "bvshl",
            Self::LShr => "bvlshr",
            Self::AShr => "bvashr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    True,
    False,
    /// Bit-vector constant, stored masked to `width`
    Literal {
        value: u128,
        width: u32,
    },
    Var {
        name: String,
        index: Option<u32>,
        sort: Sort,
    },
    /// Application of a versioned uninterpreted function
    Uf {
        name: String,
        index: u32,
        sort: Sort,
        args: Vec<Formula>,
    },
    Bv {
        op: BvOp,
        lhs: Formula,
        rhs: Formula,
    },
    Neg(Formula),
    BvNot(Formula),
    Extend {
        signed: bool,
        extra: u32,
        arg: Formula,
    },
    Extract {
        high: u32,
        low: u32,
        arg: Formula,
    },
    Ite {
        cond: Formula,
        then: Formula,
        otherwise: Formula,
    },
    Eq(Formula, Formula),
    Less {
        strict: bool,
        signed: bool,
        lhs: Formula,
        rhs: Formula,
    },
    Not(Formula),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Formula(Arc<Term>);

#[inline]
fn mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

#[inline]
fn to_signed(value: u128, width: u32) -> i128 {
    if width == 0 || width >= 128 {
        return value as i128;
    }
    if value >> (width - 1) & 1 == 1 {
        value as i128 - (1i128 << width)
    } else {
        value as i128
    }
}

impl Formula {
    #[inline]
    fn new(term: Term) -> Self {
        Formula(Arc::new(term))
    }

    #[inline]
    pub fn term(&self) -> &Term {
        &self.0
    }

    /// Same term object, not just an equal one
    #[inline]
    pub fn ptr_eq(&self, other: &Formula) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn sort(&self) -> Sort {
        match self.term() {
            Term::True
            | Term::False
            | Term::Eq(..)
            | Term::Less { .. }
            | Term::Not(_)
            | Term::And(_)
            | Term::Or(_) => Sort::Bool,
            Term::Literal { width, .. } => Sort::BitVec(*width),
            Term::Var { sort, .. } | Term::Uf { sort, .. } => *sort,
            Term::Bv { lhs, .. } => lhs.sort(),
            Term::Neg(arg) | Term::BvNot(arg) => arg.sort(),
            Term::Extend { extra, arg, .. } => Sort::BitVec(arg.width() + extra),
            Term::Extract { high, low, .. } => Sort::BitVec(high - low + 1),
            Term::Ite { then, .. } => then.sort(),
        }
    }

    /// Bit width, zero for booleans
    pub fn width(&self) -> u32 {
        match self.sort() {
            Sort::Bool => 0,
            Sort::BitVec(w) => w,
        }
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        self.sort() == Sort::Bool
    }

    #[inline]
    pub fn is_true(&self) -> bool {
        matches!(self.term(), Term::True)
    }

    #[inline]
    pub fn is_false(&self) -> bool {
        matches!(self.term(), Term::False)
    }

    pub fn as_literal(&self) -> Option<u128> {
        match self.term() {
            Term::Literal { value, .. } => Some(*value),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    pub fn tt() -> Self {
        Self::new(Term::True)
    }

    pub fn ff() -> Self {
        Self::new(Term::False)
    }

    pub fn boolean(value: bool) -> Self {
        if value {
            Self::tt()
        } else {
            Self::ff()
        }
    }

    pub fn bv(value: i128, width: u32) -> Self {
        Self::literal(value as u128, width)
    }

    fn literal(value: u128, width: u32) -> Self {
        Self::new(Term::Literal {
            value: value & mask(width),
            width,
        })
    }

    /// Unversioned variable, e.g. a base address
    pub fn var(name: impl Into<String>, sort: Sort) -> Self {
        Self::new(Term::Var {
            name: name.into(),
            index: None,
            sort,
        })
    }

    /// SSA-versioned variable `name@index`
    pub fn ssa_var(name: impl Into<String>, index: u32, sort: Sort) -> Self {
        Self::new(Term::Var {
            name: name.into(),
            index: Some(index),
            sort,
        })
    }

    pub fn uf(name: impl Into<String>, index: u32, sort: Sort, args: Vec<Formula>) -> Self {
        Self::new(Term::Uf {
            name: name.into(),
            index,
            sort,
            args,
        })
    }

    // ------------------------------------------------------------------
    // Bit-vector arithmetic
    // ------------------------------------------------------------------

    pub fn bv_op(op: BvOp, lhs: Formula, rhs: Formula) -> Self {
        let width = lhs.width();
        if let (Some(a), Some(b)) = (lhs.as_literal(), rhs.as_literal()) {
            let folded = match op {
                BvOp::Add => Some(a.wrapping_add(b)),
                BvOp::Sub => Some(a.wrapping_sub(b)),
                BvOp::Mul => Some(a.wrapping_mul(b)),
                BvOp::And => Some(a & b),
                BvOp::Or => Some(a | b),
                BvOp::Xor => Some(a ^ b),
                BvOp::UDiv if b != 0 => Some(a / b),
                BvOp::URem if b != 0 => Some(a % b),
                _ => None,
            };
            if let Some(value) = folded {
                return Self::literal(value, width);
            }
        }
        match op {
            BvOp::Add | BvOp::Sub if rhs.as_literal() == Some(0) => return lhs,
            BvOp::Add if lhs.as_literal() == Some(0) => return rhs,
            BvOp::Mul if rhs.as_literal() == Some(1) => return lhs,
            BvOp::Add => {
                // (x + c1) + c2 => x + (c1 + c2)
                if let (Some(c2), Term::Bv { op: BvOp::Add, lhs: x, rhs: c1 }) =
                    (rhs.as_literal(), lhs.term())
                {
                    if let Some(c1) = c1.as_literal() {
                        return Self::add(x.clone(), Self::literal(c1.wrapping_add(c2), width));
                    }
                }
            }
            _ => {}
        }
        Self::new(Term::Bv { op, lhs, rhs })
    }

    pub fn add(lhs: Formula, rhs: Formula) -> Self {
        Self::bv_op(BvOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Formula, rhs: Formula) -> Self {
        Self::bv_op(BvOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Formula, rhs: Formula) -> Self {
        Self::bv_op(BvOp::Mul, lhs, rhs)
    }

    pub fn neg(arg: Formula) -> Self {
        match arg.as_literal() {
            Some(v) => Self::literal(v.wrapping_neg(), arg.width()),
            None => Self::new(Term::Neg(arg)),
        }
    }

    pub fn bv_not(arg: Formula) -> Self {
        match arg.as_literal() {
            Some(v) => Self::literal(!v, arg.width()),
            None => Self::new(Term::BvNot(arg)),
        }
    }

    pub fn extend(arg: Formula, extra: u32, signed: bool) -> Self {
        if extra == 0 {
            return arg;
        }
        let width = arg.width();
        match arg.as_literal() {
            Some(v) if signed => Self::literal(to_signed(v, width) as u128, width + extra),
            Some(v) => Self::literal(v, width + extra),
            None => Self::new(Term::Extend { signed, extra, arg }),
        }
    }

    pub fn extract(arg: Formula, high: u32, low: u32) -> Self {
        if low == 0 && high + 1 == arg.width() {
            return arg;
        }
        match arg.as_literal() {
            Some(v) => Self::literal(v >> low, high - low + 1),
            None => Self::new(Term::Extract { high, low, arg }),
        }
    }

    /// Resize to `width` bits by extension or truncation
    pub fn cast(arg: Formula, width: u32, signed: bool) -> Self {
        let from = arg.width();
        if from < width {
            Self::extend(arg, width - from, signed)
        } else if from > width {
            Self::extract(arg, width - 1, 0)
        } else {
            arg
        }
    }

    pub fn ite(cond: Formula, then: Formula, otherwise: Formula) -> Self {
        if cond.is_true() || then == otherwise {
            then
        } else if cond.is_false() {
            otherwise
        } else {
            Self::new(Term::Ite {
                cond,
                then,
                otherwise,
            })
        }
    }

    // ------------------------------------------------------------------
    // Atoms
    // ------------------------------------------------------------------

    pub fn eq(lhs: Formula, rhs: Formula) -> Self {
        if lhs == rhs {
            return Self::tt();
        }
        match (lhs.term(), rhs.term()) {
            (Term::Literal { value: a, .. }, Term::Literal { value: b, .. }) => Self::boolean(a == b),
            (Term::True | Term::False, Term::True | Term::False) => Self::boolean(lhs == rhs),
            _ => Self::new(Term::Eq(lhs, rhs)),
        }
    }

    fn less(strict: bool, signed: bool, lhs: Formula, rhs: Formula) -> Self {
        if let (Some(a), Some(b)) = (lhs.as_literal(), rhs.as_literal()) {
            let width = lhs.width();
            let holds = if signed {
                let (a, b) = (to_signed(a, width), to_signed(b, width));
                if strict {
                    a < b
                } else {
                    a <= b
                }
            } else if strict {
                a < b
            } else {
                a <= b
            };
            return Self::boolean(holds);
        }
        if lhs == rhs {
            return Self::boolean(!strict);
        }
        Self::new(Term::Less {
            strict,
            signed,
            lhs,
            rhs,
        })
    }

    pub fn lt(lhs: Formula, rhs: Formula, signed: bool) -> Self {
        Self::less(true, signed, lhs, rhs)
    }

    pub fn le(lhs: Formula, rhs: Formula, signed: bool) -> Self {
        Self::less(false, signed, lhs, rhs)
    }

    pub fn gt(lhs: Formula, rhs: Formula, signed: bool) -> Self {
        Self::less(true, signed, rhs, lhs)
    }

    pub fn ge(lhs: Formula, rhs: Formula, signed: bool) -> Self {
        Self::less(false, signed, rhs, lhs)
    }

    // ------------------------------------------------------------------
    // Boolean connectives
    // ------------------------------------------------------------------

    pub fn not(arg: Formula) -> Self {
        match arg.term() {
            Term::True => Self::ff(),
            Term::False => Self::tt(),
            Term::Not(inner) => inner.clone(),
            _ => Self::new(Term::Not(arg)),
        }
    }

    pub fn and(items: impl IntoIterator<Item = Formula>) -> Self {
        let mut flat = Vec::new();
        for item in items {
            match item.term() {
                Term::True => {}
                Term::False => return Self::ff(),
                Term::And(children) => flat.extend(children.iter().cloned()),
                _ => flat.push(item),
            }
        }
        match flat.len() {
            0 => Self::tt(),
            1 => flat.pop().unwrap_or_else(Self::tt),
            _ => Self::new(Term::And(flat)),
        }
    }

    pub fn or(items: impl IntoIterator<Item = Formula>) -> Self {
        let mut flat = Vec::new();
        for item in items {
            match item.term() {
                Term::False => {}
                Term::True => return Self::tt(),
                Term::Or(children) => flat.extend(children.iter().cloned()),
                _ => flat.push(item),
            }
        }
        match flat.len() {
            0 => Self::ff(),
            1 => flat.pop().unwrap_or_else(Self::ff),
            _ => Self::new(Term::Or(flat)),
        }
    }

    pub fn and2(lhs: Formula, rhs: Formula) -> Self {
        Self::and([lhs, rhs])
    }

    pub fn or2(lhs: Formula, rhs: Formula) -> Self {
        Self::or([lhs, rhs])
    }

    pub fn implies(antecedent: Formula, consequent: Formula) -> Self {
        Self::or2(Self::not(antecedent), consequent)
    }

    /// Top-level conjuncts; a non-conjunction is its own single conjunct
    pub fn conjuncts(&self) -> Vec<Formula> {
        match self.term() {
            Term::And(children) => children.clone(),
            Term::True => Vec::new(),
            _ => vec![self.clone()],
        }
    }

    /// Replace every subterm found in `bindings`, re-folding on the way up
    pub fn substitute(&self, bindings: &FxHashMap<Formula, Formula>) -> Formula {
        if let Some(bound) = bindings.get(self) {
            return bound.clone();
        }
        let sub = |f: &Formula| f.substitute(bindings);
        match self.term() {
            Term::True | Term::False | Term::Literal { .. } | Term::Var { .. } => self.clone(),
            Term::Uf {
                name,
                index,
                sort,
                args,
            } => {
                let rebuilt = Self::uf(name.clone(), *index, *sort, args.iter().map(sub).collect());
                // The application itself may be bound once its arguments are concrete
                bindings.get(&rebuilt).cloned().unwrap_or(rebuilt)
            }
            Term::Bv { op, lhs, rhs } => Self::bv_op(*op, sub(lhs), sub(rhs)),
            Term::Neg(arg) => Self::neg(sub(arg)),
            Term::BvNot(arg) => Self::bv_not(sub(arg)),
            Term::Extend { signed, extra, arg } => Self::extend(sub(arg), *extra, *signed),
            Term::Extract { high, low, arg } => Self::extract(sub(arg), *high, *low),
            Term::Ite {
                cond,
                then,
                otherwise,
            } => Self::ite(sub(cond), sub(then), sub(otherwise)),
            Term::Eq(lhs, rhs) => Self::eq(sub(lhs), sub(rhs)),
            Term::Less {
                strict,
                signed,
                lhs,
                rhs,
            } => Self::less(*strict, *signed, sub(lhs), sub(rhs)),
            Term::Not(arg) => Self::not(sub(arg)),
            Term::And(items) => Self::and(items.iter().map(sub)),
            Term::Or(items) => Self::or(items.iter().map(sub)),
        }
    }

    /// Whether `atom` occurs as a conjunct, up to argument order of equalities
    pub fn has_conjunct(&self, atom: &Formula) -> bool {
        let flipped = match atom.term() {
            Term::Eq(a, b) => Some(Self::new(Term::Eq(b.clone(), a.clone()))),
            _ => None,
        };
        self.conjuncts()
            .iter()
            .any(|c| c == atom || flipped.as_ref() == Some(c))
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, head: &str, items: &[Formula]) -> fmt::Result {
    write!(f, "({}", head)?;
    for item in items {
        write!(f, " {}", item)?;
    }
    write!(f, ")")
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term() {
            Term::True => write!(f, "true"),
            Term::False => write!(f, "false"),
            Term::Literal { value, width } => write!(f, "(_ bv{} {})", value, width),
            Term::Var {
                name,
                index: Some(i),
                ..
            } => write!(f, "{}@{}", name, i),
            Term::Var { name, .. } => write!(f, "{}", name),
            Term::Uf {
                name, index, args, ..
            } => write_list(f, &format!("{}@{}", name, index), args),
            Term::Bv { op, lhs, rhs } => write!(f, "({} {} {})", op.smt_name(), lhs, rhs),
            Term::Neg(arg) => write!(f, "(bvneg {})", arg),
            Term::BvNot(arg) => write!(f, "(bvnot {})", arg),
            Term::Extend { signed, extra, arg } => {
                let op = if *signed { "sign_extend" } else { "zero_extend" };
                write!(f, "((_ {} {}) {})", op, extra, arg)
            }
            Term::Extract { high, low, arg } => write!(f, "((_ extract {} {}) {})", high, low, arg),
            Term::Ite {
                cond,
                then,
                otherwise,
            } => write!(f, "(ite {} {} {})", cond, then, otherwise),
            Term::Eq(lhs, rhs) => write!(f, "(= {} {})", lhs, rhs),
            Term::Less {
                strict,
                signed,
                lhs,
                rhs,
            } => {
                let op = match (signed, strict) {
                    (true, true) => "bvslt",
                    (true, false) => "bvsle",
                    (false, true) => "bvult",
                    (false, false) => "bvule",
                };
                write!(f, "({} {} {})", op, lhs, rhs)
            }
            Term::Not(arg) => write!(f, "(not {})", arg),
            Term::And(items) => write_list(f, "and", items),
            Term::Or(items) => write_list(f, "or", items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Formula {
        Formula::ssa_var("x", 1, Sort::BitVec(32))
    }

    #[test]
    fn test_boolean_folding() {
        let atom = Formula::eq(x(), Formula::bv(5, 32));
        assert_eq!(Formula::and([Formula::tt(), atom.clone()]), atom);
        assert!(Formula::and([atom.clone(), Formula::ff()]).is_false());
        assert!(Formula::or([atom.clone(), Formula::tt()]).is_true());
        assert!(Formula::and(Vec::new()).is_true());
        assert!(Formula::or(Vec::new()).is_false());
        assert_eq!(Formula::not(Formula::not(atom.clone())), atom);
    }

    #[test]
    fn test_nested_and_is_flattened() {
        let a = Formula::eq(x(), Formula::bv(1, 32));
        let b = Formula::eq(x(), Formula::bv(2, 32));
        let c = Formula::eq(x(), Formula::bv(3, 32));
        let f = Formula::and([Formula::and2(a.clone(), b.clone()), c.clone()]);
        assert_eq!(f.conjuncts(), vec![a, b, c]);
    }

    #[test]
    fn test_literal_arithmetic() {
        let sum = Formula::add(Formula::bv(250, 8), Formula::bv(10, 8));
        assert_eq!(sum.as_literal(), Some(4));
        assert_eq!(Formula::add(x(), Formula::bv(0, 32)), x());

        let chained = Formula::add(Formula::add(x(), Formula::bv(4, 32)), Formula::bv(4, 32));
        assert_eq!(chained, Formula::add(x(), Formula::bv(8, 32)));
    }

    #[test]
    fn test_signed_comparison_folding() {
        let minus_one = Formula::bv(-1, 8);
        let one = Formula::bv(1, 8);
        assert!(Formula::lt(minus_one.clone(), one.clone(), true).is_true());
        assert!(Formula::lt(minus_one, one, false).is_false());
        assert!(Formula::le(x(), x(), true).is_true());
        assert!(Formula::lt(x(), x(), true).is_false());
    }

    #[test]
    fn test_cast() {
        let c = Formula::bv(-2, 8);
        assert_eq!(Formula::cast(c.clone(), 32, true).as_literal(), Some(0xffff_fffe));
        assert_eq!(Formula::cast(c, 32, false).as_literal(), Some(0xfe));
        assert_eq!(Formula::cast(x(), 8, true).width(), 8);
        assert_eq!(Formula::cast(x(), 32, true), x());
    }

    #[test]
    fn test_substitute_folds() {
        let a = Formula::var("a", Sort::BitVec(32));
        let f = Formula::or2(
            Formula::eq(a.clone(), Formula::bv(8, 32)),
            Formula::eq(x(), Formula::bv(1, 32)),
        );
        let mut bindings = FxHashMap::default();
        bindings.insert(a, Formula::bv(4, 32));
        let reduced = f.substitute(&bindings);
        assert_eq!(reduced, Formula::eq(x(), Formula::bv(1, 32)));
    }

    #[test]
    fn test_display() {
        let f = Formula::eq(
            Formula::uf("*int", 1, Sort::BitVec(32), vec![Formula::var("p", Sort::BitVec(64))]),
            Formula::bv(7, 32),
        );
        assert_eq!(f.to_string(), "(= (*int@1 p) (_ bv7 32))");
        assert_eq!(x().to_string(), "x@1");
    }

    #[test]
    fn test_has_conjunct_ignores_equality_orientation() {
        let a = Formula::var("a", Sort::BitVec(32));
        let eq = Formula::eq(a.clone(), x());
        let f = Formula::and2(Formula::eq(x(), a), Formula::tt());
        assert!(f.has_conjunct(&eq));
    }
}
