//! C type descriptions and their canonical form
//!
//! `CType` is the type language consumed from the program representation.
//! `CanonicalType` resolves typedefs, elaborated references, qualifiers and
//! enums to one representative; it is the sole key for target tracking,
//! layout caching and UF naming.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Arithmetic base types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicType {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
}

impl BasicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "_Bool",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::LongLong => "long long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        !matches!(self, Self::Void | Self::Float | Self::Double)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompositeKind {
    Struct,
    Union,
}

impl CompositeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Union => "union",
        }
    }
}

/// Struct or union member declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub ty: CType,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Complete struct or union definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeType {
    pub kind: CompositeKind,
    pub name: String,
    pub members: Vec<Member>,
}

impl CompositeType {
    /// Textual key shared by the definition and every elaborated reference to it
    pub fn key(&self) -> String {
        format!("{} {}", self.kind.as_str(), self.name)
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// C type as written in the program
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CType {
    Simple {
        basic: BasicType,
        unsigned: bool,
    },
    Pointer(Box<CType>),
    Array {
        element: Box<CType>,
        length: Option<u64>,
    },
    Composite(Arc<CompositeType>),
    /// `struct s` reference; `resolved` is `None` for forward declarations
    Elaborated {
        kind: CompositeKind,
        name: String,
        resolved: Option<Arc<CompositeType>>,
    },
    Typedef {
        name: String,
        target: Box<CType>,
    },
    Enum {
        name: String,
    },
    Function {
        return_type: Box<CType>,
        params: Vec<CType>,
        variadic: bool,
    },
    Qualified {
        quals: Qualifiers,
        inner: Box<CType>,
    },
}

impl CType {
    #[inline]
    pub fn simple(basic: BasicType) -> Self {
        CType::Simple {
            basic,
            unsigned: false,
        }
    }

    #[inline]
    pub fn unsigned(basic: BasicType) -> Self {
        CType::Simple {
            basic,
            unsigned: true,
        }
    }

    pub fn void() -> Self {
        Self::simple(BasicType::Void)
    }

    pub fn int() -> Self {
        Self::simple(BasicType::Int)
    }

    pub fn char() -> Self {
        Self::simple(BasicType::Char)
    }

    pub fn long() -> Self {
        Self::simple(BasicType::Long)
    }

    pub fn unsigned_long() -> Self {
        Self::unsigned(BasicType::Long)
    }

    pub fn pointer_to(target: CType) -> Self {
        CType::Pointer(Box::new(target))
    }

    pub fn array_of(element: CType, length: Option<u64>) -> Self {
        CType::Array {
            element: Box::new(element),
            length,
        }
    }

    pub fn composite(kind: CompositeKind, name: impl Into<String>, members: Vec<Member>) -> Self {
        CType::Composite(Arc::new(CompositeType {
            kind,
            name: name.into(),
            members,
        }))
    }

    pub fn struct_type(name: impl Into<String>, members: Vec<Member>) -> Self {
        Self::composite(CompositeKind::Struct, name, members)
    }

    pub fn union_type(name: impl Into<String>, members: Vec<Member>) -> Self {
        Self::composite(CompositeKind::Union, name, members)
    }

    /// Forward reference to a struct, as used in self-referential members
    pub fn elaborated_struct(name: impl Into<String>) -> Self {
        CType::Elaborated {
            kind: CompositeKind::Struct,
            name: name.into(),
            resolved: None,
        }
    }

    pub fn typedef(name: impl Into<String>, target: CType) -> Self {
        CType::Typedef {
            name: name.into(),
            target: Box::new(target),
        }
    }

    pub fn const_of(inner: CType) -> Self {
        CType::Qualified {
            quals: Qualifiers {
                is_const: true,
                is_volatile: false,
            },
            inner: Box::new(inner),
        }
    }

    pub fn function(return_type: CType, params: Vec<CType>) -> Self {
        CType::Function {
            return_type: Box::new(return_type),
            params,
            variadic: false,
        }
    }

    /// Strip typedefs, qualifiers and elaboration, map enums to `int`
    pub fn canonicalize(&self) -> CType {
        match self {
            CType::Simple { .. } | CType::Composite(_) => self.clone(),
            CType::Pointer(target) => CType::Pointer(Box::new(target.canonicalize())),
            CType::Array { element, length } => CType::Array {
                element: Box::new(element.canonicalize()),
                length: *length,
            },
            CType::Elaborated {
                resolved: Some(def),
                ..
            } => CType::Composite(def.clone()),
            CType::Elaborated { kind, name, .. } => CType::Elaborated {
                kind: *kind,
                name: name.clone(),
                resolved: None,
            },
            CType::Typedef { target, .. } => target.canonicalize(),
            CType::Enum { .. } => CType::int(),
            CType::Function {
                return_type,
                params,
                variadic,
            } => CType::Function {
                return_type: Box::new(return_type.canonicalize()),
                params: params.iter().map(CType::canonicalize).collect(),
                variadic: *variadic,
            },
            CType::Qualified { inner, .. } => inner.canonicalize(),
        }
    }

    fn write_key(&self, out: &mut String) {
        match self {
            CType::Simple { basic, unsigned } => {
                if *unsigned && basic.is_integer() {
                    out.push_str("unsigned ");
                }
                out.push_str(basic.as_str());
            }
            CType::Pointer(target) => {
                target.write_key(out);
                out.push('*');
            }
            CType::Array { element, length } => {
                element.write_key(out);
                match length {
                    Some(n) => out.push_str(&format!("[{}]", n)),
                    None => out.push_str("[]"),
                }
            }
            CType::Composite(def) => out.push_str(&def.key()),
            CType::Elaborated { kind, name, .. } => {
                out.push_str(kind.as_str());
                out.push(' ');
                out.push_str(name);
            }
            CType::Typedef { target, .. } => target.write_key(out),
            CType::Enum { .. } => out.push_str("int"),
            CType::Function {
                return_type,
                params,
                variadic,
            } => {
                return_type.write_key(out);
                out.push('(');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    param.write_key(out);
                }
                if *variadic {
                    out.push_str(if params.is_empty() { "..." } else { ",..." });
                }
                out.push(')');
            }
            CType::Qualified { inner, .. } => inner.write_key(out),
        }
    }
}

/// Canonical representative of a C type
///
/// Equality, hashing and ordering go through the textual key, so two types
/// are equal iff their canonical forms print identically.
#[derive(Clone)]
pub struct CanonicalType {
    ty: Arc<CType>,
    key: Arc<str>,
}

impl CanonicalType {
    pub fn of(ty: &CType) -> Self {
        let canonical = ty.canonicalize();
        let mut key = String::new();
        canonical.write_key(&mut key);
        Self {
            ty: Arc::new(canonical),
            key: key.into(),
        }
    }

    #[inline]
    pub fn ty(&self) -> &CType {
        &self.ty
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the uninterpreted function modeling memory of this type
    pub fn uf_name(&self) -> String {
        format!("*{}", self.key.replace(' ', "_"))
    }

    pub fn void() -> Self {
        Self::of(&CType::void())
    }

    pub fn int() -> Self {
        Self::of(&CType::int())
    }

    pub fn char() -> Self {
        Self::of(&CType::char())
    }

    /// Placeholder type reserving `size` bytes of address space
    pub fn fake_base(size: u64) -> Self {
        Self::of(&CType::array_of(CType::void(), Some(size)))
    }

    pub fn pointer_to(&self) -> Self {
        Self::of(&CType::pointer_to(self.ty().clone()))
    }

    pub fn array_of(&self, length: Option<u64>) -> Self {
        Self::of(&CType::array_of(self.ty().clone(), length))
    }

    pub fn pointee(&self) -> Option<CanonicalType> {
        match self.ty() {
            CType::Pointer(target) => Some(Self::of(target)),
            _ => None,
        }
    }

    /// Element type and declared length of an array type
    pub fn array_element(&self) -> Option<(CanonicalType, Option<u64>)> {
        match self.ty() {
            CType::Array { element, length } => Some((Self::of(element), *length)),
            _ => None,
        }
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self.ty(), CType::Pointer(_))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.ty(), CType::Array { .. })
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(self.ty(), CType::Composite(_) | CType::Elaborated { .. })
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self.ty(), CType::Function { .. })
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(
            self.ty(),
            CType::Simple {
                basic: BasicType::Void,
                ..
            }
        )
    }

    /// Pointer to `void`, the type of untyped allocation results
    pub fn is_void_pointer(&self) -> bool {
        self.pointee().map_or(false, |t| t.is_void())
    }

    /// Unsigned integers and pointers compare unsigned
    pub fn is_unsigned(&self) -> bool {
        match self.ty() {
            CType::Simple { basic, unsigned } => *unsigned || *basic == BasicType::Bool,
            CType::Pointer(_) => true,
            _ => false,
        }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self.ty(), CType::Simple { .. } | CType::Pointer(_))
    }

    /// Whether this type is an array, or a composite containing one at any depth
    pub fn contains_array(&self) -> bool {
        fn walk(ty: &CType) -> bool {
            match ty.canonicalize() {
                CType::Array { .. } => true,
                CType::Composite(def) => def.members.iter().any(|m| walk(&m.ty)),
                _ => false,
            }
        }
        walk(self.ty())
    }
}

impl PartialEq for CanonicalType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CanonicalType {}

impl Hash for CanonicalType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for CanonicalType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Debug for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalType({})", self.key)
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl From<&CType> for CanonicalType {
    fn from(ty: &CType) -> Self {
        Self::of(ty)
    }
}

impl Serialize for CanonicalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ty.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CanonicalType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        CType::deserialize(deserializer).map(|ty| Self::of(&ty))
    }
}
