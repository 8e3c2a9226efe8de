//! Static Types
//!
//! The resolved static type attached to expressions by the front-end. The
//! lowering core never infers types; it only inspects them to decide between
//! native and runtime-mediated emission (nullability, array rank, generics,
//! the 64-bit integer family).

/// Owner of a type parameter (where it was declared)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParamOwner {
    /// Declared on the enclosing type
    Type,
    /// Declared on the enclosing method
    Method,
}

/// A reference to a type parameter, with its resolved constraint
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamRef {
    /// Parameter name as declared
    pub name: String,
    /// Declaring site
    pub owner: TypeParamOwner,
    /// Reference/interface constraint, if any. A constrained parameter
    /// lowers identically to its bound; an unconstrained one erases.
    pub constraint: Option<Box<Ty>>,
}

/// A named class/interface/struct type, possibly generic-instantiated
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTy {
    /// Fully resolved type name
    pub name: String,
    /// Instantiated generic arguments (empty for non-generic types)
    pub type_args: Vec<Ty>,
}

impl NamedTy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, type_args: Vec<Ty>) -> Self {
        Self {
            name: name.into(),
            type_args,
        }
    }
}

/// A resolved static type
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    /// No value (method returns, statement expressions)
    Void,
    Bool,
    /// 32-bit signed integer, representable in the target numeric model
    Int,
    /// 64-bit signed integer; bitwise operators on it have no target support
    Long,
    /// 64-bit unsigned integer; same restriction as `Long`
    ULong,
    Double,
    String,
    /// Root reference type
    Object,
    /// Value type lifted to admit "no value"
    Nullable(Box<Ty>),
    /// Array type; `rank == 1` is a native array, `rank >= 2` is rectangular
    Array {
        /// Element type
        elem: Box<Ty>,
        /// Number of dimensions
        rank: u32,
    },
    /// Named class/interface/struct reference
    Named(NamedTy),
    /// Method or type generic parameter
    TypeParam(TypeParamRef),
    /// Function-typed value (delegate)
    Delegate {
        /// Parameter types
        params: Vec<Ty>,
        /// Return type
        ret: Box<Ty>,
    },
}

impl Ty {
    /// Single-dimension array of `elem`
    pub fn array(elem: Ty) -> Ty {
        Ty::Array {
            elem: Box::new(elem),
            rank: 1,
        }
    }

    /// Rectangular array of `elem` with the given rank
    pub fn rect_array(elem: Ty, rank: u32) -> Ty {
        Ty::Array {
            elem: Box::new(elem),
            rank,
        }
    }

    pub fn nullable(inner: Ty) -> Ty {
        Ty::Nullable(Box::new(inner))
    }

    pub fn named(name: impl Into<String>) -> Ty {
        Ty::Named(NamedTy::new(name))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Ty::Nullable(_))
    }

    /// The underlying type with any `Nullable` wrapper removed
    pub fn strip_nullable(&self) -> &Ty {
        match self {
            Ty::Nullable(inner) => inner,
            other => other,
        }
    }

    /// True for the 64-bit integer family (through a `Nullable` wrapper too),
    /// which the target numeric model cannot apply bitwise operators to.
    pub fn is_int64_family(&self) -> bool {
        matches!(self.strip_nullable(), Ty::Long | Ty::ULong)
    }

    /// True when this is an array type of any rank
    pub fn is_array(&self) -> bool {
        matches!(self, Ty::Array { .. })
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Void => write!(f, "void"),
            Ty::Bool => write!(f, "bool"),
            Ty::Int => write!(f, "int"),
            Ty::Long => write!(f, "long"),
            Ty::ULong => write!(f, "ulong"),
            Ty::Double => write!(f, "double"),
            Ty::String => write!(f, "string"),
            Ty::Object => write!(f, "object"),
            Ty::Nullable(inner) => write!(f, "{}?", inner),
            Ty::Array { elem, rank } => {
                write!(f, "{}[{}]", elem, ",".repeat((*rank as usize).saturating_sub(1)))
            }
            Ty::Named(named) => {
                write!(f, "{}", named.name)?;
                if !named.type_args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in named.type_args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::TypeParam(p) => write!(f, "{}", p.name),
            Ty::Delegate { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
        }
    }
}
