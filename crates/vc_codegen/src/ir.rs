//! The statements and expressions procedures are built from.
//!
//! Every node renders as pseudo-source (`Display`). The rendering is
//! deterministic and is what [`ProcedureBuilder::listing`] prints.
//!
//! [`ProcedureBuilder::listing`]: crate::ProcedureBuilder::listing

use core::any::Any;
use core::fmt;
use std::collections::BTreeMap;

use vc_schema::TypeInfo;

use crate::hooks::{DumpHook, LoadHook};

// -----------------------------------------------------------------------------
// Direction

/// Whether a procedure loads (tree to value) or dumps (value to tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Load,
    Dump,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Dump => "dump",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// Signature

/// Default marker of an optional trailing parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// No value was supplied.
    Missing,
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("MISSING"),
        }
    }
}

/// Parameter list of a procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    direction: Direction,
    params: Box<[Box<str>]>,
    default: Option<Sentinel>,
}

impl Signature {
    pub fn new(direction: Direction, params: &[&str], default: Option<Sentinel>) -> Self {
        Self {
            direction,
            params: params.iter().map(|&param| param.into()).collect(),
            default,
        }
    }

    /// `(v1, d=MISSING)`
    pub fn load() -> Self {
        Self::new(Direction::Load, &["v1", "d"], Some(Sentinel::Missing))
    }

    /// `(o)`
    pub fn dump() -> Self {
        Self::new(Direction::Dump, &["o"], None)
    }

    pub fn of(direction: Direction) -> Self {
        match direction {
            Direction::Load => Self::load(),
            Direction::Dump => Self::dump(),
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn params(&self) -> &[Box<str>] {
        &self.params
    }

    /// The parameter carrying the value being converted.
    #[inline]
    pub fn value_param(&self) -> Option<&str> {
        self.params.first().map(|param| &**param)
    }

    #[inline]
    pub fn default(&self) -> Option<Sentinel> {
        self.default
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(param)?;
            if i == last
                && let Some(default) = self.default
            {
                write!(f, "={default}")?;
            }
        }
        f.write_str(")")
    }
}

// -----------------------------------------------------------------------------
// Binding

/// Value of a free variable, bound when the procedure is built.
#[derive(Clone)]
pub enum Binding {
    /// Type information: `cls`, scalar helpers and container helpers.
    Type(&'static TypeInfo),
    LoadHook(LoadHook),
    DumpHook(DumpHook),
    /// Factory of a field's default value.
    Default(fn() -> Box<dyn Any>),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(info) => write!(f, "{}", info.type_name()),
            Self::LoadHook(_) => f.write_str("<load hook>"),
            Self::DumpHook(_) => f.write_str("<dump hook>"),
            Self::Default(_) => f.write_str("<default>"),
        }
    }
}

/// Free variables of one procedure, ordered by name.
pub type Locals = BTreeMap<Box<str>, Binding>;

// -----------------------------------------------------------------------------
// Operand

/// Where the value being converted comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A parameter or a binder, `v1`.
    Var(Box<str>),
    /// A mapping entry, `v1['key']`. May be absent.
    Key { base: Box<str>, key: Box<str> },
    /// A sequence element, `v1[0]`.
    Item { base: Box<str>, index: usize },
    /// A record field, `o.name`. `owner` names the bound record info.
    Attr {
        base: Box<str>,
        owner: Box<str>,
        index: usize,
        name: Box<str>,
    },
    /// A tuple element, `o[0]`. `owner` names the bound tuple info.
    Element {
        base: Box<str>,
        owner: Box<str>,
        index: usize,
    },
}

impl Operand {
    #[inline]
    pub fn var(name: impl Into<Box<str>>) -> Self {
        Self::Var(name.into())
    }

    /// The variable this operand reads from.
    pub fn base(&self) -> &str {
        match self {
            Self::Var(base)
            | Self::Key { base, .. }
            | Self::Item { base, .. }
            | Self::Attr { base, .. }
            | Self::Element { base, .. } => base,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::Key { base, key } => write!(f, "{base}[{key:?}]"),
            Self::Item { base, index } | Self::Element { base, index, .. } => {
                write!(f, "{base}[{index}]")
            }
            Self::Attr { base, name, .. } => write!(f, "{base}.{name}"),
        }
    }
}

// -----------------------------------------------------------------------------
// Expr

/// A call of a generated procedure, `load_Node(v1['next'])`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallExpr {
    pub name: Box<str>,
    pub arg: Operand,
}

impl fmt::Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arg)
    }
}

/// An expression producing a converted value.
///
/// Container expressions introduce binders, the names their inner
/// expressions use for each contained value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A bound scalar helper or hook applied to a value.
    Leaf { helper: Box<str>, arg: Operand },
    Call(CallExpr),
    Optional {
        helper: Box<str>,
        arg: Operand,
        binder: Box<str>,
        inner: Box<Expr>,
    },
    Boxed {
        helper: Box<str>,
        arg: Operand,
        binder: Box<str>,
        inner: Box<Expr>,
    },
    List {
        helper: Box<str>,
        arg: Operand,
        binder: Box<str>,
        item: Box<Expr>,
    },
    Map {
        helper: Box<str>,
        arg: Operand,
        key_binder: Box<str>,
        key: Box<Expr>,
        value_binder: Box<str>,
        value: Box<Expr>,
    },
    /// One alternative per union variant, all reading the value through
    /// `binder`. Loading keeps the first alternative that converts.
    Union {
        helper: Box<str>,
        arg: Operand,
        binder: Box<str>,
        variants: Vec<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { helper, arg } => write!(f, "{helper}({arg})"),
            Self::Call(call) => fmt::Display::fmt(call, f),
            Self::Optional {
                helper,
                arg,
                binder,
                inner,
            }
            | Self::Boxed {
                helper,
                arg,
                binder,
                inner,
            }
            | Self::List {
                helper,
                arg,
                binder,
                item: inner,
            } => write!(f, "{helper}({arg}, lambda {binder}: {inner})"),
            Self::Map {
                helper,
                arg,
                key_binder,
                key,
                value_binder,
                value,
            } => write!(
                f,
                "{helper}({arg}, lambda {key_binder}: {key}, lambda {value_binder}: {value})"
            ),
            Self::Union {
                helper,
                arg,
                binder,
                variants,
            } => {
                write!(f, "{helper}({arg}, lambda {binder}: [")?;
                for (i, variant) in variants.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{variant}")?;
                }
                f.write_str("])")
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Stmt

/// One statement of a procedure body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// Load: the value must be a mapping.
    BeginMapping { arg: Operand },
    /// Load: the value must be a sequence of `min..=len` elements.
    BeginSequence { arg: Operand, min: usize, len: usize },
    /// Load: fail on mapping keys outside `keys`.
    RejectUnknownKeys { arg: Operand, keys: Box<[Box<str>]> },
    /// Load: `f{slot} = value`, or the bound default when `arg` is absent.
    Assign {
        slot: usize,
        arg: Operand,
        value: Expr,
        default: Option<Box<str>>,
    },
    /// Load: build the bound record or tuple from the assigned slots.
    Construct { cls: Box<str> },
    /// Dump: `out = {}`
    OpenMapping,
    /// Dump: `out = []`
    OpenSequence,
    /// Dump: `out[key] = value`, skipped for `null` when `omit_null`.
    Insert {
        key: Box<str>,
        value: Expr,
        omit_null: bool,
    },
    /// Dump: `out.append(value)`
    Push { value: Expr },
    /// Dump: `return out`
    ReturnOutput,
    /// `return value`
    Return(Expr),
}

impl Stmt {
    /// Statements that end a procedure body.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Construct { .. } | Self::ReturnOutput | Self::Return(_))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginMapping { arg } => write!(f, "expect_mapping({arg})"),
            Self::BeginSequence { arg, min, len } if min == len => {
                write!(f, "expect_sequence({arg}, {len})")
            }
            Self::BeginSequence { arg, min, len } => {
                write!(f, "expect_sequence({arg}, {min}, {len})")
            }
            Self::RejectUnknownKeys { arg, keys } => {
                write!(f, "reject_unknown_keys({arg}, [")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}")?;
                }
                f.write_str("])")
            }
            Self::Assign {
                slot,
                value,
                default: None,
                ..
            } => write!(f, "f{slot} = {value}"),
            Self::Assign {
                slot,
                arg,
                value,
                default: Some(default),
            } => write!(f, "f{slot} = {default}() if {arg} is MISSING else {value}"),
            Self::Construct { cls } => write!(f, "return {cls}(*f)"),
            Self::OpenMapping => f.write_str("out = {}"),
            Self::OpenSequence => f.write_str("out = []"),
            Self::Insert {
                key,
                value,
                omit_null: false,
            } => write!(f, "out[{key:?}] = {value}"),
            Self::Insert {
                key,
                value,
                omit_null: true,
            } => write!(f, "insert_non_null(out, {key:?}, {value})"),
            Self::Push { value } => write!(f, "out.append({value})"),
            Self::ReturnOutput => f.write_str("return out"),
            Self::Return(value) => write!(f, "return {value}"),
        }
    }
}
