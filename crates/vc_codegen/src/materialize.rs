//! Turns sealed procedures into closure chains.
//!
//! Every procedure of a builder becomes one callable of a [`CompiledUnit`].
//! Procedures call each other by index into the unit, so a self-referential
//! record needs no more than its own procedure. Binders are resolved to frame
//! depths here, once, and never looked up by name at run time.

use core::any::Any;
use core::fmt;

use serde_json::{Map, Value};
use vc_schema::{RecordInfo, SchemaError, TupleInfo, TypeInfo, TypePath, UnionInfo};
use vc_utils::hash::HashMap;

use crate::builder::{ProcedureBuilder, ProcedureDef};
use crate::error::{CodegenError, ConversionError, ConversionErrorKind};
use crate::ir::{Binding, CallExpr, Direction, Expr, Operand, Stmt};
use crate::leaf;

// -----------------------------------------------------------------------------
// Frames

/// Tree values visible to a load procedure, innermost binder first.
struct LoadFrame<'a> {
    value: Option<&'a Value>,
    parent: Option<&'a LoadFrame<'a>>,
}

impl<'a> LoadFrame<'a> {
    #[inline]
    fn child(value: Option<&'a Value>, parent: &'a LoadFrame<'a>) -> Self {
        Self {
            value,
            parent: Some(parent),
        }
    }

    fn ancestor(&self, up: usize) -> Option<&LoadFrame<'a>> {
        let mut frame = self;
        for _ in 0..up {
            frame = frame.parent?;
        }
        Some(frame)
    }
}

/// Values visible to a dump procedure, innermost binder first.
struct DumpFrame<'a> {
    value: &'a dyn Any,
    parent: Option<&'a DumpFrame<'a>>,
}

impl<'a> DumpFrame<'a> {
    #[inline]
    fn child(value: &'a dyn Any, parent: &'a DumpFrame<'a>) -> Self {
        Self {
            value,
            parent: Some(parent),
        }
    }

    fn ancestor(&self, up: usize) -> Option<&DumpFrame<'a>> {
        let mut frame = self;
        for _ in 0..up {
            frame = frame.parent?;
        }
        Some(frame)
    }
}

// -----------------------------------------------------------------------------
// Access

/// A resolved load [`Operand`].
enum LoadAccess {
    Var { up: usize },
    Key { up: usize, key: Box<str> },
    Item { up: usize, index: usize },
}

impl LoadAccess {
    /// `Ok(None)` when the value is absent.
    fn read<'a>(&self, frame: &LoadFrame<'a>) -> Result<Option<&'a Value>, ConversionError> {
        let (Self::Var { up } | Self::Key { up, .. } | Self::Item { up, .. }) = self;
        let base = frame.ancestor(*up).and_then(|frame| frame.value);
        match self {
            Self::Var { .. } => Ok(base),
            Self::Key { key, .. } => match base {
                Some(Value::Object(map)) => Ok(map.get(&**key)),
                Some(other) => Err(ConversionError::mismatch("object", other)),
                None => Err(ConversionError::missing()),
            },
            Self::Item { index, .. } => match base {
                Some(Value::Array(items)) => Ok(items.get(*index)),
                Some(other) => Err(ConversionError::mismatch("array", other)),
                None => Err(ConversionError::missing()),
            },
        }
    }

    fn locate(&self, err: ConversionError) -> ConversionError {
        match self {
            Self::Var { .. } => err,
            Self::Key { key, .. } => err.at_key(key),
            Self::Item { index, .. } => err.at_index(*index),
        }
    }
}

/// A resolved dump [`Operand`].
enum DumpAccess {
    Var {
        up: usize,
    },
    Attr {
        up: usize,
        record: &'static RecordInfo,
        index: usize,
        name: Box<str>,
    },
    Element {
        up: usize,
        tuple: &'static TupleInfo,
        index: usize,
    },
}

impl DumpAccess {
    fn read<'a>(&self, frame: &DumpFrame<'a>) -> Result<&'a dyn Any, ConversionError> {
        let (Self::Var { up } | Self::Attr { up, .. } | Self::Element { up, .. }) = self;
        let base = frame
            .ancestor(*up)
            .map(|frame| frame.value)
            .ok_or_else(ConversionError::missing)?;
        match self {
            Self::Var { .. } => Ok(base),
            Self::Attr { record, index, .. } => record
                .get_field(base, *index)?
                .ok_or_else(ConversionError::missing),
            Self::Element { tuple, index, .. } => tuple
                .get_element(base, *index)?
                .ok_or_else(ConversionError::missing),
        }
    }

    fn locate(&self, err: ConversionError) -> ConversionError {
        match self {
            Self::Var { .. } => err,
            Self::Attr { name, .. } => err.at_key(name),
            Self::Element { index, .. } => err.at_index(*index),
        }
    }
}

// -----------------------------------------------------------------------------
// Closures

type LoadFn = Box<
    dyn Fn(&CompiledUnit, &LoadFrame<'_>) -> Result<Box<dyn Any>, ConversionError> + Send + Sync,
>;

type DumpFn =
    Box<dyn Fn(&CompiledUnit, &DumpFrame<'_>) -> Result<Value, ConversionError> + Send + Sync>;

#[inline]
fn load_fn<F>(f: F) -> LoadFn
where
    F: Fn(&CompiledUnit, &LoadFrame<'_>) -> Result<Box<dyn Any>, ConversionError>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

#[inline]
fn dump_fn<F>(f: F) -> DumpFn
where
    F: Fn(&CompiledUnit, &DumpFrame<'_>) -> Result<Value, ConversionError> + Send + Sync + 'static,
{
    Box::new(f)
}

// -----------------------------------------------------------------------------
// Procedures

enum Expect {
    Mapping,
    Sequence { min: usize, len: usize },
}

struct Assign {
    access: LoadAccess,
    value: LoadFn,
    default: Option<fn() -> Box<dyn Any>>,
}

enum LoadTerminal {
    Record(&'static RecordInfo),
    Tuple(&'static TupleInfo),
    Return(LoadFn),
}

struct LoadProcedure {
    name: Box<str>,
    expect: Option<Expect>,
    known_keys: Option<Box<[Box<str>]>>,
    assigns: Vec<Assign>,
    terminal: LoadTerminal,
}

impl LoadProcedure {
    fn run(
        &self,
        unit: &CompiledUnit,
        value: Option<&Value>,
        default: Option<Box<dyn Any>>,
    ) -> Result<Box<dyn Any>, ConversionError> {
        match (value, default) {
            (None, Some(default)) => return Ok(default),
            (None, None) if !self.passes_absent() => return Err(ConversionError::missing()),
            _ => {}
        }
        self.body(unit, value)
            .map_err(|err| err.through(&self.name))
    }

    /// A procedure that only returns an expression lets the expression decide
    /// about an absent value, as the same expression inlined in a record would.
    fn passes_absent(&self) -> bool {
        self.expect.is_none() && matches!(self.terminal, LoadTerminal::Return(_))
    }

    fn body(
        &self,
        unit: &CompiledUnit,
        value: Option<&Value>,
    ) -> Result<Box<dyn Any>, ConversionError> {
        if let Some(expect) = &self.expect {
            let value = value.ok_or_else(ConversionError::missing)?;
            match expect {
                Expect::Mapping if !value.is_object() => {
                    return Err(ConversionError::mismatch("object", value));
                }
                Expect::Sequence { min, len } => match value.as_array() {
                    Some(items) if (*min..=*len).contains(&items.len()) => {}
                    Some(items) => {
                        return Err(ConversionErrorKind::Length {
                            expected: if items.len() < *min { *min } else { *len },
                            found: items.len(),
                        }
                        .into());
                    }
                    None => return Err(ConversionError::mismatch("array", value)),
                },
                Expect::Mapping => {}
            }
        }

        if let Some(known) = &self.known_keys
            && let Some(map) = value.and_then(Value::as_object)
            && let Some(key) = map.keys().find(|key| !known.iter().any(|k| **k == **key))
        {
            return Err(ConversionError::new(ConversionErrorKind::UnknownKey {
                key: key.clone(),
            })
            .at_key(key));
        }

        let frame = LoadFrame {
            value,
            parent: None,
        };
        let mut values = Vec::with_capacity(self.assigns.len());
        for assign in &self.assigns {
            let present = assign
                .access
                .read(&frame)
                .map_err(|err| assign.access.locate(err))?;
            match (present, assign.default) {
                (None, Some(default)) => values.push(default()),
                _ => values.push((assign.value)(unit, &frame)?),
            }
        }

        match &self.terminal {
            LoadTerminal::Record(info) => Ok(info.construct(values)?),
            LoadTerminal::Tuple(info) => Ok(info.construct(values)?),
            LoadTerminal::Return(expr) => expr(unit, &frame),
        }
    }
}

struct Insert {
    key: Box<str>,
    value: DumpFn,
    omit_null: bool,
}

enum DumpBody {
    Mapping(Vec<Insert>),
    Sequence(Vec<DumpFn>),
    Return(DumpFn),
}

struct DumpProcedure {
    name: Box<str>,
    body: DumpBody,
}

impl DumpProcedure {
    fn run(&self, unit: &CompiledUnit, value: &dyn Any) -> Result<Value, ConversionError> {
        let frame = DumpFrame {
            value,
            parent: None,
        };
        self.body(unit, &frame)
            .map_err(|err| err.through(&self.name))
    }

    fn body(&self, unit: &CompiledUnit, frame: &DumpFrame<'_>) -> Result<Value, ConversionError> {
        match &self.body {
            DumpBody::Mapping(inserts) => {
                let mut out = Map::new();
                for insert in inserts {
                    let dumped = (insert.value)(unit, frame)?;
                    if insert.omit_null && dumped.is_null() {
                        continue;
                    }
                    out.insert(insert.key.to_string(), dumped);
                }
                Ok(Value::Object(out))
            }
            DumpBody::Sequence(pushes) => {
                let out = pushes
                    .iter()
                    .map(|push| push(unit, frame))
                    .collect::<Result<Vec<Value>, ConversionError>>()?;
                Ok(Value::Array(out))
            }
            DumpBody::Return(expr) => expr(unit, frame),
        }
    }
}

// -----------------------------------------------------------------------------
// CompiledUnit

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Load(usize),
    Dump(usize),
}

/// Materialized procedures sharing one namespace.
pub struct CompiledUnit {
    record: Box<str>,
    loads: Vec<LoadProcedure>,
    dumps: Vec<DumpProcedure>,
    names: HashMap<Box<str>, Slot>,
    order: Vec<Box<str>>,
    listing: String,
}

impl CompiledUnit {
    pub(crate) fn new(builder: &ProcedureBuilder) -> Result<Self, CodegenError> {
        let mut names = HashMap::default();
        let (mut load_count, mut dump_count) = (0, 0);
        for def in builder.procedures() {
            let slot = match def.signature().direction() {
                Direction::Load => {
                    load_count += 1;
                    Slot::Load(load_count - 1)
                }
                Direction::Dump => {
                    dump_count += 1;
                    Slot::Dump(dump_count - 1)
                }
            };
            names.insert(Box::<str>::from(def.name()), slot);
        }

        let listing = builder.listing();
        let mut loads = Vec::with_capacity(load_count);
        let mut dumps = Vec::with_capacity(dump_count);
        for def in builder.procedures() {
            let linker = Linker { def, names: &names };
            let compiled = match def.signature().direction() {
                Direction::Load => linker.load_procedure().map(|done| loads.push(done)),
                Direction::Dump => linker.dump_procedure().map(|done| dumps.push(done)),
            };
            compiled.map_err(|message| CodegenError::Compilation {
                procedure: def.name().into(),
                record: builder.record().into(),
                message,
                listing: listing.clone(),
            })?;
        }

        Ok(Self {
            record: builder.record().into(),
            loads,
            dumps,
            names,
            order: builder
                .procedures()
                .iter()
                .map(|def| def.name().into())
                .collect(),
            listing,
        })
    }

    fn call_load(
        &self,
        index: usize,
        value: Option<&Value>,
        default: Option<Box<dyn Any>>,
    ) -> Result<Box<dyn Any>, ConversionError> {
        self.loads[index].run(self, value, default)
    }

    fn call_dump(&self, index: usize, value: &dyn Any) -> Result<Value, ConversionError> {
        self.dumps[index].run(self, value)
    }

    /// The load procedure called `name`.
    pub fn loader(&self, name: &str) -> Option<LoadCallable<'_>> {
        match self.names.get(name)? {
            Slot::Load(index) => Some(LoadCallable {
                unit: self,
                index: *index,
            }),
            Slot::Dump(_) => None,
        }
    }

    /// The dump procedure called `name`.
    pub fn dumper(&self, name: &str) -> Option<DumpCallable<'_>> {
        match self.names.get(name)? {
            Slot::Dump(index) => Some(DumpCallable {
                unit: self,
                index: *index,
            }),
            Slot::Load(_) => None,
        }
    }

    /// Procedure names in definition order.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.order.iter().map(|name| &**name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Display name of the record the unit was compiled for.
    #[inline]
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Pseudo-source of every procedure.
    #[inline]
    pub fn listing(&self) -> &str {
        &self.listing
    }
}

impl fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("record", &self.record)
            .field("procedures", &self.order)
            .finish()
    }
}

/// A load procedure of a [`CompiledUnit`].
#[derive(Clone, Copy)]
pub struct LoadCallable<'a> {
    unit: &'a CompiledUnit,
    index: usize,
}

impl LoadCallable<'_> {
    /// Loads `value`. When `value` is absent, returns `default` or fails
    /// with a missing-value error.
    pub fn call(
        &self,
        value: Option<&Value>,
        default: Option<Box<dyn Any>>,
    ) -> Result<Box<dyn Any>, ConversionError> {
        self.unit.call_load(self.index, value, default)
    }
}

/// A dump procedure of a [`CompiledUnit`].
#[derive(Clone, Copy)]
pub struct DumpCallable<'a> {
    unit: &'a CompiledUnit,
    index: usize,
}

impl DumpCallable<'_> {
    pub fn call(&self, value: &dyn Any) -> Result<Value, ConversionError> {
        self.unit.call_dump(self.index, value)
    }
}

// -----------------------------------------------------------------------------
// Linker

/// Resolves the names of one procedure against the unit being built.
struct Linker<'b> {
    def: &'b ProcedureDef,
    names: &'b HashMap<Box<str>, Slot>,
}

impl Linker<'_> {
    fn binding(&self, name: &str) -> Result<&Binding, String> {
        self.def
            .locals()
            .get(name)
            .ok_or_else(|| format!("`{name}` is not bound"))
    }

    fn type_binding(&self, name: &str) -> Result<&'static TypeInfo, String> {
        match self.binding(name)? {
            Binding::Type(info) => Ok(*info),
            other => Err(format!("`{name}` is bound to {other:?}, not to type information")),
        }
    }

    fn not_a_leaf(helper: &str, info: &TypeInfo) -> String {
        format!("helper `{helper}` is bound to a {}, not a scalar or dynamic type", info.kind())
    }

    /// The union bound to `helper`, which must have one alternative per variant.
    fn union_binding(&self, helper: &str, alternatives: usize) -> Result<&'static UnionInfo, String> {
        let info = self
            .type_binding(helper)?
            .as_union()
            .map_err(|err| format!("helper `{helper}`: {err}"))?;
        if info.variant_len() != alternatives {
            return Err(format!(
                "helper `{helper}` has {} variants, but {alternatives} alternatives are given",
                info.variant_len()
            ));
        }
        Ok(info)
    }

    fn procedure(&self, call: &CallExpr, direction: Direction) -> Result<usize, String> {
        match self.names.get(&*call.name) {
            Some(Slot::Load(index)) if direction == Direction::Load => Ok(*index),
            Some(Slot::Dump(index)) if direction == Direction::Dump => Ok(*index),
            Some(_) => Err(format!("`{}` is not a {direction} procedure", call.name)),
            None => Err(format!("procedure `{}` is not defined", call.name)),
        }
    }

    fn root_scope(&self) -> Result<Vec<Box<str>>, String> {
        match self.def.signature().value_param() {
            Some(param) => Ok(vec![param.into()]),
            None => Err("procedure has no parameter".to_owned()),
        }
    }

    fn is_param(operand: &Operand, scope: &[Box<str>]) -> bool {
        matches!(operand, Operand::Var(name) if scope.first().is_some_and(|param| *param == *name))
    }

    fn depth(operand: &Operand, scope: &[Box<str>]) -> Result<usize, String> {
        let base = operand.base();
        scope
            .iter()
            .rposition(|name| **name == *base)
            .map(|position| scope.len() - 1 - position)
            .ok_or_else(|| format!("`{base}` is not in scope"))
    }

    // --- load ---

    fn load_access(operand: &Operand, scope: &[Box<str>]) -> Result<LoadAccess, String> {
        let up = Self::depth(operand, scope)?;
        match operand {
            Operand::Var(_) => Ok(LoadAccess::Var { up }),
            Operand::Key { key, .. } => Ok(LoadAccess::Key {
                up,
                key: key.clone(),
            }),
            Operand::Item { index, .. } => Ok(LoadAccess::Item { up, index: *index }),
            Operand::Attr { .. } | Operand::Element { .. } => {
                Err(format!("`{operand}` reads a value, not a tree"))
            }
        }
    }

    fn load_procedure(&self) -> Result<LoadProcedure, String> {
        let scope = self.root_scope()?;
        let mut stmts = self.def.body().iter().peekable();

        let expect = match stmts.peek() {
            Some(Stmt::BeginMapping { arg }) if Self::is_param(arg, &scope) => {
                stmts.next();
                Some(Expect::Mapping)
            }
            Some(Stmt::BeginSequence { arg, min, len }) if Self::is_param(arg, &scope) => {
                if min > len {
                    return Err(format!("minimum length {min} exceeds length {len}"));
                }
                let (min, len) = (*min, *len);
                stmts.next();
                Some(Expect::Sequence { min, len })
            }
            _ => None,
        };

        let known_keys = match stmts.peek() {
            Some(Stmt::RejectUnknownKeys { arg, keys }) => {
                if !matches!(expect, Some(Expect::Mapping)) || !Self::is_param(arg, &scope) {
                    return Err("unknown keys are rejected on a value not checked as a mapping"
                        .to_owned());
                }
                let keys = keys.clone();
                stmts.next();
                Some(keys)
            }
            _ => None,
        };

        let mut assigns = Vec::new();
        while let Some(Stmt::Assign {
            slot,
            arg,
            value,
            default,
        }) = stmts.next_if(|stmt| matches!(stmt, Stmt::Assign { .. }))
        {
            if *slot != assigns.len() {
                return Err(format!("slot f{slot} assigned out of order"));
            }
            let default = match default {
                Some(name) => match self.binding(name)? {
                    Binding::Default(factory) => Some(*factory),
                    other => return Err(format!("`{name}` is bound to {other:?}, not a default")),
                },
                None => None,
            };
            assigns.push(Assign {
                access: Self::load_access(arg, &scope)?,
                value: self.load_expr(value, &mut scope.clone())?,
                default,
            });
        }

        let terminal = match stmts.next() {
            Some(Stmt::Construct { cls }) => match self.type_binding(cls)? {
                TypeInfo::Record(info) if info.field_len() == assigns.len() => {
                    LoadTerminal::Record(info)
                }
                TypeInfo::Tuple(info) if info.element_len() == assigns.len() => {
                    LoadTerminal::Tuple(info)
                }
                TypeInfo::Record(_) | TypeInfo::Tuple(_) => {
                    return Err(format!(
                        "`{cls}` is built from {} assigned slots, which does not match its arity",
                        assigns.len()
                    ));
                }
                other => {
                    return Err(format!("`{cls}` is a {}, not a record or tuple", other.kind()));
                }
            },
            Some(Stmt::Return(expr)) if assigns.is_empty() => {
                LoadTerminal::Return(self.load_expr(expr, &mut scope.clone())?)
            }
            Some(Stmt::Return(_)) => return Err("assigned slots are never used".to_owned()),
            Some(other) => return Err(format!("`{other}` is not valid in a load procedure")),
            None => return Err("procedure never returns".to_owned()),
        };

        if let Some(stmt) = stmts.next() {
            return Err(format!("`{stmt}` follows the return"));
        }

        Ok(LoadProcedure {
            name: self.def.name().into(),
            expect,
            known_keys,
            assigns,
            terminal,
        })
    }

    fn load_expr(&self, expr: &Expr, scope: &mut Vec<Box<str>>) -> Result<LoadFn, String> {
        match expr {
            Expr::Leaf { helper, arg } => {
                let access = Self::load_access(arg, scope)?;
                match self.binding(helper)? {
                    Binding::Type(TypeInfo::Scalar(info)) => Ok(load_fn(move |_, frame| {
                        access
                            .read(frame)
                            .and_then(|value| {
                                let value = value.ok_or_else(ConversionError::missing)?;
                                let scalar = leaf::load_scalar(value, info.kind())?;
                                Ok(info.from_scalar(scalar)?)
                            })
                            .map_err(|err| access.locate(err))
                    })),
                    Binding::Type(TypeInfo::Dynamic(info)) => Ok(load_fn(move |_, frame| {
                        access
                            .read(frame)
                            .and_then(|value| {
                                let value = value.ok_or_else(ConversionError::missing)?;
                                Ok(info.from_tree(value))
                            })
                            .map_err(|err| access.locate(err))
                    })),
                    Binding::Type(info) => Err(Self::not_a_leaf(helper, info)),
                    Binding::LoadHook(hook) => {
                        let hook = hook.clone();
                        Ok(load_fn(move |_, frame| {
                            access
                                .read(frame)
                                .and_then(|value| {
                                    let value = value.ok_or_else(ConversionError::missing)?;
                                    hook(value)
                                        .map_err(|message| ConversionErrorKind::Hook(message).into())
                                })
                                .map_err(|err| access.locate(err))
                        }))
                    }
                    other => Err(format!("`{helper}` is bound to {other:?}, not a load helper")),
                }
            }
            Expr::Call(call) => {
                let index = self.procedure(call, Direction::Load)?;
                let access = Self::load_access(&call.arg, scope)?;
                Ok(load_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| unit.call_load(index, value, None))
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Optional {
                helper,
                arg,
                binder,
                inner,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_optional()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = Self::load_access(arg, scope)?;
                let inner = self.load_binder(binder, inner, scope)?;
                Ok(load_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| match value {
                            None | Some(Value::Null) => Ok(info.none()),
                            Some(value) => {
                                let child = LoadFrame::child(Some(value), frame);
                                Ok(info.some(inner(unit, &child)?)?)
                            }
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Boxed {
                helper,
                arg,
                binder,
                inner,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_boxed()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = Self::load_access(arg, scope)?;
                let inner = self.load_binder(binder, inner, scope)?;
                Ok(load_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| {
                            let child = LoadFrame::child(value, frame);
                            Ok(info.wrap(inner(unit, &child)?)?)
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::List {
                helper,
                arg,
                binder,
                item,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_list()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = Self::load_access(arg, scope)?;
                let item = self.load_binder(binder, item, scope)?;
                Ok(load_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| {
                            let value = value.ok_or_else(ConversionError::missing)?;
                            let Value::Array(items) = value else {
                                return Err(ConversionError::mismatch("array", value));
                            };
                            let mut loaded = Vec::with_capacity(items.len());
                            for (index, element) in items.iter().enumerate() {
                                let child = LoadFrame::child(Some(element), frame);
                                loaded.push(item(unit, &child).map_err(|err| err.at_index(index))?);
                            }
                            Ok(info.from_items(loaded)?)
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Map {
                helper,
                arg,
                key_binder,
                key,
                value_binder,
                value,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_map()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = Self::load_access(arg, scope)?;
                let key = self.load_binder(key_binder, key, scope)?;
                let value = self.load_binder(value_binder, value, scope)?;
                Ok(load_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|tree| {
                            let tree = tree.ok_or_else(ConversionError::missing)?;
                            let Value::Object(entries) = tree else {
                                return Err(ConversionError::mismatch("object", tree));
                            };
                            let mut loaded = Vec::with_capacity(entries.len());
                            for (name, entry) in entries {
                                let name_value = Value::String(name.clone());
                                let key_frame = LoadFrame::child(Some(&name_value), frame);
                                let entry_frame = LoadFrame::child(Some(entry), frame);
                                let k = key(unit, &key_frame).map_err(|err| err.at_key(name))?;
                                let v = value(unit, &entry_frame).map_err(|err| err.at_key(name))?;
                                loaded.push((k, v));
                            }
                            Ok(info.from_entries(loaded)?)
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Union {
                helper,
                arg,
                binder,
                variants,
            } => {
                let info = self.union_binding(helper, variants.len())?;
                let access = Self::load_access(arg, scope)?;
                let variants = variants
                    .iter()
                    .map(|variant| self.load_binder(binder, variant, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(load_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| {
                            let value = value.ok_or_else(ConversionError::missing)?;
                            let child = LoadFrame::child(Some(value), frame);
                            for (index, variant) in variants.iter().enumerate() {
                                match variant(unit, &child) {
                                    Ok(loaded) => return Ok(info.wrap(index, loaded)?),
                                    Err(err) => log::trace!(
                                        "variant #{index} of `{}` rejected the value: {err}",
                                        info.ty().path(),
                                    ),
                                }
                            }
                            Err(ConversionErrorKind::NoVariant {
                                ty: info.ty().path(),
                            }
                            .into())
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
        }
    }

    fn load_binder(
        &self,
        binder: &str,
        expr: &Expr,
        scope: &mut Vec<Box<str>>,
    ) -> Result<LoadFn, String> {
        scope.push(binder.into());
        let compiled = self.load_expr(expr, scope);
        scope.pop();
        compiled
    }

    // --- dump ---

    fn dump_access(&self, operand: &Operand, scope: &[Box<str>]) -> Result<DumpAccess, String> {
        let up = Self::depth(operand, scope)?;
        match operand {
            Operand::Var(_) => Ok(DumpAccess::Var { up }),
            Operand::Attr {
                owner, index, name, ..
            } => {
                let record = self
                    .type_binding(owner)?
                    .as_record()
                    .map_err(|err| format!("`{operand}`: {err}"))?;
                if *index >= record.field_len() {
                    return Err(format!("`{operand}`: `{owner}` has no field #{index}"));
                }
                Ok(DumpAccess::Attr {
                    up,
                    record,
                    index: *index,
                    name: name.clone(),
                })
            }
            Operand::Element { owner, index, .. } => {
                let tuple = self
                    .type_binding(owner)?
                    .as_tuple()
                    .map_err(|err| format!("`{operand}`: {err}"))?;
                if *index >= tuple.element_len() {
                    return Err(format!("`{operand}`: `{owner}` has no element #{index}"));
                }
                Ok(DumpAccess::Element {
                    up,
                    tuple,
                    index: *index,
                })
            }
            Operand::Key { .. } | Operand::Item { .. } => {
                Err(format!("`{operand}` reads a tree, not a value"))
            }
        }
    }

    fn dump_procedure(&self) -> Result<DumpProcedure, String> {
        let scope = self.root_scope()?;
        let mut stmts = self.def.body().iter();

        let body = match stmts.next() {
            Some(Stmt::OpenMapping) => {
                let mut inserts = Vec::new();
                loop {
                    match stmts.next() {
                        Some(Stmt::Insert {
                            key,
                            value,
                            omit_null,
                        }) => inserts.push(Insert {
                            key: key.clone(),
                            value: self.dump_expr(value, &mut scope.clone())?,
                            omit_null: *omit_null,
                        }),
                        Some(Stmt::ReturnOutput) => break DumpBody::Mapping(inserts),
                        Some(other) => {
                            return Err(format!("`{other}` is not valid after `out = {{}}`"));
                        }
                        None => return Err("procedure never returns".to_owned()),
                    }
                }
            }
            Some(Stmt::OpenSequence) => {
                let mut pushes = Vec::new();
                loop {
                    match stmts.next() {
                        Some(Stmt::Push { value }) => {
                            pushes.push(self.dump_expr(value, &mut scope.clone())?);
                        }
                        Some(Stmt::ReturnOutput) => break DumpBody::Sequence(pushes),
                        Some(other) => {
                            return Err(format!("`{other}` is not valid after `out = []`"));
                        }
                        None => return Err("procedure never returns".to_owned()),
                    }
                }
            }
            Some(Stmt::Return(expr)) => DumpBody::Return(self.dump_expr(expr, &mut scope.clone())?),
            Some(other) => return Err(format!("`{other}` is not valid in a dump procedure")),
            None => return Err("procedure never returns".to_owned()),
        };

        if let Some(stmt) = stmts.next() {
            return Err(format!("`{stmt}` follows the return"));
        }

        Ok(DumpProcedure {
            name: self.def.name().into(),
            body,
        })
    }

    fn dump_expr(&self, expr: &Expr, scope: &mut Vec<Box<str>>) -> Result<DumpFn, String> {
        match expr {
            Expr::Leaf { helper, arg } => {
                let access = self.dump_access(arg, scope)?;
                match self.binding(helper)? {
                    Binding::Type(TypeInfo::Scalar(info)) => Ok(dump_fn(move |_, frame| {
                        access
                            .read(frame)
                            .and_then(|value| Ok(leaf::dump_scalar(info.to_scalar(value)?)))
                            .map_err(|err| access.locate(err))
                    })),
                    Binding::Type(TypeInfo::Dynamic(info)) => Ok(dump_fn(move |_, frame| {
                        access
                            .read(frame)
                            .and_then(|value| Ok(info.to_tree(value)?))
                            .map_err(|err| access.locate(err))
                    })),
                    Binding::Type(info) => Err(Self::not_a_leaf(helper, info)),
                    Binding::DumpHook(hook) => {
                        let hook = hook.clone();
                        Ok(dump_fn(move |_, frame| {
                            access
                                .read(frame)
                                .and_then(|value| {
                                    hook(value)
                                        .map_err(|message| ConversionErrorKind::Hook(message).into())
                                })
                                .map_err(|err| access.locate(err))
                        }))
                    }
                    other => Err(format!("`{helper}` is bound to {other:?}, not a dump helper")),
                }
            }
            Expr::Call(call) => {
                let index = self.procedure(call, Direction::Dump)?;
                let access = self.dump_access(&call.arg, scope)?;
                Ok(dump_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| unit.call_dump(index, value))
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Optional {
                helper,
                arg,
                binder,
                inner,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_optional()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = self.dump_access(arg, scope)?;
                let inner = self.dump_binder(binder, inner, scope)?;
                Ok(dump_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| match info.get(value)? {
                            Some(value) => inner(unit, &DumpFrame::child(value, frame)),
                            None => Ok(Value::Null),
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Boxed {
                helper,
                arg,
                binder,
                inner,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_boxed()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = self.dump_access(arg, scope)?;
                let inner = self.dump_binder(binder, inner, scope)?;
                Ok(dump_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| {
                            let value = info.get(value)?;
                            inner(unit, &DumpFrame::child(value, frame))
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::List {
                helper,
                arg,
                binder,
                item,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_list()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = self.dump_access(arg, scope)?;
                let item = self.dump_binder(binder, item, scope)?;
                Ok(dump_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| {
                            let mut out = Vec::new();
                            for (index, element) in info.items(value)?.into_iter().enumerate() {
                                let child = DumpFrame::child(element, frame);
                                out.push(item(unit, &child).map_err(|err| err.at_index(index))?);
                            }
                            Ok(Value::Array(out))
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Map {
                helper,
                arg,
                key_binder,
                key,
                value_binder,
                value,
            } => {
                let info = self
                    .type_binding(helper)?
                    .as_map()
                    .map_err(|err| format!("helper `{helper}`: {err}"))?;
                let access = self.dump_access(arg, scope)?;
                let key = self.dump_binder(key_binder, key, scope)?;
                let value = self.dump_binder(value_binder, value, scope)?;
                Ok(dump_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|map| {
                            let mut out = Vec::new();
                            for (k, v) in info.entries(map)? {
                                let name = leaf::key_string(key(unit, &DumpFrame::child(k, frame))?)?;
                                let dumped = value(unit, &DumpFrame::child(v, frame))
                                    .map_err(|err| err.at_key(&name))?;
                                out.push((name, dumped));
                            }
                            // Unordered maps are written sorted so the output is stable.
                            if !info.is_ordered() {
                                out.sort_by(|(a, _), (b, _)| a.cmp(b));
                            }
                            Ok(Value::Object(out.into_iter().collect::<Map<String, Value>>()))
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
            Expr::Union {
                helper,
                arg,
                binder,
                variants,
            } => {
                let info = self.union_binding(helper, variants.len())?;
                let access = self.dump_access(arg, scope)?;
                let variants = variants
                    .iter()
                    .map(|variant| self.dump_binder(binder, variant, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(dump_fn(move |unit, frame| {
                    access
                        .read(frame)
                        .and_then(|value| {
                            let (index, inner) = info.active(value)?;
                            let variant = variants.get(index).ok_or(SchemaError::NoVariant {
                                owner: info.ty().path(),
                                index,
                            })?;
                            variant(unit, &DumpFrame::child(inner, frame))
                        })
                        .map_err(|err| access.locate(err))
                }))
            }
        }
    }

    fn dump_binder(
        &self,
        binder: &str,
        expr: &Expr,
        scope: &mut Vec<Box<str>>,
    ) -> Result<DumpFn, String> {
        scope.push(binder.into());
        let compiled = self.dump_expr(expr, scope);
        scope.pop();
        compiled
    }
}

// -----------------------------------------------------------------------------
// Loader / Dumper

/// A compiled loader: the entry procedure of a [`CompiledUnit`].
pub struct Loader {
    unit: CompiledUnit,
    entry: usize,
    entry_name: Box<str>,
    root: &'static TypeInfo,
}

impl Loader {
    pub(crate) fn new(unit: CompiledUnit, entry_name: &str, root: &'static TypeInfo) -> Result<Self, CodegenError> {
        let entry = match unit.names.get(entry_name) {
            Some(Slot::Load(index)) => *index,
            _ => {
                return Err(CodegenError::Compilation {
                    procedure: entry_name.into(),
                    record: unit.record.clone(),
                    message: "entry procedure is not a loader".to_owned(),
                    listing: unit.listing.clone(),
                });
            }
        };
        Ok(Self {
            unit,
            entry,
            entry_name: entry_name.into(),
            root,
        })
    }

    /// Loads a value of the root type, erased.
    pub fn load(&self, value: &Value) -> Result<Box<dyn Any>, ConversionError> {
        self.unit.call_load(self.entry, Some(value), None)
    }

    /// Loads a possibly absent value, falling back to `default`.
    pub fn load_or(
        &self,
        value: Option<&Value>,
        default: Option<Box<dyn Any>>,
    ) -> Result<Box<dyn Any>, ConversionError> {
        self.unit.call_load(self.entry, value, default)
    }

    /// Loads a `T`, which must be the root type.
    pub fn load_as<T: TypePath>(&self, value: &Value) -> Result<T, ConversionError> {
        let loaded = self.load(value)?;
        loaded.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            vc_schema::SchemaError::ValueType {
                expected: self.root.type_path(),
            }
            .into()
        })
    }

    #[inline]
    pub fn unit(&self) -> &CompiledUnit {
        &self.unit
    }

    #[inline]
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    #[inline]
    pub fn root(&self) -> &'static TypeInfo {
        self.root
    }

    #[inline]
    pub fn listing(&self) -> &str {
        self.unit.listing()
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("entry", &self.entry_name)
            .field("unit", &self.unit)
            .finish()
    }
}

/// A compiled dumper: the entry procedure of a [`CompiledUnit`].
pub struct Dumper {
    unit: CompiledUnit,
    entry: usize,
    entry_name: Box<str>,
    root: &'static TypeInfo,
}

impl Dumper {
    pub(crate) fn new(unit: CompiledUnit, entry_name: &str, root: &'static TypeInfo) -> Result<Self, CodegenError> {
        let entry = match unit.names.get(entry_name) {
            Some(Slot::Dump(index)) => *index,
            _ => {
                return Err(CodegenError::Compilation {
                    procedure: entry_name.into(),
                    record: unit.record.clone(),
                    message: "entry procedure is not a dumper".to_owned(),
                    listing: unit.listing.clone(),
                });
            }
        };
        Ok(Self {
            unit,
            entry,
            entry_name: entry_name.into(),
            root,
        })
    }

    /// Dumps a value of the root type.
    pub fn dump(&self, value: &dyn Any) -> Result<Value, ConversionError> {
        if value.type_id() != self.root.type_id() {
            return Err(vc_schema::SchemaError::ValueType {
                expected: self.root.type_path(),
            }
            .into());
        }
        self.unit.call_dump(self.entry, value)
    }

    #[inline]
    pub fn unit(&self) -> &CompiledUnit {
        &self.unit
    }

    #[inline]
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    #[inline]
    pub fn root(&self) -> &'static TypeInfo {
        self.root
    }

    #[inline]
    pub fn listing(&self) -> &str {
        self.unit.listing()
    }
}

impl fmt::Debug for Dumper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dumper")
            .field("entry", &self.entry_name)
            .field("unit", &self.unit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vc_schema::Typed;

    use super::Loader;
    use crate::builder::ProcedureBuilder;
    use crate::error::{CodegenError, ConversionErrorKind};
    use crate::ir::{Binding, CallExpr, Expr, Locals, Operand, Signature, Stmt};

    fn define(
        builder: &mut ProcedureBuilder,
        name: &str,
        signature: Signature,
        locals: Locals,
        body: Vec<Stmt>,
    ) {
        let mut scope = builder.begin_procedure(name, signature, locals).unwrap();
        for stmt in body {
            scope.emit(stmt).unwrap();
        }
    }

    fn with_i32() -> Locals {
        Locals::from([("as_i32".into(), Binding::Type(<i32 as Typed>::type_info()))])
    }

    fn leaf(helper: &str, arg: &str) -> Expr {
        Expr::Leaf {
            helper: helper.into(),
            arg: Operand::var(arg),
        }
    }

    fn call(name: &str, arg: &str) -> Expr {
        Expr::Call(CallExpr {
            name: name.into(),
            arg: Operand::var(arg),
        })
    }

    /// Materializes `builder`, which must fail in `procedure`, and returns the message.
    fn compilation_error(builder: &ProcedureBuilder, procedure: &str) -> String {
        match builder.materialize() {
            Err(CodegenError::Compilation {
                procedure: failed,
                record,
                message,
                listing,
            }) => {
                assert_eq!(&*failed, procedure);
                assert_eq!(&*record, "A");
                assert_eq!(listing, builder.listing());
                message
            }
            other => panic!("expected a compilation error, got {other:?}"),
        }
    }

    #[test]
    fn unbound_helper() {
        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "load_A",
            Signature::load(),
            Locals::new(),
            vec![Stmt::Return(leaf("as_i32", "v1"))],
        );

        assert_eq!(compilation_error(&builder, "load_A"), "`as_i32` is not bound");
        assert!(builder.listing().contains("    return as_i32(v1)\n"));
    }

    #[test]
    fn undefined_procedure() {
        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "load_A",
            Signature::load(),
            Locals::new(),
            vec![Stmt::Return(call("load_B", "v1"))],
        );

        assert_eq!(
            compilation_error(&builder, "load_A"),
            "procedure `load_B` is not defined"
        );
    }

    #[test]
    fn calls_keep_their_direction() {
        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "dump_B",
            Signature::dump(),
            with_i32(),
            vec![Stmt::Return(leaf("as_i32", "o"))],
        );
        define(
            &mut builder,
            "load_A",
            Signature::load(),
            Locals::new(),
            vec![Stmt::Return(call("dump_B", "v1"))],
        );
        assert_eq!(
            compilation_error(&builder, "load_A"),
            "`dump_B` is not a load procedure"
        );

        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "load_B",
            Signature::load(),
            with_i32(),
            vec![Stmt::Return(leaf("as_i32", "v1"))],
        );
        define(
            &mut builder,
            "dump_A",
            Signature::dump(),
            Locals::new(),
            vec![Stmt::Return(call("load_B", "o"))],
        );
        assert_eq!(
            compilation_error(&builder, "dump_A"),
            "`load_B` is not a dump procedure"
        );
    }

    #[test]
    fn body_must_return() {
        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "load_A",
            Signature::load(),
            Locals::new(),
            vec![Stmt::BeginMapping {
                arg: Operand::var("v1"),
            }],
        );
        assert_eq!(compilation_error(&builder, "load_A"), "procedure never returns");

        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "dump_A",
            Signature::dump(),
            Locals::new(),
            vec![Stmt::OpenMapping],
        );
        assert_eq!(compilation_error(&builder, "dump_A"), "procedure never returns");
    }

    #[test]
    fn statements_out_of_place() {
        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "load_A",
            Signature::load(),
            Locals::new(),
            vec![Stmt::OpenMapping],
        );
        assert_eq!(
            compilation_error(&builder, "load_A"),
            "`out = {}` is not valid in a load procedure"
        );

        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "load_A",
            Signature::load(),
            with_i32(),
            vec![
                Stmt::Return(leaf("as_i32", "v1")),
                Stmt::Return(leaf("as_i32", "v1")),
            ],
        );
        assert_eq!(
            compilation_error(&builder, "load_A"),
            "`return as_i32(v1)` follows the return"
        );
    }

    #[test]
    fn entry_must_match_the_direction() {
        let mut builder = ProcedureBuilder::new("A");
        define(
            &mut builder,
            "dump_A",
            Signature::dump(),
            with_i32(),
            vec![Stmt::Return(leaf("as_i32", "o"))],
        );
        let listing = builder.listing();
        let unit = builder.materialize().unwrap();

        let err = Loader::new(unit, "dump_A", <i32 as Typed>::type_info()).unwrap_err();
        assert_eq!(
            err,
            CodegenError::Compilation {
                procedure: "dump_A".into(),
                record: "A".into(),
                message: "entry procedure is not a loader".to_owned(),
                listing,
            }
        );
    }

    #[test]
    fn absent_values_and_defaults() {
        let mut builder = ProcedureBuilder::new("A");

        let mut locals = with_i32();
        locals.insert(
            "optional_Option_i32".into(),
            Binding::Type(<Option<i32> as Typed>::type_info()),
        );
        define(
            &mut builder,
            "load_maybe",
            Signature::load(),
            locals,
            vec![Stmt::Return(Expr::Optional {
                helper: "optional_Option_i32".into(),
                arg: Operand::var("v1"),
                binder: "v2".into(),
                inner: Box::new(leaf("as_i32", "v2")),
            })],
        );

        let mut locals = with_i32();
        locals.insert("cls".into(), Binding::Type(<(i32,) as Typed>::type_info()));
        let first = Operand::Item {
            base: "v1".into(),
            index: 0,
        };
        define(
            &mut builder,
            "load_single",
            Signature::load(),
            locals,
            vec![
                Stmt::BeginSequence {
                    arg: Operand::var("v1"),
                    min: 1,
                    len: 1,
                },
                Stmt::Assign {
                    slot: 0,
                    arg: first.clone(),
                    value: Expr::Leaf {
                        helper: "as_i32".into(),
                        arg: first,
                    },
                    default: None,
                },
                Stmt::Construct { cls: "cls".into() },
            ],
        );

        let unit = builder.materialize().unwrap();
        assert_eq!(unit.names().collect::<Vec<_>>(), ["load_maybe", "load_single"]);
        assert!(unit.dumper("load_single").is_none());

        // A procedure that only returns an expression lets the expression
        // see the absent value.
        let maybe = unit.loader("load_maybe").unwrap();
        let loaded = maybe.call(None, None).unwrap();
        assert_eq!(loaded.downcast_ref::<Option<i32>>(), Some(&None));
        let loaded = maybe.call(Some(&json!(7)), None).unwrap();
        assert_eq!(loaded.downcast_ref::<Option<i32>>(), Some(&Some(7)));

        let single = unit.loader("load_single").unwrap();
        let err = single.call(None, None).unwrap_err();
        assert_eq!(err.kind(), &ConversionErrorKind::Missing);
        let loaded = single.call(None, Some(Box::new((9_i32,)))).unwrap();
        assert_eq!(loaded.downcast_ref::<(i32,)>(), Some(&(9,)));
        let loaded = single.call(Some(&json!(["4"])), None).unwrap();
        assert_eq!(loaded.downcast_ref::<(i32,)>(), Some(&(4,)));

        let err = single.call(Some(&json!([1, 2])), None).unwrap_err();
        assert_eq!(
            err.kind(),
            &ConversionErrorKind::Length {
                expected: 1,
                found: 2
            }
        );
    }
}
