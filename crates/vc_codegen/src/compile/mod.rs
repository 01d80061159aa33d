//! Per-field compilers and the top-level entry points.
//!
//! Scalars, dynamic values, hooks and containers compile to inline
//! expressions. Records, unions and tuples compile to calls through the
//! [`WrapperSet`] of the direction.

pub(crate) mod dump;
pub(crate) mod load;

use vc_schema::{NamedField, TypeInfo, TypeKind};

use crate::builder::ProcedureBuilder;
use crate::context::BuildContext;
use crate::descriptor::{TypeDescriptor, sanitize};
use crate::error::CodegenError;
use crate::guard::RecursionGuard;
use crate::hooks::Hooks;
use crate::ir::{Binding, Direction, Expr, Operand, Stmt};
use crate::materialize::{Dumper, Loader};
use crate::options::Options;
use crate::wrapper::WrapperSet;

// -----------------------------------------------------------------------------
// Entry points

/// Compiles the procedures of one direction for `info`, without materializing them.
///
/// Returns the builder and the name of the entry procedure.
pub fn compile_procedures(
    info: &'static TypeInfo,
    direction: Direction,
    options: Options,
    hooks: &Hooks,
) -> Result<(ProcedureBuilder, Box<str>), CodegenError> {
    let wrappers = WrapperSet::new(direction)?;
    let mut guard = RecursionGuard::new();
    let display = sanitize(info.type_name());

    let mut ctx = BuildContext::new(&mut guard, &wrappers, hooks, options, &display);
    let tp = TypeDescriptor::of(info, ctx.param());
    let entry = wrappers.root.invoke(&tp, &mut ctx)?;
    let builder = ctx.into_builder();

    log::debug!(
        "compiled {direction}er of `{}`: {} procedures, entry `{}`",
        info.type_path(),
        builder.len(),
        entry.name,
    );
    if options.debug() {
        log::debug!("generated source of `{}`:\n{}", info.type_path(), builder);
    }
    Ok((builder, entry.name))
}

/// Compiles and materializes the loader of `info`.
///
/// ```
/// use serde_json::json;
/// use vc_codegen::{Hooks, Options, compile_load};
/// use vc_schema::Typed;
///
/// let loader = compile_load(<Vec<u8> as Typed>::type_info(), Options::new(), &Hooks::new()).unwrap();
/// assert_eq!(loader.entry_name(), "load_Vec_u8");
/// assert_eq!(loader.load_as::<Vec<u8>>(&json!([1, "2"])).unwrap(), [1, 2]);
/// ```
pub fn compile_load(
    info: &'static TypeInfo,
    options: Options,
    hooks: &Hooks,
) -> Result<Loader, CodegenError> {
    let (builder, entry) = compile_procedures(info, Direction::Load, options, hooks)?;
    Loader::new(builder.materialize()?, &entry, info)
}

/// Compiles and materializes the dumper of `info`.
pub fn compile_dump(
    info: &'static TypeInfo,
    options: Options,
    hooks: &Hooks,
) -> Result<Dumper, CodegenError> {
    let (builder, entry) = compile_procedures(info, Direction::Dump, options, hooks)?;
    Dumper::new(builder.materialize()?, &entry, info)
}

// -----------------------------------------------------------------------------
// Wrapped compilers shared by both directions

/// Body of the top-level procedure. Opens the procedure itself.
pub(crate) fn root(tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
    let options = ctx.options();
    let hooked = ctx.has_hook(tp.info());
    ctx.procedure(|ctx| match (tp.info().kind(), ctx.direction()) {
        (TypeKind::Record, Direction::Load) if !hooked => load::record(tp, ctx, &options),
        (TypeKind::Record, Direction::Dump) if !hooked => dump::record(tp, ctx, &options),
        (TypeKind::Tuple, Direction::Load) if !hooked => load::tuple(tp, ctx),
        (TypeKind::Tuple, Direction::Dump) if !hooked => dump::tuple(tp, ctx),
        (TypeKind::Union, _) if !hooked => union(tp, ctx),
        _ => {
            let value = compile_value(tp, ctx)?;
            ctx.emit(Stmt::Return(value))
        }
    })
}

/// Body of a type-parameter slot: convert the concrete argument.
pub(crate) fn slot(tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
    let concrete = match tp.type_arguments().first() {
        Some(argument) => argument.at(tp.value().clone()),
        None => tp.clone(),
    };
    let value = compile_value(&concrete, ctx)?;
    ctx.emit(Stmt::Return(value))
}

/// Body of a union procedure: one alternative per variant, in declaration order.
pub(crate) fn union(tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
    let info = tp.info();
    let union = info.as_union()?;
    let helper = bind_helper("union", info, ctx)?;
    let binder = ctx.fresh_binder();

    let mut variants = Vec::with_capacity(union.variant_len());
    for variant in union.iter() {
        let variant_tp = TypeDescriptor::of(variant.type_info(), Operand::Var(binder.clone()))
            .with_display_name(variant.name());
        variants.push(compile_value(&variant_tp, ctx)?);
    }

    ctx.emit(Stmt::Return(Expr::Union {
        helper,
        arg: tp.value().clone(),
        binder,
        variants,
    }))
}

// -----------------------------------------------------------------------------
// Inline values

/// The expression converting one record field.
///
/// A field declared as a type parameter goes through the slot wrapper,
/// keyed by its concrete type.
pub(crate) fn field_value(
    field: &NamedField,
    arg: Operand,
    ctx: &mut BuildContext<'_>,
) -> Result<Expr, CodegenError> {
    let tp = TypeDescriptor::of(field.type_info(), arg).with_display_name(field.name());
    match field.generic_param() {
        Some(index) => {
            let slot = tp
                .clone()
                .with_field_index(index)
                .with_type_arguments(vec![tp]);
            let wrappers = ctx.wrappers();
            Ok(Expr::Call(wrappers.slot.invoke(&slot, ctx)?))
        }
        None => compile_value(&tp, ctx),
    }
}

fn bind_helper(
    prefix: &str,
    info: &'static TypeInfo,
    ctx: &mut BuildContext<'_>,
) -> Result<Box<str>, CodegenError> {
    let helper = format!("{prefix}_{}", sanitize(info.type_name()));
    ctx.bind(&helper, Binding::Type(info))?;
    Ok(helper.into_boxed_str())
}

/// An inner value bound to a fresh binder.
fn inner(
    info: &'static TypeInfo,
    parent: &TypeDescriptor,
    ctx: &mut BuildContext<'_>,
) -> (Box<str>, TypeDescriptor) {
    let binder = ctx.fresh_binder();
    let tp = TypeDescriptor::of(info, Operand::Var(binder.clone()))
        .with_display_name(parent.display_name());
    (binder, tp)
}

/// The expression converting `tp` in the current direction.
pub(crate) fn compile_value(
    tp: &TypeDescriptor,
    ctx: &mut BuildContext<'_>,
) -> Result<Expr, CodegenError> {
    let info = tp.info();
    let arg = tp.value().clone();

    if let Some(helper) = ctx.bind_hook(info)? {
        return Ok(Expr::Leaf { helper, arg });
    }

    match info {
        TypeInfo::Scalar(scalar) => {
            let helper = format!("as_{}", sanitize(scalar.ty().ident()));
            ctx.bind(&helper, Binding::Type(info))?;
            Ok(Expr::Leaf {
                helper: helper.into(),
                arg,
            })
        }
        TypeInfo::Dynamic(dynamic) => {
            let helper = format!("as_{}", sanitize(dynamic.ty().ident()));
            ctx.bind(&helper, Binding::Type(info))?;
            Ok(Expr::Leaf {
                helper: helper.into(),
                arg,
            })
        }
        TypeInfo::Opaque(_) => Err(CodegenError::Unsupported {
            type_path: info.type_path(),
            direction: ctx.direction(),
        }),
        TypeInfo::Optional(optional) => {
            let helper = bind_helper("optional", info, ctx)?;
            let (binder, inner_tp) = inner(optional.inner().type_info(), tp, ctx);
            Ok(Expr::Optional {
                helper,
                arg,
                binder,
                inner: Box::new(compile_value(&inner_tp, ctx)?),
            })
        }
        TypeInfo::Boxed(boxed) => {
            let helper = bind_helper("boxed", info, ctx)?;
            let (binder, inner_tp) = inner(boxed.inner().type_info(), tp, ctx);
            Ok(Expr::Boxed {
                helper,
                arg,
                binder,
                inner: Box::new(compile_value(&inner_tp, ctx)?),
            })
        }
        TypeInfo::List(list) => {
            let helper = bind_helper("list", info, ctx)?;
            let (binder, item_tp) = inner(list.item_info(), tp, ctx);
            Ok(Expr::List {
                helper,
                arg,
                binder,
                item: Box::new(compile_value(&item_tp, ctx)?),
            })
        }
        TypeInfo::Map(map) => {
            let helper = bind_helper("map", info, ctx)?;
            let (key_binder, key_tp) = inner(map.key().type_info(), tp, ctx);
            let key = compile_value(&key_tp, ctx)?;
            let (value_binder, value_tp) = inner(map.value().type_info(), tp, ctx);
            let value = compile_value(&value_tp, ctx)?;
            Ok(Expr::Map {
                helper,
                arg,
                key_binder,
                key: Box::new(key),
                value_binder,
                value: Box::new(value),
            })
        }
        TypeInfo::Record(_) => {
            let wrappers = ctx.wrappers();
            Ok(Expr::Call(wrappers.record.invoke(tp, ctx)?))
        }
        TypeInfo::Union(_) => {
            let wrappers = ctx.wrappers();
            Ok(Expr::Call(wrappers.union.invoke(tp, ctx)?))
        }
        TypeInfo::Tuple(_) => {
            let wrappers = ctx.wrappers();
            Ok(Expr::Call(wrappers.tuple.invoke(tp, ctx)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde_json::{Value, json};
    use vc_schema::derive::Schema;
    use vc_schema::{NonGenericTypeInfoCell, OpaqueInfo, SchemaError, TypeInfo, TypePath, Typed};

    use super::{compile_dump, compile_load, compile_procedures};
    use crate::error::{CodegenError, ConversionErrorKind};
    use crate::hooks::Hooks;
    use crate::ir::Direction;
    use crate::options::Options;

    #[derive(Schema, Debug, PartialEq)]
    struct Node {
        value: i64,
        next: Option<Box<Node>>,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Pair<A, B> {
        first: A,
        second: B,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Left {
        name: String,
        right: Option<Box<Right>>,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Right {
        left: Option<Box<Left>>,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Person {
        name: String,
        age: u8,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Group {
        people: Vec<Person>,
        lead: Person,
        scores: BTreeMap<String, u32>,
        range: (i32, bool),
    }

    fn label() -> String {
        "untitled".to_owned()
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Settings {
        #[schema(rename = "displayName")]
        display_name: String,
        #[schema(default)]
        retries: u32,
        #[schema(default = "label")]
        label: String,
    }

    #[derive(Debug, PartialEq)]
    struct Stamp(u64);

    impl TypePath for Stamp {
        fn type_path() -> &'static str {
            "tests::Stamp"
        }
        fn type_name() -> &'static str {
            "Stamp"
        }
        fn type_ident() -> &'static str {
            "Stamp"
        }
    }

    impl Typed for Stamp {
        fn type_info() -> &'static TypeInfo {
            static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
            CELL.get_or_init(|| TypeInfo::Opaque(OpaqueInfo::new::<Self>()))
        }
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Event {
        at: Stamp,
        tag: String,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Wrap<T> {
        inner: T,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Plain {
        inner: Option<i32>,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Reading {
        level: f32,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Tally {
        counts: HashMap<String, u32>,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Ledger {
        entries: BTreeMap<String, Value>,
        #[schema(default)]
        note: Value,
    }

    #[derive(Schema, Debug, PartialEq)]
    enum Occupation {
        Title(String),
        Roles(Vec<String>),
    }

    #[derive(Schema, Debug, PartialEq)]
    enum Tree {
        Leaf(i64),
        Branch(Vec<Tree>),
    }

    fn salutation() -> Option<String> {
        Some("Mr.".to_owned())
    }

    #[derive(Schema, Debug, PartialEq)]
    #[schema(positional)]
    struct Name {
        first: String,
        last: String,
        #[schema(default = "salutation")]
        title: Option<String>,
    }

    fn names(info: &'static TypeInfo, direction: Direction) -> Vec<String> {
        let (builder, _) = compile_procedures(info, direction, Options::new(), &Hooks::new()).unwrap();
        builder
            .procedures()
            .iter()
            .map(|def| def.name().to_owned())
            .collect()
    }

    #[test]
    fn self_reference_compiles_to_one_procedure() {
        let loader = compile_load(Node::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(loader.entry_name(), "load_Node");
        assert_eq!(loader.unit().len(), 1);
        assert_eq!(
            loader.listing(),
            "def load_Node(v1, d=MISSING):\n    \
             # locals: as_i64 boxed_Box_Node cls optional_Option_Box_Node\n    \
             expect_mapping(v1)\n    \
             f0 = as_i64(v1[\"value\"])\n    \
             f1 = optional_Option_Box_Node(v1[\"next\"], lambda v2: boxed_Box_Node(v2, lambda v3: load_Node(v3)))\n    \
             return cls(*f)\n"
        );

        let node = loader
            .load_as::<Node>(&json!({ "value": 1, "next": { "value": 2, "next": null } }))
            .unwrap();
        assert_eq!(
            node,
            Node {
                value: 1,
                next: Some(Box::new(Node {
                    value: 2,
                    next: None
                })),
            }
        );

        let dumper = compile_dump(Node::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(dumper.entry_name(), "dump_Node");
        assert_eq!(dumper.unit().len(), 1);
        assert_eq!(
            dumper.dump(&node).unwrap(),
            json!({ "value": 1, "next": { "value": 2, "next": null } })
        );
    }

    #[test]
    fn generic_slots_are_named_by_position() {
        type P = Pair<i32, String>;
        assert_eq!(
            names(P::type_info(), Direction::Load),
            [
                "_load_Pair_i32_String_slot_0",
                "_load_Pair_i32_String_slot_1",
                "load_Pair_i32_String",
            ]
        );
        assert_eq!(
            names(P::type_info(), Direction::Dump),
            [
                "_dump_Pair_i32_String_slot_0",
                "_dump_Pair_i32_String_slot_1",
                "dump_Pair_i32_String",
            ]
        );

        let loader = compile_load(P::type_info(), Options::new(), &Hooks::new()).unwrap();
        let pair = loader
            .load_as::<P>(&json!({ "first": "7", "second": "x" }))
            .unwrap();
        assert_eq!(
            pair,
            Pair {
                first: 7,
                second: "x".to_owned()
            }
        );

        // Both arguments are `u8`: one slot serves both fields.
        assert_eq!(
            names(Pair::<u8, u8>::type_info(), Direction::Load),
            ["_load_Pair_u8_u8_slot_0", "load_Pair_u8_u8"]
        );
    }

    #[test]
    fn mutual_recursion_terminates() {
        assert_eq!(
            names(Left::type_info(), Direction::Load),
            ["_load_Left_record_right", "load_Left"]
        );

        let loader = compile_load(Left::type_info(), Options::new(), &Hooks::new()).unwrap();
        let value = json!({
            "name": "a",
            "right": { "left": { "name": "b", "right": { "left": null } } },
        });
        let left = loader.load_as::<Left>(&value).unwrap();
        assert_eq!(left.name, "a");

        let dumper = compile_dump(Left::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(dumper.dump(&left).unwrap(), value);
    }

    #[test]
    fn shared_target_is_compiled_once() {
        let (builder, entry) =
            compile_procedures(Group::type_info(), Direction::Load, Options::new(), &Hooks::new())
                .unwrap();
        assert_eq!(&*entry, "load_Group");
        let names: Vec<_> = builder.procedures().iter().map(|def| def.name()).collect();
        assert_eq!(
            names,
            ["_load_Group_record_people", "_load_Group_tuple_range", "load_Group"]
        );

        let root = builder.get("load_Group").unwrap().to_string();
        assert!(root.contains("f1 = _load_Group_record_people(v1[\"lead\"])"));
    }

    #[test]
    fn containers_round_trip() {
        let loader = compile_load(Group::type_info(), Options::new(), &Hooks::new()).unwrap();
        let dumper = compile_dump(Group::type_info(), Options::new(), &Hooks::new()).unwrap();
        let value = json!({
            "people": [{ "name": "a", "age": 1 }, { "name": "b", "age": 2 }],
            "lead": { "name": "c", "age": 3 },
            "scores": { "x": 1, "y": 2 },
            "range": [-1, true],
        });

        let group = loader.load_as::<Group>(&value).unwrap();
        assert_eq!(group.people.len(), 2);
        assert_eq!(group.scores["y"], 2);
        assert_eq!(group.range, (-1, true));
        assert_eq!(dumper.dump(&group).unwrap(), value);
    }

    #[test]
    fn errors_carry_the_field_path() {
        let loader = compile_load(Group::type_info(), Options::new(), &Hooks::new()).unwrap();
        let err = loader
            .load(&json!({
                "people": [{ "name": "a", "age": 1 }, { "age": 2 }],
                "lead": { "name": "c", "age": 3 },
                "scores": {},
                "range": [0, false],
            }))
            .unwrap_err();
        assert_eq!(err.kind(), &ConversionErrorKind::Missing);
        assert_eq!(err.path().to_string(), "people[1].name");
        #[cfg(feature = "debug")]
        assert_eq!(
            err.trail()
                .iter()
                .map(|name| &**name)
                .collect::<Vec<_>>(),
            ["_load_Group_record_people", "load_Group"]
        );

        let err = loader
            .load(&json!({
                "people": [],
                "lead": { "name": "c", "age": 300 },
                "scores": { "x": "high" },
                "range": [0, false],
            }))
            .unwrap_err();
        assert_eq!(err.path().to_string(), "lead.age");

        let err = loader
            .load(&json!({
                "people": [],
                "lead": { "name": "c", "age": 3 },
                "scores": {},
                "range": [0],
            }))
            .unwrap_err();
        assert_eq!(
            err.kind(),
            &ConversionErrorKind::Length {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(err.path().to_string(), "range");
    }

    #[test]
    fn compilation_is_deterministic() {
        let first = compile_load(Group::type_info(), Options::new(), &Hooks::new()).unwrap();
        let second = compile_load(Group::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(first.listing(), second.listing());
        assert!(first.unit().names().eq(second.unit().names()));
    }

    #[test]
    fn unrelated_roots_do_not_share_procedures() {
        let node = names(Node::type_info(), Direction::Load);
        let pair = names(Pair::<i32, String>::type_info(), Direction::Load);
        assert!(node.iter().all(|name| !pair.contains(name)));
        assert_eq!(node, ["load_Node"]);
    }

    #[test]
    fn unknown_keys_are_rejected_on_request() {
        let value = json!({ "value": 1, "extra": true });

        let lenient = compile_load(Node::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert!(lenient.load(&value).is_ok());

        let options = Options::new().with_deny_unknown_keys(true);
        let strict = compile_load(Node::type_info(), options, &Hooks::new()).unwrap();
        let err = strict.load(&value).unwrap_err();
        assert_eq!(
            err.kind(),
            &ConversionErrorKind::UnknownKey {
                key: "extra".to_owned()
            }
        );
        assert_eq!(err.path().to_string(), "extra");
    }

    #[test]
    fn null_fields_are_omitted_on_request() {
        let node = Node {
            value: 1,
            next: None,
        };
        let options = Options::new().with_omit_null(true);
        let dumper = compile_dump(Node::type_info(), options, &Hooks::new()).unwrap();
        assert_eq!(dumper.dump(&node).unwrap(), json!({ "value": 1 }));
        assert!(dumper.listing().contains("insert_non_null(out, \"next\", "));
    }

    #[test]
    fn defaults_and_renamed_keys() {
        let loader = compile_load(Settings::type_info(), Options::new(), &Hooks::new()).unwrap();
        let settings = loader
            .load_as::<Settings>(&json!({ "displayName": "main" }))
            .unwrap();
        assert_eq!(
            settings,
            Settings {
                display_name: "main".to_owned(),
                retries: 0,
                label: "untitled".to_owned(),
            }
        );
        assert!(
            loader
                .listing()
                .contains("f2 = default_label() if v1[\"label\"] is MISSING else as_String(v1[\"label\"])")
        );

        let err = loader.load(&json!({ "retries": 2 })).unwrap_err();
        assert_eq!(err.path().to_string(), "displayName");

        let dumper = compile_dump(Settings::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(
            dumper.dump(&settings).unwrap(),
            json!({ "displayName": "main", "retries": 0, "label": "untitled" })
        );
    }

    #[test]
    fn opaque_types_need_a_hook() {
        let err = compile_load(Event::type_info(), Options::new(), &Hooks::new()).unwrap_err();
        assert_eq!(
            err,
            CodegenError::Unsupported {
                type_path: "tests::Stamp",
                direction: Direction::Load,
            }
        );

        let mut hooks = Hooks::new();
        hooks
            .register_load::<Stamp, _>(|value| match value {
                Value::Number(n) => n.as_u64().map(Stamp).ok_or_else(|| "negative".to_owned()),
                _ => Err("expected a number".to_owned()),
            })
            .register_dump::<Stamp, _>(|stamp| Ok(json!(stamp.0)));

        let loader = compile_load(Event::type_info(), Options::new(), &hooks).unwrap();
        let event = loader
            .load_as::<Event>(&json!({ "at": 5, "tag": "t" }))
            .unwrap();
        assert_eq!(event.at, Stamp(5));

        let err = loader.load(&json!({ "at": "now", "tag": "t" })).unwrap_err();
        assert_eq!(
            err.kind(),
            &ConversionErrorKind::Hook("expected a number".to_owned())
        );
        assert_eq!(err.path().to_string(), "at");

        let dumper = compile_dump(Event::type_info(), Options::new(), &hooks).unwrap();
        assert_eq!(dumper.dump(&event).unwrap(), json!({ "at": 5, "tag": "t" }));
    }

    #[test]
    fn dumper_checks_the_root_type() {
        let dumper = compile_dump(Node::type_info(), Options::new(), &Hooks::new()).unwrap();
        let err = dumper.dump(&0_u8).unwrap_err();
        assert!(matches!(err.kind(), ConversionErrorKind::Schema(_)));
    }

    #[test]
    fn absent_generic_fields_behave_like_plain_ones() {
        let plain = compile_load(Plain::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(plain.load_as::<Plain>(&json!({})).unwrap(), Plain { inner: None });

        type W = Wrap<Option<i32>>;
        assert_eq!(
            names(W::type_info(), Direction::Load),
            ["_load_Wrap_Option_i32_slot_0", "load_Wrap_Option_i32"]
        );
        let loader = compile_load(W::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(loader.load_as::<W>(&json!({})).unwrap(), Wrap { inner: None });
        assert_eq!(
            loader.load_as::<W>(&json!({ "inner": null })).unwrap(),
            Wrap { inner: None }
        );
        assert_eq!(
            loader.load_as::<W>(&json!({ "inner": 3 })).unwrap(),
            Wrap { inner: Some(3) }
        );

        let required = compile_load(Wrap::<i32>::type_info(), Options::new(), &Hooks::new()).unwrap();
        let err = required.load(&json!({})).unwrap_err();
        assert_eq!(err.kind(), &ConversionErrorKind::Missing);
        assert_eq!(err.path().to_string(), "inner");
    }

    #[test]
    fn narrow_floats_reject_overflow() {
        let loader = compile_load(Reading::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(
            loader.load_as::<Reading>(&json!({ "level": 0.25 })).unwrap(),
            Reading { level: 0.25 }
        );

        let err = loader.load(&json!({ "level": 1e300 })).unwrap_err();
        assert!(matches!(
            err.kind(),
            ConversionErrorKind::Schema(SchemaError::OutOfRange { ty: "f32", .. })
        ));
        assert_eq!(err.path().to_string(), "level");
    }

    #[test]
    fn hash_maps_dump_in_key_order() {
        let tally = Tally {
            counts: (0..32).map(|n| (format!("k{n:02}"), n)).collect(),
        };
        let dumper = compile_dump(Tally::type_info(), Options::new(), &Hooks::new()).unwrap();
        let dumped = dumper.dump(&tally).unwrap();

        let keys: Vec<&str> = dumped["counts"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let expected: Vec<String> = (0..32).map(|n| format!("k{n:02}")).collect();
        assert_eq!(keys, expected);
        assert_eq!(dumper.dump(&tally).unwrap(), dumped);
    }

    #[test]
    fn dynamic_values_pass_through() {
        let loader = compile_load(Ledger::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert!(loader.listing().contains("lambda v3: as_Value(v3)"));

        let value = json!({ "entries": { "a": [1, { "b": null }], "c": "x" } });
        let ledger = loader.load_as::<Ledger>(&value).unwrap();
        assert_eq!(ledger.entries["a"], json!([1, { "b": null }]));
        assert_eq!(ledger.note, Value::Null);

        let dumper = compile_dump(Ledger::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(
            dumper.dump(&ledger).unwrap(),
            json!({ "entries": { "a": [1, { "b": null }], "c": "x" }, "note": null })
        );

        let err = loader.load(&json!({ "note": 1 })).unwrap_err();
        assert_eq!(err.kind(), &ConversionErrorKind::Missing);
        assert_eq!(err.path().to_string(), "entries");

        let root = compile_load(Value::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(root.load_as::<Value>(&value).unwrap(), value);
    }

    #[test]
    fn unions_take_the_first_matching_variant() {
        let loader = compile_load(Occupation::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert!(loader.listing().contains(
            "return union_Occupation(v1, lambda v2: \
             [as_String(v2), list_Vec_String(v2, lambda v3: as_String(v3))])"
        ));

        assert_eq!(
            loader.load_as::<Occupation>(&json!("chef")).unwrap(),
            Occupation::Title("chef".to_owned())
        );
        assert_eq!(
            loader.load_as::<Occupation>(&json!(["cook", "host"])).unwrap(),
            Occupation::Roles(vec!["cook".to_owned(), "host".to_owned()])
        );

        let err = loader.load(&json!({ "title": "chef" })).unwrap_err();
        assert!(matches!(err.kind(), ConversionErrorKind::NoVariant { .. }));

        let dumper = compile_dump(Occupation::type_info(), Options::new(), &Hooks::new()).unwrap();
        let roles = Occupation::Roles(vec!["cook".to_owned()]);
        assert_eq!(dumper.dump(&roles).unwrap(), json!(["cook"]));
        assert_eq!(
            dumper.dump(&Occupation::Title("chef".to_owned())).unwrap(),
            json!("chef")
        );
    }

    #[test]
    fn recursive_unions_compile_to_one_procedure() {
        assert_eq!(names(Tree::type_info(), Direction::Load), ["load_Tree"]);
        assert_eq!(names(Tree::type_info(), Direction::Dump), ["dump_Tree"]);

        let value = json!([1, [2, 3]]);
        let loader = compile_load(Tree::type_info(), Options::new(), &Hooks::new()).unwrap();
        let tree = loader.load_as::<Tree>(&value).unwrap();
        assert_eq!(
            tree,
            Tree::Branch(vec![
                Tree::Leaf(1),
                Tree::Branch(vec![Tree::Leaf(2), Tree::Leaf(3)]),
            ])
        );

        let dumper = compile_dump(Tree::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert_eq!(dumper.dump(&tree).unwrap(), value);
    }

    #[test]
    fn positional_records_allow_short_input() {
        let loader = compile_load(Name::type_info(), Options::new(), &Hooks::new()).unwrap();
        assert!(loader.listing().contains("expect_sequence(v1, 2, 3)"));
        assert!(loader.listing().contains(
            "f2 = default_title() if v1[2] is MISSING else \
             optional_Option_String(v1[2], lambda v2: as_String(v2))"
        ));

        let name = loader.load_as::<Name>(&json!(["Roberto", "Fuirron"])).unwrap();
        assert_eq!(
            name,
            Name {
                first: "Roberto".to_owned(),
                last: "Fuirron".to_owned(),
                title: Some("Mr.".to_owned()),
            }
        );
        let name = loader.load_as::<Name>(&json!(["A", "B", null])).unwrap();
        assert_eq!(name.title, None);

        let err = loader.load(&json!(["A"])).unwrap_err();
        assert_eq!(
            err.kind(),
            &ConversionErrorKind::Length {
                expected: 2,
                found: 1
            }
        );
        let err = loader.load(&json!(["A", "B", "C", "D"])).unwrap_err();
        assert_eq!(
            err.kind(),
            &ConversionErrorKind::Length {
                expected: 3,
                found: 4
            }
        );
        let err = loader.load(&json!({ "first": "A", "last": "B" })).unwrap_err();
        assert!(matches!(
            err.kind(),
            ConversionErrorKind::TypeMismatch { expected: "array", .. }
        ));

        let dumper = compile_dump(Name::type_info(), Options::new(), &Hooks::new()).unwrap();
        let name = Name {
            first: "A".to_owned(),
            last: "B".to_owned(),
            title: None,
        };
        assert_eq!(dumper.dump(&name).unwrap(), json!(["A", "B", null]));
    }
}
