use vc_schema::{NamedField, RecordInfo};

use super::{compile_value, field_value};
use crate::context::BuildContext;
use crate::descriptor::{TypeDescriptor, sanitize};
use crate::error::CodegenError;
use crate::ir::{Binding, Operand, Stmt};
use crate::options::Options;

/// Body of a record loader: read each field from its key, then build `cls`.
pub(crate) fn record(
    tp: &TypeDescriptor,
    ctx: &mut BuildContext<'_>,
    options: &Options,
) -> Result<(), CodegenError> {
    let info = tp.info().as_record()?;
    if info.is_positional() {
        return positional_record(tp, info, ctx);
    }
    let param = tp.value().clone();
    let base: Box<str> = param.base().into();

    ctx.emit(Stmt::BeginMapping { arg: param.clone() })?;
    if options.deny_unknown_keys() {
        ctx.emit(Stmt::RejectUnknownKeys {
            arg: param,
            keys: info.iter().map(|field| field.key().into()).collect(),
        })?;
    }

    for (slot, field) in info.iter().enumerate() {
        let arg = Operand::Key {
            base: base.clone(),
            key: field.key().into(),
        };
        assign_field(slot, field, arg, ctx)?;
    }

    ctx.emit(Stmt::Construct { cls: "cls".into() })
}

/// Body of a positional record loader: read each field by position. An
/// input may stop before the trailing fields that have defaults.
fn positional_record(
    tp: &TypeDescriptor,
    info: &RecordInfo,
    ctx: &mut BuildContext<'_>,
) -> Result<(), CodegenError> {
    let param = tp.value().clone();
    let base: Box<str> = param.base().into();

    ctx.emit(Stmt::BeginSequence {
        arg: param,
        min: info.required_len(),
        len: info.field_len(),
    })?;
    for (slot, field) in info.iter().enumerate() {
        let arg = Operand::Item {
            base: base.clone(),
            index: slot,
        };
        assign_field(slot, field, arg, ctx)?;
    }

    ctx.emit(Stmt::Construct { cls: "cls".into() })
}

fn assign_field(
    slot: usize,
    field: &NamedField,
    arg: Operand,
    ctx: &mut BuildContext<'_>,
) -> Result<(), CodegenError> {
    let value = field_value(field, arg.clone(), ctx)?;
    let default = match field.default_fn() {
        Some(factory) => {
            let name = format!("default_{}", sanitize(field.name()));
            ctx.bind(&name, Binding::Default(factory))?;
            Some(name.into_boxed_str())
        }
        None => None,
    };
    ctx.emit(Stmt::Assign {
        slot,
        arg,
        value,
        default,
    })
}

/// Body of a tuple loader: read each element by position, then build `cls`.
pub(crate) fn tuple(tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
    let info = tp.info().as_tuple()?;
    let param = tp.value().clone();
    let base: Box<str> = param.base().into();

    ctx.emit(Stmt::BeginSequence {
        arg: param,
        min: info.element_len(),
        len: info.element_len(),
    })?;
    for (slot, element) in info.generics().iter().enumerate() {
        let arg = Operand::Item {
            base: base.clone(),
            index: slot,
        };
        let element_tp = TypeDescriptor::of(element.type_info(), arg.clone())
            .with_display_name(tp.display_name());
        let value = compile_value(&element_tp, ctx)?;
        ctx.emit(Stmt::Assign {
            slot,
            arg,
            value,
            default: None,
        })?;
    }

    ctx.emit(Stmt::Construct { cls: "cls".into() })
}
