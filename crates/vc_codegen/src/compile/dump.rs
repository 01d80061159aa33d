use super::{compile_value, field_value};
use crate::context::BuildContext;
use crate::descriptor::TypeDescriptor;
use crate::error::CodegenError;
use crate::ir::{Operand, Stmt};
use crate::options::Options;

/// Body of a record dumper: one mapping entry per field, or one sequence
/// element per field for a positional record.
pub(crate) fn record(
    tp: &TypeDescriptor,
    ctx: &mut BuildContext<'_>,
    options: &Options,
) -> Result<(), CodegenError> {
    let info = tp.info().as_record()?;
    let base: Box<str> = tp.value().base().into();
    let positional = info.is_positional();

    ctx.emit(if positional {
        Stmt::OpenSequence
    } else {
        Stmt::OpenMapping
    })?;
    for (index, field) in info.iter().enumerate() {
        let arg = Operand::Attr {
            base: base.clone(),
            owner: "cls".into(),
            index,
            name: field.name().into(),
        };
        let value = field_value(field, arg, ctx)?;
        ctx.emit(if positional {
            Stmt::Push { value }
        } else {
            Stmt::Insert {
                key: field.key().into(),
                value,
                omit_null: options.omit_null(),
            }
        })?;
    }
    ctx.emit(Stmt::ReturnOutput)
}

/// Body of a tuple dumper: one sequence element per tuple element.
pub(crate) fn tuple(tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
    let info = tp.info().as_tuple()?;
    let base: Box<str> = tp.value().base().into();

    ctx.emit(Stmt::OpenSequence)?;
    for (index, element) in info.generics().iter().enumerate() {
        let arg = Operand::Element {
            base: base.clone(),
            owner: "cls".into(),
            index,
        };
        let element_tp = TypeDescriptor::of(element.type_info(), arg)
            .with_display_name(tp.display_name());
        let value = compile_value(&element_tp, ctx)?;
        ctx.emit(Stmt::Push { value })?;
    }
    ctx.emit(Stmt::ReturnOutput)
}
