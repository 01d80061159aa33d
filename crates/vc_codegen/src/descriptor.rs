use core::any::TypeId;

use vc_schema::{Type, TypeInfo};

use crate::ir::Operand;

/// Compile-time description of one value to convert: a field, a container
/// element or one argument of a generic record.
///
/// Descriptors are built by the per-field compilers and only read by the
/// wrapper. Two descriptors with the same [`origin`](Self::origin) denote
/// the same compilation target whatever their display name or index.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    origin: Type,
    info: &'static TypeInfo,
    type_arguments: Vec<TypeDescriptor>,
    display_name: Box<str>,
    field_index: Option<usize>,
    value: Operand,
}

impl TypeDescriptor {
    /// Describes a value of type `info` read from `value`.
    ///
    /// Type arguments are taken from the type's generics, each one
    /// indexed by its position and read from the `v1` parameter.
    pub fn of(info: &'static TypeInfo, value: Operand) -> Self {
        let type_arguments = info
            .generics()
            .iter()
            .enumerate()
            .map(|(index, param)| {
                Self::of(param.type_info(), Operand::var("v1")).with_field_index(index)
            })
            .collect();

        Self {
            origin: *info.ty(),
            info,
            type_arguments,
            display_name: sanitize(info.type_name()).into(),
            field_index: None,
            value,
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = sanitize(name).into();
        self
    }

    #[inline]
    pub fn with_field_index(mut self, index: usize) -> Self {
        self.field_index = Some(index);
        self
    }

    #[inline]
    pub fn with_type_arguments(mut self, arguments: Vec<TypeDescriptor>) -> Self {
        self.type_arguments = arguments;
        self
    }

    /// The same target read from another place.
    pub fn at(&self, value: Operand) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    #[inline]
    pub fn origin(&self) -> &Type {
        &self.origin
    }

    #[inline]
    pub fn info(&self) -> &'static TypeInfo {
        self.info
    }

    #[inline]
    pub fn type_arguments(&self) -> &[TypeDescriptor] {
        &self.type_arguments
    }

    #[inline]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline]
    pub fn field_index(&self) -> Option<usize> {
        self.field_index
    }

    #[inline]
    pub fn value(&self) -> &Operand {
        &self.value
    }

    /// Identities of the type arguments, in order.
    pub fn argument_ids(&self) -> Box<[TypeId]> {
        self.type_arguments
            .iter()
            .map(|argument| argument.origin.id())
            .collect()
    }
}

/// Turns a type or field name into an identifier fragment.
///
/// Runs of non-alphanumeric characters collapse into one `_`, e.g.
/// `Option<Box<Node>>` becomes `Option_Box_Node`.
pub(crate) fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("anon");
    }
    out
}

#[cfg(test)]
mod tests {
    use vc_schema::{Type, Typed};

    use super::{TypeDescriptor, sanitize};
    use crate::ir::Operand;

    #[test]
    fn sanitized_names() {
        assert_eq!(sanitize("Option<Box<Node>>"), "Option_Box_Node");
        assert_eq!(sanitize("(i32, String)"), "i32_String");
        assert_eq!(sanitize("my_field"), "my_field");
        assert_eq!(sanitize("()"), "anon");
    }

    #[test]
    fn arguments_follow_generics() {
        let tp = TypeDescriptor::of(
            <Vec<(u8, String)> as Typed>::type_info(),
            Operand::var("v1"),
        );
        assert_eq!(tp.display_name(), "Vec_u8_String");
        assert_eq!(tp.type_arguments().len(), 1);

        let item = &tp.type_arguments()[0];
        assert_eq!(item.field_index(), Some(0));
        assert_eq!(*item.origin(), Type::of::<(u8, String)>());
        assert_eq!(&*item.argument_ids(), &[Type::of::<u8>().id(), Type::of::<String>().id()]);
    }

    #[test]
    fn origin_ignores_labels() {
        let info = <i32 as Typed>::type_info();
        let a = TypeDescriptor::of(info, Operand::var("v1")).with_display_name("first");
        let b = TypeDescriptor::of(info, Operand::var("v2")).with_field_index(3);
        assert_eq!(a.origin(), b.origin());
        assert_ne!(a.display_name(), b.display_name());
    }
}
