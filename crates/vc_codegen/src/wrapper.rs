//! The recursive-safe compilation wrapper.
//!
//! A [`RecursiveSafe`] turns a field compiler, which emits the body of one
//! procedure, into something that returns a call of that procedure. Each
//! target is compiled at most once per top-level compilation and a target
//! reached again through a cycle gets a call of the procedure already
//! reserved for it.

use core::fmt;

use crate::compile;
use crate::context::BuildContext;
use crate::descriptor::{TypeDescriptor, sanitize};
use crate::error::CodegenError;
use crate::guard::GuardKey;
use crate::ir::{Binding, CallExpr, Direction};
use crate::options::Options;

/// A compiler emitting the body of the open procedure.
pub type PlainCompiler = fn(&TypeDescriptor, &mut BuildContext<'_>) -> Result<(), CodegenError>;

/// A compiler that also reads the compilation options.
pub type ClassContextCompiler =
    fn(&TypeDescriptor, &mut BuildContext<'_>, &Options) -> Result<(), CodegenError>;

/// The calling shape of a field compiler, chosen when it is registered.
#[derive(Clone, Copy)]
pub enum FieldCompiler {
    Plain(PlainCompiler),
    ClassContext(ClassContextCompiler),
}

impl fmt::Debug for FieldCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain"),
            Self::ClassContext(_) => f.write_str("ClassContext"),
        }
    }
}

/// What identifies a target in the recursion guard, and how it is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// Keyed by the concrete type, named after the descriptor.
    Origin,
    /// Keyed by the type arguments, named after the argument position.
    Generic,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    /// The wrapper opens the procedure around the compiler.
    Nested,
    /// The compiler opens the procedure itself. `{cls_name}` in the
    /// template is replaced by the record display name.
    External { template: &'static str },
}

// -----------------------------------------------------------------------------
// RecursiveSafe

/// A field compiler made safe for recursive type graphs.
///
/// ```
/// use vc_codegen::{CodegenError, RecursiveSafe};
///
/// let err = RecursiveSafe::builder("load_to_record").build().unwrap_err();
/// assert_eq!(
///     err,
///     CodegenError::AmbiguousClassContext { role: "load_to_record", shapes: 0 },
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveSafe {
    role: &'static str,
    compiler: FieldCompiler,
    mode: GuardMode,
    scope: Scope,
}

impl RecursiveSafe {
    #[inline]
    pub fn builder(role: &'static str) -> RecursiveSafeBuilder {
        RecursiveSafeBuilder {
            role,
            plain: None,
            class_context: None,
            mode: GuardMode::Origin,
            scope: Scope::Nested,
        }
    }

    #[inline]
    pub fn role(&self) -> &'static str {
        self.role
    }

    #[inline]
    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    #[inline]
    pub fn compiler(&self) -> FieldCompiler {
        self.compiler
    }

    /// The part of the role naming procedures: `load_to_record` gives `record`.
    pub fn role_token(&self) -> &'static str {
        self.role.splitn(3, '_').last().unwrap_or(self.role)
    }

    fn key(&self, tp: &TypeDescriptor) -> GuardKey {
        match self.mode {
            GuardMode::Origin => GuardKey::origin(tp),
            GuardMode::Generic => GuardKey::arguments(tp),
        }
    }

    fn procedure_name(&self, tp: &TypeDescriptor, ctx: &BuildContext<'_>) -> String {
        let cls = ctx.record_display_name();
        match (self.scope, self.mode) {
            (Scope::External { template }, _) => template.replace("{cls_name}", cls),
            (Scope::Nested, GuardMode::Generic) => format!(
                "_{}_{cls}_{}_{}",
                ctx.direction(),
                self.role_token(),
                tp.field_index().unwrap_or_default(),
            ),
            (Scope::Nested, GuardMode::Origin) => format!(
                "_{}_{cls}_{}_{}",
                ctx.direction(),
                self.role_token(),
                tp.display_name(),
            ),
        }
    }

    fn run(&self, tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
        match self.compiler {
            FieldCompiler::Plain(compiler) => compiler(tp, ctx),
            FieldCompiler::ClassContext(compiler) => {
                let options = ctx.options();
                compiler(tp, ctx, &options)
            }
        }
    }

    /// Returns a call of the procedure converting `tp`, compiling it first
    /// unless the recursion guard already knows it.
    ///
    /// The compiler sees `tp` read from the procedure parameter. The returned
    /// call reads it from where `tp` says.
    pub fn invoke(
        &self,
        tp: &TypeDescriptor,
        ctx: &mut BuildContext<'_>,
    ) -> Result<CallExpr, CodegenError> {
        let key = self.key(tp);
        if let Some(name) = ctx.guard().lookup(&key) {
            return Ok(CallExpr {
                name: name.into(),
                arg: tp.value().clone(),
            });
        }

        let wanted = self.procedure_name(tp, ctx);
        let name = ctx.guard_mut().reserve(key, &wanted);

        let (scope_name, cls) = match self.mode {
            GuardMode::Origin => (sanitize(tp.info().type_name()), tp.info()),
            GuardMode::Generic => (
                ctx.record_display_name().to_owned(),
                tp.type_arguments()
                    .first()
                    .map_or(tp.info(), |argument| argument.info()),
            ),
        };

        let mut nested = ctx.nested(&scope_name, name.clone());
        nested.seed("cls", Binding::Type(cls));
        let inner = tp.at(nested.param());
        let compiled = match self.scope {
            Scope::External { .. } => self.run(&inner, &mut nested),
            Scope::Nested => nested.procedure(|nested| self.run(&inner, nested)),
        };
        let child = nested.into_builder();
        compiled?;
        ctx.merge(child)?;

        Ok(CallExpr {
            name,
            arg: tp.value().clone(),
        })
    }
}

/// Registers the shape of a field compiler. Exactly one shape is accepted.
#[derive(Debug)]
pub struct RecursiveSafeBuilder {
    role: &'static str,
    plain: Option<PlainCompiler>,
    class_context: Option<ClassContextCompiler>,
    mode: GuardMode,
    scope: Scope,
}

impl RecursiveSafeBuilder {
    #[inline]
    pub fn plain(mut self, compiler: PlainCompiler) -> Self {
        self.plain = Some(compiler);
        self
    }

    #[inline]
    pub fn class_context(mut self, compiler: ClassContextCompiler) -> Self {
        self.class_context = Some(compiler);
        self
    }

    /// Keys targets by their type arguments.
    #[inline]
    pub fn generic(mut self) -> Self {
        self.mode = GuardMode::Generic;
        self
    }

    /// Lets the compiler open its own procedure, named after `template`.
    #[inline]
    pub fn external_scope(mut self, template: &'static str) -> Self {
        self.scope = Scope::External { template };
        self
    }

    pub fn build(self) -> Result<RecursiveSafe, CodegenError> {
        let compiler = match (self.plain, self.class_context) {
            (Some(compiler), None) => FieldCompiler::Plain(compiler),
            (None, Some(compiler)) => FieldCompiler::ClassContext(compiler),
            (plain, class_context) => {
                return Err(CodegenError::AmbiguousClassContext {
                    role: self.role,
                    shapes: usize::from(plain.is_some()) + usize::from(class_context.is_some()),
                });
            }
        };
        Ok(RecursiveSafe {
            role: self.role,
            compiler,
            mode: self.mode,
            scope: self.scope,
        })
    }
}

// -----------------------------------------------------------------------------
// WrapperSet

/// The wrapped compilers of one direction.
#[derive(Debug, Clone)]
pub struct WrapperSet {
    direction: Direction,
    /// Top-level procedure, `load_{cls_name}` / `dump_{cls_name}`.
    pub root: RecursiveSafe,
    pub record: RecursiveSafe,
    pub union: RecursiveSafe,
    pub tuple: RecursiveSafe,
    /// Record fields declared as a type parameter.
    pub slot: RecursiveSafe,
}

impl WrapperSet {
    pub fn new(direction: Direction) -> Result<Self, CodegenError> {
        match direction {
            Direction::Load => Ok(Self {
                direction,
                root: RecursiveSafe::builder("load_root")
                    .plain(compile::root)
                    .external_scope("load_{cls_name}")
                    .build()?,
                record: RecursiveSafe::builder("load_to_record")
                    .class_context(compile::load::record)
                    .build()?,
                union: RecursiveSafe::builder("load_to_union")
                    .plain(compile::union)
                    .build()?,
                tuple: RecursiveSafe::builder("load_to_tuple")
                    .plain(compile::load::tuple)
                    .build()?,
                slot: RecursiveSafe::builder("load_to_slot")
                    .plain(compile::slot)
                    .generic()
                    .build()?,
            }),
            Direction::Dump => Ok(Self {
                direction,
                root: RecursiveSafe::builder("dump_root")
                    .plain(compile::root)
                    .external_scope("dump_{cls_name}")
                    .build()?,
                record: RecursiveSafe::builder("dump_from_record")
                    .class_context(compile::dump::record)
                    .build()?,
                union: RecursiveSafe::builder("dump_from_union")
                    .plain(compile::union)
                    .build()?,
                tuple: RecursiveSafe::builder("dump_from_tuple")
                    .plain(compile::dump::tuple)
                    .build()?,
                slot: RecursiveSafe::builder("dump_from_slot")
                    .plain(compile::slot)
                    .generic()
                    .build()?,
            }),
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use vc_schema::Typed;

    use super::{GuardMode, RecursiveSafe, WrapperSet};
    use crate::context::BuildContext;
    use crate::descriptor::TypeDescriptor;
    use crate::error::CodegenError;
    use crate::guard::RecursionGuard;
    use crate::hooks::Hooks;
    use crate::ir::{Binding, Direction, Expr, Operand, Stmt};
    use crate::options::Options;

    static COMPILED: AtomicUsize = AtomicUsize::new(0);

    fn counting(tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
        COMPILED.fetch_add(1, Ordering::SeqCst);
        leaf(tp, ctx)
    }

    fn leaf(tp: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<(), CodegenError> {
        ctx.bind("as_leaf", Binding::Type(tp.info()))?;
        ctx.emit(Stmt::Return(Expr::Leaf {
            helper: "as_leaf".into(),
            arg: tp.value().clone(),
        }))
    }

    fn unused(_: &TypeDescriptor, _: &mut BuildContext<'_>) -> Result<(), CodegenError> {
        Ok(())
    }

    #[test]
    fn shape_is_fixed_at_registration() {
        let both = RecursiveSafe::builder("load_to_record")
            .plain(unused)
            .class_context(|_, _, _| Ok(()))
            .build()
            .unwrap_err();
        assert_eq!(
            both,
            CodegenError::AmbiguousClassContext {
                role: "load_to_record",
                shapes: 2,
            }
        );

        let wrapper = RecursiveSafe::builder("load_to_slot")
            .plain(unused)
            .generic()
            .build()
            .unwrap();
        assert_eq!(wrapper.role_token(), "slot");
        assert_eq!(wrapper.mode(), GuardMode::Generic);
    }

    #[test]
    fn target_is_compiled_at_most_once() {
        let wrappers = WrapperSet::new(Direction::Load).unwrap();
        let hooks = Hooks::new();
        let mut guard = RecursionGuard::new();
        let mut ctx = BuildContext::new(&mut guard, &wrappers, &hooks, Options::new(), "Holder");

        let counted = RecursiveSafe::builder("load_to_leaf")
            .plain(counting)
            .build()
            .unwrap();
        let info = <i32 as Typed>::type_info();
        let first = TypeDescriptor::of(info, Operand::var("a")).with_display_name("first");
        let second = TypeDescriptor::of(info, Operand::var("b")).with_display_name("second");

        let before = COMPILED.load(Ordering::SeqCst);
        let a = counted.invoke(&first, &mut ctx).unwrap();
        let b = counted.invoke(&second, &mut ctx).unwrap();
        assert_eq!(COMPILED.load(Ordering::SeqCst) - before, 1);

        assert_eq!(a.to_string(), "_load_Holder_leaf_first(a)");
        assert_eq!(b.to_string(), "_load_Holder_leaf_first(b)");
        assert_eq!(ctx.guard().len(), 1);

        let builder = ctx.into_builder();
        assert_eq!(builder.len(), 1);
        assert_eq!(
            builder.procedures()[0].body(),
            &[Stmt::Return(Expr::Leaf {
                helper: "as_leaf".into(),
                arg: Operand::var("v1"),
            })]
        );
    }

    #[test]
    fn generic_and_plain_names_differ() {
        let wrappers = WrapperSet::new(Direction::Load).unwrap();
        let hooks = Hooks::new();
        let mut guard = RecursionGuard::new();
        let mut ctx = BuildContext::new(&mut guard, &wrappers, &hooks, Options::new(), "Holder");

        let plain = RecursiveSafe::builder("load_to_leaf")
            .plain(leaf)
            .build()
            .unwrap();
        let generic = RecursiveSafe::builder("load_to_slot")
            .plain(leaf)
            .generic()
            .build()
            .unwrap();

        let info = <u8 as Typed>::type_info();
        let field = TypeDescriptor::of(info, Operand::var("v1")).with_display_name("leaf");
        let argument = field
            .clone()
            .with_field_index(2)
            .with_type_arguments(vec![field.clone()]);

        let plain_call = plain.invoke(&field, &mut ctx).unwrap();
        let generic_call = generic.invoke(&argument, &mut ctx).unwrap();
        assert_eq!(&*plain_call.name, "_load_Holder_leaf_leaf");
        assert_eq!(&*generic_call.name, "_load_Holder_slot_2");
    }
}
