use core::mem;

use vc_schema::TypeInfo;

use crate::builder::ProcedureBuilder;
use crate::descriptor::sanitize;
use crate::error::CodegenError;
use crate::guard::RecursionGuard;
use crate::hooks::Hooks;
use crate::ir::{Binding, Direction, Locals, Operand, Signature, Stmt};
use crate::options::Options;
use crate::wrapper::WrapperSet;

/// State threaded through one top-level compilation.
///
/// Each nested procedure gets its own context from [`nested`](Self::nested):
/// a fresh builder and fresh locals, but the same recursion guard. The
/// nested builder is merged into the parent once the procedure is done.
pub struct BuildContext<'g> {
    guard: &'g mut RecursionGuard,
    wrappers: &'g WrapperSet,
    hooks: &'g Hooks,
    options: Options,
    direction: Direction,
    builder: ProcedureBuilder,
    locals: Locals,
    record_display_name: Box<str>,
    procedure_name: Option<Box<str>>,
    binders: usize,
}

impl<'g> BuildContext<'g> {
    pub fn new(
        guard: &'g mut RecursionGuard,
        wrappers: &'g WrapperSet,
        hooks: &'g Hooks,
        options: Options,
        record_display_name: &str,
    ) -> Self {
        Self {
            guard,
            wrappers,
            hooks,
            options,
            direction: wrappers.direction(),
            builder: ProcedureBuilder::new(record_display_name),
            locals: Locals::new(),
            record_display_name: record_display_name.into(),
            procedure_name: None,
            binders: 1,
        }
    }

    /// A context for the procedure `procedure_name`, namespaced by `scope_name`.
    pub fn nested(&mut self, scope_name: &str, procedure_name: Box<str>) -> BuildContext<'_> {
        BuildContext {
            guard: &mut *self.guard,
            wrappers: self.wrappers,
            hooks: self.hooks,
            options: self.options,
            direction: self.direction,
            builder: ProcedureBuilder::new(self.builder.record()),
            locals: Locals::new(),
            record_display_name: scope_name.into(),
            procedure_name: Some(procedure_name),
            binders: 1,
        }
    }

    /// Opens this context's procedure, runs `f` and seals the procedure,
    /// whether `f` succeeded or not.
    pub fn procedure<F>(&mut self, f: F) -> Result<(), CodegenError>
    where
        F: FnOnce(&mut Self) -> Result<(), CodegenError>,
    {
        let name = self
            .procedure_name
            .clone()
            .ok_or_else(|| CodegenError::builder_state("no procedure name reserved"))?;
        let locals = mem::take(&mut self.locals);
        self.builder.open(&name, Signature::of(self.direction), locals)?;
        let result = f(self);
        let sealed = self.builder.seal();
        result.and(sealed)
    }

    #[inline]
    pub fn emit(&mut self, stmt: Stmt) -> Result<(), CodegenError> {
        self.builder.emit(stmt)
    }

    #[inline]
    pub fn bind(&mut self, name: &str, binding: Binding) -> Result<(), CodegenError> {
        self.builder.bind(name, binding)
    }

    /// Adds a free variable to the procedure this context is about to open.
    #[inline]
    pub fn seed(&mut self, name: &str, binding: Binding) {
        self.locals.insert(name.into(), binding);
    }

    /// Binds the user hook for `info`, if one is registered, and returns its name.
    pub(crate) fn bind_hook(
        &mut self,
        info: &'static TypeInfo,
    ) -> Result<Option<Box<str>>, CodegenError> {
        let binding = match self.direction {
            Direction::Load => self
                .hooks
                .load_hook(info.type_id())
                .map(|hook| Binding::LoadHook(hook.clone())),
            Direction::Dump => self
                .hooks
                .dump_hook(info.type_id())
                .map(|hook| Binding::DumpHook(hook.clone())),
        };
        let Some(binding) = binding else {
            return Ok(None);
        };
        let helper = format!("hook_{}", sanitize(info.type_name()));
        self.bind(&helper, binding)?;
        Ok(Some(helper.into()))
    }

    /// Returns `true` if a hook converts `info` in this direction.
    pub(crate) fn has_hook(&self, info: &TypeInfo) -> bool {
        match self.direction {
            Direction::Load => self.hooks.has_load(info.type_id()),
            Direction::Dump => self.hooks.has_dump(info.type_id()),
        }
    }

    /// A binder name unique within the current procedure.
    pub fn fresh_binder(&mut self) -> Box<str> {
        self.binders += 1;
        let prefix = match self.direction {
            Direction::Load => "v",
            Direction::Dump => "o",
        };
        format!("{prefix}{}", self.binders).into_boxed_str()
    }

    /// The parameter holding the value being converted.
    pub fn param(&self) -> Operand {
        match self.direction {
            Direction::Load => Operand::var("v1"),
            Direction::Dump => Operand::var("o"),
        }
    }

    pub(crate) fn merge(&mut self, child: ProcedureBuilder) -> Result<(), CodegenError> {
        self.builder.merge(child).map(|_| ())
    }

    #[inline]
    pub fn guard(&self) -> &RecursionGuard {
        &*self.guard
    }

    #[inline]
    pub(crate) fn guard_mut(&mut self) -> &mut RecursionGuard {
        &mut *self.guard
    }

    #[inline]
    pub fn wrappers(&self) -> &'g WrapperSet {
        self.wrappers
    }

    #[inline]
    pub fn options(&self) -> Options {
        self.options
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn record_display_name(&self) -> &str {
        &self.record_display_name
    }

    #[inline]
    pub fn procedure_name(&self) -> Option<&str> {
        self.procedure_name.as_deref()
    }

    #[inline]
    pub fn builder(&self) -> &ProcedureBuilder {
        &self.builder
    }

    #[inline]
    pub fn into_builder(self) -> ProcedureBuilder {
        self.builder
    }
}
