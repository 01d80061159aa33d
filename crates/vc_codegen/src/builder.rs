use core::fmt;
use core::ops::{Deref, DerefMut};

use vc_utils::hash::HashMap;

use crate::error::CodegenError;
use crate::ir::{Binding, Locals, Signature, Stmt};
use crate::materialize::CompiledUnit;

// -----------------------------------------------------------------------------
// ProcedureDef

/// One named procedure: signature, body and the free variables it reads.
#[derive(Debug, Clone)]
pub struct ProcedureDef {
    name: Box<str>,
    signature: Signature,
    body: Vec<Stmt>,
    locals: Locals,
}

impl ProcedureDef {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[inline]
    pub fn body(&self) -> &[Stmt] {
        &self.body
    }

    #[inline]
    pub fn locals(&self) -> &Locals {
        &self.locals
    }
}

impl fmt::Display for ProcedureDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "def {}{}:", self.name, self.signature)?;
        if !self.locals.is_empty() {
            f.write_str("    # locals:")?;
            for name in self.locals.keys() {
                write!(f, " {name}")?;
            }
            f.write_str("\n")?;
        }
        if self.body.is_empty() {
            f.write_str("    pass\n")?;
        }
        for stmt in &self.body {
            writeln!(f, "    {stmt}")?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ProcedureBuilder

/// Accumulates procedure definitions until they are materialized.
///
/// Statements go to the innermost open procedure. Sealed procedures keep
/// the order they were sealed or merged in, which is also the order of
/// the [`listing`](Self::listing).
///
/// # Examples
///
/// ```
/// use vc_codegen::{Locals, ProcedureBuilder, Signature, Stmt};
///
/// let mut builder = ProcedureBuilder::new("Unit");
/// {
///     let mut scope = builder
///         .begin_procedure("dump_Unit", Signature::dump(), Locals::new())
///         .unwrap();
///     scope.emit(Stmt::OpenMapping).unwrap();
///     scope.emit(Stmt::ReturnOutput).unwrap();
/// }
///
/// assert!(builder.get("dump_Unit").is_some());
/// assert!(builder.emit(Stmt::OpenMapping).is_err());
/// ```
#[derive(Debug)]
pub struct ProcedureBuilder {
    record: Box<str>,
    procedures: Vec<ProcedureDef>,
    index: HashMap<Box<str>, usize>,
    open: Vec<ProcedureDef>,
}

impl ProcedureBuilder {
    /// Creates an empty builder for procedures compiled on behalf of `record`.
    pub fn new(record: &str) -> Self {
        Self {
            record: record.into(),
            procedures: Vec::new(),
            index: HashMap::default(),
            open: Vec::new(),
        }
    }

    /// Display name of the record the procedures were compiled for.
    #[inline]
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Opens a procedure. It is sealed when the returned scope is dropped,
    /// including on early return.
    pub fn begin_procedure(
        &mut self,
        name: &str,
        signature: Signature,
        locals: Locals,
    ) -> Result<ProcedureScope<'_>, CodegenError> {
        self.open(name, signature, locals)?;
        Ok(ProcedureScope {
            builder: self,
            sealed: false,
        })
    }

    pub(crate) fn open(
        &mut self,
        name: &str,
        signature: Signature,
        locals: Locals,
    ) -> Result<(), CodegenError> {
        if self.is_defined(name) {
            return Err(CodegenError::DuplicateProcedure { name: name.into() });
        }
        self.open.push(ProcedureDef {
            name: name.into(),
            signature,
            body: Vec::new(),
            locals,
        });
        Ok(())
    }

    pub(crate) fn seal(&mut self) -> Result<(), CodegenError> {
        let def = self
            .open
            .pop()
            .ok_or_else(|| CodegenError::builder_state("no procedure to seal"))?;
        if self.index.contains_key(&def.name) {
            return Err(CodegenError::DuplicateProcedure { name: def.name });
        }
        self.index.insert(def.name.clone(), self.procedures.len());
        self.procedures.push(def);
        Ok(())
    }

    /// Appends a statement to the open procedure.
    pub fn emit(&mut self, stmt: Stmt) -> Result<(), CodegenError> {
        match self.open.last_mut() {
            Some(def) => {
                def.body.push(stmt);
                Ok(())
            }
            None => Err(CodegenError::builder_state(format!(
                "`{stmt}` emitted outside any procedure"
            ))),
        }
    }

    /// Binds a free variable of the open procedure.
    pub fn bind(&mut self, name: &str, binding: Binding) -> Result<(), CodegenError> {
        match self.open.last_mut() {
            Some(def) => {
                def.locals.insert(name.into(), binding);
                Ok(())
            }
            None => Err(CodegenError::builder_state(format!(
                "`{name}` bound outside any procedure"
            ))),
        }
    }

    /// Absorbs every definition of `other`, keeping their order.
    ///
    /// Nothing is absorbed if a name collides or `other` still has an open
    /// procedure.
    pub fn merge(&mut self, other: ProcedureBuilder) -> Result<&mut Self, CodegenError> {
        if let Some(def) = other.open.last() {
            return Err(CodegenError::builder_state(format!(
                "cannot merge while `{}` is still open",
                def.name
            )));
        }
        if let Some(def) = other.procedures.iter().find(|def| self.is_defined(&def.name)) {
            return Err(CodegenError::DuplicateProcedure {
                name: def.name.clone(),
            });
        }

        for def in other.procedures {
            self.index.insert(def.name.clone(), self.procedures.len());
            self.procedures.push(def);
        }
        Ok(self)
    }

    fn is_defined(&self, name: &str) -> bool {
        self.index.contains_key(name) || self.open.iter().any(|def| *def.name == *name)
    }

    /// A sealed procedure.
    pub fn get(&self, name: &str) -> Option<&ProcedureDef> {
        self.index.get(name).map(|&index| &self.procedures[index])
    }

    /// Sealed procedures in order.
    #[inline]
    pub fn procedures(&self) -> &[ProcedureDef] {
        &self.procedures
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Returns `true` while some procedure is open.
    #[inline]
    pub fn has_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// The pseudo-source of every sealed procedure.
    #[inline]
    pub fn listing(&self) -> String {
        self.to_string()
    }

    /// Turns the sealed procedures into callables sharing one namespace.
    pub fn materialize(&self) -> Result<CompiledUnit, CodegenError> {
        if let Some(def) = self.open.last() {
            return Err(CodegenError::builder_state(format!(
                "cannot materialize while `{}` is still open",
                def.name
            )));
        }
        CompiledUnit::new(self)
    }
}

impl fmt::Display for ProcedureBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, def) in self.procedures.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            fmt::Display::fmt(def, f)?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ProcedureScope

/// An open procedure. Dereferences to the builder, seals on drop.
pub struct ProcedureScope<'a> {
    builder: &'a mut ProcedureBuilder,
    sealed: bool,
}

impl ProcedureScope<'_> {
    /// Seals the procedure now, reporting a failure the drop would only log.
    pub fn finish(mut self) -> Result<(), CodegenError> {
        self.sealed = true;
        self.builder.seal()
    }
}

impl Deref for ProcedureScope<'_> {
    type Target = ProcedureBuilder;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.builder
    }
}

impl DerefMut for ProcedureScope<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder
    }
}

impl Drop for ProcedureScope<'_> {
    fn drop(&mut self) {
        if !self.sealed
            && let Err(err) = self.builder.seal()
        {
            log::error!("ProcedureScope::drop -> {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use vc_schema::Typed;

    use super::ProcedureBuilder;
    use crate::error::CodegenError;
    use crate::ir::{Binding, CallExpr, Expr, Locals, Operand, Signature, Stmt};

    fn returning(name: &str, builder: &mut ProcedureBuilder) {
        let mut scope = builder
            .begin_procedure(name, Signature::load(), Locals::new())
            .unwrap();
        scope
            .bind("as_i32", Binding::Type(<i32 as Typed>::type_info()))
            .unwrap();
        scope
            .emit(Stmt::Return(Expr::Leaf {
                helper: "as_i32".into(),
                arg: Operand::var("v1"),
            }))
            .unwrap();
    }

    #[test]
    fn emit_requires_an_open_procedure() {
        let mut builder = ProcedureBuilder::new("A");
        let err = builder.emit(Stmt::ReturnOutput).unwrap_err();
        assert!(matches!(err, CodegenError::BuilderState { .. }));
        assert!(builder.bind("cls", Binding::Default(|| Box::new(0_u8))).is_err());
    }

    #[test]
    fn scope_seals_on_error_paths() {
        fn failing(builder: &mut ProcedureBuilder) -> Result<(), CodegenError> {
            let mut scope = builder.begin_procedure("f", Signature::dump(), Locals::new())?;
            scope.emit(Stmt::OpenMapping)?;
            Err(CodegenError::builder_state("stop"))
        }

        let mut builder = ProcedureBuilder::new("A");
        assert!(failing(&mut builder).is_err());
        assert!(!builder.has_open());
        assert_eq!(builder.get("f").unwrap().body(), &[Stmt::OpenMapping]);
    }

    #[test]
    fn merge_keeps_order_and_rejects_duplicates() {
        let mut parent = ProcedureBuilder::new("A");
        returning("first", &mut parent);

        let mut child = ProcedureBuilder::new("A");
        returning("second", &mut child);
        returning("third", &mut child);
        parent.merge(child).unwrap();

        let names: Vec<_> = parent.procedures().iter().map(|def| def.name()).collect();
        assert_eq!(names, ["first", "second", "third"]);

        let mut clash = ProcedureBuilder::new("A");
        returning("fourth", &mut clash);
        returning("second", &mut clash);
        assert_eq!(
            parent.merge(clash).unwrap_err(),
            CodegenError::DuplicateProcedure {
                name: "second".into()
            }
        );
        assert_eq!(parent.len(), 3);
    }

    #[test]
    fn merge_into_an_open_procedure() {
        let mut parent = ProcedureBuilder::new("A");
        let mut scope = parent
            .begin_procedure("outer", Signature::load(), Locals::new())
            .unwrap();

        let mut child = ProcedureBuilder::new("A");
        returning("inner", &mut child);
        scope.merge(child).unwrap();
        scope
            .emit(Stmt::Return(Expr::Call(CallExpr {
                name: "inner".into(),
                arg: Operand::var("v1"),
            })))
            .unwrap();
        scope.finish().unwrap();

        let names: Vec<_> = parent.procedures().iter().map(|def| def.name()).collect();
        assert_eq!(names, ["inner", "outer"]);

        let mut open = ProcedureBuilder::new("A");
        open.open("pending", Signature::load(), Locals::new()).unwrap();
        assert!(matches!(
            parent.merge(open),
            Err(CodegenError::BuilderState { .. })
        ));
    }

    #[test]
    fn listing_renders_every_procedure() {
        let mut builder = ProcedureBuilder::new("A");
        returning("load_A", &mut builder);
        assert_eq!(
            builder.listing(),
            "def load_A(v1, d=MISSING):\n    # locals: as_i32\n    return as_i32(v1)\n"
        );
    }
}
