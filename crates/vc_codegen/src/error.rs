use core::fmt;

use thiserror::Error;
use vc_schema::{SchemaError, TypeKindError};

use crate::Direction;

// -----------------------------------------------------------------------------
// CodegenError

/// Failure while compiling converters.
///
/// Every variant aborts the whole top-level compilation. Compilation is
/// deterministic, so the same inputs fail the same way again.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// A statement or binding was emitted with no procedure open,
    /// or a builder was used out of order.
    #[error("procedure builder misuse: {message}")]
    BuilderState { message: String },
    /// Two procedures with the same name met in one builder.
    #[error("procedure `{name}` is already defined")]
    DuplicateProcedure { name: Box<str> },
    /// A field compiler was registered with zero or several calling shapes.
    #[error("field compiler `{role}` declares {shapes} calling shapes, expected exactly one")]
    AmbiguousClassContext { role: &'static str, shapes: usize },
    /// The accumulated procedures could not be turned into callables.
    #[error("cannot materialize `{procedure}` (compiled for `{record}`): {message}\n{listing}")]
    Compilation {
        procedure: Box<str>,
        record: Box<str>,
        message: String,
        listing: String,
    },
    /// No conversion exists for the type and no hook is registered for it.
    #[error("cannot {direction} `{type_path}`: no conversion rule and no hook registered")]
    Unsupported {
        type_path: &'static str,
        direction: Direction,
    },
    /// A field compiler was handed a type of another kind.
    #[error(transparent)]
    Kind(#[from] TypeKindError),
}

impl CodegenError {
    #[inline]
    pub(crate) fn builder_state(message: impl Into<String>) -> Self {
        Self::BuilderState {
            message: message.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// FieldPath

/// One step from a parent value to a child value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(Box<str>),
    Index(usize),
}

/// Location of a value inside the converted tree, e.g. `people[1].name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    // Innermost segment first, segments are pushed while unwinding.
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Segments from the root down.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter().rev()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.segments().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => f.write_str(key)?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ConversionError

/// What went wrong while converting one value.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionErrorKind {
    #[error("missing required value")]
    Missing,
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid {ty}: {reason}")]
    InvalidScalar { ty: &'static str, reason: String },
    #[error("expected {expected} elements, found {found}")]
    Length { expected: usize, found: usize },
    #[error("unknown key `{key}`")]
    UnknownKey { key: String },
    #[error("map key does not dump to a string or number")]
    NonStringKey,
    #[error("no variant of `{ty}` accepts the value")]
    NoVariant { ty: &'static str },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("hook failed: {0}")]
    Hook(String),
}

/// Failure while running compiled converters on a value.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at `{path}`")]
pub struct ConversionError {
    kind: ConversionErrorKind,
    path: FieldPath,
    #[cfg(feature = "debug")]
    trail: Vec<Box<str>>,
}

impl ConversionError {
    pub fn new(kind: ConversionErrorKind) -> Self {
        Self {
            kind,
            path: FieldPath::default(),
            #[cfg(feature = "debug")]
            trail: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ConversionErrorKind {
        &self.kind
    }

    #[inline]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Generated procedures the error unwound through, innermost first.
    ///
    /// Always empty without the `debug` feature.
    pub fn trail(&self) -> &[Box<str>] {
        #[cfg(feature = "debug")]
        {
            &self.trail
        }
        #[cfg(not(feature = "debug"))]
        {
            &[]
        }
    }

    pub(crate) fn at(mut self, segment: PathSegment) -> Self {
        self.path.segments.push(segment);
        self
    }

    #[inline]
    pub(crate) fn at_key(self, key: &str) -> Self {
        self.at(PathSegment::Key(key.into()))
    }

    #[inline]
    pub(crate) fn at_index(self, index: usize) -> Self {
        self.at(PathSegment::Index(index))
    }

    #[cfg_attr(not(feature = "debug"), allow(unused_variables))]
    #[inline]
    pub(crate) fn through(mut self, procedure: &str) -> Self {
        #[cfg(feature = "debug")]
        self.trail.push(procedure.into());
        self
    }

    pub(crate) fn missing() -> Self {
        Self::new(ConversionErrorKind::Missing)
    }

    pub(crate) fn mismatch(expected: &'static str, found: &serde_json::Value) -> Self {
        Self::new(ConversionErrorKind::TypeMismatch {
            expected,
            found: crate::leaf::value_kind(found),
        })
    }
}

impl From<SchemaError> for ConversionError {
    #[inline]
    fn from(value: SchemaError) -> Self {
        Self::new(ConversionErrorKind::Schema(value))
    }
}

impl From<ConversionErrorKind> for ConversionError {
    #[inline]
    fn from(kind: ConversionErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversionError, ConversionErrorKind};

    #[test]
    fn path_renders_from_the_root() {
        let err = ConversionError::missing()
            .at_key("name")
            .at_index(1)
            .at_key("people");
        assert_eq!(err.path().to_string(), "people[1].name");
        assert_eq!(err.to_string(), "missing required value at `people[1].name`");
    }

    #[test]
    fn root_path() {
        let err = ConversionError::new(ConversionErrorKind::Length { expected: 2, found: 3 });
        assert!(err.path().is_root());
        assert_eq!(err.to_string(), "expected 2 elements, found 3 at `$`");
    }
}
