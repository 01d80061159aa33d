use core::any::{TypeId, type_name};
use core::fmt;
use std::sync::Arc;

use serde_json::Value;
use vc_codegen::{CodegenError, CompiledCell, Dumper, Hooks, Loader, Options};
use vc_codegen::{compile_dump, compile_load};
use vc_schema::Typed;

use crate::Error;

// -----------------------------------------------------------------------------
// Codec

/// Compiled converters sharing one set of [`Options`] and [`Hooks`].
///
/// Each root type is compiled once per direction, on first use, and kept
/// for the lifetime of the codec. Concurrent first uses wait for a single
/// compilation.
///
/// ```
/// use serde_json::json;
/// use vc_wizard::{Codec, Options};
/// use vc_wizard::schema::derive::Schema;
///
/// #[derive(Schema, Debug)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let codec = Codec::with_options(Options::new().with_deny_unknown_keys(true));
/// assert!(codec.load::<Point>(&json!({ "x": 1, "y": 2, "z": 3 })).is_err());
///
/// let point = codec.load::<Point>(&json!({ "x": 1, "y": "2" })).unwrap();
/// assert_eq!(codec.dump(&point).unwrap(), json!({ "x": 1, "y": 2 }));
/// ```
pub struct Codec {
    options: Options,
    hooks: Hooks,
    loaders: CompiledCell<Loader>,
    dumpers: CompiledCell<Dumper>,
}

impl Codec {
    #[inline]
    pub const fn new() -> Self {
        Self::with_options(Options::new())
    }

    #[inline]
    pub const fn with_options(options: Options) -> Self {
        Self {
            options,
            hooks: Hooks::new(),
            loaders: CompiledCell::new(),
            dumpers: CompiledCell::new(),
        }
    }

    /// The process-wide codec behind the free functions, with default options
    /// and no hooks.
    #[inline]
    pub fn global() -> &'static Codec {
        static GLOBAL: Codec = Codec::new();
        &GLOBAL
    }

    #[inline]
    pub fn options(&self) -> Options {
        self.options
    }

    #[inline]
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Registers the loader of leaf type `T` and drops every compiled loader,
    /// which may have been compiled without it.
    pub fn register_load_hook<T, F>(&mut self, hook: F) -> &mut Self
    where
        T: Typed,
        F: Fn(&Value) -> Result<T, String> + Send + Sync + 'static,
    {
        self.hooks.register_load::<T, F>(hook);
        self.loaders.clear();
        self
    }

    /// Registers the dumper of leaf type `T` and drops every compiled dumper.
    pub fn register_dump_hook<T, F>(&mut self, hook: F) -> &mut Self
    where
        T: Typed,
        F: Fn(&T) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.hooks.register_dump::<T, F>(hook);
        self.dumpers.clear();
        self
    }

    /// The loader of `T`, compiling it on first use.
    pub fn loader<T: Typed>(&self) -> Result<Arc<Loader>, CodegenError> {
        self.loaders.get_or_compile(TypeId::of::<T>(), || {
            log::debug!("compiling loader of `{}`", type_name::<T>());
            compile_load(T::type_info(), self.options, &self.hooks)
        })
    }

    /// The dumper of `T`, compiling it on first use.
    pub fn dumper<T: Typed>(&self) -> Result<Arc<Dumper>, CodegenError> {
        self.dumpers.get_or_compile(TypeId::of::<T>(), || {
            log::debug!("compiling dumper of `{}`", type_name::<T>());
            compile_dump(T::type_info(), self.options, &self.hooks)
        })
    }

    pub fn load<T: Typed>(&self, value: &Value) -> Result<T, Error> {
        Ok(self.loader::<T>()?.load_as::<T>(value)?)
    }

    /// Loads every element of a sequence as a `T`.
    #[inline]
    pub fn load_list<T: Typed>(&self, value: &Value) -> Result<Vec<T>, Error> {
        self.load::<Vec<T>>(value)
    }

    pub fn dump<T: Typed>(&self, value: &T) -> Result<Value, Error> {
        Ok(self.dumper::<T>()?.dump(value)?)
    }

    pub fn from_json<T: Typed>(&self, text: &str) -> Result<T, Error> {
        let value: Value = serde_json::from_str(text)?;
        self.load(&value)
    }

    pub fn to_json<T: Typed>(&self, value: &T) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.dump(value)?)?)
    }

    /// Number of root types compiled per direction, as `(loaders, dumpers)`.
    pub fn compiled(&self) -> (usize, usize) {
        (self.loaders.len(), self.dumpers.len())
    }
}

impl Default for Codec {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("options", &self.options)
            .field("hooks", &self.hooks)
            .field("loaders", &self.loaders.len())
            .field("dumpers", &self.dumpers.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Global entry points

/// Loads a `T` from a tree with the [global](Codec::global) codec.
#[inline]
pub fn load<T: Typed>(value: &Value) -> Result<T, Error> {
    Codec::global().load(value)
}

/// Dumps a `T` to a tree with the [global](Codec::global) codec.
#[inline]
pub fn dump<T: Typed>(value: &T) -> Result<Value, Error> {
    Codec::global().dump(value)
}

/// Parses `text` and loads a `T` from it with the [global](Codec::global) codec.
#[inline]
pub fn from_json<T: Typed>(text: &str) -> Result<T, Error> {
    Codec::global().from_json(text)
}

/// Dumps a `T` and writes it as compact JSON with the [global](Codec::global) codec.
#[inline]
pub fn to_json<T: Typed>(value: &T) -> Result<String, Error> {
    Codec::global().to_json(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    use serde_json::{Value, json};
    use vc_codegen::{CodegenError, ConversionErrorKind};
    use vc_schema::derive::Schema;
    use vc_schema::{NonGenericTypeInfoCell, OpaqueInfo, TypeInfo, TypePath, Typed};

    use super::Codec;
    use crate::Error;

    #[derive(Schema, Debug, PartialEq)]
    struct Tree {
        label: String,
        children: Vec<Tree>,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Millis(u64);

    impl TypePath for Millis {
        fn type_path() -> &'static str {
            "vc_wizard::tests::Millis"
        }
        fn type_name() -> &'static str {
            "Millis"
        }
        fn type_ident() -> &'static str {
            "Millis"
        }
    }

    impl Typed for Millis {
        fn type_info() -> &'static TypeInfo {
            static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
            CELL.get_or_init(|| TypeInfo::Opaque(OpaqueInfo::new::<Self>()))
        }
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Sample {
        at: Millis,
        tags: HashMap<String, bool>,
    }

    #[derive(Schema, Debug, PartialEq)]
    enum Contact {
        Email(String),
        Phones(Vec<String>),
    }

    #[derive(Schema, Debug, PartialEq)]
    #[schema(positional)]
    struct Span {
        start: u32,
        #[schema(default)]
        end: Option<u32>,
    }

    #[derive(Schema, Debug, PartialEq)]
    struct Profile {
        contact: Contact,
        active: Span,
        extra: Value,
    }

    #[test]
    fn recursive_record_through_json_text() {
        let text = r#"{"label":"root","children":[{"label":"leaf","children":[]}]}"#;
        let tree: Tree = crate::from_json(text).unwrap();
        assert_eq!(tree.children[0].label, "leaf");
        assert_eq!(crate::to_json(&tree).unwrap(), text);
    }

    #[test]
    fn unions_positional_records_and_raw_trees() {
        let codec = Codec::new();
        let value = json!({
            "contact": ["+1 555 0100"],
            "active": [1700],
            "extra": { "source": "import", "tags": [1, 2] },
        });
        let profile = codec.load::<Profile>(&value).unwrap();
        assert_eq!(profile.contact, Contact::Phones(vec!["+1 555 0100".to_owned()]));
        assert_eq!(profile.active, Span { start: 1700, end: None });
        assert_eq!(profile.extra["tags"], json!([1, 2]));

        assert_eq!(
            codec.dump(&profile).unwrap(),
            json!({
                "contact": ["+1 555 0100"],
                "active": [1700, null],
                "extra": { "source": "import", "tags": [1, 2] },
            })
        );

        let err = codec
            .load::<Profile>(&json!({ "contact": {}, "active": [1], "extra": null }))
            .unwrap_err();
        let Error::Conversion(err) = err else {
            panic!("expected a conversion error, got {err:?}");
        };
        assert_eq!(err.path().to_string(), "contact");
        assert!(matches!(err.kind(), ConversionErrorKind::NoVariant { .. }));
    }

    #[test]
    fn converters_are_compiled_once_per_type() {
        let codec = Arc::new(Codec::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let codec = Arc::clone(&codec);
                thread::spawn(move || {
                    let label = format!("t{i}");
                    codec
                        .load::<Tree>(&json!({ "label": label, "children": [] }))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let first = codec.loader::<Tree>().unwrap();
        let second = codec.loader::<Tree>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(codec.compiled(), (1, 0));
    }

    #[test]
    fn list_roots() {
        let codec = Codec::new();
        let trees = codec
            .load_list::<Tree>(&json!([
                { "label": "a", "children": [] },
                { "label": "b", "children": [] },
            ]))
            .unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(codec.loader::<Vec<Tree>>().unwrap().entry_name(), "load_Vec_Tree");
    }

    #[test]
    fn hooks_reset_compiled_converters() {
        let mut codec = Codec::new();
        let err = codec.loader::<Sample>().unwrap_err();
        assert!(matches!(err, CodegenError::Unsupported { .. }));
        assert_eq!(codec.compiled(), (1, 0));

        codec
            .register_load_hook::<Millis, _>(|value| {
                value.as_u64().map(Millis).ok_or_else(|| "expected milliseconds".to_owned())
            })
            .register_dump_hook::<Millis, _>(|millis| Ok(json!(millis.0)));
        assert_eq!(codec.compiled(), (0, 0));

        let value = json!({ "at": 1500, "tags": { "hot": true } });
        let sample = codec.load::<Sample>(&value).unwrap();
        assert_eq!(sample.at, Millis(1500));
        assert_eq!(codec.dump(&sample).unwrap(), value);
    }

    #[test]
    fn errors_are_classified() {
        let codec = Codec::new();
        assert!(matches!(codec.from_json::<Tree>("{"), Err(Error::Json(_))));

        let err = codec
            .load::<Tree>(&json!({ "label": "a", "children": [{ "label": 3 }] }))
            .unwrap_err();
        let Error::Conversion(err) = err else {
            panic!("expected a conversion error, got {err:?}");
        };
        assert_eq!(err.path().to_string(), "children[0].children");
        assert_eq!(err.kind(), &ConversionErrorKind::Missing);

        let leaf = Tree {
            label: "x".to_owned(),
            children: Vec::new(),
        };
        assert_eq!(codec.dump(&leaf).unwrap(), json!({ "label": "x", "children": [] }));
    }
}
