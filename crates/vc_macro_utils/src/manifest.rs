use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use proc_macro2::Span;
use toml_edit::{Document, Item, Table};

/// Locate an accessible [`syn::Path`] for another crate as seen from the
/// caller's Cargo.toml.
///
/// The emitted path must be valid from the crate invoking the proc-macro,
/// which may depend on `vc_schema` directly or only through the `vc_wizard`
/// facade.
///
/// # Example
///
/// ```rust
/// # use vc_macro_utils::Manifest;
/// let p: syn::Path = Manifest::shared(|m| m.get_crate_path("vc_schema"));
/// ```
///
/// Reading the manifest is not cheap, call this once per macro invocation.
///
/// # Resolution rules
///
/// 1. If the requested crate is listed in `dependencies`, return `::crate_name`.
/// 2. If the requested crate name begins with `vc_` and the target crate
///    depends on `vc_wizard`, return `::vc_wizard::short_name`
///    (e.g. `vc_schema` -> `::vc_wizard::schema`).
/// 3. Repeat step 1-2 in `dev-dependencies`.
/// 4. Otherwise, fall back to the absolute path `::crate_name`.
///
/// A crate that refers to itself through generated code needs
/// `extern crate self as crate_name;` in its root.
#[derive(Debug)]
pub struct Manifest {
    pub manifest: Option<Document<Box<str>>>,
    pub modified_time: Option<SystemTime>,
}

const FACADE_NAME: &str = "vc_wizard";
const PREFIX: &str = "vc_";

impl Manifest {
    #[inline(never)]
    fn get_manifest_path() -> Option<PathBuf> {
        let mut path = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR")?);
        path.push("Cargo.toml");
        path.exists().then_some(path)
    }

    #[inline(never)]
    fn get_manifest_modified_time(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }

    #[inline(never)]
    fn read_manifest(path: &Path) -> Option<Document<Box<str>>> {
        let manifest = std::fs::read_to_string(path).ok()?.into_boxed_str();
        Document::parse(manifest).ok()
    }

    fn absolute_path(segments: &[&str]) -> syn::Path {
        syn::Path {
            leading_colon: Some(Default::default()),
            segments: segments
                .iter()
                .map(|segment| syn::PathSegment::from(syn::Ident::new(segment, Span::call_site())))
                .collect(),
        }
    }

    fn find_in_deps(deps: &Table, name: &str) -> Option<syn::Path> {
        if deps.contains_key(name) {
            return Some(Self::absolute_path(&[name]));
        }
        let module = name.strip_prefix(PREFIX)?;
        deps.contains_key(FACADE_NAME)
            .then(|| Self::absolute_path(&[FACADE_NAME, module]))
    }

    /// Return a [`syn::Path`] for the package named `name` as resolved from
    /// the caller's Cargo.toml.
    #[inline(never)]
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        if let Some(manifest) = &self.manifest {
            for table in ["dependencies", "dev-dependencies"] {
                if let Some(Item::Table(deps)) = manifest.get(table)
                    && let Some(path) = Self::find_in_deps(deps, name)
                {
                    return path;
                }
            }
        }

        Self::absolute_path(&[name])
    }

    /// Run `func` with the [`Manifest`] of the caller's Cargo.toml.
    ///
    /// Parsed manifests are cached per path and refreshed when the file's
    /// modification time changes.
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let Some(manifest_path) = Self::get_manifest_path() else {
            return func(&Manifest {
                manifest: None,
                modified_time: None,
            });
        };
        let modified_time = Self::get_manifest_modified_time(&manifest_path);

        let manifests = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(manifest) = manifests.get(&manifest_path)
            && manifest.modified_time.is_some()
            && manifest.modified_time == modified_time
        {
            return func(manifest);
        }

        drop(manifests);

        let manifest = Manifest {
            manifest: Self::read_manifest(&manifest_path),
            modified_time,
        };

        let result = func(&manifest);

        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(manifest_path, manifest);

        result
    }
}
