use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

use serde_json::Value;
use vc_schema::TypePath;
use vc_utils::TypeIdMap;

/// A user converter from a tree value to an erased `T`.
pub type LoadHook = Arc<dyn Fn(&Value) -> Result<Box<dyn Any>, String> + Send + Sync>;

/// A user converter from an erased `T` to a tree value.
pub type DumpHook = Arc<dyn Fn(&dyn Any) -> Result<Value, String> + Send + Sync>;

/// User converters for leaf types the engine has no rule for,
/// typically date-times, UUIDs and other newtypes.
///
/// A hook also takes precedence over the built-in rule of a type.
///
/// ```
/// use serde_json::{Value, json};
/// use vc_codegen::Hooks;
///
/// let mut hooks = Hooks::new();
/// hooks.register_load::<u8, _>(|v| match v {
///     Value::String(s) => u8::from_str_radix(s, 16).map_err(|e| e.to_string()),
///     _ => Err("expected a hex string".into()),
/// });
///
/// let hook = hooks.load_hook(core::any::TypeId::of::<u8>()).unwrap();
/// let value = hook(&json!("ff")).unwrap();
/// assert_eq!(value.downcast_ref::<u8>(), Some(&255));
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    load: TypeIdMap<LoadHook>,
    dump: TypeIdMap<DumpHook>,
}

impl Hooks {
    #[inline]
    pub const fn new() -> Self {
        Self {
            load: TypeIdMap::new(),
            dump: TypeIdMap::new(),
        }
    }

    /// Registers the loader of `T`, replacing any previous one.
    pub fn register_load<T, F>(&mut self, hook: F) -> &mut Self
    where
        T: TypePath,
        F: Fn(&Value) -> Result<T, String> + Send + Sync + 'static,
    {
        let erased: LoadHook = Arc::new(move |value: &Value| {
            hook(value).map(|loaded| Box::new(loaded) as Box<dyn Any>)
        });
        self.load.insert_type::<T>(erased);
        self
    }

    /// Registers the dumper of `T`, replacing any previous one.
    pub fn register_dump<T, F>(&mut self, hook: F) -> &mut Self
    where
        T: TypePath,
        F: Fn(&T) -> Result<Value, String> + Send + Sync + 'static,
    {
        let erased: DumpHook = Arc::new(move |value: &dyn Any| match value.downcast_ref::<T>() {
            Some(value) => hook(value),
            None => Err(format!("dump hook of `{}` received another type", T::type_path())),
        });
        self.dump.insert_type::<T>(erased);
        self
    }

    #[inline]
    pub fn load_hook(&self, type_id: TypeId) -> Option<&LoadHook> {
        self.load.get(&type_id)
    }

    #[inline]
    pub fn dump_hook(&self, type_id: TypeId) -> Option<&DumpHook> {
        self.dump.get(&type_id)
    }

    /// Returns `true` if a loader is registered for `type_id`.
    #[inline]
    pub fn has_load(&self, type_id: TypeId) -> bool {
        self.load.contains(&type_id)
    }

    /// Returns `true` if a dumper is registered for `type_id`.
    #[inline]
    pub fn has_dump(&self, type_id: TypeId) -> bool {
        self.dump.contains(&type_id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.load.is_empty() && self.dump.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("load", &self.load.len())
            .field("dump", &self.dump.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use serde_json::json;

    use super::Hooks;

    #[test]
    fn directions_are_registered_apart() {
        let mut hooks = Hooks::new();
        assert!(hooks.is_empty());

        hooks.register_dump::<u8, _>(|byte| Ok(json!(format!("{byte:02x}"))));
        assert!(!hooks.is_empty());
        assert!(hooks.has_dump(TypeId::of::<u8>()));
        assert!(!hooks.has_load(TypeId::of::<u8>()));

        let hook = hooks.dump_hook(TypeId::of::<u8>()).unwrap();
        assert_eq!(hook(&10_u8).unwrap(), json!("0a"));
        assert!(hook(&10_u16).unwrap_err().contains("`u8`"));
    }
}
