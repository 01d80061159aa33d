use serde_json::Value;

use crate::{DynamicInfo, NonGenericTypeInfoCell, TypeInfo, TypePath, Typed};

impl TypePath for Value {
    #[inline]
    fn type_path() -> &'static str {
        "serde_json::Value"
    }

    #[inline]
    fn type_name() -> &'static str {
        "Value"
    }

    #[inline]
    fn type_ident() -> &'static str {
        "Value"
    }

    #[inline]
    fn module_path() -> Option<&'static str> {
        Some("serde_json")
    }
}

impl Typed for Value {
    fn type_info() -> &'static TypeInfo {
        static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
        CELL.get_or_init(|| TypeInfo::Dynamic(DynamicInfo::new::<Self>()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{TypeKind, Typed};

    #[test]
    fn tree_is_kept_as_is() {
        let info = Value::type_info();
        assert_eq!(info.kind(), TypeKind::Dynamic);
        assert!(info.generics().is_empty());

        let dynamic = info.as_dynamic().unwrap();
        let tree = json!({"a": [1, "two", null]});
        let value = dynamic.from_tree(&tree);
        assert_eq!(value.downcast_ref::<Value>(), Some(&tree));
        assert_eq!(dynamic.to_tree(&*value).unwrap(), tree);

        assert!(dynamic.to_tree(&1_u8).is_err());
    }
}
