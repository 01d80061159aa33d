//! Paths into `vc_schema` used by the generated code.

use proc_macro2::TokenStream;
use quote::quote;

/// Get the correct access path to the `vc_schema` crate.
///
/// `::vc_schema` for crates depending on it directly, `::vc_wizard::schema`
/// for crates that only depend on the facade. See [`vc_macro_utils::Manifest`].
pub(crate) fn vc_schema() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_schema"))
}

macro_rules! define_paths {
    ($($fn_name:ident => $item:ident),* $(,)?) => {$(
        #[inline(always)]
        pub(crate) fn $fn_name(vc_schema_path: &syn::Path) -> TokenStream {
            quote! { #vc_schema_path::$item }
        }
    )*};
}

define_paths! {
    type_path_ => TypePath,
    typed_ => Typed,
    record_ => Record,
    union_ => Union,
    type_info_ => TypeInfo,
    record_info_ => RecordInfo,
    named_field_ => NamedField,
    union_info_ => UnionInfo,
    union_variant_ => UnionVariant,
    variant_value_ => VariantValue,
    generics_ => Generics,
    type_param_info_ => TypeParamInfo,
    field_values_ => FieldValues,
    schema_error_ => SchemaError,
    generic_type_path_cell_ => GenericTypePathCell,
    generic_type_info_cell_ => GenericTypeInfoCell,
    non_generic_type_info_cell_ => NonGenericTypeInfoCell,
    concat_ => concat,
}
