use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Fields, GenericParam, Generics, Ident, LitStr, Type};

use crate::attributes::{FieldAttributes, FieldDefault, TypeAttributes};

// -----------------------------------------------------------------------------
// SchemaField

pub(crate) struct SchemaField<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
    pub attrs: FieldAttributes,
    /// Index of the type parameter the field is declared with.
    pub generic_param: Option<usize>,
}

impl SchemaField<'_> {
    /// The serialized key, `rename` or the field name.
    pub(crate) fn key(&self) -> LitStr {
        self.attrs
            .rename
            .clone()
            .unwrap_or_else(|| LitStr::new(&self.name(), self.ident.span()))
    }

    pub(crate) fn name(&self) -> String {
        let name = self.ident.to_string();
        name.strip_prefix("r#").map(str::to_owned).unwrap_or(name)
    }
}

// -----------------------------------------------------------------------------
// SchemaVariant

/// A newtype variant of an enum deriving `Schema`.
pub(crate) struct SchemaVariant<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
}

impl SchemaVariant<'_> {
    pub(crate) fn name(&self) -> String {
        let name = self.ident.to_string();
        name.strip_prefix("r#").map(str::to_owned).unwrap_or(name)
    }
}

// -----------------------------------------------------------------------------
// SchemaStruct

/// What the deriving type is made of.
pub(crate) enum SchemaShape<'a> {
    /// A struct with named fields.
    Record(Vec<SchemaField<'a>>),
    /// An enum of newtype variants.
    Union(Vec<SchemaVariant<'a>>),
}

pub(crate) struct SchemaStruct<'a> {
    pub ident: &'a Ident,
    pub generics: &'a Generics,
    pub attrs: TypeAttributes,
    pub type_params: Vec<&'a Ident>,
    pub shape: SchemaShape<'a>,
}

impl<'a> SchemaStruct<'a> {
    pub(crate) fn from_input(input: &'a DeriveInput) -> syn::Result<Self> {
        let attrs = TypeAttributes::parse_attrs(&input.attrs)?;

        let mut type_params = Vec::new();
        for param in &input.generics.params {
            match param {
                GenericParam::Type(param) => type_params.push(&param.ident),
                GenericParam::Lifetime(param) => {
                    return Err(syn::Error::new_spanned(
                        param,
                        "`Schema` types must be 'static, lifetime parameters are not supported",
                    ));
                }
                GenericParam::Const(param) => {
                    return Err(syn::Error::new_spanned(
                        param,
                        "const parameters are not supported by `Schema`",
                    ));
                }
            }
        }

        let shape = match &input.data {
            Data::Struct(data) => {
                let Fields::Named(named) = &data.fields else {
                    return Err(syn::Error::new_spanned(
                        &input.ident,
                        "`Schema` can only be derived for structs with named fields",
                    ));
                };
                let mut fields = Vec::with_capacity(named.named.len());
                for field in &named.named {
                    let Some(ident) = field.ident.as_ref() else {
                        continue;
                    };
                    fields.push(SchemaField {
                        ident,
                        ty: &field.ty,
                        attrs: FieldAttributes::parse_attrs(&field.attrs)?,
                        generic_param: type_param_index(&field.ty, &type_params),
                    });
                }
                SchemaShape::Record(fields)
            }
            Data::Enum(data) => {
                if let Some(positional) = &attrs.positional {
                    return Err(syn::Error::new_spanned(
                        positional,
                        "`positional` only applies to structs",
                    ));
                }
                if data.variants.is_empty() {
                    return Err(syn::Error::new_spanned(
                        &input.ident,
                        "`Schema` enums need at least one variant",
                    ));
                }
                let mut variants = Vec::with_capacity(data.variants.len());
                for variant in &data.variants {
                    if let Some(attr) = variant
                        .attrs
                        .iter()
                        .find(|attr| attr.path().is_ident(crate::SCHEMA_ATTRIBUTE_NAME))
                    {
                        return Err(syn::Error::new_spanned(
                            attr,
                            "`Schema` enum variants take no attributes",
                        ));
                    }
                    let ty = match &variant.fields {
                        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                            &unnamed.unnamed[0].ty
                        }
                        _ => {
                            return Err(syn::Error::new_spanned(
                                variant,
                                "`Schema` enum variants must wrap exactly one value, as in `Name(T)`",
                            ));
                        }
                    };
                    variants.push(SchemaVariant {
                        ident: &variant.ident,
                        ty,
                    });
                }
                SchemaShape::Union(variants)
            }
            Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "`Schema` can only be derived for structs and enums",
                ));
            }
        };

        Ok(Self {
            ident: &input.ident,
            generics: &input.generics,
            attrs,
            type_params,
            shape,
        })
    }

    pub(crate) fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// The type ident, possibly overridden by `type_path`.
    pub(crate) fn type_ident(&self) -> String {
        match &self.attrs.type_path {
            Some(path) => path
                .segments
                .last()
                .map(|segment| segment.ident.to_string())
                .unwrap_or_else(|| self.ident.to_string()),
            None => self.ident.to_string(),
        }
    }

    /// Tokens evaluating to the module path, as a `&'static str`.
    pub(crate) fn module_path(&self) -> TokenStream {
        match &self.attrs.type_path {
            Some(path) => {
                let module = path
                    .segments
                    .iter()
                    .take(path.segments.len().saturating_sub(1))
                    .map(|segment| segment.ident.to_string())
                    .collect::<Vec<_>>()
                    .join("::");
                module.to_token_stream()
            }
            None => quote! { ::core::module_path!() },
        }
    }

    /// Extra where-predicates: `T: Typed` per type parameter, `F: Default`
    /// per `#[schema(default)]` field.
    pub(crate) fn where_predicates(&self, vc_schema_path: &syn::Path) -> Vec<TokenStream> {
        let typed_ = crate::path::typed_(vc_schema_path);

        let mut predicates: Vec<TokenStream> = self
            .type_params
            .iter()
            .map(|param| quote! { #param: #typed_ })
            .collect();

        if self.is_generic()
            && let SchemaShape::Record(fields) = &self.shape
        {
            for field in fields {
                if let Some(FieldDefault::Trait) = field.attrs.default {
                    let ty = field.ty;
                    predicates.push(quote! { #ty: ::core::default::Default });
                }
            }
        }

        predicates
    }
}

/// Returns the index of the type parameter `ty` is spelled as, if any.
fn type_param_index(ty: &Type, type_params: &[&Ident]) -> Option<usize> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let ident = path.path.get_ident()?;
    type_params.iter().position(|param| *param == ident)
}
