//! Parsing of `#[schema(...)]` attributes.

use syn::{Attribute, LitStr, Path};

use crate::SCHEMA_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// TypeAttributes

/// Attributes placed on the struct or enum itself.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    /// `#[schema(type_path = "...")]`
    pub type_path: Option<Path>,
    /// `#[schema(positional)]`
    pub positional: Option<Path>,
}

impl TypeAttributes {
    pub(crate) fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident(SCHEMA_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("type_path") {
                    if result.type_path.is_some() {
                        return Err(meta.error("duplicate `type_path`"));
                    }
                    let lit: LitStr = meta.value()?.parse()?;
                    let path: Path = lit.parse()?;
                    if path.leading_colon.is_some() {
                        return Err(syn::Error::new_spanned(lit, "`type_path` must not start with `::`"));
                    }
                    result.type_path = Some(path);
                    Ok(())
                } else if meta.path.is_ident("positional") {
                    if result.positional.is_some() {
                        return Err(meta.error("duplicate `positional`"));
                    }
                    result.positional = Some(meta.path);
                    Ok(())
                } else {
                    Err(meta.error("unknown type attribute, expected `type_path` or `positional`"))
                }
            })?;
        }

        Ok(result)
    }
}

// -----------------------------------------------------------------------------
// FieldAttributes

/// How a field is filled when its key is absent.
pub(crate) enum FieldDefault {
    /// `#[schema(default)]`
    Trait,
    /// `#[schema(default = "path")]`
    Func(Path),
}

/// Attributes placed on a field.
#[derive(Default)]
pub(crate) struct FieldAttributes {
    /// `#[schema(rename = "...")]`
    pub rename: Option<LitStr>,
    pub default: Option<FieldDefault>,
}

impl FieldAttributes {
    pub(crate) fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident(SCHEMA_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if result.rename.is_some() {
                        return Err(meta.error("duplicate `rename`"));
                    }
                    result.rename = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("default") {
                    if result.default.is_some() {
                        return Err(meta.error("duplicate `default`"));
                    }
                    result.default = Some(if meta.input.peek(syn::Token![=]) {
                        let lit: LitStr = meta.value()?.parse()?;
                        FieldDefault::Func(lit.parse()?)
                    } else {
                        FieldDefault::Trait
                    });
                    Ok(())
                } else {
                    Err(meta.error("unknown field attribute, expected `rename` or `default`"))
                }
            })?;
        }

        Ok(result)
    }
}
