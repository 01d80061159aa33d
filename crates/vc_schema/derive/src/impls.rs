//! Code generation for `#[derive(Schema)]`.

use proc_macro2::TokenStream;
use quote::quote;
use vc_macro_utils::full_path::{AnyFP, BoxFP, DefaultFP, OptionFP, ResultFP};

use crate::attributes::FieldDefault;
use crate::derive_data::{SchemaField, SchemaShape, SchemaStruct, SchemaVariant};

pub(crate) fn impl_schema(data: &SchemaStruct) -> TokenStream {
    let vc_schema_path = crate::path::vc_schema();

    let type_path = impl_trait_type_path(data, &vc_schema_path);
    let typed = impl_trait_typed(data, &vc_schema_path);
    let shape = match &data.shape {
        SchemaShape::Record(fields) => impl_trait_record(data, fields, &vc_schema_path),
        SchemaShape::Union(variants) => impl_trait_union(data, variants, &vc_schema_path),
    };

    quote! {
        #type_path
        #typed
        #shape
    }
}

fn where_clause(data: &SchemaStruct, extra: &[TokenStream]) -> TokenStream {
    let existing: Vec<_> = data
        .generics
        .where_clause
        .iter()
        .flat_map(|clause| clause.predicates.iter())
        .collect();

    if existing.is_empty() && extra.is_empty() {
        return TokenStream::new();
    }

    quote! { where #(#existing,)* #(#extra,)* }
}

// -----------------------------------------------------------------------------
// TypePath

fn impl_trait_type_path(data: &SchemaStruct, vc_schema_path: &syn::Path) -> TokenStream {
    let type_path_ = crate::path::type_path_(vc_schema_path);
    let path_cell_ = crate::path::generic_type_path_cell_(vc_schema_path);
    let concat_ = crate::path::concat_(vc_schema_path);

    let ident = data.ident;
    let type_ident = data.type_ident();

    // Non-generic path, as an expression of type `&'static str`.
    let (base_path, module_path) = match &data.attrs.type_path {
        Some(path) => {
            let full = path
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect::<Vec<_>>()
                .join("::");
            let module = if path.segments.len() > 1 {
                let module = data.module_path();
                quote! { #OptionFP::Some(#module) }
            } else {
                quote! { #OptionFP::None }
            };
            (quote! { #full }, module)
        }
        None => (
            quote! { ::core::concat!(::core::module_path!(), "::", #type_ident) },
            quote! { #OptionFP::Some(::core::module_path!()) },
        ),
    };

    let (type_path, type_name, inline_flag) = if data.is_generic() {
        let mut path_args = Vec::new();
        let mut name_args = Vec::new();
        for (index, param) in data.type_params.iter().enumerate() {
            if index > 0 {
                path_args.push(quote! { ", " });
                name_args.push(quote! { ", " });
            }
            path_args.push(quote! { <#param as #type_path_>::type_path() });
            name_args.push(quote! { <#param as #type_path_>::type_name() });
        }
        (
            quote! {
                static CELL: #path_cell_ = #path_cell_::new();
                CELL.get_or_insert::<Self>(|| {
                    #concat_(&[#base_path, "<", #(#path_args,)* ">"])
                })
            },
            quote! {
                static CELL: #path_cell_ = #path_cell_::new();
                CELL.get_or_insert::<Self>(|| {
                    #concat_(&[#type_ident, "<", #(#name_args,)* ">"])
                })
            },
            TokenStream::new(),
        )
    } else {
        (base_path, quote! { #type_ident }, quote! { #[inline] })
    };

    let (impl_generics, ty_generics, _) = data.generics.split_for_impl();
    let bounds: Vec<TokenStream> = data
        .type_params
        .iter()
        .map(|param| quote! { #param: #type_path_ })
        .collect();
    let where_clause = where_clause(data, &bounds);

    quote! {
        impl #impl_generics #type_path_ for #ident #ty_generics #where_clause {
            #inline_flag
            fn type_path() -> &'static str {
                #type_path
            }

            #inline_flag
            fn type_name() -> &'static str {
                #type_name
            }

            #[inline]
            fn type_ident() -> &'static str {
                #type_ident
            }

            #[inline]
            fn module_path() -> #OptionFP<&'static str> {
                #module_path
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Typed

fn impl_trait_typed(data: &SchemaStruct, vc_schema_path: &syn::Path) -> TokenStream {
    let typed_ = crate::path::typed_(vc_schema_path);
    let type_info_ = crate::path::type_info_(vc_schema_path);

    let ident = data.ident;

    let with_generics = if data.is_generic() {
        let generics_ = crate::path::generics_(vc_schema_path);
        let type_param_info_ = crate::path::type_param_info_(vc_schema_path);
        let params = data.type_params.iter().map(|param| {
            let name = param.to_string();
            quote! { #type_param_info_::new::<#param>(#name) }
        });
        quote! { .with_generics(#generics_::from_params(&[#(#params),*])) }
    } else {
        TokenStream::new()
    };

    let info = match &data.shape {
        SchemaShape::Record(fields) => {
            let record_info_ = crate::path::record_info_(vc_schema_path);
            let fields = fields.iter().map(|field| named_field(field, vc_schema_path));
            let positional = if data.attrs.positional.is_some() {
                quote! { .with_positional() }
            } else {
                TokenStream::new()
            };
            quote! {
                #type_info_::Record(
                    #record_info_::new::<Self>(&[#(#fields),*])
                    #with_generics
                    #positional
                )
            }
        }
        SchemaShape::Union(variants) => {
            let union_info_ = crate::path::union_info_(vc_schema_path);
            let union_variant_ = crate::path::union_variant_(vc_schema_path);
            let variants = variants.iter().map(|variant| {
                let ty = variant.ty;
                let name = variant.name();
                quote! { #union_variant_::new::<#ty>(#name) }
            });
            quote! {
                #type_info_::Union(
                    #union_info_::new::<Self>(&[#(#variants),*])
                    #with_generics
                )
            }
        }
    };

    let body = if data.is_generic() {
        let cell_ = crate::path::generic_type_info_cell_(vc_schema_path);
        quote! {
            static CELL: #cell_ = #cell_::new();
            CELL.get_or_insert::<Self>(|| #info)
        }
    } else {
        let cell_ = crate::path::non_generic_type_info_cell_(vc_schema_path);
        quote! {
            static CELL: #cell_ = #cell_::new();
            CELL.get_or_init(|| #info)
        }
    };

    let (impl_generics, ty_generics, _) = data.generics.split_for_impl();
    let where_clause = where_clause(data, &data.where_predicates(vc_schema_path));

    quote! {
        impl #impl_generics #typed_ for #ident #ty_generics #where_clause {
            fn type_info() -> &'static #type_info_ {
                #body
            }
        }
    }
}

/// The `NamedField` expression describing `field`.
fn named_field(field: &SchemaField, vc_schema_path: &syn::Path) -> TokenStream {
    let named_field_ = crate::path::named_field_(vc_schema_path);

    let ty = field.ty;
    let name = field.name();
    let mut tokens = quote! { #named_field_::new::<#ty>(#name) };

    if field.attrs.rename.is_some() {
        let key = field.key();
        tokens.extend(quote! { .with_key(#key) });
    }
    if let Some(index) = field.generic_param {
        tokens.extend(quote! { .with_generic_param(#index) });
    }
    match &field.attrs.default {
        Some(FieldDefault::Trait) => tokens.extend(quote! {
            .with_default(|| -> #BoxFP<dyn #AnyFP> {
                #BoxFP::new(<#ty as #DefaultFP>::default())
            })
        }),
        Some(FieldDefault::Func(func)) => tokens.extend(quote! {
            .with_default(|| -> #BoxFP<dyn #AnyFP> {
                #BoxFP::<#ty>::new(#func())
            })
        }),
        None => {}
    }
    tokens
}

// -----------------------------------------------------------------------------
// Record

fn impl_trait_record(
    data: &SchemaStruct,
    fields: &[SchemaField],
    vc_schema_path: &syn::Path,
) -> TokenStream {
    let record_ = crate::path::record_(vc_schema_path);
    let field_values_ = crate::path::field_values_(vc_schema_path);
    let schema_error_ = crate::path::schema_error_(vc_schema_path);

    let ident = data.ident;

    let takes = fields.iter().map(|field| {
        let field_ident = field.ident;
        let ty = field.ty;
        quote! { #field_ident: fields.take::<#ty>()? }
    });

    let accessors = fields.iter().enumerate().map(|(index, field)| {
        let field_ident = field.ident;
        quote! { #index => #OptionFP::Some(&self.#field_ident as &dyn #AnyFP) }
    });

    let (impl_generics, ty_generics, _) = data.generics.split_for_impl();
    let where_clause = where_clause(data, &data.where_predicates(vc_schema_path));

    quote! {
        impl #impl_generics #record_ for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn from_fields(fields: &mut #field_values_) -> #ResultFP<Self, #schema_error_> {
                #ResultFP::Ok(Self {
                    #(#takes,)*
                })
            }

            fn field_at(&self, index: usize) -> #OptionFP<&dyn #AnyFP> {
                match index {
                    #(#accessors,)*
                    _ => #OptionFP::None,
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Union

fn impl_trait_union(
    data: &SchemaStruct,
    variants: &[SchemaVariant],
    vc_schema_path: &syn::Path,
) -> TokenStream {
    let union_ = crate::path::union_(vc_schema_path);
    let variant_value_ = crate::path::variant_value_(vc_schema_path);
    let schema_error_ = crate::path::schema_error_(vc_schema_path);

    let ident = data.ident;

    let wraps = variants.iter().enumerate().map(|(index, variant)| {
        let variant_ident = variant.ident;
        let ty = variant.ty;
        quote! { #index => #ResultFP::Ok(Self::#variant_ident(variant.take::<#ty>()?)) }
    });

    let actives = variants.iter().enumerate().map(|(index, variant)| {
        let variant_ident = variant.ident;
        quote! { Self::#variant_ident(value) => (#index, value as &dyn #AnyFP) }
    });

    let (impl_generics, ty_generics, _) = data.generics.split_for_impl();
    let where_clause = where_clause(data, &data.where_predicates(vc_schema_path));

    quote! {
        impl #impl_generics #union_ for #ident #ty_generics #where_clause {
            fn from_variant(variant: #variant_value_) -> #ResultFP<Self, #schema_error_> {
                match variant.index() {
                    #(#wraps,)*
                    _ => #ResultFP::Err(variant.unknown()),
                }
            }

            fn variant(&self) -> (usize, &dyn #AnyFP) {
                match self {
                    #(#actives,)*
                }
            }
        }
    }
}
