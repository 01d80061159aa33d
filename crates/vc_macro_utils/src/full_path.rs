//! Fully qualified paths of standard items, for use inside `quote!`.
//!
//! Generated code must not depend on what the caller has in scope, so
//! `Option` is spelled `::core::option::Option` and so on.
//!
//! ```
//! use quote::quote;
//! use vc_macro_utils::full_path::OptionFP;
//!
//! let tokens = quote! { #OptionFP::None };
//! assert!(tokens.to_string().contains("option"));
//! ```

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};

macro_rules! define_full_path {
    ($(#[$meta:meta])* $name:ident => $($path:tt)+) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug)]
        #[allow(non_camel_case_types)]
        pub struct $name;

        impl ToTokens for $name {
            #[inline]
            fn to_tokens(&self, tokens: &mut TokenStream) {
                tokens.extend(quote! { $($path)+ });
            }
        }
    };
}

define_full_path!(
    /// `::core::option::Option`
    OptionFP => ::core::option::Option
);

define_full_path!(
    /// `::core::result::Result`
    ResultFP => ::core::result::Result
);

define_full_path!(
    /// `::std::boxed::Box`
    BoxFP => ::std::boxed::Box
);

define_full_path!(
    /// `::core::default::Default`
    DefaultFP => ::core::default::Default
);

define_full_path!(
    /// `::core::any::Any`
    AnyFP => ::core::any::Any
);
