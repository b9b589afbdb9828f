use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ItemStruct;

pub fn expand_slice(input: ItemStruct) -> TokenStream {
    let ItemStruct { attrs, vis, ident, generics, fields, .. } = &input;
    let inner = format_ident!("{ident}Inner");
    let body = match fields {
        syn::Fields::Named(_) => quote! { #fields },
        _ => quote! { #fields; },
    };

    quote! {
        #(#attrs)*
        #[derive(Debug)]
        #vis struct #inner #generics #body

        /// Cheaply clonable handle to the slice state.
        #[derive(Debug, Clone)]
        #vis struct #ident {
            inner: std::sync::Arc<#inner>,
        }

        impl #ident {
            #[must_use]
            pub fn new(inner: #inner) -> Self {
                Self { inner: std::sync::Arc::new(inner) }
            }
        }

        impl std::ops::Deref for #ident {
            type Target = #inner;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl ::parley_kernel::domain::registry::FeatureSlice for #ident {
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    }
}
