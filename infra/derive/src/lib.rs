#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Parley crates: the workspace error enum
//! attribute, HTTP model/handler helpers and the feature slice wrapper.
//!
//! The examples below are `ignore`d since a proc-macro crate cannot use its own
//! macros in doctests.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context(..)`
///   to `Result<T, Name>` and to results of every wrapped source error.
/// * **Conversions**: Implements `From<Source>` for variants carrying a `source` field
///   (or a field marked `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal`
///   variant exists.
///
/// # Requirements
///
/// 1. Must be applied to an **enum** with named-field variants only.
/// 2. A `context` field must be typed `Option<Cow<'static, str>>`.
/// 3. Variants with a source must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[parley_derive::parley_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("data.bin").context("Reading snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn parley_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Attribute macro to define a Vertical Slice handle.
///
/// Turns `struct Name { .. }` into `NameInner { .. }` plus an `Arc`-backed `Name`
/// handle that derefs to the inner state and implements `FeatureSlice` so it can be
/// registered in the kernel's `ApiState`.
///
/// # Example
/// ```rust,ignore
/// #[parley_derive::parley_slice]
/// pub struct Discussion {
///     pub name: String,
/// }
///
/// let slice = Discussion::new(DiscussionInner { name: "discussion".to_owned() });
/// ```
#[proc_macro_attribute]
pub fn parley_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}

/// Attribute macro for HTTP data transfer objects.
///
/// * Adds `Debug`, `Serialize` and `Deserialize` when missing.
/// * Adds `utoipa::ToSchema` when the consuming crate enables its `server` feature.
/// * Applies `rename_all = "camelCase"` and `deny_unknown_fields` unless overridden.
///
/// ```rust,ignore
/// #[parley_derive::api_model(deny_unknown_fields = false)]
/// pub struct CreatePostRequest {
///     pub title: String,
///     pub text: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Attribute macro for axum handlers, forwarding its arguments to `utoipa::path`
/// when the `server` feature is enabled.
///
/// ```rust,ignore
/// #[parley_derive::api_handler(get, path = "/health", responses((status = OK)))]
/// pub async fn health() -> &'static str {
///     "up"
/// }
/// ```
#[proc_macro_attribute]
pub fn api_handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(attr.into(), input).into()
}
