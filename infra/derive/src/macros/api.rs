use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, LitStr, Meta, MetaNameValue, Token};

/// Serde policy requested through `#[api_model(..)]` arguments.
#[derive(Default)]
struct ModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

/// Serde policy already present on the struct.
#[derive(Default)]
struct SerdePolicy {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    match expand_model(args, &input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

/// Wraps the handler and attaches `utoipa::path` behind the `server` feature.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = &input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn expand_model(args: TokenStream, input: &ItemStruct) -> syn::Result<TokenStream> {
    let args = parse_model_args(args)?;
    let policy = serde_policy(&input.attrs)?;
    let derives = derived_traits(&input.attrs);

    let mut missing = Vec::new();
    if !derives.contains("Debug") {
        missing.push(quote! { Debug });
    }
    if !derives.contains("Serialize") {
        missing.push(quote! { ::serde::Serialize });
    }
    if !derives.contains("Deserialize") {
        missing.push(quote! { ::serde::Deserialize });
    }
    let derive_attr = if missing.is_empty() { quote!() } else { quote! { #[derive(#(#missing),*)] } };
    let schema_attr = if derives.contains("ToSchema") {
        quote!()
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let rename = args
        .rename_all
        .unwrap_or_else(|| LitStr::new("camelCase", proc_macro2::Span::call_site()));
    let rename_attr = match &policy.rename_all {
        Some(existing) if existing.value() != rename.value() => {
            return Err(syn::Error::new_spanned(
                existing,
                "conflicting serde rename_all; drop it or pass the same value to api_model",
            ));
        }
        Some(_) => quote!(),
        None => quote! { #[serde(rename_all = #rename)] },
    };

    let deny = args.deny_unknown_fields.unwrap_or(true);
    let deny_attr = match (policy.deny_unknown_fields, deny) {
        (true, false) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "deny_unknown_fields is already set via serde",
            ));
        }
        (false, true) => quote! { #[serde(deny_unknown_fields)] },
        _ => quote!(),
    };

    Ok(quote! {
        #derive_attr
        #schema_attr
        #rename_attr
        #deny_attr
        #input
    })
}

fn parse_model_args(args: TokenStream) -> syn::Result<ModelArgs> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = ModelArgs::default();

    for meta in metas {
        let Meta::NameValue(pair) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `key = value` arguments"));
        };
        if pair.path.is_ident("rename_all") {
            let Lit::Str(value) = literal(&pair)? else {
                return Err(syn::Error::new_spanned(&pair.value, "rename_all must be a string"));
            };
            set_once(&mut parsed.rename_all, &pair, value)?;
        } else if pair.path.is_ident("deny_unknown_fields") {
            let Lit::Bool(value) = literal(&pair)? else {
                return Err(syn::Error::new_spanned(
                    &pair.value,
                    "deny_unknown_fields must be a boolean",
                ));
            };
            set_once(&mut parsed.deny_unknown_fields, &pair, value.value)?;
        } else {
            return Err(syn::Error::new_spanned(
                &pair.path,
                "unsupported argument; expected rename_all or deny_unknown_fields",
            ));
        }
    }

    Ok(parsed)
}

fn literal(pair: &MetaNameValue) -> syn::Result<Lit> {
    match &pair.value {
        Expr::Lit(expr) => Ok(expr.lit.clone()),
        other => Err(syn::Error::new_spanned(other, "expected a literal")),
    }
}

fn set_once<T>(slot: &mut Option<T>, pair: &MetaNameValue, value: T) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(pair, "duplicate argument"));
    }
    *slot = Some(value);
    Ok(())
}

fn serde_policy(attrs: &[Attribute]) -> syn::Result<SerdePolicy> {
    let mut policy = SerdePolicy::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                policy.rename_all = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("deny_unknown_fields") {
                policy.deny_unknown_fields = true;
            } else if meta.input.peek(Token![=]) {
                // Skip values of unrelated serde keys.
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(policy)
}

fn derived_traits(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                traits.insert(last.ident.to_string());
            }
            Ok(())
        });
    }
    traits
}
