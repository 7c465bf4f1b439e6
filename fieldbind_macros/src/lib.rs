//! `#[derive(Bind)]` for fieldbind records.
//!
//! Each `#[bind(...)]` attribute lists the namespaces a field takes part in:
//!
//! ```text
//! #[bind(param = "id")]          key "id" in namespace "param"
//! #[bind(query, form)]           key = field name in both namespaces
//! #[bind(json = "-")]            never bound in "json"
//! #[bind(json, serde)]           coerce through serde instead of FromValue
//! ```
//!
//! The derive emits a `Bind` impl whose descriptor is built once and cached.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, Ident, LitStr, Result as SynResult,
    Type,
};

struct Tag {
    namespace: String,
    key: String,
}

struct FieldDef {
    ident: Ident,
    ty: Type,
    tags: Vec<Tag>,
    serde: bool,
}

fn parse_field(field: &syn::Field) -> SynResult<Option<FieldDef>> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new(field.span(), "Bind requires named fields"));
    };
    let mut tags: Vec<Tag> = Vec::new();
    let mut serde = false;
    let mut seen_attr = false;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("bind")) {
        seen_attr = true;
        attr.parse_nested_meta(|meta| {
            let Some(ns) = meta.path.get_ident() else {
                return Err(meta.error("expected a namespace identifier"));
            };
            if ns == "serde" {
                serde = true;
                return Ok(());
            }
            let namespace = ns.to_string();
            let key = if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<LitStr>()?.value()
            } else {
                ident.to_string()
            };
            if tags.iter().any(|t| t.namespace == namespace) {
                return Err(meta.error(format!("namespace `{namespace}` tagged twice")));
            }
            tags.push(Tag { namespace, key });
            Ok(())
        })?;
    }

    if !seen_attr {
        return Ok(None);
    }
    Ok(Some(FieldDef {
        ident,
        ty: field.ty.clone(),
        tags,
        serde,
    }))
}

fn expand(input: DeriveInput) -> SynResult<TokenStream2> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "Bind cannot be derived for generic types",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(name.span(), "Bind can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new(name.span(), "Bind requires named fields"));
    };

    let mut bindings = Vec::new();
    for field in &named.named {
        let Some(def) = parse_field(field)? else {
            continue;
        };
        let ident = &def.ident;
        let ty = &def.ty;
        let field_name = ident.to_string();

        let (set, get) = if def.serde {
            (
                quote! { ::fieldbind::resolve::from_serde::<#ty>(value)? },
                quote! { ::fieldbind::resolve::to_serde(&source.#ident) },
            )
        } else {
            (
                quote! { <#ty as ::fieldbind::FromValue>::from_value(value)? },
                quote! { ::std::result::Result::Ok(::fieldbind::IntoValue::to_value(&source.#ident)) },
            )
        };

        for tag in def.tags.iter().filter(|t| t.key != "-") {
            let namespace = &tag.namespace;
            let key = &tag.key;
            bindings.push(quote! {
                ::fieldbind::FieldBinding::new(
                    #field_name,
                    #namespace,
                    #key,
                    |target: &mut #name, value: &::fieldbind::Value| -> ::std::result::Result<(), ::fieldbind::CoerceError> {
                        target.#ident = #set;
                        ::std::result::Result::Ok(())
                    },
                    |source: &#name| -> ::std::result::Result<::fieldbind::Value, ::fieldbind::CoerceError> { #get },
                )
            });
        }
    }

    Ok(quote! {
        impl ::fieldbind::Bind for #name {
            fn descriptor() -> &'static ::fieldbind::Descriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<::fieldbind::Descriptor<#name>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| ::fieldbind::Descriptor::new(::std::vec![#(#bindings),*]))
            }
        }
    })
}

/// Derive `fieldbind::Bind` from `#[bind(...)]` field attributes.
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
