use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, Item, Lit, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[versioned] 宏实现
/// - 支持结构体与枚举，作为事件载荷或快照载荷
/// - 合并派生：Debug, Clone, PartialEq, Serialize, Deserialize
/// - 实现 `::eventide_domain::versioned::VersionedType`
/// - `#[versioned(name = "...", version = N)]` 显式声明标签；缺省时由类型名约定推导
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as VersionedAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];

    let (ident, generics) = match &mut input {
        Item::Struct(st) => {
            apply_derives(&mut st.attrs, required);
            (st.ident.clone(), st.generics.clone())
        }
        Item::Enum(en) => {
            apply_derives(&mut en.attrs, required);
            (en.ident.clone(), en.generics.clone())
        }
        other => {
            return syn::Error::new(other.span(), "#[versioned] only supports struct or enum")
                .to_compile_error()
                .into();
        }
    };

    let tag = match cfg.tag {
        Some((name, version)) => quote! {
            ::core::option::Option::Some(::eventide_domain::versioned::VersionedTag::new(#name, #version))
        },
        None => quote! { ::core::option::Option::None },
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let out = quote! {
        #input

        impl #impl_generics ::eventide_domain::versioned::VersionedType for #ident #ty_generics #where_clause {
            const VERSIONED_TAG: ::core::option::Option<::eventide_domain::versioned::VersionedTag> = #tag;
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

struct VersionedAttrConfig {
    tag: Option<(syn::LitStr, syn::LitInt)>,
}

impl Parse for VersionedAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self { tag: None });
        }

        let mut name: Option<syn::LitStr> = None;
        let mut version: Option<syn::LitInt> = None;

        let pairs: Punctuated<syn::MetaNameValue, Token![,]> = Punctuated::parse_terminated(input)?;
        for pair in pairs {
            let key = pair
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            match (key.as_str(), pair.value) {
                ("name", Expr::Lit(syn::ExprLit { lit: Lit::Str(s), .. })) => {
                    if name.replace(s).is_some() {
                        return Err(syn::Error::new(pair.path.span(), "duplicate key 'name'"));
                    }
                }
                ("version", Expr::Lit(syn::ExprLit { lit: Lit::Int(i), .. })) => {
                    if i.base10_parse::<u32>()? == 0 {
                        return Err(syn::Error::new(i.span(), "version starts at 1"));
                    }
                    if version.replace(i).is_some() {
                        return Err(syn::Error::new(pair.path.span(), "duplicate key 'version'"));
                    }
                }
                ("name", other) => {
                    return Err(syn::Error::new(other.span(), "expected string literal for 'name'"));
                }
                ("version", other) => {
                    return Err(syn::Error::new(other.span(), "expected integer literal for 'version'"));
                }
                _ => {
                    return Err(syn::Error::new(
                        pair.path.span(),
                        "unknown key in attribute; expected 'name' or 'version'",
                    ));
                }
            }
        }

        match (name, version) {
            (Some(name), Some(version)) => Ok(Self { tag: Some((name, version)) }),
            _ => Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "#[versioned] expects both 'name' and 'version' when declaring a tag",
            )),
        }
    }
}
