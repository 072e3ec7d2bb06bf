use crate::utils::{apply_derives, parse_bool_lit};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[value_object] 宏实现
///
/// 值对象按值比较、可序列化，适用于序号、金额这类没有标识的小类型：
/// - 合并派生：Default, Clone, Serialize, Deserialize, PartialEq, Eq, Hash，Debug 可通过 `debug = false` 关闭
/// - `ordered = true` 额外派生 Copy, PartialOrd, Ord
/// - 单字段元组结构体追加 `#[serde(transparent)]`，落盘形态即内部值
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as ValueObjectOptions);
    let mut input = parse_macro_input!(item as Item);

    let mut derives: Vec<syn::Path> = Vec::with_capacity(11);
    if cfg.debug {
        derives.push(syn::parse_quote!(Debug));
    }
    let base: [syn::Path; 7] = [
        syn::parse_quote!(Default),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(Eq),
        syn::parse_quote!(Hash),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    derives.extend(base);
    if cfg.ordered {
        let ordering: [syn::Path; 3] = [
            syn::parse_quote!(Copy),
            syn::parse_quote!(PartialOrd),
            syn::parse_quote!(Ord),
        ];
        derives.extend(ordering);
    }

    match &mut input {
        Item::Struct(st) => {
            let newtype = matches!(&st.fields, syn::Fields::Unnamed(f) if f.unnamed.len() == 1);
            apply_derives(&mut st.attrs, derives);
            if newtype && !has_serde_transparent(&st.attrs) {
                st.attrs.push(syn::parse_quote!(#[serde(transparent)]));
            }
        }
        Item::Enum(en) => apply_derives(&mut en.attrs, derives),
        other => {
            return syn::Error::new(other.span(), "#[value_object] only supports struct or enum")
                .to_compile_error()
                .into();
        }
    }

    TokenStream::from(quote! { #input })
}

fn has_serde_transparent(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("serde")
            && attr
                .parse_args::<syn::Ident>()
                .is_ok_and(|ident| ident == "transparent")
    })
}

// -------- parsing --------

struct ValueObjectOptions {
    debug: bool,
    ordered: bool,
}

impl Parse for ValueObjectOptions {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut debug: Option<bool> = None;
        let mut ordered: Option<bool> = None;

        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            let _eq: Token![=] = input.parse()?;
            let value: syn::Expr = input.parse()?;

            let slot = match key.to_string().as_str() {
                "debug" => &mut debug,
                "ordered" => &mut ordered,
                _ => {
                    return Err(syn::Error::new(
                        key.span(),
                        "unknown key in attribute; expected 'debug' or 'ordered'",
                    ));
                }
            };
            if slot.is_some() {
                return Err(syn::Error::new(key.span(), format!("duplicate key '{key}'")));
            }
            *slot = Some(parse_bool_lit(value, &key.to_string())?);

            if !input.is_empty() {
                let _comma: Token![,] = input.parse()?;
            }
        }

        Ok(Self {
            debug: debug.unwrap_or(true),
            ordered: ordered.unwrap_or(false),
        })
    }
}
