use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, Type, parse_macro_input};

/// #[domain_event] 宏实现
/// - 仅支持单字段 tuple 变体：`Variant(Payload)`，`Payload` 需实现 `VersionedType`
/// - 合并派生：Debug, Clone
/// - 生成 `::eventide_domain::domain_event::DomainEvent` 实现：
///   载荷访问、由载荷还原变体、向注册表登记全部载荷类型
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[domain_event] takes no arguments; declare tags on payload types with #[versioned]",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(other.span(), "#[domain_event] can only be used on enum types")
                .to_compile_error()
                .into();
        }
    };

    apply_derives(
        &mut enum_item.attrs,
        vec![syn::parse_quote!(Debug), syn::parse_quote!(Clone)],
    );

    let mut variants: Vec<(syn::Ident, Type)> = Vec::with_capacity(enum_item.variants.len());
    for v in &enum_item.variants {
        match &v.fields {
            syn::Fields::Unnamed(f) if f.unnamed.len() == 1 => {
                variants.push((v.ident.clone(), f.unnamed[0].ty.clone()));
            }
            _ => {
                return syn::Error::new(
                    v.span(),
                    "#[domain_event] supports only single-field tuple variants, e.g. Variant(Payload)",
                )
                .to_compile_error()
                .into();
            }
        }
    }

    if variants.is_empty() {
        return syn::Error::new(enum_item.span(), "#[domain_event] requires at least one variant")
            .to_compile_error()
            .into();
    }

    let enum_ident = enum_item.ident.clone();
    let generics = enum_item.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let payload_arms = variants.iter().map(|(v_ident, _)| {
        quote! { Self::#v_ident(payload) => payload }
    });

    let downcasts = variants.iter().map(|(v_ident, ty)| {
        quote! {
            let any = match any.downcast::<#ty>() {
                ::core::result::Result::Ok(payload) => {
                    return ::core::result::Result::Ok(Self::#v_ident(*payload));
                }
                ::core::result::Result::Err(any) => any,
            };
        }
    });

    let registrations = variants.iter().map(|(_, ty)| {
        quote! { registry.register::<#ty>(); }
    });

    let out = quote! {
        #input

        impl #impl_generics ::eventide_domain::domain_event::DomainEvent for #enum_ident #ty_generics #where_clause {
            fn payload(&self) -> &dyn ::eventide_domain::versioned::VersionedPayload {
                match self { #( #payload_arms, )* }
            }

            fn from_payload(
                payload: ::std::boxed::Box<dyn ::eventide_domain::versioned::VersionedPayload>,
            ) -> ::eventide_domain::error::DomainResult<Self> {
                let found = payload.payload_type_name();
                let any = payload.into_any();
                #( #downcasts )*
                ::core::mem::drop(any);
                ::core::result::Result::Err(::eventide_domain::error::DomainError::TypeMismatch {
                    expected: ::std::string::String::from(::core::any::type_name::<Self>()),
                    found: ::std::string::String::from(found),
                })
            }

            fn register_types(registry: &mut ::eventide_domain::versioned::VersionedTypeRegistry) {
                #( #registrations )*
            }
        }
    };

    TokenStream::from(out)
}
