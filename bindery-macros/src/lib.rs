mod bean_name;
mod decode_property;

use bean_name::bean_name;
use decode_property::{decode_property, property_case};
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Implements `bindery::Bean` for a struct with named fields.
///
/// Every field is a property named like the field, its type must implement `bindery::BeanField`.
/// Fields of a type that cannot be assigned from a value (holders, tables, maps, nested beans) are
/// read only.
#[proc_macro_derive(
    Bean,
    attributes(
        bean_name,
        property_case,
        property_name,
        property_read_only,
        property_skip,
    )
)]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    if !item.generics.params.is_empty() {
        panic!("Bean cannot be derived for the generic struct `{}`", name);
    }
    let bean_name = bean_name(&item);
    let case = property_case(&item);
    let properties = item
        .fields
        .iter()
        .filter_map(|f| decode_property(f, case.as_ref()))
        .map(|property| {
            let ident = &property.ident;
            let ty = &property.ty;
            let property_name = &property.name;
            let set = if property.read_only {
                quote!(::std::option::Option::None)
            } else {
                quote! {
                    if <#ty as ::bindery::BeanField>::WRITABLE {
                        ::std::option::Option::Some(
                            (|bean: &mut #name, value: ::bindery::Value| {
                                ::bindery::BeanField::assign(&mut bean.#ident, value)
                            }) as fn(&mut #name, ::bindery::Value) -> ::bindery::Result<()>,
                        )
                    } else {
                        ::std::option::Option::None
                    }
                }
            };
            quote! {
                ::bindery::Property {
                    name: #property_name,
                    get: |bean: &#name| ::bindery::BeanField::to_arg(&bean.#ident),
                    set: #set,
                }
            }
        });
    quote! {
        impl ::bindery::Bean for #name {
            fn bean_name() -> &'static str {
                #bean_name
            }
            fn properties() -> &'static [::bindery::Property<Self>] {
                static PROPERTIES: ::std::sync::LazyLock<::std::vec::Vec<::bindery::Property<#name>>> =
                    ::std::sync::LazyLock::new(|| ::std::vec![#(#properties),*]);
                &PROPERTIES
            }
        }
    }
    .into()
}
