use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(BeanModel, attributes(bean))]
pub fn derive_bean_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "BeanModel derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let model_ident = input.ident;

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "BeanModel derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "BeanModel derive is only supported on structs",
            )
            .to_compile_error()
            .into();
        }
    };

    let bindery = bindery_path();
    let mut registrations = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_ty = field.ty;
        let field_name = field_ident.to_string();

        let mut nested = false;
        for attr in &field.attrs {
            if !attr.path().is_ident("bean") {
                continue;
            }
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("nested") {
                    nested = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported bean attribute, expected `nested`"))
                }
            });
            if let Err(error) = parsed {
                return error.to_compile_error().into();
            }
        }

        if nested {
            registrations.push(quote! {
                set.nest(
                    #field_name,
                    |model: &#model_ident| model.#field_ident.clone(),
                    |model: &mut #model_ident, value: #field_ty| model.#field_ident = value,
                    <#field_ty as #bindery::binder::BeanModel>::property_set(),
                );
            });
        } else {
            registrations.push(quote! {
                set.insert(
                    #field_name,
                    |model: &#model_ident| model.#field_ident.clone(),
                    |model: &mut #model_ident, value: #field_ty| model.#field_ident = value,
                );
            });
        }
    }

    quote! {
        impl #bindery::binder::BeanModel for #model_ident {
            fn property_set() -> #bindery::binder::PropertySet<Self> {
                let mut set = #bindery::binder::PropertySet::new();
                #(#registrations)*
                set
            }
        }
    }
    .into()
}

fn bindery_path() -> TokenStream2 {
    match crate_name("bindery") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::bindery),
    }
}
