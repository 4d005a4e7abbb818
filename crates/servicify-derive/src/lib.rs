use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Implements `servicify::Enumeration` and `From<T> for servicify::Value` for a
/// fieldless enum. Names default to the SCREAMING_SNAKE_CASE form of the
/// variant and can be overridden with `#[enumeration(name = "...")]`.
#[proc_macro_derive(Enumeration, attributes(enumeration))]
pub fn derive_enumeration(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Enumeration cannot be derived for generic types",
        ));
    }

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Enumeration can only be derived for enums",
            ))
        }
    };

    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Enumeration requires at least one variant",
        ));
    }

    let mut idents = Vec::new();
    let mut names = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Enumeration variants must not carry fields",
            ));
        }
        names.push(variant_name(variant)?);
        idents.push(&variant.ident);
    }

    let ordinals = 0..idents.len();
    let type_name = name.to_string();

    Ok(quote! {
        impl ::servicify::Enumeration for #name {
            const TYPE_NAME: &'static str = #type_name;

            fn name(&self) -> &'static str {
                match self {
                    #( #name::#idents => #names, )*
                }
            }

            fn ordinal(&self) -> usize {
                match self {
                    #( #name::#idents => #ordinals, )*
                }
            }

            fn values() -> &'static [Self] {
                &[ #( #name::#idents ),* ]
            }
        }

        impl ::core::convert::From<#name> for ::servicify::Value {
            fn from(it: #name) -> Self {
                ::servicify::Value::Enumeration(::servicify::Enumeration::to_enumeration_value(&it))
            }
        }
    })
}

fn variant_name(variant: &syn::Variant) -> syn::Result<String> {
    let mut name = None;
    for attr in &variant.attrs {
        if !attr.path().is_ident("enumeration") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported enumeration attribute"))
            }
        })?;
    }
    Ok(name.unwrap_or_else(|| screaming_snake_case(&variant.ident.to_string())))
}

/// `UnixMilliseconds` -> `UNIX_MILLISECONDS`, `Iso8601` -> `ISO_8601`.
fn screaming_snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev: Option<char> = None;
    for c in ident.chars() {
        if let Some(p) = prev {
            let boundary = (c.is_uppercase() && (p.is_lowercase() || p.is_ascii_digit()))
                || (c.is_ascii_digit() && p.is_alphabetic());
            if boundary && p != '_' {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::screaming_snake_case;

    #[test]
    fn test_screaming_snake_case() {
        assert_eq!(screaming_snake_case("Success"), "SUCCESS");
        assert_eq!(screaming_snake_case("UnixMilliseconds"), "UNIX_MILLISECONDS");
        assert_eq!(screaming_snake_case("Iso8601"), "ISO_8601");
        assert_eq!(screaming_snake_case("LocaleDate"), "LOCALE_DATE");
        assert_eq!(screaming_snake_case("Already_Split"), "ALREADY_SPLIT");
    }
}
