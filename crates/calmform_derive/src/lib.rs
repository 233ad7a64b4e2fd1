use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Token, parse_macro_input};

/// Generates a `<Model>Fields` accessor with one `FieldLens` per named field.
///
/// Lens keys follow `#[serde(rename = "...")]` and the container's
/// `#[serde(rename_all = "...")]` so they address the same slot the model
/// occupies once serialized into a form value.
#[proc_macro_derive(FormModel, attributes(serde))]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.ident,
            "FormModel can only be derived for non-generic structs",
        ));
    }

    let rename_all = serde_rename_all(&input.attrs)?;
    let model_ident = input.ident;
    let fields_ident = format_ident!("{model_ident}Fields");
    let named = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "FormModel needs a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "FormModel can only be derived for structs",
            ));
        }
    };

    let calmform = calmform_path();
    let mut lenses = Vec::new();
    let mut accessors = Vec::new();

    for field in named {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let key = match serde_rename(&field.attrs)? {
            Some(key) => key,
            None => rename_all.apply(&field_ident.to_string()),
        };
        let field_ty = field.ty;
        let lens_ident =
            format_ident!("{model_ident}{}Lens", to_pascal_case(&field_ident.to_string()));

        lenses.push(quote! {
            #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
            pub struct #lens_ident;

            impl #calmform::form::FieldLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #calmform::form::FieldKey {
                    #calmform::form::FieldKey::new(#key)
                }

                fn get<'a>(self, model: &'a #model_ident) -> &'a Self::Value {
                    &model.#field_ident
                }

                fn set(self, model: &mut #model_ident, value: Self::Value) {
                    model.#field_ident = value;
                }
            }
        });

        accessors.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });
    }

    Ok(quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_ident;

        impl #fields_ident {
            #(#accessors)*
        }

        impl #calmform::form::FormModel for #model_ident {
            type Fields = #fields_ident;

            fn fields() -> Self::Fields {
                #fields_ident
            }
        }

        #(#lenses)*
    })
}

/// Reads `rename = "..."` or `rename(deserialize = "...")` from serde field
/// attributes. Every other serde option is skipped.
fn serde_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    Ok(serde_name_option(attrs, "rename")?.map(|name| name.value()))
}

fn serde_rename_all(attrs: &[Attribute]) -> syn::Result<RenameRule> {
    match serde_name_option(attrs, "rename_all")? {
        Some(rule) => RenameRule::parse(&rule),
        None => Ok(RenameRule::None),
    }
}

/// Finds `option = "..."` or the `deserialize` side of `option(...)` inside
/// `#[serde(...)]` attributes.
fn serde_name_option(attrs: &[Attribute], option: &str) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(option) {
                if meta.input.peek(Token![=]) {
                    found = Some(meta.value()?.parse()?);
                } else {
                    meta.parse_nested_meta(|inner| {
                        let name: LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("deserialize") {
                            found = Some(name);
                        }
                        Ok(())
                    })?;
                }
            } else if meta.input.peek(Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let _group: proc_macro2::Group = meta.input.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}

/// Case conventions accepted by serde's `rename_all`, applied to snake_case
/// field names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RenameRule {
    None,
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &LitStr) -> syn::Result<Self> {
        Ok(match rule.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            other => {
                return Err(syn::Error::new_spanned(
                    rule,
                    format!("unknown rename_all rule `{other}`"),
                ));
            }
        })
    }

    fn apply(self, field: &str) -> String {
        match self {
            Self::None | Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => to_pascal_case(field),
            Self::Camel => {
                let pascal = to_pascal_case(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }
}

fn calmform_path() -> TokenStream2 {
    match crate_name("calmform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::calmform),
    }
}

fn to_pascal_case(input: &str) -> String {
    input
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
