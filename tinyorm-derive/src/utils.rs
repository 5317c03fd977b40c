use proc_macro2::{Ident, TokenStream};
use syn::{Attribute, Lit, Meta, MetaNameValue};

/// This returns the attribute [`Ident`] if a bare `#[name]` attribute was found.
pub fn has_attribute(attrs: &[Attribute], attr_name: &str) -> Option<Ident> {
    for attr in attrs {
        if let Ok(Meta::Path(path)) = attr.parse_meta() {
            if let Some(ident) = path.get_ident() {
                if ident == attr_name {
                    return Some(ident.clone());
                }
            }
        }
    }

    None
}

/// Value of a `#[name = "value"]` attribute.
pub fn get_str_attr(attrs: &[Attribute], attr_name: &str) -> Result<Option<String>, TokenStream> {
    let attr = match attrs.iter().find(|attr| attr.path.is_ident(attr_name)) {
        Some(attr) => attr,
        None => return Ok(None),
    };

    match attr.parse_meta() {
        Ok(Meta::NameValue(MetaNameValue {
            lit: Lit::Str(value),
            ..
        })) => Ok(Some(value.value())),
        _ => Err(syn::Error::new_spanned(
            attr,
            format!("expected `#[{} = \"...\"]`", attr_name),
        )
        .to_compile_error()),
    }
}

/// Make sure none of the `forbidden` attributes are present.
pub fn validate_attributes(attrs: &[Attribute], forbidden: &[&str]) -> Result<(), TokenStream> {
    for attr in attrs {
        if let Some(name) = forbidden.iter().find(|name| attr.path.is_ident(name)) {
            return Err(syn::Error::new_spanned(
                attr,
                format!("`#[{}]` is not allowed here", name),
            )
            .to_compile_error());
        }
    }

    Ok(())
}
