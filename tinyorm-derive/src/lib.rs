mod utils;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, FieldsNamed, Ident};
use utils::{get_str_attr, has_attribute, validate_attributes};

/// Derive `tinyorm::Entity` for a struct with named scalar fields.
///
/// The struct maps onto `#[table = "..."]` (defaults to the lowercase struct name
/// with an `s` appended) with one column per field, in declaration order. The `id`
/// column is implicit. Fields marked `#[index]` get a `find_by_<field>` method on
/// the generated `<Name>Mapper`.
#[proc_macro_derive(Entity, attributes(table, index))]
pub fn entity(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let name = ast.ident;

    let fields = match ast.data {
        Data::Struct(syn::DataStruct {
            fields: Fields::Named(FieldsNamed { ref named, .. }),
            ..
        }) => named,
        _ => {
            return syn::Error::new(name.span(), "can only derive on a struct with named fields")
                .to_compile_error()
                .into()
        }
    };

    if let Err(tokens) = validate_attributes(&ast.attrs, &["index"]) {
        return tokens.into();
    }

    let table = match get_str_attr(&ast.attrs, "table") {
        Ok(Some(table)) => table,
        Ok(None) => format!("{}s", name.to_string().to_lowercase()),
        Err(tokens) => return tokens.into(),
    };

    let (columns, to_values, from_values, finders) = match process_fields(&name, fields.iter()) {
        Ok(v) => v,
        Err(e) => return e.into(),
    };

    let entity_name = name.to_string();
    let vis = ast.vis.clone();
    let wrapper_name = Ident::new(&format!("{}Mapper", name), name.span());

    let expanded = quote! {
        impl tinyorm::Entity for #name {
            const SCHEMA: tinyorm::Schema = tinyorm::Schema {
                entity: #entity_name,
                table: #table,
                columns: &[#(#columns),*],
            };

            fn to_values(&self) -> ::std::vec::Vec<tinyorm::Value> {
                ::std::vec![#(#to_values),*]
            }

            fn from_values(values: ::std::vec::Vec<tinyorm::Value>) -> tinyorm::DbResult<Self> {
                let mut values = values.into_iter();
                ::std::result::Result::Ok(Self {
                    #(#from_values),*
                })
            }
        }

        #vis struct #wrapper_name<G: tinyorm::Gateway>(tinyorm::Mapper<#name, G>);

        impl<G: tinyorm::Gateway> ::std::ops::Deref for #wrapper_name<G> {
            type Target = tinyorm::Mapper<#name, G>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<G: tinyorm::Gateway> ::std::ops::DerefMut for #wrapper_name<G> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl<G: tinyorm::Gateway> #wrapper_name<G> {
            pub fn into_inner(self) -> tinyorm::Mapper<#name, G> {
                self.0
            }

            #(#finders)*
        }

        impl #name {
            pub fn mapper<G: tinyorm::Gateway>(gateway: G) -> #wrapper_name<G> {
                #wrapper_name(tinyorm::Mapper::new(gateway))
            }
        }
    };

    expanded.into()
}

/// Process fields and decide what should be generated for each field.
fn process_fields<'a>(
    struct_name: &Ident,
    fields: impl Iterator<Item = &'a Field>,
) -> Result<
    (
        Vec<proc_macro2::TokenStream>,
        Vec<proc_macro2::TokenStream>,
        Vec<proc_macro2::TokenStream>,
        Vec<proc_macro2::TokenStream>,
    ),
    proc_macro2::TokenStream,
> {
    let mut columns = vec![];
    let mut to_values = vec![];
    let mut from_values = vec![];
    let mut finders = vec![];

    for field in fields {
        validate_attributes(&field.attrs, &["table"])?;

        let (field_name, type_name) = match field.ident.as_ref() {
            Some(ident) => (ident, &field.ty),
            None => unreachable!("named fields always have an ident"),
        };

        if field_name == "id" {
            return Err(syn::Error::new(
                field_name.span(),
                "the `id` column is implicit, use `tinyorm::Record::id`",
            )
            .to_compile_error());
        }

        let column = field_name.to_string();

        columns.push(quote! {
            tinyorm::Column {
                name: #column,
                ty: <#type_name as tinyorm::Field>::SQL_TYPE,
            }
        });

        to_values.push(quote! {
            tinyorm::Field::into_value(::std::clone::Clone::clone(&self.#field_name))
        });

        from_values.push(quote! {
            #field_name: <#type_name as tinyorm::Field>::from_value(
                values.next().ok_or_else(|| {
                    tinyorm::TinyOrmError::Decode(::std::format!("missing column `{}`", #column))
                })?,
            )?
        });

        if has_attribute(&field.attrs, "index").is_some() {
            finders.push(create_finder(field_name, type_name, struct_name));
        }
    }

    Ok((columns, to_values, from_values, finders))
}

/// Create the lookup method for an indexed field.
fn create_finder(
    field_name: &Ident,
    type_name: &syn::Type,
    name: &Ident,
) -> proc_macro2::TokenStream {
    let find_method = Ident::new(&format!("find_by_{}", field_name), field_name.span());
    let column = field_name.to_string();

    quote! {
        pub fn #find_method(
            &mut self,
            #field_name: #type_name,
        ) -> tinyorm::DbResult<::std::option::Option<tinyorm::Handle<#name>>> {
            self.0.find_by(#column, tinyorm::Field::into_value(#field_name))
        }
    }
}
