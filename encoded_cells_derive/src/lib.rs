use proc_macro2::{Span, TokenStream};
use proc_macro_crate::{crate_name, FoundCrate};
use quote::{quote, quote_spanned};
use syn::{
    parse_macro_input, spanned::Spanned, Attribute, Data, DataStruct, DeriveInput, Error, Field,
    Ident, Index,
};

const QUALIFIER_ATTR: &str = "qualifier";

fn parse_struct_input(input: &DeriveInput) -> Result<&DataStruct, Error> {
    let struct_def = match &input.data {
        Data::Struct(struct_def) => struct_def,
        Data::Enum(enum_def) => {
            return Err(Error::new_spanned(
                enum_def.enum_token,
                "the Cell trait can only be derived for structs",
            ));
        }
        Data::Union(union_def) => {
            return Err(Error::new_spanned(
                union_def.union_token,
                "the Cell trait can only be derived for structs",
            ));
        }
    };

    if struct_def.fields.is_empty() {
        return Err(Error::new_spanned(
            &struct_def.fields,
            "cannot derive Cell trait for struct with no fields",
        ));
    }

    Ok(struct_def)
}

fn is_qualifier(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path.is_ident(QUALIFIER_ATTR))
}

/// Picks the field marked `#[qualifier]`, or the only field of the struct.
fn find_qualifier_field(struct_def: &DataStruct) -> Result<(usize, &Field), Error> {
    let mut marked = struct_def
        .fields
        .iter()
        .enumerate()
        .filter(|(_, field)| is_qualifier(&field.attrs));

    match (marked.next(), marked.next()) {
        (Some(found), None) => Ok(found),
        (Some(_), Some((_, second))) => Err(Error::new_spanned(
            second,
            "only one field can be marked #[qualifier]",
        )),
        (None, _) => match struct_def.fields.iter().next() {
            Some(only) if struct_def.fields.len() == 1 => Ok((0, only)),
            _ => Err(Error::new_spanned(
                &struct_def.fields,
                "mark the field holding the qualifier bytes with #[qualifier]",
            )),
        },
    }
}

fn get_crate_path(orig_name: &str) -> TokenStream {
    match crate_name(orig_name) {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => {
            let ident = Ident::new(orig_name, Span::call_site());
            quote!(::#ident)
        }
    }
}

// 'proc_macro_crate' resolves to 'crate' inside this crate's own doctests, which are compiled as
// separate crates. Doctests mark their structs with this attribute to get the absolute path.
fn is_doctest(attrs: &[Attribute]) -> bool {
    let is_doctest_ident = Ident::new(
        "is_doctest_5f0c2e7a_3d1b_4a69_b8e2_91c4d7f06a13",
        Span::call_site(),
    );
    attrs
        .iter()
        .any(|attr| attr.path.is_ident(&is_doctest_ident))
}

#[proc_macro_derive(
    Cell,
    attributes(qualifier, is_doctest_5f0c2e7a_3d1b_4a69_b8e2_91c4d7f06a13)
)]
pub fn derive_cell(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let (position, field) = match parse_struct_input(&input).and_then(find_qualifier_field) {
        Ok(found) => found,
        Err(err) => return err.into_compile_error().into(),
    };

    let encoded_cells_path = if is_doctest(&input.attrs) {
        quote!(::encoded_cells)
    } else {
        get_crate_path("encoded_cells")
    };
    let trait_name = quote!(#encoded_cells_path::Cell);

    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let field_type = &field.ty;
    let accessor = match &field.ident {
        Some(field_name) => quote!(#field_name),
        None => {
            let index = Index::from(position);
            quote!(#index)
        }
    };

    quote_spanned! {
        field_type.span() =>
        impl #impl_generics #trait_name for #struct_name #ty_generics #where_clause {
            #[inline]
            fn qualifier_array(&self) -> &[u8] {
                ::core::convert::AsRef::<[u8]>::as_ref(&self.#accessor)
            }
        }
    }
    .into()
}
