use crate::imports::*;
use crate::utilities::*;

pub fn history_vec_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(err) => abort_call_site!("failed to parse derive input: {}", err),
    };
    let original_name = &ast.ident;
    let new_name = Ident::new(
        &format!("{}HistoryVec", original_name.to_token_stream()),
        original_name.span(),
    );
    let fields = named_fields(&ast, "HistoryVec");
    if fields.is_empty() {
        abort!(
            original_name.span(),
            "#[derive(HistoryVec)] needs at least one field"
        );
    }
    let field_names = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .collect::<Vec<_>>();
    let first_field = &field_names[0];

    let vec_fields = fields
        .iter()
        .map(|f| {
            let ident = &f.ident;
            let ty = &f.ty;
            quote! {
                pub #ident: Vec<#ty>,
            }
        })
        .concat();

    let doc = format!(
        "Step-by-step history of [`{}`], one vec per field.",
        original_name
    );

    let mut generated = TokenStream2::new();
    generated.append_all(quote! {
        #[doc = #doc]
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
        pub struct #new_name {
            #vec_fields
        }

        impl #new_name {
            pub fn new() -> #new_name {
                #new_name {
                    #(#field_names: Vec::new(),)*
                }
            }

            /// push fields of state to vec fields in history
            pub fn push(&mut self, value: #original_name) {
                #(self.#field_names.push(value.#field_names);)*
            }

            /// clear all history vecs
            pub fn clear(&mut self) {
                #(self.#field_names.clear();)*
            }

            pub fn pop(&mut self) -> Option<#original_name> {
                if self.is_empty() {
                    return None;
                }
                #(
                    let #field_names = self.#field_names.pop()?;
                )*
                Some(#original_name { #(#field_names),* })
            }

            /// reassemble the state recorded at index `i`
            pub fn get(&self, i: usize) -> Option<#original_name> {
                Some(#original_name {
                    #(#field_names: self.#field_names.get(i)?.clone(),)*
                })
            }

            pub fn len(&self) -> usize {
                self.#first_field.len()
            }

            pub fn is_empty(&self) -> bool {
                self.#first_field.is_empty()
            }
        }

        impl Default for #new_name {
            fn default() -> #new_name {
                #new_name::new()
            }
        }
    });
    generated.into()
}
