use crate::imports::*;
use crate::utilities::*;

pub fn approx_eq_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(err) => abort_call_site!("failed to parse derive input: {}", err),
    };
    let name = &ast.ident;
    let fields = named_fields(&ast, "ApproxEq");

    let field_names = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .collect::<Vec<_>>();

    let mut generated = TokenStream2::new();
    generated.append_all(quote! {
        impl ApproxEq for #name {
            fn approx_eq(&self, other: &#name, tol: f64) -> bool {
                true #(&& self.#field_names.approx_eq(&other.#field_names, tol))*
            }
        }
    });
    generated.into()
}
