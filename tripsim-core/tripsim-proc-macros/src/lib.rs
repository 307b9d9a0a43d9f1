mod imports;
use crate::imports::*;
mod approx_eq_derive;
mod history_vec_derive;
mod utilities;

/// Generates `<Name>HistoryVec`, a struct of vecs with one vec per field of
/// `<Name>`, for recording per-step state.
#[proc_macro_error]
#[proc_macro_derive(HistoryVec)]
pub fn history_vec_derive(input: TokenStream) -> TokenStream {
    history_vec_derive::history_vec_derive(input)
}

/// Implements `ApproxEq` by comparing every field with the same tolerance.
#[proc_macro_error]
#[proc_macro_derive(ApproxEq)]
pub fn approx_eq_derive(input: TokenStream) -> TokenStream {
    approx_eq_derive::approx_eq_derive(input)
}
