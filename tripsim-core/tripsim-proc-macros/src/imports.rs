pub use proc_macro::TokenStream;
pub use proc_macro2::TokenStream as TokenStream2;
pub use proc_macro_error::{abort, abort_call_site, proc_macro_error};
pub use quote::{quote, ToTokens, TokenStreamExt}; // ToTokens is implicitly used as a trait
pub use syn::{DeriveInput, Ident};
