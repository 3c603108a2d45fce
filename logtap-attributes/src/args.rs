//! Parsing for the `level = "...", error_level = "...", target = "...",
//! formatter = "...", type_name = "..."` argument lists accepted by
//! `log_input`, `log_output`, `log_both`, `no_log`, and `no_auto_log`.
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Lit, LitStr, Token};

#[derive(Default)]
pub struct DecisionArgs {
    pub level: Option<LitStr>,
    pub error_level: Option<LitStr>,
    pub target: Option<LitStr>,
    pub formatter: Option<LitStr>,
    /// Overrides the `module_path!()` fallback `expand.rs` uses for a
    /// method's declaring-type name. A free function has no enclosing
    /// `impl Self` for the macro to recover on its own, so this is how a
    /// method called through an `impl` block tells the decision cache the
    /// name a host's `MethodPattern` configuration will actually match on.
    pub type_name: Option<LitStr>,
}

impl Parse for DecisionArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = DecisionArgs::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let lit: Lit = input.parse()?;
            let lit_str = match lit {
                Lit::Str(s) => s,
                other => {
                    return Err(syn::Error::new_spanned(other, "expected a string literal"));
                }
            };
            match ident.to_string().as_str() {
                "level" => args.level = Some(lit_str),
                "error_level" => args.error_level = Some(lit_str),
                "target" => args.target = Some(lit_str),
                "formatter" => args.formatter = Some(lit_str),
                "type_name" => args.type_name = Some(lit_str),
                other => {
                    return Err(syn::Error::new_spanned(
                        ident,
                        format!("unknown argument `{}`", other),
                    ));
                }
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

/// Renders `Option<LitStr>` level fields as `Option<logtap_core::Level>`
/// token streams, or `None` when absent. A level string that fails to parse
/// at compile time is rejected with a span-accurate error rather than
/// deferred to a runtime panic.
fn level_tokens(lit: &Option<LitStr>) -> syn::Result<TokenStream> {
    match lit {
        None => Ok(quote! { None }),
        Some(s) => {
            let value = s.value();
            let variant = parse_level_ident(&value)
                .ok_or_else(|| syn::Error::new_spanned(s, format!("unknown level `{}`", value)))?;
            Ok(quote! { Some(::logtap::Level::#variant) })
        }
    }
}

fn parse_level_ident(value: &str) -> Option<proc_macro2::Ident> {
    let name = match value.to_ascii_lowercase().as_str() {
        "trace" => "Trace",
        "debug" => "Debug",
        "information" | "info" => "Information",
        "warning" | "warn" => "Warning",
        "error" => "Error",
        "critical" | "fatal" => "Critical",
        _ => return None,
    };
    Some(proc_macro2::Ident::new(name, proc_macro2::Span::call_site()))
}

fn opt_string_tokens(lit: &Option<LitStr>) -> TokenStream {
    match lit {
        None => quote! { None },
        Some(s) => quote! { Some(#s.to_string()) },
    }
}

impl DecisionArgs {
    /// Builds a `logtap_core::DecisionOverride::LogInput { .. }` expression.
    pub fn to_log_input_tokens(&self) -> syn::Result<TokenStream> {
        let level = level_tokens(&self.level)?;
        let target = opt_string_tokens(&self.target);
        let formatter = opt_string_tokens(&self.formatter);
        Ok(quote! {
            ::logtap::DecisionOverride::LogInput {
                level: #level,
                target: #target,
                formatter: #formatter,
            }
        })
    }

    /// Builds a `logtap_core::DecisionOverride::LogOutput { .. }` expression.
    pub fn to_log_output_tokens(&self) -> syn::Result<TokenStream> {
        let level = level_tokens(&self.level)?;
        let error_level = level_tokens(&self.error_level)?;
        let target = opt_string_tokens(&self.target);
        let formatter = opt_string_tokens(&self.formatter);
        Ok(quote! {
            ::logtap::DecisionOverride::LogOutput {
                level: #level,
                error_level: #error_level,
                target: #target,
                formatter: #formatter,
            }
        })
    }

    /// Builds a `logtap_core::DecisionOverride::LogBoth { .. }` expression.
    pub fn to_log_both_tokens(&self) -> syn::Result<TokenStream> {
        let level = level_tokens(&self.level)?;
        let error_level = level_tokens(&self.error_level)?;
        let target = opt_string_tokens(&self.target);
        let formatter = opt_string_tokens(&self.formatter);
        Ok(quote! {
            ::logtap::DecisionOverride::LogBoth {
                level: #level,
                error_level: #error_level,
                target: #target,
                formatter: #formatter,
            }
        })
    }
}
