//! Shared expansion logic behind `#[log_input]`, `#[log_output]`,
//! `#[log_both]`, `#[no_log]`, and `#[no_auto_log]`.
//!
//! Rust has no runtime reflection to build the managed-host `Invocation`
//! capability the specification describes (method metadata, a mutable
//! argument list, `proceed()`, a mutable return slot) from a dynamic proxy.
//! Instead, each of these attributes is a `tracing-attributes`-style
//! function-level macro: it parses the annotated `fn`, and rewrites its body
//! to build a [`logtap::CallContext`], hand the original body to
//! [`logtap::Interceptor::intercept_sync`] or `intercept_async` as the
//! `proceed()` closure, and return whatever the interceptor returns. The
//! per-call-site [`logtap::MethodHandle`] this needs for O(1) hot-path
//! lookup is registered once, lazily, into a `static` local to the
//! generated function body, the same "register once, look up by handle
//! forever after" shape [`logtap::DecisionCache`] itself implements.
use crate::args::DecisionArgs;
use proc_macro2::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::{FnArg, ItemFn, Pat, ReturnType, Type};

/// Which of the five attributes is being expanded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    LogInput,
    LogOutput,
    LogBoth,
    NoLog,
    NoAutoLog,
}

impl Mode {
    fn captures_parameters(self) -> bool {
        matches!(self, Mode::LogInput | Mode::LogBoth)
    }

    /// Builds the `logtap::DecisionOverride` expression this mode always
    /// supplies as the tier-1 attribute override, the one input to
    /// `resolve_decision` that the decision cache's three-tier resolver
    /// never looks past once present, per the veto/override semantics in
    /// the specification's decision engine.
    fn override_tokens(self, args: &DecisionArgs) -> syn::Result<TokenStream> {
        match self {
            Mode::NoLog | Mode::NoAutoLog => Ok(quote! { ::logtap::DecisionOverride::Disabled }),
            Mode::LogInput => args.to_log_input_tokens(),
            Mode::LogOutput => args.to_log_output_tokens(),
            Mode::LogBoth => args.to_log_both_tokens(),
        }
    }
}

/// Parses `args` as a [`DecisionArgs`] (plus the extra `type_name = "..."`
/// field this module adds) and rewrites `item` in place.
pub fn expand(mode: Mode, raw_args: TokenStream, item: TokenStream) -> TokenStream {
    match try_expand(mode, raw_args, item) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn try_expand(mode: Mode, raw_args: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let args: DecisionArgs = syn::parse2(raw_args)?;
    let mut func: ItemFn = syn::parse2(item)?;

    let fn_name_str = func.sig.ident.to_string();
    let type_name_tokens = args
        .type_name
        .as_ref()
        .map(|lit| quote! { #lit })
        .unwrap_or_else(|| quote! { module_path!() });
    let override_tokens = mode.override_tokens(&args)?;

    let params = collect_typed_params(&func)?;
    let param_type_name_literals = params.iter().map(|p| p.type_name.as_str());

    let handle_ident = format_ident!("__logtap_handle");
    let ctx_ident = format_ident!("__logtap_ctx");

    let parameters_expr = if mode.captures_parameters() && !params.is_empty() {
        let raw_params = params.iter().enumerate().map(|(index, p)| {
            let ident = &p.ident;
            let name_lit = &p.name;
            let type_lit = &p.type_name;
            quote_spanned! { ident.span() =>
                ::logtap::RawParam {
                    descriptor: ::logtap::ParameterDescriptor {
                        name: Some(#name_lit.to_string()),
                        type_name: Some(#type_lit.to_string()),
                        index: #index,
                    },
                    value: ::logtap::serde_json::to_value(&#ident).unwrap_or(::logtap::serde_json::Value::Null),
                }
            }
        });
        quote! { .with_parameters(vec![ #(#raw_params),* ]) }
    } else {
        quote! {}
    };

    let registration = quote! {
        static #handle_ident: ::std::sync::OnceLock<::logtap::MethodHandle> = ::std::sync::OnceLock::new();
        let #handle_ident = *#handle_ident.get_or_init(|| {
            let __descriptor = ::logtap::MethodDescriptor::new(
                #type_name_tokens,
                #fn_name_str,
                vec![ #(#param_type_name_literals.to_string()),* ],
            );
            ::logtap::global().decisions().register(&__descriptor, #override_tokens)
        });
        let #ctx_ident = ::logtap::CallContext::new(#fn_name_str, #type_name_tokens, #handle_ident)
            #parameters_expr;
    };

    let is_async = func.sig.asyncness.is_some();
    let returns_result = is_result_type(&func.sig.output);
    let original_block = *func.block.clone();

    let new_body: syn::Block = if is_async {
        if returns_result {
            syn::parse2(quote! {{
                #registration
                ::logtap::global().interceptor().intercept_async(#ctx_ident, async move #original_block).await
            }})?
        } else {
            syn::parse2(quote! {{
                #registration
                let __logtap_result: ::std::result::Result<_, ::std::convert::Infallible> =
                    ::logtap::global().interceptor()
                        .intercept_async(#ctx_ident, async move {
                            let __logtap_value = (async move #original_block).await;
                            ::std::result::Result::Ok(__logtap_value)
                        })
                        .await;
                match __logtap_result {
                    ::std::result::Result::Ok(value) => value,
                    ::std::result::Result::Err(never) => match never {},
                }
            }})?
        }
    } else if returns_result {
        syn::parse2(quote! {{
            #registration
            ::logtap::global().interceptor().intercept_sync(#ctx_ident, move || #original_block)
        }})?
    } else {
        syn::parse2(quote! {{
            #registration
            let __logtap_result: ::std::result::Result<_, ::std::convert::Infallible> =
                ::logtap::global().interceptor()
                    .intercept_sync(#ctx_ident, move || {
                        let __logtap_value = (move || #original_block)();
                        ::std::result::Result::Ok(__logtap_value)
                    });
            match __logtap_result {
                ::std::result::Result::Ok(value) => value,
                ::std::result::Result::Err(never) => match never {},
            }
        }})?
    };

    func.block = Box::new(new_body);
    Ok(quote! { #func })
}

struct TypedParam {
    ident: syn::Ident,
    name: String,
    type_name: String,
}

/// Collects every non-receiver, simple-ident-pattern parameter. Parameters
/// bound with a destructuring pattern (`(a, b): (u32, u32)`) are skipped:
/// there is no single name to report, and the specification's "missing
/// names fall back to `arg{index}`" rule is for a host that can't recover a
/// name at all, not one this macro can trivially destructure further.
fn collect_typed_params(func: &ItemFn) -> syn::Result<Vec<TypedParam>> {
    let mut params = Vec::new();
    for input in &func.sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(pat_ident) = pat_type.pat.as_ref() {
                params.push(TypedParam {
                    ident: pat_ident.ident.clone(),
                    name: pat_ident.ident.to_string(),
                    type_name: type_name_of(&pat_type.ty),
                });
            }
        }
    }
    Ok(params)
}

fn type_name_of(ty: &Type) -> String {
    quote! { #ty }.to_string().replace(' ', "")
}

fn is_result_type(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|segment| segment.ident == "Result")
                .unwrap_or(false),
            _ => false,
        },
    }
}
