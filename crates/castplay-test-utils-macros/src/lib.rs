// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Attribute macros that wrap castplay tests with a [`TestLoggerGuard`].
//!
//! The wrapped test body sees a `logger: &mut TestLogger` binding. The guard
//! finalizes the per-test log file as a success when the body returns normally
//! (or returns `Ok`) and as a failure on `Err` or panic.
//!
//! [`TestLoggerGuard`]: ../castplay_test_utils/struct.TestLoggerGuard.html

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{ItemFn, ReturnType, Type, parse_macro_input, spanned::Spanned};

/// Wrap a synchronous `#[test]` function.
///
/// ```rust,ignore
/// use castplay_test_utils::logged_test;
///
/// #[logged_test]
/// fn batches_events() {
///     logger.log("building queue").unwrap();
/// }
/// ```
#[proc_macro_attribute]
pub fn logged_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "#[logged_test] does not accept arguments")
            .to_compile_error()
            .into();
    }

    let input = parse_macro_input!(item as ItemFn);

    if let Some(async_token) = &input.sig.asyncness {
        return syn::Error::new(
            async_token.span(),
            "#[logged_test] cannot be applied to async functions; use #[logged_tokio_test] instead",
        )
        .to_compile_error()
        .into();
    }

    expand(input, quote! { #[::core::prelude::v1::test] }, "logged_test")
}

/// Wrap an `async` test with `#[tokio::test]`, forwarding any arguments
/// (for example `flavor = "current_thread"`).
#[proc_macro_attribute]
pub fn logged_tokio_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = TokenStream2::from(attr);
    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new(
            input.sig.ident.span(),
            "#[logged_tokio_test] requires an async function",
        )
        .to_compile_error()
        .into();
    }

    let harness = if args.is_empty() {
        quote! { #[::tokio::test] }
    } else {
        quote! { #[::tokio::test( #args )] }
    };

    expand(input, harness, "logged_tokio_test")
}

fn expand(mut input: ItemFn, harness: TokenStream2, macro_name: &str) -> TokenStream {
    input.attrs.retain(|attr| !is_logged_attr(attr));

    let fn_ident = &input.sig.ident;

    if !input.sig.inputs.is_empty() {
        return syn::Error::new(
            fn_ident.span(),
            format!("#[{macro_name}] can only be applied to functions without parameters"),
        )
        .to_compile_error()
        .into();
    }

    let fn_name = fn_ident.to_string();
    let visibility = &input.vis;
    let asyncness = &input.sig.asyncness;
    let generics = &input.sig.generics;
    let block = &input.block;
    let other_attrs = &input.attrs;
    let (kind, return_tokens) = classify_return(&input.sig.output);
    let finish = finish_tokens(kind);

    let expanded = quote! {
        #harness
        #(#other_attrs)*
        #visibility #asyncness fn #fn_ident #generics () #return_tokens {
            let mut __guard = ::castplay_test_utils::TestLoggerGuard::new(#fn_name)
                .expect("failed to create TestLogger");
            let mut logger = __guard.logger();
            let _ = &mut logger;

            let inner_result = { #block };
            drop(logger);
            #finish
        }
    };

    expanded.into()
}

#[derive(Clone, Copy)]
enum ReturnKind {
    Unit,
    Result,
    Other,
}

fn classify_return(output: &ReturnType) -> (ReturnKind, TokenStream2) {
    match output {
        ReturnType::Default => (ReturnKind::Unit, quote! {}),
        ReturnType::Type(arrow, ty) if is_result_type(ty) => {
            (ReturnKind::Result, quote! { #arrow #ty })
        }
        ReturnType::Type(arrow, ty) => (ReturnKind::Other, quote! { #arrow #ty }),
    }
}

fn is_result_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => {
            type_path.path.segments.last().is_some_and(|segment| segment.ident == "Result")
        }
        _ => false,
    }
}

fn finish_tokens(kind: ReturnKind) -> TokenStream2 {
    match kind {
        ReturnKind::Unit => quote! {
            let _ = inner_result;
            if let Err(e) = __guard.finish_success() {
                panic!("failed to finalize TestLogger: {}", e);
            }
        },
        ReturnKind::Result => quote! {
            match inner_result {
                ::std::result::Result::Ok(value) => {
                    if let Err(e) = __guard.finish_success() {
                        panic!("failed to finalize TestLogger: {}", e);
                    }
                    ::std::result::Result::Ok(value)
                }
                ::std::result::Result::Err(err) => {
                    let __err_msg = format!("{}", err);
                    if let Err(e) = __guard.finish_failure(&__err_msg) {
                        eprintln!("failed to finalize TestLogger after error: {}", e);
                    }
                    ::std::result::Result::Err(err)
                }
            }
        },
        ReturnKind::Other => quote! {
            let value = inner_result;
            if let Err(e) = __guard.finish_success() {
                panic!("failed to finalize TestLogger: {}", e);
            }
            value
        },
    }
}

fn is_logged_attr(attr: &syn::Attribute) -> bool {
    attr.path()
        .get_ident()
        .is_some_and(|ident| ident == "logged_test" || ident == "logged_tokio_test")
}
