use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use quote::quote_spanned;
use syn::spanned::Spanned;

/// Turns a function into a test that runs against the gateway.
///
/// Usage: `#[gateway_test]` or `#[gateway_test(configure_fn)]` where
/// `configure_fn: fn(&mut HarnessConfiguration)`. The function may take the
/// resulting `HarnessConfiguration` by value as its only argument.
#[proc_macro_attribute]
pub fn gateway_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    let configuration_function = match args.as_slice() {
        [] => None,
        [syn::NestedMeta::Meta(syn::Meta::Path(function_path))] => Some(function_path),
        _ => {
            return quote! {
                compile_error!("The only argument should be a configuration function!");
            }
            .into();
        }
    };

    let signature = &input.sig;

    if let Some(asyncness) = &signature.asyncness {
        return error_at(asyncness.span(), "Gateway tests can't be async!");
    }

    if let syn::ReturnType::Type(_, return_type) = &signature.output {
        return error_at(return_type.span(), "Gateway tests shouldn't return anything!");
    }

    if signature.inputs.len() > 1 {
        return error_at(
            signature.inputs.span(),
            "Gateway tests take at most one argument, the configuration!",
        );
    }

    let configuration_binding = match signature.inputs.first() {
        None => quote! {},
        Some(syn::FnArg::Receiver(receiver)) => {
            return error_at(receiver.span(), "Gateway tests can't be methods!");
        }
        Some(syn::FnArg::Typed(argument)) => {
            let pattern = &argument.pat;
            let argument_type = &argument.ty;
            quote! { let #pattern: #argument_type = __gateway_configuration; }
        }
    };

    let configure_call = configuration_function.map(|function_path| {
        quote! { #function_path(&mut __gateway_configuration); }
    });

    let attributes = &input.attrs;
    let visibility = &input.vis;
    let name = &signature.ident;
    let test_name = name.to_string();
    let block = &input.block;

    let output = quote! {
        #(#attributes)*
        #[test]
        #visibility fn #name() {
            ::gateway_harness::logging::init_tracing();

            #[allow(unused_mut)]
            let mut __gateway_configuration = ::gateway_harness::HarnessConfiguration::from_env();
            #configure_call
            ::gateway_harness::prepare_gateway(&__gateway_configuration);

            let __gateway_outcome = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(move || {
                #configuration_binding
                #block
            }));

            ::gateway_harness::reporting::report_outcome(#test_name, &__gateway_outcome);
            if let Err(e) = __gateway_outcome {
                ::std::panic::resume_unwind(e);
            }
        }
    };

    TokenStream::from(output)
}

fn error_at(span: Span, message: &str) -> TokenStream {
    quote_spanned! {span=>
        compile_error!(#message);
    }
    .into()
}
