use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, AttributeArgs, FnArg, ItemFn, Lit, Meta, MetaNameValue, NestedMeta, Pat};

/// Attribute used to mark a function as a calculator builtin.
///
/// ```rust,ignore
/// use metron_macros::calc_builtin;
///
/// #[calc_builtin(name = "abs", category = "math", summary = "Absolute value.")]
/// fn abs_builtin(x: Operand) -> Result<Operand, CalcError> {
///     /* implementation */
/// }
/// ```
///
/// This registers the function with the `metron-values` inventory so the
/// runtime dispatcher can discover it at start-up. Parameters are converted
/// from `&[Operand]` with `TryInto`; a trailing `Vec<Operand>` parameter
/// collects variadic arguments.
#[proc_macro_attribute]
pub fn calc_builtin(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as AttributeArgs);
    let mut name_str: Option<String> = None;
    let mut category = String::from("general");
    let mut summary = String::new();
    for arg in args {
        if let NestedMeta::Meta(Meta::NameValue(MetaNameValue { path, lit, .. })) = arg {
            let value = if let Lit::Str(ref s) = lit {
                s.value()
            } else {
                panic!("attribute values must be string literals");
            };
            if path.is_ident("name") {
                name_str = Some(value);
            } else if path.is_ident("category") {
                category = value;
            } else if path.is_ident("summary") {
                summary = value;
            } else {
                panic!("unknown attribute parameter; expected name, category or summary");
            }
        }
    }
    let name_str = name_str.expect("expected `name = \"...\"` argument");

    let func: ItemFn = parse_macro_input!(input as ItemFn);
    let ident = &func.sig.ident;

    let mut param_idents = Vec::new();
    let mut param_types = Vec::new();
    for arg in &func.sig.inputs {
        match arg {
            FnArg::Typed(pt) => {
                if let Pat::Ident(pi) = pt.pat.as_ref() {
                    param_idents.push(pi.ident.clone());
                } else {
                    panic!("parameters must be simple identifiers");
                }
                param_types.push((*pt.ty).clone());
            }
            _ => panic!("self parameter not allowed"),
        }
    }
    let param_len = param_idents.len();

    // Crude detection of a trailing variadic `Vec<Operand>` parameter.
    let is_last_variadic = param_types
        .last()
        .map(|ty| {
            if let syn::Type::Path(tp) = ty {
                if tp.path.segments.last().map(|s| s.ident == "Vec").unwrap_or(false) {
                    if let syn::PathArguments::AngleBracketed(ab) =
                        &tp.path.segments.last().unwrap().arguments
                    {
                        if let Some(syn::GenericArgument::Type(syn::Type::Path(inner))) = ab.args.first() {
                            return inner
                                .path
                                .segments
                                .last()
                                .map(|s| s.ident == "Operand")
                                .unwrap_or(false);
                        }
                    }
                }
            }
            false
        })
        .unwrap_or(false);

    let wrapper_ident = format_ident!("__calc_wrap_{}", ident);

    let conv_stmts: Vec<proc_macro2::TokenStream> = if is_last_variadic && param_len > 0 {
        let mut stmts = Vec::new();
        for (i, (ident, ty)) in param_idents.iter().zip(param_types.iter()).enumerate().take(param_len - 1) {
            stmts.push(quote! { let #ident : #ty = std::convert::TryInto::try_into(&args[#i])?; });
        }
        let last_ident = &param_idents[param_len - 1];
        stmts.push(quote! {
            let #last_ident : Vec<metron_values::Operand> =
                args[(#param_len - 1)..].iter().cloned().collect();
        });
        stmts
    } else {
        param_idents
            .iter()
            .zip(param_types.iter())
            .enumerate()
            .map(|(i, (ident, ty))| {
                quote! { let #ident : #ty = std::convert::TryInto::try_into(&args[#i])?; }
            })
            .collect()
    };

    let wrapper = quote! {
        fn #wrapper_ident(
            args: &[metron_values::Operand],
        ) -> Result<metron_values::Operand, metron_values::CalcError> {
            #![allow(unused_variables)]
            if #is_last_variadic {
                if args.len() < #param_len - 1 {
                    return Err(metron_values::CalcError::with(
                        metron_values::ErrorKind::NumArgs,
                        #name_str,
                    ));
                }
            } else if args.len() != #param_len {
                return Err(metron_values::CalcError::with(
                    metron_values::ErrorKind::NumArgs,
                    #name_str,
                ));
            }
            #(#conv_stmts)*
            #ident(#(#param_idents),*)
        }
    };

    let register = quote! {
        metron_values::inventory::submit! {
            metron_values::BuiltinFunction::new(#name_str, #category, #summary, #wrapper_ident)
        }
    };

    TokenStream::from(quote! {
        #func
        #wrapper
        #register
    })
}

/// Attribute used to declare a named constant available to expressions.
///
/// ```rust,ignore
/// #[calc_constant(name = "pi")]
/// fn pi_constant() -> Operand {
///     /* construct the operand */
/// }
/// ```
#[proc_macro_attribute]
pub fn calc_constant(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as AttributeArgs);
    let mut name_str: Option<String> = None;
    for arg in args {
        if let NestedMeta::Meta(Meta::NameValue(MetaNameValue { path, lit, .. })) = arg {
            if path.is_ident("name") {
                if let Lit::Str(s) = lit {
                    name_str = Some(s.value());
                }
            } else {
                panic!("unknown attribute parameter; only `name` is supported");
            }
        }
    }
    let name_str = name_str.expect("expected `name = \"...\"` argument");

    let func: ItemFn = parse_macro_input!(input as ItemFn);
    let ident = &func.sig.ident;

    let register = quote! {
        metron_values::inventory::submit! {
            metron_values::Constant { name: #name_str, builder: #ident }
        }
    };

    TokenStream::from(quote! {
        #func
        #register
    })
}
