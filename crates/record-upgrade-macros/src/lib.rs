//! Proc macros for `record-upgrade`.
//!
//! Provides **`#[upgrade_step]`**, an attribute macro that turns a plain
//! function editing a record in place into a registered `UpgradeStep`.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    parse_macro_input, punctuated::Punctuated, token::Comma, Expr, ExprLit, FnArg, ItemFn, Lit,
    LitStr, Meta, MetaNameValue,
};

/// Attribute macro that wraps a step function into an `UpgradeStep`.
///
/// The function must have the signature
/// `fn(&mut Record, &dyn UpgradeContext) -> Result<(), StepError>`.
///
/// # Attributes
///
/// - `type_name(from = N, to = N + 1)`: **Required, repeatable.** One entry
///   per record type the step is registered for. Listing several types is how
///   a transition shared by sibling types is declared once.
/// - `name = "..."`: Optional. Step identity; defaults to the function's
///   module path and name.
///
/// # Generated Code
///
/// - A struct `{FnName}Step` implementing `record_upgrade::UpgradeStep`.
/// - A function `register_{fn_name}(&mut StepRegistry)` that registers the
///   step under every listed `(type, from)` key at once.
///
/// # Example
///
/// ```ignore
/// use record_upgrade::{transform, upgrade_step, Record, StepError, UpgradeContext};
///
/// #[upgrade_step(human_donor(from = 4, to = 5), rodent_donor(from = 3, to = 4))]
/// fn drop_external_resources(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
///     transform::remove_field(value, "external_resources");
///     Ok(())
/// }
/// // Generates: DropExternalResourcesStep struct + impl UpgradeStep
/// // Generates: fn register_drop_external_resources(&mut StepRegistry) -> Result<(), UpgradeError>
/// ```
#[proc_macro_attribute]
pub fn upgrade_step(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    match expand(args, input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct Target {
    type_name: String,
    from: u32,
}

fn expand(args: Punctuated<Meta, Comma>, input: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    let mut name: Option<LitStr> = None;
    let mut targets: Vec<Target> = Vec::new();

    for meta in &args {
        match meta {
            Meta::NameValue(nv) if nv.path.is_ident("name") => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => name = Some(lit.clone()),
                other => return Err(syn::Error::new_spanned(other, "expected a string literal")),
            },
            Meta::List(list) => {
                let type_ident = list
                    .path
                    .get_ident()
                    .ok_or_else(|| syn::Error::new_spanned(&list.path, "expected a type name"))?;
                let type_name = type_ident.to_string();
                if targets.iter().any(|t| t.type_name == type_name) {
                    return Err(syn::Error::new_spanned(
                        type_ident,
                        format!("type `{type_name}` listed twice"),
                    ));
                }

                let versions =
                    list.parse_args_with(Punctuated::<MetaNameValue, Comma>::parse_terminated)?;
                let mut from: Option<u32> = None;
                let mut to: Option<u32> = None;
                for nv in &versions {
                    let key = nv
                        .path
                        .get_ident()
                        .map(|i| i.to_string())
                        .unwrap_or_default();
                    match key.as_str() {
                        "from" => from = Some(int_value(nv)?),
                        "to" => to = Some(int_value(nv)?),
                        _ => {
                            return Err(syn::Error::new_spanned(
                                &nv.path,
                                format!("unknown attribute `{key}`"),
                            ))
                        }
                    }
                }

                let (from, to) = match (from, to) {
                    (Some(from), Some(to)) => (from, to),
                    _ => {
                        return Err(syn::Error::new_spanned(
                            list,
                            "expected both `from` and `to`",
                        ))
                    }
                };
                if from == 0 {
                    return Err(syn::Error::new_spanned(list, "versions start at 1"));
                }
                if from.checked_add(1) != Some(to) {
                    let expected = from.saturating_add(1);
                    return Err(syn::Error::new_spanned(
                        list,
                        format!("a step upgrades exactly one version: expected `to = {expected}`"),
                    ));
                }
                targets.push(Target { type_name, from });
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `type_name(from = N, to = M)` or `name = \"...\"`",
                ))
            }
        }
    }

    if targets.is_empty() {
        return Err(syn::Error::new(
            Span::call_site(),
            "missing record type, e.g. `#[upgrade_step(human_donor(from = 1, to = 2))]`",
        ));
    }

    let sig = &input.sig;
    if sig.inputs.len() != 2 || sig.inputs.iter().any(|arg| matches!(arg, FnArg::Receiver(_))) {
        return Err(syn::Error::new_spanned(
            sig,
            "upgrade step must take `(&mut Record, &dyn UpgradeContext)`",
        ));
    }
    if matches!(sig.output, syn::ReturnType::Default) {
        return Err(syn::Error::new_spanned(
            sig,
            "upgrade step must return `Result<(), StepError>`",
        ));
    }

    let fn_name = &sig.ident;
    let fn_name_str = fn_name.to_string();

    // snake_case -> PascalCase + "Step"
    let struct_name = {
        let pascal: String = fn_name_str
            .split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        syn::Ident::new(&format!("{pascal}Step"), fn_name.span())
    };
    let register_fn = syn::Ident::new(&format!("register_{fn_name}"), fn_name.span());

    let step_name = match name {
        Some(lit) => quote!(#lit),
        None => quote!(concat!(module_path!(), "::", #fn_name_str)),
    };
    let keys = targets.iter().map(|Target { type_name, from }| quote!((#type_name, #from)));

    Ok(quote! {
        #input

        /// Generated upgrade step.
        pub struct #struct_name;

        impl ::record_upgrade::UpgradeStep for #struct_name {
            fn name(&self) -> &str {
                #step_name
            }

            fn apply(
                &self,
                mut record: ::record_upgrade::Record,
                ctx: &dyn ::record_upgrade::UpgradeContext,
            ) -> ::std::result::Result<::record_upgrade::Record, ::record_upgrade::StepError> {
                #fn_name(&mut record, ctx)?;
                ::std::result::Result::Ok(record)
            }
        }

        /// Register this step under every record type it was declared for.
        pub fn #register_fn(
            registry: &mut ::record_upgrade::StepRegistry,
        ) -> ::std::result::Result<(), ::record_upgrade::UpgradeError> {
            registry.register_alias(
                ::std::sync::Arc::new(#struct_name),
                &[#(#keys),*],
            )
        }
    })
}

fn int_value(nv: &MetaNameValue) -> syn::Result<u32> {
    match &nv.value {
        Expr::Lit(ExprLit {
            lit: Lit::Int(lit), ..
        }) => lit.base10_parse(),
        other => Err(syn::Error::new_spanned(other, "expected an integer literal")),
    }
}
