//! Derive macros for tasklist controllers
//!
//! Controller action enums mix two kinds of input: *intents* dispatched by the
//! presentation layer and *feedback* produced by effects (query results, store
//! failures, timers). `#[derive(Action)]` classifies variants so reducers and
//! logs can tell them apart.
//!
//! # Example
//!
//! ```ignore
//! use tasklist_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum AddTodoAction {
//!     #[intent]
//!     NameChanged { name: String },
//!
//!     #[feedback]
//!     Saved { id: TaskId },
//! }
//!
//! // Generated methods:
//! assert!(AddTodoAction::NameChanged { name: "x".into() }.is_intent());
//! assert_eq!(AddTodoAction::Saved { id }.name(), "Saved");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields};

/// Derive macro for controller action enums
///
/// Generates helper methods:
/// - `is_intent()` - Returns true if this variant is a user intent
/// - `is_feedback()` - Returns true if this variant is effect feedback
/// - `name()` - Returns the variant name, for tracing fields
///
/// # Attributes
///
/// - `#[intent]` - Mark a variant as dispatched by the presentation layer
/// - `#[feedback]` - Mark a variant as produced by an effect
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has both `#[intent]` and `#[feedback]` attributes
#[proc_macro_derive(Action, attributes(intent, feedback))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(
            input,
            "#[derive(Action)] can only be used on enums"
        )
        .to_compile_error()
        .into();
    };

    let mut intent_arms = Vec::new();
    let mut feedback_arms = Vec::new();
    let mut name_arms = Vec::new();

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;
        let is_intent = has_attribute(&variant.attrs, "intent");
        let is_feedback = has_attribute(&variant.attrs, "feedback");

        if is_intent && is_feedback {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[intent] and #[feedback]"
            )
            .to_compile_error()
            .into();
        }

        let pattern = match &variant.fields {
            Fields::Named(_) => quote! { Self::#variant_name { .. } },
            Fields::Unnamed(_) => quote! { Self::#variant_name(..) },
            Fields::Unit => quote! { Self::#variant_name },
        };

        let label = variant_name.to_string();
        name_arms.push(quote! { #pattern => #label, });

        if is_intent {
            intent_arms.push(quote! { #pattern => true, });
        }
        if is_feedback {
            feedback_arms.push(quote! { #pattern => true, });
        }
    }

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a user intent
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_intent(&self) -> bool {
                match self {
                    #(#intent_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action was produced by an effect
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_feedback(&self) -> bool {
                match self {
                    #(#feedback_arms)*
                    _ => false,
                }
            }

            /// Returns the variant name
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident(name)
    })
}
