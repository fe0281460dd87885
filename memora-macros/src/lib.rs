use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, FnArg, GenericParam, ItemFn, Pat, ReturnType, Signature, Type,
};

// Import shared utilities
use memora_macro_utils::{
    generate_custom_key_expr, generate_key_expr, is_borrowed_or_opaque, mentions_self_type,
    parse_cache_attributes, result_ok_type, CacheAttributes, KeyArg, KindAttr, ReceiverKind,
};

/// Arguments of the annotated function, as seen by the key generator
struct FnShape {
    receiver: Option<ReceiverKind>,
    args: Vec<KeyArg>,
}

fn unsupported(msg: &str) -> TokenStream2 {
    let msg = format!("unsupported callable kind: {}", msg);
    quote! { compile_error!(#msg) }
}

/// Classify the signature, rejecting shapes that cannot be memoized
fn inspect_signature(sig: &Signature, kind: KindAttr) -> Result<FnShape, TokenStream2> {
    if sig.asyncness.is_some() {
        return Err(unsupported("async functions cannot be memoized"));
    }
    if sig
        .generics
        .params
        .iter()
        .any(|param| !matches!(param, GenericParam::Lifetime(_)))
    {
        return Err(unsupported(
            "functions with generic type or const parameters cannot be memoized",
        ));
    }

    let mut receiver = None;
    let mut args = Vec::new();
    for arg in sig.inputs.iter() {
        match arg {
            FnArg::Receiver(recv) => {
                if recv.colon_token.is_some() {
                    return Err(unsupported(
                        "typed receivers such as `self: Box<Self>` are not supported",
                    ));
                }
                if recv.reference.is_some() && recv.mutability.is_some() {
                    return Err(unsupported("memoized methods cannot take `&mut self`"));
                }
                if kind != KindAttr::Plain {
                    return Err(unsupported(
                        "`kind = \"class\"` and `kind = \"static\"` functions cannot take `self`",
                    ));
                }
                receiver = Some(if recv.reference.is_some() {
                    ReceiverKind::ByRef
                } else {
                    ReceiverKind::ByValue
                });
            }
            FnArg::Typed(pat_type) => {
                let Pat::Ident(pat_ident) = &*pat_type.pat else {
                    return Err(unsupported(
                        "arguments must be plain identifiers, destructuring patterns are not supported",
                    ));
                };
                if pat_ident.subpat.is_some() {
                    return Err(unsupported("arguments must be plain identifiers"));
                }
                if matches!(&*pat_type.ty, Type::ImplTrait(_)) {
                    return Err(unsupported(
                        "functions with `impl Trait` arguments cannot be memoized",
                    ));
                }
                args.push(KeyArg {
                    ident: pat_ident.ident.clone(),
                    is_ref: matches!(&*pat_type.ty, Type::Reference(_)),
                });
            }
        }
    }

    Ok(FnShape { receiver, args })
}

/// Generate the memoized function
fn expand(attrs: CacheAttributes, input: &ItemFn) -> Result<TokenStream2, TokenStream2> {
    let fn_attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let ident = &sig.ident;
    let block = &input.block;

    let shape = inspect_signature(sig, attrs.kind)?;

    // Extract return type
    let ret_type: Type = match &sig.output {
        ReturnType::Type(_, ty) => (**ty).clone(),
        ReturnType::Default => parse_quote! { () },
    };
    if is_borrowed_or_opaque(&ret_type) {
        return Err(unsupported(
            "the return type must be an owned `'static` value to be stored in the cache",
        ));
    }
    if mentions_self_type(quote! { #ret_type }) {
        return Err(unsupported(
            "the return type must name the type explicitly instead of using `Self`",
        ));
    }

    // Only the `Ok` value of a `Result` is stored
    let ok_type = result_ok_type(&ret_type);
    let is_result = ok_type.is_some();
    let value_type = ok_type.unwrap_or(&ret_type);

    let class_scoped = attrs.kind == KindAttr::Class;
    let key_expr = match &attrs.key {
        Some(key) => generate_custom_key_expr(key, class_scoped, shape.receiver, &shape.args),
        None => generate_key_expr(class_scoped, shape.receiver, &shape.args),
    };

    let on_key_error = if is_result {
        quote! {
            return ::std::result::Result::Err(::std::convert::From::from(__memora_err))
        }
    } else {
        quote! { ::std::panic!("{}", __memora_err) }
    };

    let hit = if is_result {
        quote! { ::std::result::Result::Ok(__memora_cached) }
    } else {
        quote! { __memora_cached }
    };

    let insert_call = if is_result {
        quote! {
            if let ::std::result::Result::Ok(__memora_value) = &__memora_result {
                __memora_cache.insert(__memora_key, ::std::clone::Clone::clone(__memora_value));
            }
        }
    } else {
        quote! {
            __memora_cache.insert(__memora_key, ::std::clone::Clone::clone(&__memora_result));
        }
    };

    // Custom name verbatim, otherwise the full path of the function
    let registry_name = match &attrs.custom_name {
        Some(name) => quote! { #name },
        None => quote! { ::memora::registry::scope_name(__memora_scope) },
    };
    let store_ident = format_ident!("__MEMORA_STORE_{}", ident.to_string().to_uppercase());
    let capacity = attrs.capacity_tokens();
    let stats = attrs.stats;

    Ok(quote! {
        #(#fn_attrs)*
        #vis #sig {
            #[allow(dead_code)]
            fn __memora_scope() {}

            thread_local! {
                static #store_ident: ::memora::registry::SharedStore<::memora::CacheKey, #value_type> =
                    ::memora::registry::register_new(#registry_name, #capacity, #stats);
            }

            let __memora_cache = ::memora::ThreadLocalStore::new(&#store_ident);

            let __memora_key = match #key_expr {
                ::std::result::Result::Ok(__memora_key) => __memora_key,
                ::std::result::Result::Err(__memora_err) => { #on_key_error }
            };

            if let ::std::option::Option::Some(__memora_cached) = __memora_cache.get(&__memora_key) {
                return #hit;
            }

            let __memora_result: #ret_type = (|| -> #ret_type #block)();
            #insert_call
            __memora_result
        }
    })
}

/// A procedural macro that memoizes functions and methods.
///
/// The annotated function keeps a cache in thread-local storage, keyed by its arguments.
/// A repeated call with equal arguments returns a clone of the stored result without
/// running the body. The cache is registered in `memora::registry` under the function's
/// full path (or `name`) the first time the function runs on a thread; registry lookups
/// accept any trailing part of that path that names a single cache.
///
/// # Requirements
///
/// - **Arguments**: must implement `CacheableKey` (or `DefaultCacheableKey` + `Debug`).
///   With `&self`, `Self` must implement it too.
/// - **Return type**: must implement `Clone` and must not borrow or mention `Self`.
/// - **Result-returning functions**: the error type must implement `From<MemoError>`.
/// - **Function purity**: the body should depend only on its arguments.
///
/// # Macro Parameters
///
/// - `capacity` (optional): maximum number of entries, evicting the least recently used
///   entry when full. `0` disables caching and leaves the function as written.
///   Default: `"unbounded"`.
/// - `stats` (optional): track hits and misses. Default: `false`. Not allowed with
///   `capacity = 0`.
/// - `key` (optional): a function or closure that receives every key source by reference
///   (the class, then `self`, then each argument) and returns a `CacheableKey` used as the
///   whole key. Closure parameters need type annotations.
/// - `kind` (optional): `"plain"` (default), `"class"` or `"static"`. A `"class"` function
///   is an associated function whose key starts with the type it is invoked through, so
///   a trait default method caches separately per implementor. A `"static"` function
///   ignores any receiving type. Neither may take `self`.
/// - `name` (optional): registry name, used verbatim. Default: the full path of the
///   function, such as `my_crate::shapes::Circle::area`.
///
/// # Cache Behavior
///
/// - **Regular functions**: all results are cached. A key that cannot be derived
///   (a `NaN` argument) panics with the `UnhashableArgument` message.
/// - **Result-returning functions**: only `Ok` values are cached; a key that cannot be
///   derived is returned as `Err(MemoError::UnhashableArgument { .. }.into())`.
/// - **Recursion**: the cache is not borrowed while the body runs, so a memoized function
///   may call itself.
/// - **Threads**: every thread has its own cache.
///
/// # Examples
///
/// ```ignore
/// use memora::cache;
///
/// #[cache(capacity = 128, stats = true)]
/// fn fibonacci(n: u64) -> u64 {
///     if n < 2 {
///         return n;
///     }
///     fibonacci(n - 1) + fibonacci(n - 2)
/// }
///
/// assert_eq!(fibonacci(80), 23_416_728_348_467_685);
/// let info = memora::registry::info("fibonacci").unwrap();
/// assert_eq!(info.misses, Some(81));
/// ```
///
/// ```ignore
/// use memora::{cache, CacheableKey};
///
/// trait Shape: 'static {
///     const SIDES: u32;
///
///     #[cache(kind = "class")]
///     fn describe(scale: u32) -> String {
///         format!("{} sides at scale {}", Self::SIDES, scale)
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn cache(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_cache_attributes(attr.into()) {
        Ok(attrs) => attrs,
        Err(err) => {
            let item: TokenStream2 = item.into();
            return TokenStream::from(quote! { #err; #item });
        }
    };

    let input = parse_macro_input!(item as ItemFn);

    if attrs.is_disabled() {
        return TokenStream::from(quote! { #input });
    }

    match expand(attrs, &input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(quote! { #err; #input }),
    }
}
