//! Shared utilities for memora procedural macros
//!
//! Attribute parsing and cache-key code generation used by `memora-macros`. Every
//! parser reports problems as a `compile_error!` token stream so the message points at
//! the annotated item.

use proc_macro2::{Ident, TokenStream as TokenStream2, TokenTree};
use quote::quote;
use syn::{punctuated::Punctuated, Expr, Lit, MetaNameValue, Token, Type, UnOp};

/// Value of the `capacity` attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapacityAttr {
    Unbounded,
    Bounded(usize),
}

/// Value of the `kind` attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindAttr {
    Plain,
    Class,
    Static,
}

/// Parsed `#[cache(...)]` attributes
#[derive(Debug)]
pub struct CacheAttributes {
    pub capacity: CapacityAttr,
    pub stats: bool,
    pub key: Option<Expr>,
    pub kind: KindAttr,
    pub custom_name: Option<String>,
}

impl Default for CacheAttributes {
    fn default() -> Self {
        Self {
            capacity: CapacityAttr::Unbounded,
            stats: false,
            key: None,
            kind: KindAttr::Plain,
            custom_name: None,
        }
    }
}

impl CacheAttributes {
    /// `capacity = 0`: the function is emitted unchanged.
    pub fn is_disabled(&self) -> bool {
        self.capacity == CapacityAttr::Bounded(0)
    }

    /// Runtime `Capacity` expression.
    pub fn capacity_tokens(&self) -> TokenStream2 {
        match self.capacity {
            CapacityAttr::Unbounded => quote! { ::memora::Capacity::Unbounded },
            CapacityAttr::Bounded(limit) => quote! { ::memora::Capacity::Bounded(#limit) },
        }
    }
}

fn invalid_capacity() -> TokenStream2 {
    quote! {
        compile_error!("invalid configuration: `capacity` must be a non-negative integer or \"unbounded\"")
    }
}

/// Parse the `capacity` attribute
pub fn parse_capacity_attribute(nv: &MetaNameValue) -> Result<CapacityAttr, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Int(lit_int) => lit_int
                .base10_parse::<usize>()
                .map(CapacityAttr::Bounded)
                .map_err(|_| invalid_capacity()),
            Lit::Str(s) => match s.value().trim() {
                "unbounded" | "none" => Ok(CapacityAttr::Unbounded),
                other => other
                    .parse::<usize>()
                    .map(CapacityAttr::Bounded)
                    .map_err(|_| invalid_capacity()),
            },
            _ => Err(invalid_capacity()),
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => Err(invalid_capacity()),
        _ => Err(
            quote! { compile_error!("Invalid syntax for `capacity`: expected `capacity = <integer>` or `capacity = \"unbounded\"`") },
        ),
    }
}

/// Parse the `stats` attribute
pub fn parse_stats_attribute(nv: &MetaNameValue) -> Result<bool, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Bool(b) => Ok(b.value),
            _ => Err(quote! { compile_error!("Invalid literal for `stats`: expected `true` or `false`") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `stats`: expected `stats = true|false`") }),
    }
}

/// Parse the `kind` attribute
pub fn parse_kind_attribute(nv: &MetaNameValue) -> Result<KindAttr, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => match s.value().as_str() {
                "plain" | "function" | "method" => Ok(KindAttr::Plain),
                "class" | "classmethod" => Ok(KindAttr::Class),
                "static" | "staticmethod" => Ok(KindAttr::Static),
                _ => Err(
                    quote! { compile_error!("unsupported callable kind: expected \"plain\", \"class\" or \"static\"") },
                ),
            },
            _ => Err(quote! { compile_error!("Invalid literal for `kind`: expected string") }),
        },
        _ => Err(
            quote! { compile_error!("Invalid syntax for `kind`: expected `kind = \"plain\"|\"class\"|\"static\"`") },
        ),
    }
}

/// Parse the `name` attribute
pub fn parse_name_attribute(nv: &MetaNameValue) -> Result<String, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => Ok(s.value()),
            _ => Err(quote! { compile_error!("Invalid literal for `name`: expected string") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `name`: expected `name = \"...\"`") }),
    }
}

/// Parse cache attributes from a token stream
pub fn parse_cache_attributes(attr: TokenStream2) -> Result<CacheAttributes, TokenStream2> {
    use syn::parse::Parser;

    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    let parsed_args = parser.parse2(attr).map_err(|e| {
        let msg = format!("Failed to parse attributes: {}", e);
        quote! { compile_error!(#msg) }
    })?;

    let mut attrs = CacheAttributes::default();

    for nv in parsed_args {
        if nv.path.is_ident("capacity") {
            attrs.capacity = parse_capacity_attribute(&nv)?;
        } else if nv.path.is_ident("stats") {
            attrs.stats = parse_stats_attribute(&nv)?;
        } else if nv.path.is_ident("kind") {
            attrs.kind = parse_kind_attribute(&nv)?;
        } else if nv.path.is_ident("name") {
            attrs.custom_name = Some(parse_name_attribute(&nv)?);
        } else if nv.path.is_ident("key") {
            attrs.key = Some(nv.value);
        } else {
            let path = &nv.path;
            let msg = format!(
                "Unknown attribute `{}`: expected `capacity`, `stats`, `key`, `kind` or `name`",
                quote!(#path).to_string().replace(' ', "")
            );
            return Err(quote! { compile_error!(#msg) });
        }
    }

    if attrs.is_disabled() && attrs.stats {
        return Err(
            quote! { compile_error!("invalid configuration: `stats = true` requires caching, but `capacity = 0` disables it") },
        );
    }

    Ok(attrs)
}

/// How a method receives `self`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiverKind {
    /// `&self`
    ByRef,
    /// `self`
    ByValue,
}

/// One named function argument that takes part in the key
pub struct KeyArg {
    pub ident: Ident,
    /// Declared with a reference type (`&T`, `&mut T`)
    pub is_ref: bool,
}

impl KeyArg {
    /// The argument as a `&T` expression.
    pub fn borrowed(&self) -> TokenStream2 {
        let ident = &self.ident;
        if self.is_ref {
            quote! { &*#ident }
        } else {
            quote! { &#ident }
        }
    }
}

fn key_sources(
    class_scoped: bool,
    receiver: Option<ReceiverKind>,
    args: &[KeyArg],
) -> Vec<TokenStream2> {
    let mut sources = Vec::with_capacity(args.len() + 2);
    if class_scoped {
        sources.push(quote! { &::memora::ClassRef::of::<Self>() });
    }
    match receiver {
        Some(ReceiverKind::ByRef) => sources.push(quote! { self }),
        Some(ReceiverKind::ByValue) => sources.push(quote! { &self }),
        None => {}
    }
    sources.extend(args.iter().map(KeyArg::borrowed));
    sources
}

/// Generate the default cache key expression, of type `MemoResult<CacheKey>`.
///
/// The invoking class (for class-scoped functions) comes first, then the receiver,
/// then every argument in declaration order.
pub fn generate_key_expr(
    class_scoped: bool,
    receiver: Option<ReceiverKind>,
    args: &[KeyArg],
) -> TokenStream2 {
    let sources = key_sources(class_scoped, receiver, args);
    quote! {{
        let mut __memora_builder = ::memora::CacheKey::builder();
        #(
            __memora_builder.arg(#sources);
        )*
        __memora_builder.build()
    }}
}

/// Generate a cache key expression from a user key function.
///
/// The function receives the same sources as the default key, all by reference, and
/// returns any `CacheableKey`.
pub fn generate_custom_key_expr(
    key: &Expr,
    class_scoped: bool,
    receiver: Option<ReceiverKind>,
    args: &[KeyArg],
) -> TokenStream2 {
    let sources = key_sources(class_scoped, receiver, args);
    quote! {{
        let __memora_key_fn = #key;
        let __memora_custom_key = __memora_key_fn(#(#sources),*);
        let mut __memora_builder = ::memora::CacheKey::builder();
        __memora_builder.arg(&__memora_custom_key);
        __memora_builder.build()
    }}
}

/// The `T` of a `Result<T, E>` return type (also matches aliases such as `io::Result<T>`).
pub fn result_ok_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return None;
    };
    generics.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

/// `true` if the tokens mention `Self` anywhere.
pub fn mentions_self_type(tokens: TokenStream2) -> bool {
    tokens.into_iter().any(|tt| match tt {
        TokenTree::Ident(ident) => ident == "Self",
        TokenTree::Group(group) => mentions_self_type(group.stream()),
        _ => false,
    })
}

fn is_static(lifetime: Option<&syn::Lifetime>) -> bool {
    lifetime.map_or(false, |lifetime| lifetime.ident == "static")
}

/// `true` if the type borrows something shorter than `'static` or contains `impl Trait`;
/// such values cannot live in a thread-local cache.
pub fn is_borrowed_or_opaque(ty: &Type) -> bool {
    match ty {
        Type::ImplTrait(_) => true,
        Type::Reference(reference) => {
            !is_static(reference.lifetime.as_ref()) || is_borrowed_or_opaque(&reference.elem)
        }
        Type::Paren(inner) => is_borrowed_or_opaque(&inner.elem),
        Type::Group(inner) => is_borrowed_or_opaque(&inner.elem),
        Type::Tuple(tuple) => tuple.elems.iter().any(is_borrowed_or_opaque),
        Type::Array(array) => is_borrowed_or_opaque(&array.elem),
        Type::Slice(slice) => is_borrowed_or_opaque(&slice.elem),
        Type::Path(path) => path.path.segments.iter().any(|segment| match &segment.arguments {
            syn::PathArguments::AngleBracketed(generics) => generics.args.iter().any(|arg| {
                matches!(arg, syn::GenericArgument::Lifetime(lifetime) if !is_static(Some(lifetime)))
                    || matches!(arg, syn::GenericArgument::Type(ty) if is_borrowed_or_opaque(ty))
            }),
            _ => false,
        }),
        _ => false,
    }
}
