//! Symbol demangling fallback chain.
//!
//! A symbol name is rendered by trying, in order:
//!
//! 1. the `_W` decoder ([`crate::demangle`])
//! 2. a [`GenericDemangler`] for other toolchains (Rust and Itanium C++ by default)
//! 3. the raw linkage name, unchanged
//!
//! ## Language Detection
//!
//! - `_W` symbols: start with the `_W` sentinel
//! - Rust symbols: start with `_R`, or legacy `_ZN...17h<hash>E`
//! - C++ symbols: start with `_Z` (Itanium mangling)
//! - Everything else is unknown

use std::borrow::Cow;

use crate::demangle::{demangle, is_w_mangled};
use crate::types::{SymbolLanguage, SymbolName};

/// Secondary decoder consulted only after the `_W` decoder fails.
pub trait GenericDemangler
{
    /// Demangle `raw`, or `None` if this demangler does not understand it.
    fn demangle(&self, raw: &str) -> Option<String>;
}

/// Rust (`rustc-demangle`) and Itanium C++ (`cpp_demangle`) demangling.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformDemangler;

impl GenericDemangler for PlatformDemangler
{
    fn demangle(&self, raw: &str) -> Option<String>
    {
        if is_rust_mangled(raw) {
            if let Ok(symbol) = rustc_demangle::try_demangle(raw) {
                return Some(symbol.to_string());
            }
        }
        if is_itanium_cpp_mangled(raw) {
            if let Ok(symbol) = cpp_demangle::Symbol::new(raw) {
                return symbol.demangle(&cpp_demangle::DemangleOptions::default()).ok();
            }
        }
        None
    }
}

impl<D: GenericDemangler + ?Sized> GenericDemangler for &D
{
    fn demangle(&self, raw: &str) -> Option<String>
    {
        (**self).demangle(raw)
    }
}

/// Heuristic: Rust v0 mangling starts with `_R`; legacy mangling is Itanium-shaped with a hash.
pub fn is_rust_mangled(raw: &str) -> bool
{
    raw.starts_with("_R") || (raw.starts_with("_ZN") && raw.contains("17h") && raw.ends_with('E'))
}

/// Heuristic: Itanium C++ mangling starts with `_Z`.
pub fn is_itanium_cpp_mangled(raw: &str) -> bool
{
    raw.starts_with("_Z")
}

/// Detect which mangling scheme `raw` uses.
pub fn detect_language(raw: &str) -> SymbolLanguage
{
    if is_w_mangled(raw) {
        SymbolLanguage::W
    } else if is_rust_mangled(raw) {
        SymbolLanguage::Rust
    } else if is_itanium_cpp_mangled(raw) {
        SymbolLanguage::Cpp
    } else {
        SymbolLanguage::Unknown
    }
}

/// Render a linkage name through the full fallback chain.
///
/// Borrows `raw` when neither decoder understood it.
///
/// ```rust
/// use wdemangle_core::symbols::{render_symbol, PlatformDemangler};
///
/// assert_eq!(render_symbol("_WF3foo_", &PlatformDemangler), "foo()");
/// assert_eq!(render_symbol("_ZN3foo3barEv", &PlatformDemangler), "foo::bar()");
/// assert_eq!(render_symbol("main", &PlatformDemangler), "main");
/// ```
pub fn render_symbol<'a, D>(raw: &'a str, generic: &D) -> Cow<'a, str>
where
    D: GenericDemangler + ?Sized,
{
    if let Ok(text) = demangle(raw) {
        return Cow::Owned(text);
    }
    if let Some(text) = generic.demangle(raw) {
        return Cow::Owned(text);
    }
    Cow::Borrowed(raw)
}

/// Create a `SymbolName` from a raw mangled symbol string.
///
/// `demangled` is `None` when the whole chain fell through to the raw name.
pub fn make_symbol_name<D>(raw: String, generic: &D) -> SymbolName
where
    D: GenericDemangler + ?Sized,
{
    let language = detect_language(&raw);
    let demangled = match render_symbol(&raw, generic) {
        Cow::Owned(text) => Some(text),
        Cow::Borrowed(_) => None,
    };

    SymbolName::new(raw, demangled, language)
}
