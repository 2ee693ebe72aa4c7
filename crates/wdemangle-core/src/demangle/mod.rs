//! # `_W` Symbol Decoding
//!
//! Decoder for the compiler's symbol-mangling scheme. Every symbol starts
//! with the `_W` sentinel followed by a declaration marker:
//!
//! | Symbol | Decoded |
//! |---|---|
//! | `_WTsv` | `Void` |
//! | `_WTsi32` | `Int32` |
//! | `_WF3foo_` | `foo()` |
//! | `_WFM3Foo3bar_` | `Foo.bar()` |
//! | `_WFI3Foo1xsI_` | `Foo.init(_ x: Int)` |
//! | `_WFD3Foo` | `Foo.deinit` |
//! | `_WF3mapS1fFsIRsb_RsI` | `map(f: (Int) -> Bool) -> Int` |
//!
//! ## Grammar
//!
//! Names are `<decimal length><bytes>`. Types are one of:
//!
//! - `P<count>T` followed by another type form: `count` pointer markers
//! - `F<type>*R<type>`: function type
//! - `t<type>*T`: tuple
//! - `s<code>`: builtin (`i[width]`, `I`, `f`, `d`, `F`, `b`, `v`)
//! - a name: nominal type
//!
//! Decoding is strictly left to right with no backtracking, and a failure
//! anywhere discards the whole result.
//!
//! The decoder never logs and keeps no global state, so it is safe to call
//! from any thread and from the crash reporter.

mod declaration;
mod filter;
mod parser;

pub use declaration::{demangle_declaration, DeclarationKind, Demangled, FunctionKind, SENTINEL};
pub use filter::demangle_text;
pub use parser::MAX_TYPE_DEPTH;

use crate::error::DemangleError;

/// Decode a `_W` symbol to its human-readable form.
///
/// ```rust
/// use wdemangle_core::demangle::demangle;
/// use wdemangle_core::error::DemangleError;
///
/// assert_eq!(demangle("_WFM3Foo3bar_").unwrap(), "Foo.bar()");
/// assert_eq!(demangle("_WC3foo"), Err(DemangleError::Unsupported));
/// assert_eq!(demangle("main"), Err(DemangleError::UnrecognizedFormat));
/// ```
///
/// ## Errors
///
/// See [`DemangleError`]. Failures are routine for symbols from other
/// toolchains.
pub fn demangle(symbol: &str) -> Result<String, DemangleError>
{
    demangle_declaration(symbol).map(|decoded| decoded.text)
}

/// Returns `true` if `symbol` carries the `_W` sentinel.
pub fn is_w_mangled(symbol: &str) -> bool
{
    symbol.starts_with(SENTINEL)
}
