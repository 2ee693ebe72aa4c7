//! # wdemangle-core
//!
//! Decoding of `_W` mangled symbol names, and a stack-trace renderer built
//! on top of it.
//!
//! This crate provides:
//! - [`demangle`]: the recursive-descent decoder for the `_W` scheme
//! - [`symbols`]: address resolution and the demangling fallback chain
//! - [`unwind`]: return-address capture for the current thread
//! - [`trace`]: turning addresses into printable frames
//! - `crash`: a one-shot fatal-signal reporter (Unix only)
//!
//! ## Example
//!
//! ```rust
//! use wdemangle_core::demangle::demangle;
//!
//! assert_eq!(demangle("_WFM3Foo3barS1x3Int_").unwrap(), "Foo.bar(x: Int)");
//! ```
//!
//! ## Why unsafe code is needed
//!
//! Unwinding, `dladdr`, and signal handling are C library calls. The decoder
//! itself is entirely safe code.

#![allow(unsafe_code)] // Required for backtrace(3), dladdr(3) and sigaction(2)

#[cfg(unix)]
pub mod crash;
pub mod demangle;
pub mod error;
pub mod prelude;
pub mod symbols;
pub mod trace;
pub mod types;
pub mod unwind;

#[cfg(unix)]
pub use crash::{fatal_error, install_crash_handler};
pub use demangle::{demangle, demangle_declaration, demangle_text};
// Re-export commonly used types
pub use error::{DemangleError, Result, SymbolError};
pub use trace::{print_stack_trace, StackTraceRenderer};
pub use types::{Address, RenderedFrame};
