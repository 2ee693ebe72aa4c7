//! # Error Types
//!
//! Error handling for the decoder and the symbolication layer.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Reasons a mangled symbol could not be decoded
///
/// Every failure aborts the whole decode. The caller never sees partial
/// output: either the complete rendering comes back, or one of these.
///
/// Decode failures are routine. Symbol tables are full of names from other
/// toolchains, so callers are expected to fall through to the next
/// demangler instead of reporting these.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemangleError
{
    /// Expected a decimal length or count but found no digits
    ///
    /// Only unsigned ASCII digits are accepted. A leading `+`/`-`, leading
    /// whitespace, or a value that does not fit in `usize` lands here too.
    #[error("Malformed integer in mangled symbol")]
    MalformedInteger,

    /// The input ended before the grammar was satisfied
    ///
    /// This happens when:
    /// - A declared identifier length exceeds the remaining text
    /// - A list (tuple, function type, argument list) is never terminated
    /// - A type marker is expected but the text is exhausted
    #[error("Mangled symbol is truncated")]
    Truncated,

    /// An `s` builtin type code that the grammar does not define
    #[error("Unknown builtin type marker '{0}'")]
    UnknownTypeMarker(char),

    /// The text is not in the `_W` mangling scheme
    ///
    /// Either the `_W` prefix is missing, the declaration marker after it
    /// is not one of `T`, `F`, `C`, or a mandatory structural marker (the
    /// `T` closing a pointer count) is absent.
    #[error("Not a recognized mangled symbol")]
    UnrecognizedFormat,

    /// Closure declarations (`_WC`) cannot be decoded
    ///
    /// This is a permanent limitation of the decoder, not a transient error.
    #[error("Closure symbols are not supported")]
    Unsupported,

    /// Types are nested deeper than the decoder is willing to recurse
    #[error("Type nesting exceeds {0} levels")]
    NestingTooDeep(usize),
}

/// Errors from loading images and wiring up crash reporting
#[derive(Error, Debug)]
pub enum SymbolError
{
    /// The file could not be parsed as an object file, or lacks what we need
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Installing a signal handler failed
    ///
    /// The string names the signal; the wrapped error carries `errno`.
    #[error("Failed to install handler for {signal}: {source}")]
    HandlerInstall
    {
        /// Signal name, e.g. `SIGSEGV`
        signal: &'static str,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SymbolError>`
///
/// ```rust
/// use wdemangle_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SymbolError>;
