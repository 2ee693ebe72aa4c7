//! Top-level `_W` declarations: types, functions, closures.

use std::fmt;

use super::parser::{Items, Parser};
use crate::error::DemangleError;

/// Prefix shared by every symbol in the scheme.
pub const SENTINEL: &str = "_W";

/// Suffix rendered for a synthesized closure wrapper (`C` after a function).
const CLOSURE_WRAPPER_SUFFIX: &str = " (closure #1)";

/// Which flavour of function a `_WF` symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind
{
    /// `_WF<name>...`
    Free,
    /// `_WFM<owner><name>...`
    Method,
    /// `_WFI<owner>...`
    Initializer,
    /// `_WFD<owner>`
    Deinitializer,
}

/// What a `_W` symbol declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind
{
    /// `_WT<type>`
    Type,
    /// `_WF...`
    Function(FunctionKind),
    /// `_WC...`; recognised but never decodable.
    Closure,
}

impl DeclarationKind
{
    /// Look only at the sentinel and markers, without decoding anything.
    ///
    /// Returns `None` for text outside the scheme.
    pub fn classify(symbol: &str) -> Option<Self>
    {
        let body = symbol.strip_prefix(SENTINEL)?.as_bytes();
        match body.first()? {
            b'T' => Some(Self::Type),
            b'C' => Some(Self::Closure),
            b'F' => Some(Self::Function(match body.get(1) {
                Some(b'D') => FunctionKind::Deinitializer,
                Some(b'M') => FunctionKind::Method,
                Some(b'I') => FunctionKind::Initializer,
                _ => FunctionKind::Free,
            })),
            _ => None,
        }
    }
}

impl fmt::Display for DeclarationKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            DeclarationKind::Type => "type",
            DeclarationKind::Function(FunctionKind::Free) => "function",
            DeclarationKind::Function(FunctionKind::Method) => "method",
            DeclarationKind::Function(FunctionKind::Initializer) => "initializer",
            DeclarationKind::Function(FunctionKind::Deinitializer) => "deinitializer",
            DeclarationKind::Closure => "closure",
        };
        write!(f, "{label}")
    }
}

/// A fully decoded symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demangled
{
    /// What the symbol declares.
    pub kind: DeclarationKind,
    /// Human-readable rendering, e.g. `Foo.bar(_ x: Int) -> Bool`.
    pub text: String,
    /// The symbol is the closure wrapper synthesized for a function.
    pub closure_wrapper: bool,
}

impl fmt::Display for Demangled
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.text)
    }
}

/// Decode a complete `_W` symbol.
///
/// Text after a complete declaration is ignored.
///
/// ## Errors
///
/// - [`DemangleError::UnrecognizedFormat`] if `symbol` is not in the scheme
/// - [`DemangleError::Unsupported`] for closure declarations (`_WC`)
/// - any reader error from the body of the declaration
pub fn demangle_declaration(symbol: &str) -> Result<Demangled, DemangleError>
{
    let body = symbol.strip_prefix(SENTINEL).ok_or(DemangleError::UnrecognizedFormat)?;
    let mut parser = Parser::new(body);

    let (kind, closure_wrapper) = match parser.peek() {
        Some(b'T') => {
            parser.bump();
            parser.read_type()?;
            (DeclarationKind::Type, false)
        }
        Some(b'C') => return Err(DemangleError::Unsupported),
        Some(b'F') => {
            parser.bump();
            let (kind, closure_wrapper) = read_function(&mut parser)?;
            (DeclarationKind::Function(kind), closure_wrapper)
        }
        _ => return Err(DemangleError::UnrecognizedFormat),
    };

    Ok(Demangled {
        kind,
        text: parser.finish(),
        closure_wrapper,
    })
}

fn read_function(parser: &mut Parser<'_>) -> Result<(FunctionKind, bool), DemangleError>
{
    let kind = match parser.peek() {
        Some(b'D') => {
            parser.bump();
            parser.read_type()?;
            parser.push_str(".deinit");
            return Ok((FunctionKind::Deinitializer, false));
        }
        Some(b'M') => {
            parser.bump();
            parser.read_type()?;
            parser.push('.');
            parser.read_identifier()?;
            FunctionKind::Method
        }
        Some(b'I') => {
            parser.bump();
            parser.read_type()?;
            parser.push_str(".init");
            FunctionKind::Initializer
        }
        _ => {
            parser.read_identifier()?;
            FunctionKind::Free
        }
    };

    let mut arguments = Items::new();
    while !parser.eat(b'_') {
        arguments.push(parser.capture(Parser::read_argument)?);
    }
    parser.push_list(&arguments);

    if parser.eat(b'R') {
        parser.push_str(" -> ");
        parser.read_type()?;
    }

    let closure_wrapper = parser.eat(b'C');
    if closure_wrapper {
        parser.push_str(CLOSURE_WRAPPER_SUFFIX);
    }

    Ok((kind, closure_wrapper))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_kind_reported_with_text()
    {
        let decoded = demangle_declaration("_WFI3Foo1xsI_").unwrap();
        assert_eq!(decoded.kind, DeclarationKind::Function(FunctionKind::Initializer));
        assert_eq!(decoded.text, "Foo.init(_ x: Int)");
        assert!(!decoded.closure_wrapper);
    }

    #[test]
    fn test_closure_wrapper_flag()
    {
        let decoded = demangle_declaration("_WF3run_C").unwrap();
        assert!(decoded.closure_wrapper);
        assert_eq!(decoded.to_string(), "run() (closure #1)");
    }

    #[test]
    fn test_deinit_ignores_trailing_markers()
    {
        // Nothing after the owner is read for a deinitializer.
        let decoded = demangle_declaration("_WFD3Foo_RsI").unwrap();
        assert_eq!(decoded.text, "Foo.deinit");
    }

    #[test]
    fn test_classify()
    {
        assert_eq!(DeclarationKind::classify("_WTsv"), Some(DeclarationKind::Type));
        assert_eq!(DeclarationKind::classify("_WC3foo"), Some(DeclarationKind::Closure));
        assert_eq!(
            DeclarationKind::classify("_WFM3Foo3bar_"),
            Some(DeclarationKind::Function(FunctionKind::Method))
        );
        assert_eq!(
            DeclarationKind::classify("_WFD3Foo"),
            Some(DeclarationKind::Function(FunctionKind::Deinitializer))
        );
        assert_eq!(
            DeclarationKind::classify("_WF"),
            Some(DeclarationKind::Function(FunctionKind::Free))
        );
        assert_eq!(DeclarationKind::classify("_WX"), None);
        assert_eq!(DeclarationKind::classify("_ZN3foo3barE"), None);
    }

    #[test]
    fn test_trailing_text_is_ignored()
    {
        let decoded = demangle_declaration("_WTsI.llvm.1234").unwrap();
        assert_eq!(decoded.text, "Int");
    }

    #[test]
    fn test_missing_marker()
    {
        assert_eq!(demangle_declaration("_W"), Err(DemangleError::UnrecognizedFormat));
        assert_eq!(demangle_declaration("_WZ"), Err(DemangleError::UnrecognizedFormat));
    }

    #[test]
    fn test_display_kind()
    {
        assert_eq!(DeclarationKind::Function(FunctionKind::Method).to_string(), "method");
        assert_eq!(DeclarationKind::Closure.to_string(), "closure");
    }
}
