//! Common module for library exports

pub use crate::demangle::{demangle, demangle_declaration, demangle_text, DeclarationKind, Demangled, FunctionKind};
pub use crate::error::{DemangleError, Result, SymbolError};
pub use crate::symbols::{AddressResolver, DladdrResolver, GenericDemangler, ImageResolver, PlatformDemangler};
pub use crate::trace::{print_stack_trace, RenderOptions, StackTraceRenderer};
pub use crate::types::{Address, RenderedFrame, ResolvedSymbol, SymbolLanguage, SymbolName};
pub use crate::unwind::{PlatformUnwinder, Unwinder};
