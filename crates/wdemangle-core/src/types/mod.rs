//! # Types
//!
//! Plain data shared by the symbolication layer and the stack-trace renderer.

pub mod address;
pub mod frame;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use frame::{module_basename, RenderedFrame, ResolvedSymbol};
pub use symbols::{SymbolLanguage, SymbolName};
