//! Stack frame types.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use super::Address;

/// What an address resolver knows about one code address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol<'a>
{
    /// Path of the loaded module (executable or shared library) containing the address.
    pub module: Cow<'a, str>,
    /// Raw linkage name of the nearest preceding exported symbol.
    pub name: Cow<'a, str>,
    /// Runtime start address of that symbol.
    pub address: Address,
}

/// One printable line of a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame<'a>
{
    /// Position in the trace (0 = newest).
    pub index: usize,
    /// Final path component of the owning module.
    pub module: Cow<'a, str>,
    /// Start address of the resolved symbol.
    pub symbol_address: Address,
    /// Symbol name after the demangling fallback chain.
    pub name: Cow<'a, str>,
    /// Bytes from the symbol start to the return address.
    pub offset: u64,
}

impl fmt::Display for RenderedFrame<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "{:<4} {:<34} {} {} + {}",
            self.index, self.module, self.symbol_address, self.name, self.offset
        )
    }
}

/// Final path component of a module path.
///
/// ```rust
/// use wdemangle_core::types::module_basename;
///
/// assert_eq!(module_basename("/usr/lib/libc.so.6"), "libc.so.6");
/// assert_eq!(module_basename("a.out"), "a.out");
/// ```
pub fn module_basename(path: &str) -> &str
{
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}
