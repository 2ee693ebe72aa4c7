//! # Symbols
//!
//! Turning code addresses into readable names.
//!
//! - [`AddressResolver`]: address to module, linkage name and symbol start
//! - [`DladdrResolver`]: in-process lookups through the dynamic loader
//! - [`ImageResolver`]: lookups against symbol tables read from disk
//! - [`render_symbol`]: linkage name to display name (`_W` decoder, then a
//!   [`GenericDemangler`], then the raw name)

pub mod demangle;
pub mod dladdr;
pub mod image;

pub use demangle::{
    detect_language, is_itanium_cpp_mangled, is_rust_mangled, make_symbol_name, render_symbol, GenericDemangler,
    PlatformDemangler,
};
pub use dladdr::DladdrResolver;
pub use image::{BinaryImage, ImageResolver, ImageSymbol};

use crate::types::{Address, ResolvedSymbol};

/// Maps a code address to the symbol containing it.
pub trait AddressResolver
{
    /// Returns `None` when the address is not inside any known symbol.
    fn resolve(&self, address: Address) -> Option<ResolvedSymbol<'_>>;
}

impl<R: AddressResolver + ?Sized> AddressResolver for &R
{
    fn resolve(&self, address: Address) -> Option<ResolvedSymbol<'_>>
    {
        (**self).resolve(address)
    }
}
