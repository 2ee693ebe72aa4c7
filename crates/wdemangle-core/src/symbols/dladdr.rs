//! In-process address resolution through the dynamic loader.

use crate::types::{Address, ResolvedSymbol};

use super::AddressResolver;

/// Resolves addresses in the current process with `dladdr(3)`.
///
/// Only exported (dynamic) symbols are visible to the loader, so static
/// functions resolve to the nearest exported symbol before them. Link
/// executables with `-rdynamic` for useful names.
///
/// `dladdr` does not allocate on the platforms we support, which is why the
/// crash reporter uses this resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct DladdrResolver;

#[cfg(unix)]
impl AddressResolver for DladdrResolver
{
    fn resolve(&self, address: Address) -> Option<ResolvedSymbol<'_>>
    {
        use std::ffi::CStr;

        let Ok(addr) = usize::try_from(address.value()) else {
            return None;
        };

        // SAFETY: `Dl_info` is plain pointers; all-zero is a valid value.
        let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
        // SAFETY: dladdr only inspects the address value, it never dereferences it.
        let found = unsafe { libc::dladdr(addr as *const libc::c_void, &mut info) };
        if found == 0 || info.dli_fname.is_null() || info.dli_sname.is_null() {
            return None;
        }

        // SAFETY: both strings are NUL-terminated and owned by the loader for
        // as long as the module stays mapped.
        let (module, name) = unsafe { (CStr::from_ptr(info.dli_fname), CStr::from_ptr(info.dli_sname)) };

        Some(ResolvedSymbol {
            module: module.to_string_lossy(),
            name: name.to_string_lossy(),
            address: Address::new(info.dli_saddr as usize as u64),
        })
    }
}

#[cfg(not(unix))]
impl AddressResolver for DladdrResolver
{
    fn resolve(&self, _address: Address) -> Option<ResolvedSymbol<'_>>
    {
        None
    }
}
