//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed code address
///
/// This wrapper around `u64` keeps return addresses, symbol start addresses,
/// and load biases from being mixed up with offsets and counts.
///
/// ## Example
///
/// ```rust
/// use wdemangle_core::types::Address;
///
/// let start = Address::from(0x1000);
/// let ret = start + 0x24;
/// assert_eq!(ret.offset_from(start), 0x24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Distance in bytes from `base` up to this address
    ///
    /// Saturates at zero when `base` lies above `self`.
    ///
    /// ```rust
    /// use wdemangle_core::types::Address;
    ///
    /// let symbol = Address::new(0x4000);
    /// assert_eq!(Address::new(0x4010).offset_from(symbol), 0x10);
    /// assert_eq!(Address::new(0x3000).offset_from(symbol), 0);
    /// ```
    pub const fn offset_from(self, base: Address) -> u64
    {
        self.0.saturating_sub(base.0)
    }

    /// Add a signed bias, checking for overflow
    ///
    /// ```rust
    /// use wdemangle_core::types::Address;
    ///
    /// assert_eq!(Address::new(0x1000).checked_add_signed(-0x100), Some(Address::new(0xf00)));
    /// assert_eq!(Address::new(0x10).checked_add_signed(-0x100), None);
    /// ```
    pub fn checked_add_signed(self, bias: i64) -> Option<Self>
    {
        self.0.checked_add_signed(bias).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
