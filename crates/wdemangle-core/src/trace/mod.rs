//! # Stack traces
//!
//! Rendering return addresses as readable frames.
//!
//! ```text
//! Current stack trace:
//! 0    app                                0x000055d0c1a02340 Foo.bar() + 52
//! 2    libc.so.6                          0x00007f1e9c829dc0 __libc_start_main + 128
//! ```
//!
//! Each address goes through an [`AddressResolver`]. Frames the resolver
//! cannot place are left out, but the remaining frames keep their original
//! index so gaps stay visible. Names go through [`render_symbol`].

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};

use tracing::trace;

use crate::symbols::{render_symbol, AddressResolver, DladdrResolver, GenericDemangler, PlatformDemangler};
use crate::types::{module_basename, Address, RenderedFrame};
use crate::unwind::{PlatformUnwinder, Unwinder, MAX_STACK_DEPTH};

/// First line of every printed trace.
pub const TRACE_HEADER: &str = "Current stack trace:";

/// Knobs for [`StackTraceRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions
{
    /// Frames past this depth are ignored.
    ///
    /// Unwinding the calling thread never goes past [`MAX_STACK_DEPTH`];
    /// recorded addresses passed to [`StackTraceRenderer::render_addresses`]
    /// are not clamped.
    pub max_depth: usize,
}

impl Default for RenderOptions
{
    fn default() -> Self
    {
        Self {
            max_depth: MAX_STACK_DEPTH,
        }
    }
}

impl RenderOptions
{
    fn unwind_depth(&self) -> usize
    {
        self.max_depth.min(MAX_STACK_DEPTH)
    }
}

/// Turns return addresses into [`RenderedFrame`]s.
pub struct StackTraceRenderer<R, D = PlatformDemangler>
{
    resolver: R,
    demangler: D,
    options: RenderOptions,
}

impl StackTraceRenderer<DladdrResolver, PlatformDemangler>
{
    /// Renderer for the current process: `dladdr` plus the Rust/C++ demanglers.
    pub fn platform() -> Self
    {
        Self::new(DladdrResolver, PlatformDemangler)
    }
}

impl<R, D> StackTraceRenderer<R, D>
where
    R: AddressResolver,
    D: GenericDemangler,
{
    pub fn new(resolver: R, demangler: D) -> Self
    {
        Self {
            resolver,
            demangler,
            options: RenderOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self
    {
        self.options = options;
        self
    }

    /// Render one frame, or `None` if its module or symbol is unknown.
    pub fn render_frame(&self, index: usize, address: Address) -> Option<RenderedFrame<'_>>
    {
        let symbol = self.resolver.resolve(address)?;
        if symbol.module.is_empty() || symbol.name.is_empty() {
            return None;
        }

        let module = match symbol.module {
            Cow::Borrowed(path) => Cow::Borrowed(module_basename(path)),
            Cow::Owned(path) => Cow::Owned(module_basename(&path).to_string()),
        };
        let name = match symbol.name {
            Cow::Borrowed(raw) => render_symbol(raw, &self.demangler),
            Cow::Owned(raw) => Cow::Owned(render_symbol(&raw, &self.demangler).into_owned()),
        };

        Some(RenderedFrame {
            index,
            module,
            symbol_address: symbol.address,
            name,
            offset: address.offset_from(symbol.address),
        })
    }

    /// Render every resolvable address, newest first.
    pub fn render_addresses(&self, addresses: &[Address]) -> Vec<RenderedFrame<'_>>
    {
        addresses
            .iter()
            .take(self.options.max_depth)
            .enumerate()
            .filter_map(|(index, &address)| {
                let frame = self.render_frame(index, address);
                if frame.is_none() {
                    trace!(index, address = %address, "skipping unresolved frame");
                }
                frame
            })
            .collect()
    }

    /// Unwind the calling thread and render the result.
    pub fn capture<U>(&self, unwinder: &U) -> Vec<RenderedFrame<'_>>
    where
        U: Unwinder + ?Sized,
    {
        let mut addresses = [Address::ZERO; MAX_STACK_DEPTH];
        let count = unwinder.unwind(&mut addresses[..self.options.unwind_depth()]);
        self.render_addresses(&addresses[..count])
    }

    /// Write the header and one line per resolvable frame.
    ///
    /// Frames are formatted straight into `out` without collecting them, and
    /// nothing is logged. This is the path the crash handler uses.
    pub fn write_addresses<W>(&self, addresses: &[Address], out: &mut W) -> fmt::Result
    where
        W: fmt::Write + ?Sized,
    {
        writeln!(out, "{TRACE_HEADER}")?;
        for (index, &address) in addresses.iter().take(self.options.max_depth).enumerate() {
            if let Some(frame) = self.render_frame(index, address) {
                writeln!(out, "{frame}")?;
            }
        }
        Ok(())
    }

    /// Unwind the calling thread and write the trace to `out`.
    ///
    /// ## Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn write_trace<U, W>(&self, unwinder: &U, mut out: W) -> io::Result<()>
    where
        U: Unwinder + ?Sized,
        W: Write,
    {
        let mut addresses = [Address::ZERO; MAX_STACK_DEPTH];
        let count = unwinder.unwind(&mut addresses[..self.options.unwind_depth()]);

        let mut text = String::new();
        self.write_addresses(&addresses[..count], &mut text)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "failed to format stack trace"))?;
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

/// Print the calling thread's stack trace to stderr.
///
/// Errors writing to stderr are ignored.
pub fn print_stack_trace()
{
    let renderer = StackTraceRenderer::platform();
    let _ = renderer.write_trace(&PlatformUnwinder, io::stderr().lock());
}
