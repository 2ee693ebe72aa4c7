//! Binary image parsing and symbol table loading.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use object::{BinaryFormat, Object, ObjectSection, ObjectSegment, ObjectSymbol, SymbolKind};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use super::AddressResolver;
use crate::error::{Result, SymbolError};
use crate::types::{Address, ResolvedSymbol};

/// A defined code symbol from an image's symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSymbol
{
    /// Linkage name (Mach-O leading underscore removed).
    pub name: String,
    /// Address in the file's own address space.
    pub address: u64,
    /// Size in bytes, 0 if the table does not record one.
    pub size: u64,
}

/// An executable or shared library mapped at a known load address.
///
/// The symbol table is read lazily on the first lookup.
pub struct BinaryImage
{
    path: PathBuf,
    data: Arc<[u8]>,
    slide: i64,
    runtime_range: (u64, u64),
    symbols: OnceCell<Vec<ImageSymbol>>,
}

impl BinaryImage
{
    /// Parse the object file at `path`, as mapped at `load_address`.
    ///
    /// `load_address` is where the image's lowest segment lives at runtime.
    ///
    /// ## Errors
    ///
    /// Returns an error if the file cannot be read, is not an object file, or
    /// has nothing mapped.
    pub fn load(path: impl Into<PathBuf>, load_address: Address) -> Result<Self>
    {
        Self::map(path.into(), Some(load_address))
    }

    /// Parse the object file at `path` at its preferred addresses, so runtime
    /// and file addresses coincide.
    ///
    /// ## Errors
    ///
    /// See [`BinaryImage::load`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self>
    {
        Self::map(path.into(), None)
    }

    fn map(path: PathBuf, load_address: Option<Address>) -> Result<Self>
    {
        let bytes = fs::read(&path)?;
        let data = Arc::<[u8]>::from(bytes);
        let file = parse_object(&path, &data)?;

        let (file_start, file_end) = mapped_range(&file)
            .ok_or_else(|| SymbolError::InvalidImage(format!("{} has no mapped segments", path.display())))?;

        let load_address = load_address.unwrap_or(Address::new(file_start));
        let slide = (load_address.value() as i64).wrapping_sub(file_start as i64);
        let runtime_start = load_address.value();
        let runtime_end = runtime_start.saturating_add(file_end - file_start);

        debug!(
            path = %path.display(),
            load_address = %load_address,
            slide,
            "loaded binary image"
        );

        Ok(Self {
            path,
            data,
            slide,
            runtime_range: (runtime_start, runtime_end),
            symbols: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Runtime address range `[start, end)` covered by the image.
    pub fn runtime_range(&self) -> (Address, Address)
    {
        (Address::new(self.runtime_range.0), Address::new(self.runtime_range.1))
    }

    pub fn contains(&self, address: Address) -> bool
    {
        let addr = address.value();
        addr >= self.runtime_range.0 && addr < self.runtime_range.1
    }

    /// Translate a runtime address into the file's address space.
    pub fn file_address(&self, address: Address) -> Option<u64>
    {
        if !self.contains(address) {
            return None;
        }
        address.checked_add_signed(self.slide.wrapping_neg()).map(Address::value)
    }

    fn runtime_address(&self, file_address: u64) -> Option<Address>
    {
        Address::new(file_address).checked_add_signed(self.slide)
    }

    /// Defined code symbols sorted by address.
    ///
    /// ## Errors
    ///
    /// Returns an error if the symbol table cannot be read.
    pub fn symbols(&self) -> Result<&[ImageSymbol]>
    {
        self.symbols
            .get_or_try_init(|| self.collect_symbols())
            .map(Vec::as_slice)
    }

    fn collect_symbols(&self) -> Result<Vec<ImageSymbol>>
    {
        let file = parse_object(&self.path, &self.data)?;
        let strip_underscore = file.format() == BinaryFormat::MachO;

        let mut symbols = Vec::new();
        for symbol in file.symbols().chain(file.dynamic_symbols()) {
            if !symbol.is_definition() || symbol.kind() != SymbolKind::Text {
                continue;
            }
            let Ok(name) = symbol.name() else {
                continue;
            };
            let name = if strip_underscore {
                name.strip_prefix('_').unwrap_or(name)
            } else {
                name
            };
            if name.is_empty() {
                continue;
            }
            symbols.push(ImageSymbol {
                name: name.to_string(),
                address: symbol.address(),
                size: symbol.size(),
            });
        }

        symbols.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.name.cmp(&b.name)));
        symbols.dedup_by(|a, b| a.address == b.address && a.name == b.name);

        debug!(path = %self.path.display(), count = symbols.len(), "read symbol table");
        Ok(symbols)
    }

    /// Nearest symbol starting at or before `address`.
    pub fn nearest_symbol(&self, address: Address) -> Option<ResolvedSymbol<'_>>
    {
        let file_address = self.file_address(address)?;
        let symbols = match self.symbols() {
            Ok(symbols) => symbols,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "symbol table unavailable");
                return None;
            }
        };

        let index = symbols.partition_point(|symbol| symbol.address <= file_address);
        let symbol = symbols.get(index.checked_sub(1)?)?;

        Some(ResolvedSymbol {
            module: self.path.to_string_lossy(),
            name: Cow::Borrowed(symbol.name.as_str()),
            address: self.runtime_address(symbol.address)?,
        })
    }
}

fn parse_object<'data>(path: &Path, data: &'data [u8]) -> Result<object::File<'data>>
{
    object::File::parse(data)
        .map_err(|err| SymbolError::InvalidImage(format!("failed to parse {}: {err}", path.display())))
}

/// Lowest and highest file addresses that get mapped.
///
/// Relocatable objects have no segments, so fall back to their sections.
fn mapped_range(file: &object::File<'_>) -> Option<(u64, u64)>
{
    let segments = file
        .segments()
        .filter(|segment| segment.size() > 0 && !matches!(segment.name(), Ok(Some("__PAGEZERO"))))
        .map(|segment| (segment.address(), segment.address().saturating_add(segment.size())));
    let range = fold_range(segments);
    if range.is_some() {
        return range;
    }

    let sections = file
        .sections()
        .filter(|section| section.size() > 0)
        .map(|section| (section.address(), section.address().saturating_add(section.size())));
    fold_range(sections)
}

fn fold_range(ranges: impl Iterator<Item = (u64, u64)>) -> Option<(u64, u64)>
{
    ranges.fold(None, |acc, (start, end)| match acc {
        None => Some((start, end)),
        Some((lo, hi)) => Some((lo.min(start), hi.max(end))),
    })
}

/// Resolves addresses against a set of loaded images.
///
/// Useful for rendering addresses recorded by another process, where
/// `dladdr` cannot help.
#[derive(Default)]
pub struct ImageResolver
{
    images: Vec<BinaryImage>,
}

impl ImageResolver
{
    pub fn new() -> Self
    {
        Self { images: Vec::new() }
    }

    pub fn add_image(&mut self, image: BinaryImage)
    {
        self.images.push(image);
    }

    /// Load an image and register it.
    ///
    /// ## Errors
    ///
    /// See [`BinaryImage::load`].
    pub fn load_image(&mut self, path: impl Into<PathBuf>, load_address: Address) -> Result<&BinaryImage>
    {
        let image = BinaryImage::load(path, load_address)?;
        self.images.push(image);
        let index = self.images.len() - 1;
        Ok(&self.images[index])
    }

    pub fn images(&self) -> &[BinaryImage]
    {
        &self.images
    }

    pub fn image_for_address(&self, address: Address) -> Option<&BinaryImage>
    {
        self.images.iter().find(|image| image.contains(address))
    }
}

impl AddressResolver for ImageResolver
{
    fn resolve(&self, address: Address) -> Option<ResolvedSymbol<'_>>
    {
        self.image_for_address(address)?.nearest_symbol(address)
    }
}
