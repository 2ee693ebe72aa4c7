//! Stack-trace rendering against the real process

use wdemangle_core::symbols::{BinaryImage, ImageResolver, PlatformDemangler};
use wdemangle_core::trace::{RenderOptions, StackTraceRenderer, TRACE_HEADER};
use wdemangle_core::types::Address;
use wdemangle_core::unwind::{PlatformUnwinder, Unwinder, MAX_STACK_DEPTH};

#[test]
fn test_platform_trace_starts_with_header()
{
    let mut out = Vec::new();
    StackTraceRenderer::platform()
        .write_trace(&PlatformUnwinder, &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().next(), Some(TRACE_HEADER));
}

#[cfg(unix)]
#[test]
fn test_platform_renderer_resolves_libc_export()
{
    // Thread roots on glibc have no dynamic symbol, so check a known export.
    let malloc = Address::new(libc::malloc as *const () as usize as u64);
    let renderer = StackTraceRenderer::platform();
    let frame = renderer.render_frame(3, malloc).unwrap();
    assert_eq!(frame.index, 3);
    assert_eq!(frame.offset, 0);
    assert!(frame.name.contains("malloc"));
    assert!(frame.module.starts_with("libc") || frame.module.starts_with("libsystem"));
}

#[test]
fn test_depth_is_clamped()
{
    let renderer = StackTraceRenderer::platform().with_options(RenderOptions {
        max_depth: MAX_STACK_DEPTH * 4,
    });
    let frames = renderer.capture(&PlatformUnwinder);
    assert!(frames.len() <= MAX_STACK_DEPTH);
}

#[test]
fn test_image_resolver_renders_own_symbols()
{
    let exe = std::env::current_exe().unwrap();
    let image = BinaryImage::open(&exe).unwrap();
    let symbol = image
        .symbols()
        .unwrap()
        .iter()
        .find(|symbol| symbol.name.starts_with("_ZN") && image.contains(Address::new(symbol.address)))
        .cloned()
        .expect("test binary has Rust symbols");

    let mut resolver = ImageResolver::new();
    resolver.add_image(image);
    let renderer = StackTraceRenderer::new(&resolver, PlatformDemangler);

    let frame = renderer.render_frame(7, Address::new(symbol.address + 1)).unwrap();
    assert_eq!(frame.index, 7);
    assert_eq!(frame.offset, 1);
    assert_eq!(frame.symbol_address, Address::new(symbol.address));
    assert_ne!(frame.name, symbol.name);
    assert_eq!(frame.module, exe.file_name().unwrap().to_string_lossy());
}

#[cfg(any(target_os = "macos", target_os = "ios", all(target_os = "linux", target_env = "gnu")))]
#[test]
fn test_unwinder_reports_return_addresses()
{
    let mut addresses = [Address::ZERO; 16];
    let count = PlatformUnwinder.unwind(&mut addresses);
    assert!(count > 0);
    assert!(count <= addresses.len());
    assert!(addresses[..count].iter().all(|&address| address != Address::ZERO));
}

#[cfg(unix)]
#[test]
fn test_trace_lines_follow_header()
{
    let mut text = String::new();
    let malloc = Address::new(libc::malloc as *const () as usize as u64);
    StackTraceRenderer::platform()
        .write_addresses(&[Address::ZERO, malloc], &mut text)
        .unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], TRACE_HEADER);
    assert!(lines[1].starts_with("1 "));
    assert!(lines[1].contains("malloc"));
    assert!(lines[1].ends_with("+ 0"));
}
