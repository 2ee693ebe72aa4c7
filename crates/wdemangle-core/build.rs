//! Build script for wdemangle-core
//!
//! Checks the toolchain and tells the crate which targets have a native
//! unwinder.
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer (`OnceCell`, let-else, `checked_add_signed`)
//! - **Unwinding**: `backtrace(3)` from glibc or libSystem; other targets
//!   build fine but capture no frames

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    match rustc_version::version() {
        Ok(rustc_version) => {
            let min_rust_version = rustc_version::Version::new(1, 70, 0);
            if rustc_version < min_rust_version {
                panic!(
                    "wdemangle-core requires Rust {} or newer, found {}",
                    min_rust_version, rustc_version
                );
            }
        }
        // Some build environments hide rustc; don't fail the build over it
        Err(_) => println!("cargo:warning=could not verify Rust version"),
    }

    let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let env = std::env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    if !(matches!(os.as_str(), "macos" | "ios") || (os == "linux" && env == "gnu")) {
        println!("cargo:warning=no native unwinder for target {os}-{env}; stack traces will be empty");
    }
}
