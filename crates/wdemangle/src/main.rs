use std::error::Error;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use wdemangle_core::demangle::{demangle, demangle_text, DeclarationKind};
use wdemangle_core::symbols::{make_symbol_name, BinaryImage, ImageResolver, PlatformDemangler};
use wdemangle_core::trace::{RenderOptions, StackTraceRenderer};
use wdemangle_core::types::Address;
use wdemangle_core::unwind::{PlatformUnwinder, MAX_STACK_DEPTH};
use wdemangle_utils::{debug, info, init_logging, LogFormat, LogLevel, LoggingConfig};

/// Decode `_W` mangled symbols and render stack traces.
#[derive(Parser, Debug)]
#[command(name = "wdemangle")]
#[command(version)]
#[command(about = "Decode `_W` mangled symbols and render stack traces", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log format: pretty or json (overrides WDEMANGLE_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Decode each symbol given on the command line
    Demangle
    {
        /// Mangled symbols, e.g. `_WFM3Foo3bar_`
        #[arg(required = true)]
        symbols: Vec<String>,
        /// Fall back to the Rust and C++ demanglers for non-`_W` symbols
        #[arg(long)]
        all: bool,
    },
    /// Copy stdin to stdout, decoding every `_W` symbol found in the text
    Filter,
    /// Render recorded addresses against a binary's symbol table
    Symbolize
    {
        /// Executable or shared library the addresses came from
        binary: PathBuf,
        /// Where the binary's lowest segment was mapped (hex format: 0x1000 or decimal)
        #[arg(long, value_parser = parse_address)]
        load_address: Option<Address>,
        /// Return addresses, newest first (hex format: 0x1000 or decimal)
        #[arg(required = true, value_parser = parse_address)]
        addresses: Vec<Address>,
    },
    /// Print this process's own stack trace
    Trace
    {
        /// Maximum number of frames to print
        #[arg(long, default_value_t = MAX_STACK_DEPTH)]
        max_depth: usize,
    },
}

fn main()
{
    let cli = Cli::parse();

    let config = LoggingConfig::from_env()
        .with_level(cli.log_level)
        .with_format(cli.log_format);
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    #[cfg(unix)]
    if let Err(e) = wdemangle_core::install_crash_handler() {
        // Not fatal; we just lose traces for our own crashes.
        wdemangle_utils::warn!(error = %e, "crash handler unavailable");
    }

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<(), Box<dyn Error>>
{
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match command {
        Commands::Demangle { symbols, all } => {
            for symbol in symbols {
                writeln!(out, "{}", demangle_line(symbol, all))?;
            }
        }
        Commands::Filter => {
            for line in io::stdin().lock().lines() {
                let line = line?;
                writeln!(out, "{}", demangle_text(&line))?;
            }
        }
        Commands::Symbolize {
            binary,
            load_address,
            addresses,
        } => {
            info!("Loading symbols from {}", binary.display());
            let mut resolver = ImageResolver::new();
            match load_address {
                Some(load_address) => {
                    let image = resolver.load_image(binary, load_address)?;
                    debug!(range = ?image.runtime_range(), "image mapped");
                }
                None => resolver.add_image(BinaryImage::open(binary)?),
            }

            let renderer = StackTraceRenderer::new(resolver, PlatformDemangler).with_options(RenderOptions {
                max_depth: addresses.len(),
            });
            let mut text = String::new();
            renderer.write_addresses(&addresses, &mut text)?;
            out.write_all(text.as_bytes())?;
        }
        Commands::Trace { max_depth } => {
            let renderer = StackTraceRenderer::platform().with_options(RenderOptions { max_depth });
            renderer.write_trace(&PlatformUnwinder, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}

/// One output line of the `demangle` command.
///
/// With `all`, symbols go through the whole fallback chain instead of the
/// `_W` decoder alone.
fn demangle_line(symbol: String, all: bool) -> String
{
    if all {
        let name = make_symbol_name(symbol, &PlatformDemangler);
        debug!(symbol = %name.raw(), language = %name.language(), "fallback chain");
        return match name.demangled() {
            Some(decoded) => format!("{} => {decoded}", name.raw()),
            None => format!("could not demangle {}", name.raw()),
        };
    }

    match demangle(&symbol) {
        Ok(decoded) => format!("{symbol} => {decoded}"),
        Err(e) => {
            debug!(symbol = %symbol, kind = ?DeclarationKind::classify(&symbol), error = %e, "decode failed");
            format!("could not demangle {symbol}")
        }
    }
}

/// Parse `0x`-prefixed hex or plain decimal.
fn parse_address(value: &str) -> Result<Address, String>
{
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed
        .map(Address::new)
        .map_err(|e| format!("invalid address '{value}': {e}"))
}
