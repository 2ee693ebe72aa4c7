//! # Crash reporting
//!
//! Prints a stack trace when the process dies from a fatal signal, then
//! terminates it.
//!
//! The handler is one-shot: it is registered with `SA_RESETHAND`, guarded
//! against re-entry, and always ends in [`std::process::abort`]. It never
//! returns to the faulting code.
//!
//! ## Reduced guarantees
//!
//! The address buffer and output path are reserved up front (a fixed array on
//! the signal stack, unbuffered `write(2)` to fd 2). Symbol lookup goes
//! through `dladdr`, which does not allocate. Demangling a frame name does
//! allocate, which is not async-signal-safe. A heap corrupted badly enough to
//! deadlock `malloc` will cut the report short; the process still dies.

use std::fmt::{self, Write as _};
use std::io;
use std::mem;
use std::os::raw::{c_int, c_void};
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{Result, SymbolError};
use crate::trace::StackTraceRenderer;
use crate::types::Address;
use crate::unwind::{PlatformUnwinder, Unwinder, MAX_STACK_DEPTH};

/// Signals that trigger a report, with the line printed for each.
const FATAL_SIGNALS: [(c_int, &str, &str); 2] = [
    (libc::SIGSEGV, "SIGSEGV", "Segmentation fault"),
    (libc::SIGILL, "SIGILL", "Illegal instruction"),
];

/// Size of the alternate stack the handler runs on.
const SIGNAL_STACK_SIZE: usize = 256 * 1024;

static INSTALLED: OnceCell<()> = OnceCell::new();
static REPORTING: AtomicBool = AtomicBool::new(false);

/// Install the fatal-signal handler for `SIGSEGV` and `SIGILL`.
///
/// Calling this more than once is harmless; only the first call registers
/// anything. The alternate signal stack is set up for the calling thread, so
/// call this early from the main thread.
///
/// ## Errors
///
/// Returns [`SymbolError::HandlerInstall`] if `sigaltstack` or `sigaction`
/// fails.
pub fn install_crash_handler() -> Result<()>
{
    INSTALLED.get_or_try_init(|| -> Result<()> {
        // Load the unwinder's support library now rather than inside the handler.
        PlatformUnwinder::prime();
        install_signal_stack()?;

        for (signal, name, _) in FATAL_SIGNALS {
            // SAFETY: `sigaction` is plain data; all-zero is a valid starting value.
            let mut action: libc::sigaction = unsafe { mem::zeroed() };
            action.sa_sigaction = handle_fatal_signal as *const () as usize as libc::sighandler_t;
            action.sa_flags = libc::SA_SIGINFO | libc::SA_ONSTACK | libc::SA_RESETHAND;

            // SAFETY: `action` is fully initialized and the handler has the
            // three-argument signature SA_SIGINFO requires.
            let r = unsafe {
                libc::sigemptyset(&mut action.sa_mask);
                libc::sigaction(signal, &action, std::ptr::null_mut())
            };
            if r != 0 {
                return Err(SymbolError::HandlerInstall {
                    signal: name,
                    source: io::Error::last_os_error(),
                });
            }
        }

        debug!("crash handler installed");
        Ok(())
    })?;
    Ok(())
}

fn install_signal_stack() -> Result<()>
{
    // Lives for the rest of the process.
    let stack: &'static mut [u8] = Box::leak(vec![0u8; SIGNAL_STACK_SIZE].into_boxed_slice());

    let alt = libc::stack_t {
        ss_sp: stack.as_mut_ptr().cast::<c_void>(),
        ss_flags: 0,
        ss_size: stack.len(),
    };
    // SAFETY: `alt` describes a leaked buffer that is never freed or aliased.
    let r = unsafe { libc::sigaltstack(&alt, std::ptr::null_mut()) };
    if r != 0 {
        return Err(SymbolError::HandlerInstall {
            signal: "sigaltstack",
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

extern "C" fn handle_fatal_signal(signal: c_int, _info: *mut libc::siginfo_t, _context: *mut c_void)
{
    let description = FATAL_SIGNALS
        .iter()
        .find(|(candidate, _, _)| *candidate == signal)
        .map_or("Fatal signal", |&(_, _, description)| description);

    report_and_abort(format_args!("{description}"));
}

/// Print `message` and a stack trace to stderr, then abort.
///
/// Shares the crash handler's output path, so it is safe to call when the
/// process state is already suspect.
pub fn fatal_error(message: &str) -> !
{
    report_and_abort(format_args!("fatal error: {message}"))
}

fn report_and_abort(headline: fmt::Arguments<'_>) -> !
{
    if REPORTING.swap(true, Ordering::SeqCst) {
        // A second failure while reporting; don't try again.
        std::process::abort();
    }

    let mut out = FdWriter::stderr();
    let _ = writeln!(out, "\n{headline}");
    write_crash_trace(&mut out);
    std::process::abort()
}

fn write_crash_trace(out: &mut FdWriter)
{
    let mut addresses = [Address::ZERO; MAX_STACK_DEPTH];
    let count = PlatformUnwinder.unwind(&mut addresses);
    let _ = StackTraceRenderer::platform().write_addresses(&addresses[..count], out);
}

/// Unbuffered `fmt::Write` over a raw file descriptor.
struct FdWriter
{
    fd: c_int,
}

impl FdWriter
{
    fn stderr() -> Self
    {
        Self {
            fd: libc::STDERR_FILENO,
        }
    }
}

impl fmt::Write for FdWriter
{
    fn write_str(&mut self, s: &str) -> fmt::Result
    {
        let mut bytes = s.as_bytes();
        while !bytes.is_empty() {
            // SAFETY: `bytes` is a live slice; write(2) reads at most its length.
            let n = unsafe { libc::write(self.fd, bytes.as_ptr().cast::<c_void>(), bytes.len()) };
            if n < 0 {
                if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(fmt::Error);
            }
            if n == 0 {
                return Err(fmt::Error);
            }
            bytes = &bytes[n as usize..];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use std::fmt::Write as _;
    use std::process::Command;

    use super::*;

    const CHILD_ENV: &str = "WDEMANGLE_CRASH_CHILD";

    #[test]
    fn test_fd_writer_writes_everything()
    {
        let mut fds = [0 as c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

        let mut writer = FdWriter { fd: fds[1] };
        write!(writer, "{} + {}", "frame", 42).unwrap();
        unsafe { libc::close(fds[1]) };

        let mut buf = [0u8; 64];
        let n = unsafe { libc::read(fds[0], buf.as_mut_ptr().cast::<c_void>(), buf.len()) };
        unsafe { libc::close(fds[0]) };
        assert_eq!(&buf[..n as usize], b"frame + 42");
    }

    #[test]
    fn test_fd_writer_reports_bad_descriptor()
    {
        let mut writer = FdWriter { fd: -1 };
        assert!(writer.write_str("x").is_err());
    }

    /// Re-runs this test binary with only `test_crash_child` selected.
    fn run_child(mode: &str) -> std::process::Output
    {
        Command::new(std::env::current_exe().unwrap())
            .args(["crash::tests::test_crash_child", "--exact", "--ignored", "--nocapture"])
            .env(CHILD_ENV, mode)
            .output()
            .unwrap()
    }

    #[test]
    #[ignore = "only meaningful when spawned by the crash tests"]
    fn test_crash_child()
    {
        let Ok(mode) = std::env::var(CHILD_ENV) else {
            return;
        };
        install_crash_handler().unwrap();
        install_crash_handler().unwrap();
        match mode.as_str() {
            "query" => {
                for (signal, name, _) in FATAL_SIGNALS {
                    let mut current: libc::sigaction = unsafe { mem::zeroed() };
                    assert_eq!(unsafe { libc::sigaction(signal, std::ptr::null(), &mut current) }, 0);
                    if current.sa_sigaction == handle_fatal_signal as *const () as usize as libc::sighandler_t {
                        println!("handler installed for {name}");
                    }
                }
                return;
            }
            "segv" => unsafe {
                libc::raise(libc::SIGSEGV);
            },
            "ill" => unsafe {
                libc::raise(libc::SIGILL);
            },
            _ => fatal_error("invariant broken"),
        }
        unreachable!("the crash handler returned");
    }

    #[test]
    fn test_handler_is_registered_for_fatal_signals()
    {
        let output = run_child("query");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "stdout: {stdout}");
        for (_, name, _) in FATAL_SIGNALS {
            assert!(stdout.contains(&format!("handler installed for {name}")), "stdout: {stdout}");
        }
    }

    #[test]
    fn test_segfault_prints_trace_and_terminates()
    {
        let output = run_child("segv");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!output.status.success());
        assert!(stderr.contains("Segmentation fault"), "stderr: {stderr}");
        assert!(stderr.contains(crate::trace::TRACE_HEADER), "stderr: {stderr}");
        assert!(!stderr.contains("the crash handler returned"));
    }

    #[test]
    fn test_illegal_instruction_is_reported()
    {
        let output = run_child("ill");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!output.status.success());
        assert!(stderr.contains("Illegal instruction"), "stderr: {stderr}");
    }

    #[test]
    fn test_fatal_error_aborts_with_message()
    {
        let output = run_child("fatal");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!output.status.success());
        assert!(stderr.contains("fatal error: invariant broken"), "stderr: {stderr}");
        assert!(stderr.contains(crate::trace::TRACE_HEADER), "stderr: {stderr}");
    }
}
