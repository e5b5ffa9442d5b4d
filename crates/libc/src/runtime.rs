//! C ABI entry points for firmware images.
//!
//! One console lives in a static for the whole run. Nothing serializes
//! access to it: interrupt handlers must not print while foreground code
//! does.

use core::cell::UnsafeCell;
use core::ffi::{CStr, c_char, c_int, c_void};

use semihost::Ebreak;

use crate::config::Config;
use crate::stdio::{Console, StdConsole};

/// Holds the firmware's one console in a `static`.
///
/// The target runs a single hart with no preemption of the print path, so
/// handing out `&mut` is sound as long as entry points never nest.
pub struct Global<T> {
    cell: UnsafeCell<T>,
}

impl<T> Global<T> {
    pub const fn new(value: T) -> Self {
        Self {
            cell: UnsafeCell::new(value),
        }
    }

    /// # Safety
    /// The previous borrow must be gone: no interrupt handler or nested
    /// entry point may be printing.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn borrow_mut(&self) -> &mut T {
        unsafe { &mut *self.cell.get() }
    }
}

unsafe impl<T> Sync for Global<T> {}

static CONSOLE: Global<StdConsole<Ebreak>> = Global::new(Console::new(Ebreak));

fn console() -> &'static mut StdConsole<Ebreak> {
    // SAFETY: a single hart runs this code and none of the entry points
    // below re-enter one another.
    unsafe { CONSOLE.borrow_mut() }
}

/// # Safety
/// `s` must be null or point to a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn puts(s: *const c_char) -> c_int {
    if s.is_null() {
        return -1;
    }
    let s = unsafe { CStr::from_ptr(s) };
    console().puts(s)
}

#[unsafe(no_mangle)]
pub extern "C" fn fputc(c: c_int, _stream: *mut c_void) -> c_int {
    console().fputc(c, Config::STDOUT_HANDLE)
}

#[unsafe(no_mangle)]
pub extern "C" fn putchar(c: c_int) -> c_int {
    console().putchar(c)
}

#[unsafe(no_mangle)]
pub extern "C" fn exit(status: c_int) -> ! {
    console().exit(status)
}

#[unsafe(no_mangle)]
pub extern "C" fn abort() -> ! {
    console().abort()
}

/// Called by the startup code before `main`.
#[unsafe(no_mangle)]
pub extern "C" fn libc_init() {}

#[unsafe(no_mangle)]
pub extern "C" fn libc_start() -> c_int {
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn libc_stop() {}

#[cfg(feature = "panic-handler")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::fmt::Write;

    let console = console();
    if let Some(location) = info.location() {
        let _ = write!(
            console,
            "panic at {}:{}:{}: ",
            location.file(),
            location.line(),
            location.column()
        );
    }
    let _ = writeln!(console, "{}", info.message());
    console.flush();
    console.abort()
}
