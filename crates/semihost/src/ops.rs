use core::ffi::CStr;
use core::sync::atomic::{Ordering, compiler_fence};

use types::{ExitReason, HostTrap, OpenMode, Result, SemihostError, SemihostOp};

/// A host-side file handle as returned by `SYS_OPEN`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle(pub usize);

impl Handle {
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// Console handles the host opens before the target starts.
pub const STDIN: Handle = Handle(0);
pub const STDOUT: Handle = Handle(1);
pub const STDERR: Handle = Handle(2);

/// Typed semihosting operations over a [`HostTrap`].
///
/// Operations with more than one argument build their argument block on the
/// stack and hand its address to the host; single scalars travel in `a1`
/// directly.
#[derive(Debug, Default)]
pub struct Semihost<T: HostTrap> {
    trap: T,
}

impl<T: HostTrap> Semihost<T> {
    pub const fn new(trap: T) -> Self {
        Self { trap }
    }

    pub fn trap_mut(&mut self) -> &mut T {
        &mut self.trap
    }

    pub fn into_inner(self) -> T {
        self.trap
    }

    fn call_scalar(&mut self, op: SemihostOp, value: usize) -> isize {
        // SAFETY: the argument is a plain value, the host does not
        // dereference it.
        unsafe { self.trap.trap(op, value) }
    }

    /// # Safety
    /// Every address inside `args` must be valid for the access `op` makes.
    unsafe fn call_block<const N: usize>(&mut self, op: SemihostOp, args: &[usize; N]) -> isize {
        // The host reads the block through memory, so it has to be written
        // out before the trap rather than left in registers.
        compiler_fence(Ordering::SeqCst);
        unsafe { self.trap.trap(op, args.as_ptr() as usize) }
    }

    /// `SYS_OPEN`: `[name, mode, strlen(name)]`. Returns the raw handle or -1.
    pub fn open_raw(&mut self, name: &CStr, mode: OpenMode) -> isize {
        let args = [
            name.as_ptr() as usize,
            mode.code() as usize,
            name.to_bytes().len(),
        ];
        // SAFETY: `name` is borrowed and NUL-terminated for the whole call.
        unsafe { self.call_block(SemihostOp::Open, &args) }
    }

    pub fn open(&mut self, name: &CStr, mode: OpenMode) -> Result<Handle> {
        value(self.open_raw(name, mode)).map(Handle)
    }

    /// `SYS_CLOSE`, handle passed directly.
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        status(self.call_scalar(SemihostOp::Close, handle.raw()))
    }

    /// `SYS_WRITE`: `[handle, buffer, len]`. Returns the number of bytes the
    /// host did NOT write.
    pub fn write_raw(&mut self, handle: Handle, bytes: &[u8]) -> isize {
        let args = [handle.raw(), bytes.as_ptr() as usize, bytes.len()];
        // SAFETY: `bytes` stays borrowed for the duration of the trap.
        unsafe { self.call_block(SemihostOp::Write, &args) }
    }

    pub fn write(&mut self, handle: Handle, bytes: &[u8]) -> Result<()> {
        match remaining(self.write_raw(handle, bytes), bytes.len())? {
            0 => Ok(()),
            remaining => Err(SemihostError::Partial { remaining }),
        }
    }

    /// `SYS_READ`: `[handle, buffer, len]`. Returns the number of bytes the
    /// host did NOT read; `buf.len()` means end of file.
    pub fn read_raw(&mut self, handle: Handle, buf: &mut [u8]) -> isize {
        let args = [handle.raw(), buf.as_mut_ptr() as usize, buf.len()];
        // SAFETY: `buf` is exclusively borrowed, the host may fill it.
        unsafe { self.call_block(SemihostOp::Read, &args) }
    }

    /// Reads into `buf` and returns how many bytes arrived.
    pub fn read(&mut self, handle: Handle, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len();
        let left = remaining(self.read_raw(handle, buf), len)?;
        Ok(len - left)
    }

    /// `SYS_SEEK`: `[handle, absolute position]`.
    pub fn seek(&mut self, handle: Handle, pos: usize) -> Result<()> {
        let args = [handle.raw(), pos];
        // SAFETY: no addresses in the block.
        status(unsafe { self.call_block(SemihostOp::Seek, &args) })
    }

    /// `SYS_FLEN`, handle passed directly.
    pub fn flen(&mut self, handle: Handle) -> Result<usize> {
        value(self.call_scalar(SemihostOp::Flen, handle.raw()))
    }

    /// `SYS_EXIT`, reason passed directly. Only returns if the host ignored
    /// the request.
    pub fn exit(&mut self, reason: ExitReason) -> isize {
        self.call_scalar(SemihostOp::Exit, reason.code())
    }

    /// `SYS_EXIT_EXTENDED`: `[reason, subcode]`.
    pub fn exit_extended(&mut self, reason: ExitReason, subcode: usize) -> isize {
        let args = [reason.code(), subcode];
        // SAFETY: no addresses in the block.
        unsafe { self.call_block(SemihostOp::ExitExtended, &args) }
    }

    /// `SYS_WRITEC`: the address of one byte.
    pub fn writec(&mut self, byte: u8) {
        let cell = byte;
        compiler_fence(Ordering::SeqCst);
        // SAFETY: `cell` lives on the stack across the trap.
        unsafe {
            self.trap
                .trap(SemihostOp::WriteC, &cell as *const u8 as usize);
        }
    }

    /// `SYS_WRITE0`: the address of a NUL-terminated string.
    pub fn write0(&mut self, s: &CStr) {
        compiler_fence(Ordering::SeqCst);
        // SAFETY: `s` is NUL-terminated and borrowed across the trap.
        unsafe {
            self.trap.trap(SemihostOp::Write0, s.as_ptr() as usize);
        }
    }

    /// `SYS_READC`: blocks on the host console for one byte.
    pub fn readc(&mut self) -> Result<u8> {
        let raw = self.call_scalar(SemihostOp::ReadC, 0);
        u8::try_from(raw).map_err(|_| SemihostError::HostError(raw))
    }

    /// `SYS_ISTTY`, handle passed directly.
    pub fn istty(&mut self, handle: Handle) -> Result<bool> {
        match self.call_scalar(SemihostOp::IsTty, handle.raw()) {
            1 => Ok(true),
            0 => Ok(false),
            err => Err(SemihostError::HostError(err)),
        }
    }

    /// `SYS_REMOVE`: `[name, strlen(name)]`. The host returns 0 or its errno.
    pub fn remove(&mut self, name: &CStr) -> Result<()> {
        let args = [name.as_ptr() as usize, name.to_bytes().len()];
        // SAFETY: `name` is borrowed and NUL-terminated for the whole call.
        status(unsafe { self.call_block(SemihostOp::Remove, &args) })
    }

    /// `SYS_CLOCK`: centiseconds since the target started.
    pub fn clock(&mut self) -> Result<usize> {
        value(self.call_scalar(SemihostOp::Clock, 0))
    }

    /// `SYS_TIME`: seconds since the Unix epoch.
    pub fn time(&mut self) -> Result<usize> {
        value(self.call_scalar(SemihostOp::Time, 0))
    }

    /// `SYS_ERRNO`: the host's errno after the last failing call.
    pub fn errno(&mut self) -> isize {
        self.call_scalar(SemihostOp::Errno, 0)
    }
}

fn status(raw: isize) -> Result<()> {
    match raw {
        0 => Ok(()),
        err => Err(SemihostError::HostError(err)),
    }
}

fn value(raw: isize) -> Result<usize> {
    usize::try_from(raw).map_err(|_| SemihostError::HostError(raw))
}

fn remaining(raw: isize, requested: usize) -> Result<usize> {
    let left = value(raw)?;
    if left > requested {
        return Err(SemihostError::BadReturn(raw));
    }
    Ok(left)
}
