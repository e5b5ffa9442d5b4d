use std::collections::VecDeque;
use std::io::Write as _;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{debug, trace, warn};
use thiserror::Error;
use types::{ExitReason, OpenMode, SemihostOp};

use crate::config::AgentConfig;
use crate::files::{ConsoleStream, FileTarget, HostFiles};
use crate::memory::{MemoryError, TargetMemory};

/// Host errno values reported through `SYS_ERRNO`.
pub mod errno {
    pub const ENOENT: isize = 2;
    pub const EBADF: isize = 9;
    pub const EACCES: isize = 13;
    pub const EFAULT: isize = 14;
    pub const EINVAL: isize = 22;
    pub const ESPIPE: isize = 29;
    pub const ENOSYS: isize = 38;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("unknown operation number 0x{0:x}")]
    UnknownOperation(usize),

    #[error("{} is not serviced by this host", .0.name())]
    Unsupported(SemihostOp),

    #[error("handle {0} is not open")]
    BadHandle(usize),

    #[error("handle {0} is not open for reading")]
    NotReadable(usize),

    #[error("handle {0} is not open for writing")]
    NotWritable(usize),

    #[error("handle {0} does not refer to a file")]
    NotSeekable(usize),

    #[error("no such file: {0}")]
    NotFound(String),

    #[error("invalid open mode {0}")]
    InvalidMode(usize),

    #[error("file name is not valid UTF-8")]
    BadName,

    #[error("seek to {pos} beyond end of file ({len} bytes)")]
    SeekOutOfRange { pos: usize, len: usize },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl AgentError {
    pub fn errno(&self) -> isize {
        match self {
            AgentError::UnknownOperation(_) | AgentError::Unsupported(_) => errno::ENOSYS,
            AgentError::BadHandle(_) => errno::EBADF,
            AgentError::NotReadable(_) | AgentError::NotWritable(_) => errno::EACCES,
            AgentError::NotSeekable(_) => errno::ESPIPE,
            AgentError::NotFound(_) => errno::ENOENT,
            AgentError::InvalidMode(_) | AgentError::BadName | AgentError::SeekOutOfRange { .. } => {
                errno::EINVAL
            }
            AgentError::Memory(_) => errno::EFAULT,
        }
    }
}

/// A semihosting request after the host has read its argument block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Open { name: usize, mode: usize, len: usize },
    Close { handle: usize },
    WriteC { addr: usize },
    Write0 { addr: usize },
    Write { handle: usize, addr: usize, len: usize },
    Read { handle: usize, addr: usize, len: usize },
    ReadC,
    IsError { status: isize },
    IsTty { handle: usize },
    Seek { handle: usize, pos: usize },
    Flen { handle: usize },
    Remove { name: usize, len: usize },
    Clock,
    Time,
    Errno,
    Exit { reason: usize },
    ExitExtended { reason: usize, subcode: usize },
    Elapsed { addr: usize },
    TickFreq,
    Unsupported(SemihostOp),
}

impl Request {
    /// Reads the argument block for `op` out of target memory.
    ///
    /// Scalar operations (close, flen, istty, iserror, exit) take their value
    /// straight from `a1`.
    pub fn decode<M: TargetMemory>(op: SemihostOp, arg: usize, mem: &M) -> Result<Self, MemoryError> {
        Ok(match op {
            SemihostOp::Open => {
                let [name, mode, len] = mem.read_words::<3>(arg)?;
                Request::Open { name, mode, len }
            }
            SemihostOp::Close => Request::Close { handle: arg },
            SemihostOp::WriteC => Request::WriteC { addr: arg },
            SemihostOp::Write0 => Request::Write0 { addr: arg },
            SemihostOp::Write => {
                let [handle, addr, len] = mem.read_words::<3>(arg)?;
                Request::Write { handle, addr, len }
            }
            SemihostOp::Read => {
                let [handle, addr, len] = mem.read_words::<3>(arg)?;
                Request::Read { handle, addr, len }
            }
            SemihostOp::ReadC => Request::ReadC,
            SemihostOp::IsError => Request::IsError { status: arg as isize },
            SemihostOp::IsTty => Request::IsTty { handle: arg },
            SemihostOp::Seek => {
                let [handle, pos] = mem.read_words::<2>(arg)?;
                Request::Seek { handle, pos }
            }
            SemihostOp::Flen => Request::Flen { handle: arg },
            SemihostOp::Remove => {
                let [name, len] = mem.read_words::<2>(arg)?;
                Request::Remove { name, len }
            }
            SemihostOp::Clock => Request::Clock,
            SemihostOp::Time => Request::Time,
            SemihostOp::Errno => Request::Errno,
            SemihostOp::Exit => Request::Exit { reason: arg },
            SemihostOp::ExitExtended => {
                let [reason, subcode] = mem.read_words::<2>(arg)?;
                Request::ExitExtended { reason, subcode }
            }
            SemihostOp::Elapsed => Request::Elapsed { addr: arg },
            SemihostOp::TickFreq => Request::TickFreq,
            other @ (SemihostOp::TmpNam
            | SemihostOp::Rename
            | SemihostOp::System
            | SemihostOp::GetCmdline
            | SemihostOp::HeapInfo
            | SemihostOp::EnterSvc) => Request::Unsupported(other),
        })
    }
}

/// How the target asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub reason: ExitReason,
    pub subcode: Option<usize>,
}

/// Services semihosting requests for one target.
///
/// Every failure becomes `-1` in `a0` (or the errno for `SYS_REMOVE`) and is
/// remembered for `SYS_ERRNO`; the agent never aborts the host.
pub struct SemihostAgent<M: TargetMemory> {
    memory: M,
    config: AgentConfig,
    files: HostFiles,
    stdin: VecDeque<u8>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    errno: isize,
    started: Instant,
    exit: Option<ExitStatus>,
}

impl<M: TargetMemory> SemihostAgent<M> {
    pub fn new(memory: M) -> Self {
        Self::with_config(memory, AgentConfig::default())
    }

    pub fn with_config(memory: M, config: AgentConfig) -> Self {
        let stdin = config.stdin.iter().copied().collect();
        Self {
            memory,
            config,
            files: HostFiles::new(),
            stdin,
            stdout: Vec::new(),
            stderr: Vec::new(),
            errno: 0,
            started: Instant::now(),
            exit: None,
        }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn files(&self) -> &HostFiles {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut HostFiles {
        &mut self.files
    }

    /// Everything the target wrote to stdout so far.
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    pub fn take_stdout(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.stdout)
    }

    pub fn push_stdin(&mut self, bytes: &[u8]) {
        self.stdin.extend(bytes.iter().copied());
    }

    pub fn last_errno(&self) -> isize {
        self.errno
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Handles one trap: `op` is the raw `a0`, `arg` the raw `a1`. Returns
    /// the value for `a0`.
    pub fn handle(&mut self, op: usize, arg: usize) -> isize {
        let Some(op) = u32::try_from(op).ok().and_then(SemihostOp::from_number) else {
            warn!("unknown semihosting operation 0x{op:x} (a1=0x{arg:x})");
            return self.fail(&AgentError::UnknownOperation(op));
        };

        let request = match Request::decode(op, arg, &self.memory) {
            Ok(request) => request,
            Err(err) => return self.fail(&err.into()),
        };

        let result = match self.service(&request) {
            Ok(value) => value,
            Err(err) => match request {
                Request::Remove { .. } => {
                    self.errno = err.errno();
                    err.errno()
                }
                _ => self.fail(&err),
            },
        };
        debug!("{} a1=0x{arg:x} -> {result}", op.name());
        result
    }

    fn fail(&mut self, err: &AgentError) -> isize {
        match err {
            AgentError::Unsupported(_) | AgentError::UnknownOperation(_) => warn!("{err}"),
            _ => debug!("request failed: {err}"),
        }
        self.errno = err.errno();
        -1
    }

    /// Carries out an already decoded request.
    pub fn service(&mut self, request: &Request) -> Result<isize, AgentError> {
        match *request {
            Request::Open { name, mode, len } => {
                let mode = u32::try_from(mode)
                    .ok()
                    .and_then(OpenMode::from_code)
                    .ok_or(AgentError::InvalidMode(mode))?;
                let name = self.read_name(name, len)?;
                let handle = self.files.open(&name, mode)?;
                debug!("open {name:?} ({}) -> handle {handle}", mode.as_str());
                Ok(handle as isize)
            }
            Request::Close { handle } => {
                self.files.close(handle)?;
                Ok(0)
            }
            Request::WriteC { addr } => {
                let mut byte = [0u8; 1];
                self.memory.read_bytes(addr, &mut byte)?;
                self.console_write(ConsoleStream::Stdout, &byte);
                Ok(0)
            }
            Request::Write0 { addr } => {
                let bytes = self.memory.read_cstr(addr, self.config.write0_limit)?;
                self.console_write(ConsoleStream::Stdout, &bytes);
                Ok(0)
            }
            Request::Write { handle, addr, len } => {
                let bytes = self.memory.read_vec(addr, len)?;
                trace!("write handle={handle} bytes={}", hex::encode(&bytes));
                let target = self.files.get(handle)?.target.clone();
                let written = match target {
                    FileTarget::Console(ConsoleStream::Stdin) => {
                        return Err(AgentError::NotWritable(handle));
                    }
                    FileTarget::Console(stream) => {
                        self.console_write(stream, &bytes);
                        bytes.len()
                    }
                    FileTarget::Path(_) => self.files.write(handle, &bytes)?,
                };
                Ok((len - written) as isize)
            }
            Request::Read { handle, addr, len } => {
                // Nothing is consumed until the bytes have landed in target
                // memory.
                let target = self.files.get(handle)?.target.clone();
                let bytes: Vec<u8> = match target {
                    FileTarget::Console(ConsoleStream::Stdin) => {
                        self.stdin.iter().take(len).copied().collect()
                    }
                    FileTarget::Console(_) => return Err(AgentError::NotReadable(handle)),
                    FileTarget::Path(_) => self.files.peek(handle, len)?,
                };
                self.memory.write_bytes(addr, &bytes)?;
                match target {
                    FileTarget::Path(_) => self.files.advance(handle, bytes.len())?,
                    _ => {
                        self.stdin.drain(..bytes.len());
                    }
                }
                Ok((len - bytes.len()) as isize)
            }
            Request::ReadC => Ok(self.stdin.pop_front().map_or(-1, isize::from)),
            Request::IsError { status } => Ok(isize::from(status < 0)),
            Request::IsTty { handle } => match self.files.get(handle)?.target {
                FileTarget::Console(_) => Ok(1),
                FileTarget::Path(_) => Ok(0),
            },
            Request::Seek { handle, pos } => {
                self.files.seek(handle, pos)?;
                Ok(0)
            }
            Request::Flen { handle } => Ok(self.files.len(handle)? as isize),
            Request::Remove { name, len } => {
                let name = self.read_name(name, len)?;
                self.files.remove(&name)?;
                Ok(0)
            }
            Request::Clock => Ok((self.started.elapsed().as_millis() / 10) as isize),
            Request::Time => Ok(SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |since| since.as_secs() as isize)),
            Request::Errno => Ok(self.errno),
            Request::Exit { reason } => {
                self.stop(ExitReason::from_code(reason), None);
                Ok(0)
            }
            Request::ExitExtended { reason, subcode } => {
                self.stop(ExitReason::from_code(reason), Some(subcode));
                Ok(0)
            }
            Request::Elapsed { addr } => {
                let elapsed = self.started.elapsed();
                let ticks = (elapsed.as_nanos() * u128::from(self.config.tick_frequency)
                    / 1_000_000_000) as u64;
                self.memory.write_bytes(addr, &ticks.to_le_bytes())?;
                Ok(0)
            }
            Request::TickFreq => Ok(self.config.tick_frequency as isize),
            Request::Unsupported(op) => Err(AgentError::Unsupported(op)),
        }
    }

    fn read_name(&self, addr: usize, len: usize) -> Result<String, AgentError> {
        if len > self.config.max_name_len {
            return Err(AgentError::BadName);
        }
        let raw = self.memory.read_vec(addr, len)?;
        String::from_utf8(raw).map_err(|_| AgentError::BadName)
    }

    fn console_write(&mut self, stream: ConsoleStream, bytes: &[u8]) {
        let sink = match stream {
            ConsoleStream::Stderr => &mut self.stderr,
            _ => &mut self.stdout,
        };
        sink.extend_from_slice(bytes);

        if self.config.echo_console {
            // Echo is best effort, the captured copy is authoritative.
            let _ = match stream {
                ConsoleStream::Stderr => std::io::stderr().write_all(bytes),
                _ => std::io::stdout().write_all(bytes),
            };
        }
    }

    fn stop(&mut self, reason: ExitReason, subcode: Option<usize>) {
        debug!("target exit: reason=0x{:x} subcode={subcode:?}", reason.code());
        self.exit = Some(ExitStatus { reason, subcode });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn agent() -> SemihostAgent<Memory> {
        SemihostAgent::new(Memory::new(0x4000))
    }

    fn op(op: SemihostOp) -> usize {
        op.number() as usize
    }

    #[test]
    fn write_to_stdout_is_captured() {
        let mut agent = agent();
        let text = agent.memory_mut().alloc(b"hello\n").unwrap();
        let block = agent.memory_mut().alloc_words(&[1, text, 6]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Write), block), 0);
        assert_eq!(agent.stdout(), b"hello\n");
    }

    #[test]
    fn file_round_trip() {
        let mut agent = agent();
        let name = agent.memory_mut().alloc(b"out.bin\0").unwrap();
        let open = agent
            .memory_mut()
            .alloc_words(&[name, OpenMode::WriteReadBinary.code() as usize, 7])
            .unwrap();
        let handle = agent.handle(op(SemihostOp::Open), open);
        assert!(handle >= 3);
        let handle = handle as usize;

        let data = agent.memory_mut().alloc(b"payload").unwrap();
        let write = agent.memory_mut().alloc_words(&[handle, data, 7]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Write), write), 0);
        assert_eq!(agent.handle(op(SemihostOp::Flen), handle), 7);

        let seek = agent.memory_mut().alloc_words(&[handle, 3]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Seek), seek), 0);

        let dest = agent.memory_mut().alloc(&[0u8; 8]).unwrap();
        let read = agent.memory_mut().alloc_words(&[handle, dest, 8]).unwrap();
        // 4 bytes left in the file, 4 of 8 not read
        assert_eq!(agent.handle(op(SemihostOp::Read), read), 4);
        assert_eq!(&agent.memory().mem()[dest..dest + 4], b"load");

        assert_eq!(agent.handle(op(SemihostOp::IsTty), handle), 0);
        assert_eq!(agent.handle(op(SemihostOp::Close), handle), 0);
        assert_eq!(agent.handle(op(SemihostOp::Close), handle), -1);
        assert_eq!(agent.last_errno(), errno::EBADF);
        assert_eq!(agent.files().contents("out.bin").unwrap(), b"payload");
    }

    #[test]
    fn open_missing_file_for_reading_fails() {
        let mut agent = agent();
        let name = agent.memory_mut().alloc(b"missing\0").unwrap();
        let open = agent.memory_mut().alloc_words(&[name, 0, 7]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Open), open), -1);
        assert_eq!(agent.handle(op(SemihostOp::Errno), 0), errno::ENOENT);
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let mut agent = agent();
        let name = agent.memory_mut().alloc(b"x\0").unwrap();
        let open = agent.memory_mut().alloc_words(&[name, 12, 1]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Open), open), -1);
        assert_eq!(agent.last_errno(), errno::EINVAL);
    }

    #[test]
    fn unknown_and_unsupported_operations() {
        let mut agent = agent();
        assert_eq!(agent.handle(0x0B, 0), -1);
        assert_eq!(agent.last_errno(), errno::ENOSYS);
        agent.handle(op(SemihostOp::Clock), 0);
        assert_eq!(agent.handle(op(SemihostOp::Rename), 0), -1);
        assert_eq!(agent.last_errno(), errno::ENOSYS);
    }

    #[test]
    fn bad_argument_block_is_efault() {
        let mut agent = agent();
        assert_eq!(agent.handle(op(SemihostOp::Write), 0x10_0000), -1);
        assert_eq!(agent.last_errno(), errno::EFAULT);
    }

    #[test]
    fn huge_write_length_is_efault() {
        let mut agent = SemihostAgent::new(Memory::new(0x4000).with_word_size(8));
        let text = agent.memory_mut().alloc(b"x").unwrap();
        let block = agent
            .memory_mut()
            .alloc_words(&[1, text, usize::MAX])
            .unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Write), block), -1);
        assert_eq!(agent.last_errno(), errno::EFAULT);
        assert!(agent.stdout().is_empty());
    }

    #[test]
    fn huge_read_length_after_seek() {
        let mut agent = SemihostAgent::new(Memory::new(0x4000).with_word_size(8));
        agent.files_mut().insert("f", b"abcdef");
        let h = agent.files_mut().open("f", OpenMode::Read).unwrap();
        agent.files_mut().seek(h, 2).unwrap();

        let dest = agent.memory_mut().alloc(&[0u8; 8]).unwrap();
        let read = agent.memory_mut().alloc_words(&[h, dest, usize::MAX]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Read), read), (usize::MAX - 4) as isize);
        assert_eq!(&agent.memory().mem()[dest..dest + 4], b"cdef");
    }

    #[test]
    fn failed_read_consumes_nothing() {
        let mut agent = agent();
        agent.files_mut().insert("f", b"abcdef");
        let h = agent.files_mut().open("f", OpenMode::Read).unwrap();

        let bad = agent.memory_mut().alloc_words(&[h, 0x10_0000, 4]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Read), bad), -1);
        assert_eq!(agent.last_errno(), errno::EFAULT);

        let dest = agent.memory_mut().alloc(&[0u8; 4]).unwrap();
        let good = agent.memory_mut().alloc_words(&[h, dest, 4]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Read), good), 0);
        assert_eq!(&agent.memory().mem()[dest..dest + 4], b"abcd");
    }

    #[test]
    fn failed_console_read_keeps_stdin() {
        let config = AgentConfig::default().with_stdin(b"ok");
        let mut agent = SemihostAgent::with_config(Memory::new(0x4000), config);
        let bad = agent.memory_mut().alloc_words(&[0, 0x10_0000, 2]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Read), bad), -1);
        assert_eq!(agent.handle(op(SemihostOp::ReadC), 0), b'o' as isize);
    }

    #[test]
    fn remove_returns_errno() {
        let mut agent = agent();
        agent.files_mut().insert("tmp", b"x");
        let name = agent.memory_mut().alloc(b"tmp\0").unwrap();
        let block = agent.memory_mut().alloc_words(&[name, 3]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Remove), block), 0);
        assert_eq!(agent.handle(op(SemihostOp::Remove), block), errno::ENOENT);
    }

    #[test]
    fn console_input() {
        let config = AgentConfig::default().with_stdin(b"ab");
        let mut agent = SemihostAgent::with_config(Memory::new(0x4000), config);
        assert_eq!(agent.handle(op(SemihostOp::ReadC), 0), b'a' as isize);

        let dest = agent.memory_mut().alloc(&[0u8; 4]).unwrap();
        let read = agent.memory_mut().alloc_words(&[0, dest, 4]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Read), read), 3);
        assert_eq!(agent.memory().mem()[dest], b'b');
        assert_eq!(agent.handle(op(SemihostOp::ReadC), 0), -1);
    }

    #[test]
    fn write0_and_writec() {
        let mut agent = agent();
        let s = agent.memory_mut().alloc(b"hi\0").unwrap();
        let c = agent.memory_mut().alloc(b"!").unwrap();
        agent.handle(op(SemihostOp::Write0), s);
        agent.handle(op(SemihostOp::WriteC), c);
        assert_eq!(agent.stdout(), b"hi!");
    }

    #[test]
    fn exit_records_reason() {
        let mut agent = agent();
        assert_eq!(agent.exit_status(), None);
        agent.handle(op(SemihostOp::Exit), ExitReason::ERROR_CODE);
        assert_eq!(
            agent.exit_status(),
            Some(ExitStatus { reason: ExitReason::Error, subcode: None })
        );

        let mut agent = self::agent();
        let block = agent
            .memory_mut()
            .alloc_words(&[ExitReason::SUCCESS_CODE, 3])
            .unwrap();
        agent.handle(op(SemihostOp::ExitExtended), block);
        assert_eq!(
            agent.exit_status(),
            Some(ExitStatus { reason: ExitReason::Success, subcode: Some(3) })
        );
    }

    #[test]
    fn iserror_and_tickfreq() {
        let mut agent = agent();
        assert_eq!(agent.handle(op(SemihostOp::IsError), (-5isize) as usize), 1);
        assert_eq!(agent.handle(op(SemihostOp::IsError), 4), 0);
        assert_eq!(agent.handle(op(SemihostOp::TickFreq), 0), 1_000_000);
        let slot = agent.memory_mut().alloc(&[0u8; 8]).unwrap();
        assert_eq!(agent.handle(op(SemihostOp::Elapsed), slot), 0);
        assert_eq!(agent.handle(op(SemihostOp::IsTty), 1), 1);
    }
}
