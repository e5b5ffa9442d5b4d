//! Semihosting operation numbers, exit reasons and open modes.
//!
//! The numeric values are protocol constants recognized by debuggers and
//! emulators (openocd, QEMU, GVSoC). They must never be renumbered.

/// Operation numbers placed in `a0` before the trap sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SemihostOp {
    Open = 0x01,
    Close = 0x02,
    /// Write a single character.
    WriteC = 0x03,
    /// Write a NUL-terminated string.
    Write0 = 0x04,
    Write = 0x05,
    Read = 0x06,
    /// Read a single character from the console.
    ReadC = 0x07,
    IsError = 0x08,
    IsTty = 0x09,
    Seek = 0x0A,
    Flen = 0x0C,
    TmpNam = 0x0D,
    Remove = 0x0E,
    Rename = 0x0F,
    Clock = 0x10,
    Time = 0x11,
    System = 0x12,
    Errno = 0x13,
    GetCmdline = 0x15,
    HeapInfo = 0x16,
    /// Deprecated, kept for decoding only.
    EnterSvc = 0x17,
    Exit = 0x18,
    ExitExtended = 0x20,
    Elapsed = 0x30,
    TickFreq = 0x31,
}

impl SemihostOp {
    pub const ALL: [SemihostOp; 25] = [
        SemihostOp::Open,
        SemihostOp::Close,
        SemihostOp::WriteC,
        SemihostOp::Write0,
        SemihostOp::Write,
        SemihostOp::Read,
        SemihostOp::ReadC,
        SemihostOp::IsError,
        SemihostOp::IsTty,
        SemihostOp::Seek,
        SemihostOp::Flen,
        SemihostOp::TmpNam,
        SemihostOp::Remove,
        SemihostOp::Rename,
        SemihostOp::Clock,
        SemihostOp::Time,
        SemihostOp::System,
        SemihostOp::Errno,
        SemihostOp::GetCmdline,
        SemihostOp::HeapInfo,
        SemihostOp::EnterSvc,
        SemihostOp::Exit,
        SemihostOp::ExitExtended,
        SemihostOp::Elapsed,
        SemihostOp::TickFreq,
    ];

    pub const fn number(self) -> u32 {
        self as u32
    }

    /// Maps a raw `a0` value back to an operation, as the host sees it.
    pub fn from_number(number: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.number() == number)
    }

    pub const fn name(self) -> &'static str {
        match self {
            SemihostOp::Open => "SYS_OPEN",
            SemihostOp::Close => "SYS_CLOSE",
            SemihostOp::WriteC => "SYS_WRITEC",
            SemihostOp::Write0 => "SYS_WRITE0",
            SemihostOp::Write => "SYS_WRITE",
            SemihostOp::Read => "SYS_READ",
            SemihostOp::ReadC => "SYS_READC",
            SemihostOp::IsError => "SYS_ISERROR",
            SemihostOp::IsTty => "SYS_ISTTY",
            SemihostOp::Seek => "SYS_SEEK",
            SemihostOp::Flen => "SYS_FLEN",
            SemihostOp::TmpNam => "SYS_TMPNAM",
            SemihostOp::Remove => "SYS_REMOVE",
            SemihostOp::Rename => "SYS_RENAME",
            SemihostOp::Clock => "SYS_CLOCK",
            SemihostOp::Time => "SYS_TIME",
            SemihostOp::System => "SYS_SYSTEM",
            SemihostOp::Errno => "SYS_ERRNO",
            SemihostOp::GetCmdline => "SYS_GET_CMDLINE",
            SemihostOp::HeapInfo => "SYS_HEAPINFO",
            SemihostOp::EnterSvc => "SYS_ENTER_SVC",
            SemihostOp::Exit => "SYS_EXIT",
            SemihostOp::ExitExtended => "SYS_EXIT_EXTENDED",
            SemihostOp::Elapsed => "SYS_ELAPSED",
            SemihostOp::TickFreq => "SYS_TICKFREQ",
        }
    }
}

/// Termination reasons understood by the host for `SYS_EXIT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// `ADP_Stopped_ApplicationExit`
    Success,
    /// `ADP_Stopped_RunTimeErrorUnknown`
    Error,
    /// Any other reason code a target chose to report.
    Other(usize),
}

impl ExitReason {
    pub const SUCCESS_CODE: usize = 0x20026;
    pub const ERROR_CODE: usize = 0x20023;

    /// Zero is success, everything else collapses to the generic error.
    pub const fn from_status(status: i32) -> Self {
        if status == 0 {
            ExitReason::Success
        } else {
            ExitReason::Error
        }
    }

    pub const fn from_code(code: usize) -> Self {
        match code {
            Self::SUCCESS_CODE => ExitReason::Success,
            Self::ERROR_CODE => ExitReason::Error,
            other => ExitReason::Other(other),
        }
    }

    pub const fn code(self) -> usize {
        match self {
            ExitReason::Success => Self::SUCCESS_CODE,
            ExitReason::Error => Self::ERROR_CODE,
            ExitReason::Other(code) => code,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, ExitReason::Success)
    }
}

/// `fopen`-style modes, encoded as the host expects them in `SYS_OPEN`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum OpenMode {
    Read = 0,
    ReadBinary = 1,
    ReadWrite = 2,
    ReadWriteBinary = 3,
    Write = 4,
    WriteBinary = 5,
    WriteRead = 6,
    WriteReadBinary = 7,
    Append = 8,
    AppendBinary = 9,
    AppendRead = 10,
    AppendReadBinary = 11,
}

impl OpenMode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => OpenMode::Read,
            1 => OpenMode::ReadBinary,
            2 => OpenMode::ReadWrite,
            3 => OpenMode::ReadWriteBinary,
            4 => OpenMode::Write,
            5 => OpenMode::WriteBinary,
            6 => OpenMode::WriteRead,
            7 => OpenMode::WriteReadBinary,
            8 => OpenMode::Append,
            9 => OpenMode::AppendBinary,
            10 => OpenMode::AppendRead,
            11 => OpenMode::AppendReadBinary,
            _ => return None,
        })
    }

    /// The C mode string, e.g. `"w+b"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::ReadBinary => "rb",
            OpenMode::ReadWrite => "r+",
            OpenMode::ReadWriteBinary => "r+b",
            OpenMode::Write => "w",
            OpenMode::WriteBinary => "wb",
            OpenMode::WriteRead => "w+",
            OpenMode::WriteReadBinary => "w+b",
            OpenMode::Append => "a",
            OpenMode::AppendBinary => "ab",
            OpenMode::AppendRead => "a+",
            OpenMode::AppendReadBinary => "a+b",
        }
    }

    // Codes come in groups of four: r, w, a, each with +/b variants.
    const fn family(self) -> u32 {
        self.code() / 4
    }

    const fn plus(self) -> bool {
        self.code() & 0b10 != 0
    }

    pub const fn readable(self) -> bool {
        self.family() == 0 || self.plus()
    }

    pub const fn writable(self) -> bool {
        self.family() != 0 || self.plus()
    }

    /// `w` modes create the file or truncate it to zero length.
    pub const fn truncates(self) -> bool {
        self.family() == 1
    }

    /// `w` and `a` modes create the file when it does not exist.
    pub const fn creates(self) -> bool {
        self.family() != 0
    }

    pub const fn appends(self) -> bool {
        self.family() == 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_numbers_are_protocol_constants() {
        assert_eq!(SemihostOp::Open.number(), 0x01);
        assert_eq!(SemihostOp::Write.number(), 0x05);
        assert_eq!(SemihostOp::Read.number(), 0x06);
        assert_eq!(SemihostOp::Seek.number(), 0x0A);
        assert_eq!(SemihostOp::Flen.number(), 0x0C);
        assert_eq!(SemihostOp::Exit.number(), 0x18);
        assert_eq!(SemihostOp::ExitExtended.number(), 0x20);
        assert_eq!(SemihostOp::TickFreq.number(), 0x31);
    }

    #[test]
    fn from_number_covers_every_operation() {
        for op in SemihostOp::ALL {
            assert_eq!(SemihostOp::from_number(op.number()), Some(op));
        }
        assert_eq!(SemihostOp::from_number(0x0B), None);
        assert_eq!(SemihostOp::from_number(0x14), None);
    }

    #[test]
    fn exit_status_mapping() {
        assert_eq!(ExitReason::from_status(0).code(), 0x20026);
        assert_eq!(ExitReason::from_status(7).code(), 0x20023);
        assert_eq!(ExitReason::from_status(-1).code(), 0x20023);
        assert_eq!(ExitReason::from_code(0x20026), ExitReason::Success);
        assert_eq!(ExitReason::from_code(0x20024), ExitReason::Other(0x20024));
    }

    #[test]
    fn open_mode_flags() {
        assert!(OpenMode::Read.readable());
        assert!(!OpenMode::Read.writable());
        assert!(OpenMode::ReadWrite.writable());
        assert!(OpenMode::Write.truncates());
        assert!(!OpenMode::Write.readable());
        assert!(OpenMode::WriteRead.readable());
        assert!(OpenMode::AppendBinary.appends());
        assert!(OpenMode::AppendBinary.creates());
        assert!(!OpenMode::AppendRead.truncates());
        assert_eq!(OpenMode::from_code(7), Some(OpenMode::WriteReadBinary));
        assert_eq!(OpenMode::from_code(12), None);
        assert_eq!(OpenMode::AppendReadBinary.as_str(), "a+b");
    }
}
