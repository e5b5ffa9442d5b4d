use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("access of {len} bytes at 0x{addr:08x} is outside target memory")]
    OutOfBounds { addr: usize, len: usize },

    #[error("null pointer access")]
    Null,

    #[error("no NUL terminator within {limit} bytes of 0x{addr:08x}")]
    Unterminated { addr: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Whatever the host agent can see of the target's address space.
///
/// Words are little-endian and `word_size()` bytes wide; argument blocks are
/// arrays of such words.
pub trait TargetMemory {
    fn word_size(&self) -> usize;

    fn read_bytes(&self, addr: usize, buf: &mut [u8]) -> Result<()>;

    fn write_bytes(&mut self, addr: usize, data: &[u8]) -> Result<()>;

    /// Fails unless `len` bytes at `addr` are addressable.
    fn check_range(&self, addr: usize, len: usize) -> Result<()>;

    fn read_vec(&self, addr: usize, len: usize) -> Result<Vec<u8>> {
        self.check_range(addr, len)?;
        let mut buf = vec![0u8; len];
        self.read_bytes(addr, &mut buf)?;
        Ok(buf)
    }

    fn read_word(&self, addr: usize) -> Result<usize> {
        let size = self.word_size();
        let mut raw = [0u8; 8];
        self.read_bytes(addr, &mut raw[..size])?;
        Ok(u64::from_le_bytes(raw) as usize)
    }

    fn write_word(&mut self, addr: usize, value: usize) -> Result<()> {
        let size = self.word_size();
        let raw = (value as u64).to_le_bytes();
        self.write_bytes(addr, &raw[..size])
    }

    /// Reads `N` consecutive words starting at `addr`.
    fn read_words<const N: usize>(&self, addr: usize) -> Result<[usize; N]>
    where
        Self: Sized,
    {
        let mut words = [0usize; N];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.read_word(addr + i * self.word_size())?;
        }
        Ok(words)
    }

    /// Reads a NUL-terminated string, terminator excluded.
    fn read_cstr(&self, addr: usize, limit: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while out.len() < limit {
            self.read_bytes(addr + out.len(), &mut byte)?;
            if byte[0] == 0 {
                return Ok(out);
            }
            out.push(byte[0]);
        }
        Err(MemoryError::Unterminated { addr, limit })
    }
}

/// A flat simulated RV32 address space starting at `base`.
pub struct Memory {
    mem: Vec<u8>,
    base: usize,
    word_size: usize,
    next_heap: usize,
}

/// Offset from the bottom of memory where `alloc` starts handing out space.
pub const HEAP_START_OFFSET: usize = 0x1000;

impl Memory {
    pub fn new(memory_size: usize) -> Self {
        Self::new_with_base(memory_size, 0)
    }

    pub fn new_with_base(memory_size: usize, base: usize) -> Self {
        Self {
            mem: vec![0u8; memory_size],
            base,
            word_size: 4,
            next_heap: base + HEAP_START_OFFSET.min(memory_size),
        }
    }

    /// Switches argument-block decoding to 64-bit words (RV64 targets).
    pub fn with_word_size(mut self, word_size: usize) -> Self {
        assert!(word_size == 4 || word_size == 8, "unsupported word size {word_size}");
        self.word_size = word_size;
        self
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn size(&self) -> usize {
        self.mem.len()
    }

    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    fn range(&self, addr: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let oob = MemoryError::OutOfBounds { addr, len };
        let start = addr.checked_sub(self.base).ok_or(oob.clone())?;
        let end = start.checked_add(len).ok_or(oob.clone())?;
        if end > self.mem.len() {
            return Err(oob);
        }
        Ok(start..end)
    }

    pub fn load_u32(&self, addr: usize) -> Result<u32> {
        let range = self.range(addr, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.mem[range]);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn store_u32(&mut self, addr: usize, val: u32) -> Result<()> {
        let range = self.range(addr, 4)?;
        self.mem[range].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }

    /// Lays out instruction words starting at `addr`.
    pub fn write_code(&mut self, addr: usize, words: &[u32]) -> Result<()> {
        for (i, word) in words.iter().enumerate() {
            self.store_u32(addr + i * 4, *word)?;
        }
        Ok(())
    }

    /// Bump-allocates `data` into memory, 8-byte aligned, and returns its
    /// target address.
    pub fn alloc(&mut self, data: &[u8]) -> Result<usize> {
        let addr = (self.next_heap + 7) & !7;
        self.write_bytes(addr, data)?;
        self.next_heap = addr + data.len();
        Ok(addr)
    }

    /// Allocates an argument block from `words` using the target word size.
    pub fn alloc_words(&mut self, words: &[usize]) -> Result<usize> {
        let mut raw = Vec::with_capacity(words.len() * self.word_size);
        for word in words {
            raw.extend_from_slice(&(*word as u64).to_le_bytes()[..self.word_size]);
        }
        self.alloc(&raw)
    }
}

impl TargetMemory for Memory {
    fn word_size(&self) -> usize {
        self.word_size
    }

    fn check_range(&self, addr: usize, len: usize) -> Result<()> {
        self.range(addr, len).map(|_| ())
    }

    fn read_bytes(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.mem[range]);
        Ok(())
    }

    fn write_bytes(&mut self, addr: usize, data: &[u8]) -> Result<()> {
        let range = self.range(addr, data.len())?;
        self.mem[range].copy_from_slice(data);
        Ok(())
    }
}

/// The memory of the current process, addressed by raw pointers.
///
/// Lets the agent service requests issued by target code compiled for the
/// host, where argument blocks are ordinary stack arrays.
#[derive(Debug)]
pub struct NativeMemory {
    _private: (),
}

impl NativeMemory {
    /// # Safety
    /// Every non-null address the agent is asked to touch through this view
    /// must be valid for the access, which holds when requests come from the
    /// `semihost` wrappers in this process.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl TargetMemory for NativeMemory {
    fn word_size(&self) -> usize {
        std::mem::size_of::<usize>()
    }

    fn check_range(&self, addr: usize, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        if addr == 0 {
            return Err(MemoryError::Null);
        }
        if len > isize::MAX as usize || addr.checked_add(len).is_none() {
            return Err(MemoryError::OutOfBounds { addr, len });
        }
        Ok(())
    }

    fn read_bytes(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.check_range(addr, buf.len())?;
        // SAFETY: guaranteed by the contract of `NativeMemory::new`.
        unsafe {
            std::ptr::copy_nonoverlapping(addr as *const u8, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    fn write_bytes(&mut self, addr: usize, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.check_range(addr, data.len())?;
        // SAFETY: guaranteed by the contract of `NativeMemory::new`.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len());
        }
        Ok(())
    }
}
