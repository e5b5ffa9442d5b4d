use std::collections::BTreeMap;

use types::OpenMode;

use crate::agent::AgentError;

/// Name that opens the host console instead of a file.
pub const CONSOLE_NAME: &str = ":tt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdin,
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    Console(ConsoleStream),
    Path(String),
}

#[derive(Debug, Clone)]
pub struct OpenFile {
    pub target: FileTarget,
    pub mode: OpenMode,
    pub pos: usize,
}

/// Host-side files and the handles the target holds on them.
///
/// Handles 0, 1 and 2 are the console and are open from the start.
#[derive(Debug)]
pub struct HostFiles {
    files: BTreeMap<String, Vec<u8>>,
    handles: BTreeMap<usize, OpenFile>,
    next_handle: usize,
}

impl Default for HostFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl HostFiles {
    pub fn new() -> Self {
        let mut handles = BTreeMap::new();
        let console = [
            (ConsoleStream::Stdin, OpenMode::Read),
            (ConsoleStream::Stdout, OpenMode::Write),
            (ConsoleStream::Stderr, OpenMode::Append),
        ];
        for (handle, (stream, mode)) in console.into_iter().enumerate() {
            handles.insert(
                handle,
                OpenFile {
                    target: FileTarget::Console(stream),
                    mode,
                    pos: 0,
                },
            );
        }
        Self {
            files: BTreeMap::new(),
            handles,
            next_handle: 3,
        }
    }

    pub fn insert(&mut self, path: &str, contents: &[u8]) {
        self.files.insert(path.to_string(), contents.to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn is_open(&self, handle: usize) -> bool {
        self.handles.contains_key(&handle)
    }

    pub fn open(&mut self, name: &str, mode: OpenMode) -> Result<usize, AgentError> {
        let target = if name == CONSOLE_NAME {
            FileTarget::Console(if mode.appends() {
                ConsoleStream::Stderr
            } else if mode.creates() {
                ConsoleStream::Stdout
            } else {
                ConsoleStream::Stdin
            })
        } else {
            match self.files.get_mut(name) {
                Some(data) if mode.truncates() => data.clear(),
                Some(_) => {}
                None if mode.creates() => {
                    self.files.insert(name.to_string(), Vec::new());
                }
                None => return Err(AgentError::NotFound(name.to_string())),
            }
            FileTarget::Path(name.to_string())
        };

        let handle = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(handle, OpenFile { target, mode, pos: 0 });
        Ok(handle)
    }

    pub fn close(&mut self, handle: usize) -> Result<(), AgentError> {
        self.handles
            .remove(&handle)
            .map(|_| ())
            .ok_or(AgentError::BadHandle(handle))
    }

    pub fn get(&self, handle: usize) -> Result<&OpenFile, AgentError> {
        self.handles.get(&handle).ok_or(AgentError::BadHandle(handle))
    }

    pub fn remove(&mut self, name: &str) -> Result<(), AgentError> {
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AgentError::NotFound(name.to_string()))
    }

    fn file_mut(&mut self, handle: usize) -> Result<(&mut OpenFile, &mut Vec<u8>), AgentError> {
        let open = self
            .handles
            .get_mut(&handle)
            .ok_or(AgentError::BadHandle(handle))?;
        let FileTarget::Path(path) = &open.target else {
            return Err(AgentError::NotSeekable(handle));
        };
        let data = self
            .files
            .get_mut(path)
            .ok_or_else(|| AgentError::NotFound(path.clone()))?;
        Ok((open, data))
    }

    /// Writes at the handle's position (or the end in append modes) and
    /// returns how many bytes were written.
    pub fn write(&mut self, handle: usize, bytes: &[u8]) -> Result<usize, AgentError> {
        let (open, data) = self.file_mut(handle)?;
        if !open.mode.writable() {
            return Err(AgentError::NotWritable(handle));
        }
        if open.mode.appends() {
            open.pos = data.len();
        }
        let end = open
            .pos
            .checked_add(bytes.len())
            .ok_or(AgentError::SeekOutOfRange { pos: open.pos, len: data.len() })?;
        if end > data.len() {
            data.resize(end, 0);
        }
        data[open.pos..end].copy_from_slice(bytes);
        open.pos = end;
        Ok(bytes.len())
    }

    /// Returns up to `len` bytes from the handle's position without moving
    /// it.
    pub fn peek(&mut self, handle: usize, len: usize) -> Result<Vec<u8>, AgentError> {
        let (open, data) = self.file_mut(handle)?;
        if !open.mode.readable() {
            return Err(AgentError::NotReadable(handle));
        }
        let start = open.pos.min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    /// Moves the handle's position forward by `count` bytes, stopping at
    /// the end of the file.
    pub fn advance(&mut self, handle: usize, count: usize) -> Result<(), AgentError> {
        let (open, data) = self.file_mut(handle)?;
        open.pos = open.pos.saturating_add(count).min(data.len());
        Ok(())
    }

    /// Reads up to `len` bytes from the handle's position.
    pub fn read(&mut self, handle: usize, len: usize) -> Result<Vec<u8>, AgentError> {
        let bytes = self.peek(handle, len)?;
        self.advance(handle, bytes.len())?;
        Ok(bytes)
    }

    pub fn seek(&mut self, handle: usize, pos: usize) -> Result<(), AgentError> {
        let (open, data) = self.file_mut(handle)?;
        if pos > data.len() {
            return Err(AgentError::SeekOutOfRange { pos, len: data.len() });
        }
        open.pos = pos;
        Ok(())
    }

    pub fn len(&mut self, handle: usize) -> Result<usize, AgentError> {
        let (_, data) = self.file_mut(handle)?;
        Ok(data.len())
    }
}
