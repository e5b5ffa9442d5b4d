use types::{HostTrap, SemihostOp};

use crate::agent::{ExitStatus, Request, SemihostAgent};
use crate::config::AgentConfig;
use crate::files::HostFiles;
use crate::memory::NativeMemory;

/// Panic payload raised when target code exits under a [`NativeHost`].
///
/// Real hardware never comes back from `SYS_EXIT`; unwinding is the closest
/// a test process can get. Catch it with `std::panic::catch_unwind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetExit(pub ExitStatus);

/// A [`HostTrap`] that services requests in-process.
///
/// Argument blocks are read straight out of the caller's memory, so target
/// crates can be exercised on the development machine exactly as they would
/// talk to a debugger.
pub struct NativeHost {
    agent: SemihostAgent<NativeMemory>,
    requests: Vec<Request>,
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost {
    pub fn new() -> Self {
        Self::with_config(AgentConfig::default())
    }

    pub fn with_config(config: AgentConfig) -> Self {
        // SAFETY: the agent only dereferences addresses handed to it through
        // `HostTrap::trap`, whose contract makes them valid.
        let memory = unsafe { NativeMemory::new() };
        Self {
            agent: SemihostAgent::with_config(memory, config),
            requests: Vec::new(),
        }
    }

    /// Every request seen so far, decoded from its argument block.
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn stdout(&self) -> &[u8] {
        self.agent.stdout()
    }

    pub fn stderr(&self) -> &[u8] {
        self.agent.stderr()
    }

    pub fn push_stdin(&mut self, bytes: &[u8]) {
        self.agent.push_stdin(bytes);
    }

    pub fn files(&self) -> &HostFiles {
        self.agent.files()
    }

    pub fn files_mut(&mut self) -> &mut HostFiles {
        self.agent.files_mut()
    }

    pub fn last_errno(&self) -> isize {
        self.agent.last_errno()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.agent.exit_status()
    }
}

impl HostTrap for NativeHost {
    unsafe fn trap(&mut self, op: SemihostOp, arg: usize) -> isize {
        if let Ok(request) = Request::decode(op, arg, self.agent.memory()) {
            self.requests.push(request);
        }
        let result = self.agent.handle(op.number() as usize, arg);
        if let Some(status) = self.agent.exit_status() {
            std::panic::panic_any(TargetExit(status));
        }
        result
    }
}
