/// Runtime knobs for a [`SemihostAgent`](crate::SemihostAgent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Copy console output to the host process's stdout/stderr as well as
    /// capturing it.
    pub echo_console: bool,
    /// Bytes served to `SYS_READC` and reads from the stdin handle.
    pub stdin: Vec<u8>,
    /// Value reported by `SYS_TICKFREQ`; `SYS_ELAPSED` counts in these ticks.
    pub tick_frequency: u64,
    /// Longest string `SYS_WRITE0` will scan for its terminator.
    pub write0_limit: usize,
    /// Longest file name `SYS_OPEN`/`SYS_REMOVE` accept.
    pub max_name_len: usize,
}

impl AgentConfig {
    pub const DEFAULT_TICK_FREQUENCY: u64 = 1_000_000;

    pub fn with_stdin(mut self, input: &[u8]) -> Self {
        self.stdin = input.to_vec();
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo_console = echo;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            echo_console: false,
            stdin: Vec::new(),
            tick_frequency: Self::DEFAULT_TICK_FREQUENCY,
            write0_limit: 4096,
            max_name_len: 1024,
        }
    }
}
