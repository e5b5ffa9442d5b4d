use thiserror::Error;

/// Failures reported by the typed semihosting wrappers.
///
/// The raw trap never fails locally; these variants only describe what the
/// host put in `a0`, or a reply that makes no sense for the request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum SemihostError {
    #[error("host returned error sentinel {0}")]
    HostError(isize),

    #[error("transfer incomplete, {remaining} bytes left")]
    Partial { remaining: usize },

    #[error("host returned an out-of-range value {0}")]
    BadReturn(isize),
}

pub type Result<T> = core::result::Result<T, SemihostError>;
