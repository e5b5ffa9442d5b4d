use semihost::{ExitReason, HostTrap, Semihost};

/// Asks the host to end the program: status 0 reports success, anything
/// else a generic error.
///
/// Spins forever if the host resumes the target anyway.
pub fn platform_exit<T: HostTrap>(host: &mut Semihost<T>, status: i32) -> ! {
    host.exit(ExitReason::from_status(status));
    loop {
        core::hint::spin_loop();
    }
}
