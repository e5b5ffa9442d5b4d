use std::fmt::Write as _;
use std::panic::{AssertUnwindSafe, catch_unwind};

use minlibc::{Console, StdConsole};
use semihost::{ExitReason, STDOUT};
use vm::{NativeHost, Request, TargetExit};

fn console() -> StdConsole<NativeHost> {
    Console::new(NativeHost::new())
}

fn stdout(console: &mut StdConsole<NativeHost>) -> Vec<u8> {
    console.host_mut().trap_mut().stdout().to_vec()
}

fn writes(console: &mut StdConsole<NativeHost>) -> Vec<usize> {
    console
        .host_mut()
        .trap_mut()
        .requests()
        .iter()
        .filter_map(|request| match request {
            Request::Write { handle, len, .. } => {
                assert_eq!(*handle, STDOUT.raw());
                Some(*len)
            }
            _ => None,
        })
        .collect()
}

fn exit_reason(run: impl FnOnce()) -> ExitReason {
    let payload = catch_unwind(AssertUnwindSafe(run)).unwrap_err();
    let TargetExit(status) = *payload.downcast::<TargetExit>().unwrap();
    status.reason
}

#[test]
fn puts_appends_one_newline() {
    let mut con = console();
    assert_eq!(con.puts(c"hello"), 0);
    assert_eq!(stdout(&mut con), b"hello\n");
    assert_eq!(writes(&mut con), vec![6]);
    assert!(con.buffer().is_empty());
}

#[test]
fn puts_flushes_at_embedded_newlines() {
    let mut con = console();
    con.puts(c"a\nbc");
    assert_eq!(stdout(&mut con), b"a\nbc\n");
    assert_eq!(writes(&mut con), vec![2, 3]);
}

#[test]
fn puts_keeps_c_semantics_for_trailing_newline() {
    let mut con = console();
    con.puts(c"line\n");
    assert_eq!(stdout(&mut con), b"line\n\n");
}

#[test]
fn adjacent_puts_stay_in_order() {
    let mut con = console();
    con.puts(c"first");
    con.puts(c"second");
    assert_eq!(stdout(&mut con), b"first\nsecond\n");
}

#[test]
fn putchar_buffers_until_newline() {
    let mut con = console();
    assert_eq!(con.putchar(i32::from(b'o')), i32::from(b'o'));
    assert_eq!(con.fputc(i32::from(b'k'), STDOUT), 0);
    assert!(stdout(&mut con).is_empty());
    assert_eq!(con.buffer().pending(), b"ok");

    con.putchar(i32::from(b'\n'));
    assert_eq!(stdout(&mut con), b"ok\n");
}

#[test]
fn long_line_is_split_at_capacity() {
    let mut con = console();
    let line = "x".repeat(200);
    write!(con, "{line}").unwrap();
    assert_eq!(writes(&mut con), vec![128]);
    assert_eq!(con.buffer().len(), 72);

    con.flush();
    assert_eq!(writes(&mut con), vec![128, 72]);
    assert_eq!(stdout(&mut con), line.as_bytes());
}

#[test]
fn formatted_output_goes_through_the_buffer() {
    let mut con = console();
    writeln!(con, "{} + {} = {}", 2, 2, 4).unwrap();
    assert_eq!(stdout(&mut con), b"2 + 2 = 4\n");
}

#[test]
fn exit_zero_reports_success() {
    let mut con = console();
    assert_eq!(exit_reason(|| con.exit(0)), ExitReason::Success);
    let last = con.host_mut().trap_mut().requests().last().cloned();
    assert_eq!(last, Some(Request::Exit { reason: 0x20026 }));
}

#[test]
fn exit_nonzero_reports_error() {
    let mut con = console();
    assert_eq!(exit_reason(|| con.exit(7)), ExitReason::Error);
    let last = con.host_mut().trap_mut().requests().last().cloned();
    assert_eq!(last, Some(Request::Exit { reason: 0x20023 }));
}

#[test]
fn abort_is_an_error_exit() {
    let mut con = console();
    assert_eq!(exit_reason(|| con.abort()), ExitReason::Error);
}

#[test]
fn exit_leaves_partial_line_unflushed() {
    let mut con = console();
    con.putchar(i32::from(b'?'));
    exit_reason(|| con.exit(0));
    assert_eq!(
        con.host_mut().trap_mut().requests(),
        &[Request::Exit { reason: ExitReason::SUCCESS_CODE }]
    );
    assert_eq!(con.buffer().pending(), b"?");
}
