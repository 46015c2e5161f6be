// Per-execution host state for the script engine thread.
//
// The engine is synchronous and runs one script per blocking thread at a
// time, so a thread local gives every execution its own private output
// buffers and deadline. Builtins reach this state through the free functions
// below; nothing here is shared across concurrent executions.

use std::cell::RefCell;
use std::time::{Duration, Instant};

struct HostState {
    deadline: Instant,
    stdout: String,
    stderr: String,
}

thread_local! {
    static HOST: RefCell<Option<HostState>> = const { RefCell::new(None) };
}

/// Installs host state for the duration of one script run and hands the
/// captured output back on `finish`. Dropping without `finish` discards it.
pub struct HostGuard {
    _priv: (),
}

impl HostGuard {
    pub fn install(deadline: Instant) -> Self {
        HOST.with(|host| {
            *host.borrow_mut() = Some(HostState {
                deadline,
                stdout: String::new(),
                stderr: String::new(),
            });
        });
        Self { _priv: () }
    }

    /// Tear down and return `(stdout, stderr)`.
    pub fn finish(self) -> (String, String) {
        HOST.with(|host| match host.borrow_mut().take() {
            Some(state) => (state.stdout, state.stderr),
            None => (String::new(), String::new()),
        })
    }
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        HOST.with(|host| {
            host.borrow_mut().take();
        });
    }
}

pub fn append_stdout(line: &str) {
    HOST.with(|host| {
        if let Some(state) = host.borrow_mut().as_mut() {
            state.stdout.push_str(line);
            state.stdout.push('\n');
        }
    });
}

pub fn append_stderr(line: &str) {
    HOST.with(|host| {
        if let Some(state) = host.borrow_mut().as_mut() {
            state.stderr.push_str(line);
            state.stderr.push('\n');
        }
    });
}

/// Time left before the execution deadline. `None` when no state is
/// installed (builtins called outside a run, e.g. from engine tests).
pub fn remaining_time() -> Option<Duration> {
    HOST.with(|host| {
        host.borrow()
            .as_ref()
            .map(|state| state.deadline.saturating_duration_since(Instant::now()))
    })
}

/// True once the execution deadline has passed.
pub fn deadline_exceeded() -> bool {
    matches!(remaining_time(), Some(remaining) if remaining.is_zero())
}
