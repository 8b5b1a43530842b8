//! One-shot invocation path with bounded auto-recovery
//!
//! Global commands (initialize-all, multi-device status dump, the
//! per-device fan fallback) run a fresh liquidctl process to completion
//! instead of going through a persistent channel. The tool can wedge
//! itself into a state that only a fresh top-level initialization clears,
//! so a failed invocation is retried exactly once after re-initializing;
//! a second consecutive failure is fatal.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use liquidbridge_core::{LiquidbridgeError, Result};
use tracing::{debug, warn};

/// Arguments for the global initialization command
pub const INITIALIZE_ARGS: [&str; 3] = ["--json", "initialize", "all"];

/// Arguments for the global status dump
pub const STATUS_ARGS: [&str; 2] = ["--json", "status"];

/// Outcome of one completed subprocess run
#[derive(Debug, Clone)]
pub struct Invocation {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command to completion with captured output.
///
/// Seam for testing the circuit breaker with scripted exit codes.
pub trait Runner {
    fn run(&self, args: &[String]) -> Result<Invocation>;
}

/// Real runner over `std::process::Command`
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    exe: PathBuf,
}

impl ProcessRunner {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }
}

impl Runner for ProcessRunner {
    fn run(&self, args: &[String]) -> Result<Invocation> {
        debug!("Running {:?} {:?}", self.exe, args);
        let output = Command::new(&self.exe).args(args).output()?;

        Ok(Invocation {
            // Termination by signal has no exit code
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Circuit-breaker state: either the last call succeeded (or the retry
/// healed it), or a recovery attempt is already in flight / has failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    Normal,
    RetriedOnce,
}

/// One-shot invocation path with the single initialize-and-retry policy.
///
/// The state is scoped to this instance; a backend owns exactly one, so
/// the consecutive-failure flag is shared by every one-shot call site of
/// that backend. The mutex keeps racing calls from observing a torn
/// state and makes the initialize-and-retry sequence atomic.
pub struct OneShot<R: Runner> {
    runner: R,
    state: Mutex<RetryState>,
}

impl<R: Runner> OneShot<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            state: Mutex::new(RetryState::Normal),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn args_of(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    /// Run a command; on non-zero exit, re-initialize once and retry the
    /// original arguments exactly once. A second consecutive failure is
    /// fatal with the captured stderr and exit code. Any success resets
    /// the failure flag.
    pub fn run(&self, args: &[String]) -> Result<Invocation> {
        let mut state = self.state.lock().expect("one-shot state poisoned");

        let first = self.runner.run(args)?;
        if first.success() {
            *state = RetryState::Normal;
            return Ok(first);
        }

        // Exit code 1 is the recoverable case; other non-zero codes get
        // the same single retry but stay distinguishable in diagnostics.
        if *state == RetryState::RetriedOnce {
            return Err(LiquidbridgeError::Invocation {
                code: first.exit_code,
                stderr: first.stderr,
            });
        }
        *state = RetryState::RetriedOnce;

        warn!(
            "liquidctl exited with code {}, re-initializing and retrying once",
            first.exit_code
        );
        let init = self.runner.run(&Self::args_of(&INITIALIZE_ARGS))?;
        if !init.success() {
            return Err(LiquidbridgeError::Invocation {
                code: init.exit_code,
                stderr: init.stderr,
            });
        }

        let retry = self.runner.run(args)?;
        if retry.success() {
            *state = RetryState::Normal;
            Ok(retry)
        } else {
            Err(LiquidbridgeError::Invocation {
                code: retry.exit_code,
                stderr: retry.stderr,
            })
        }
    }

    /// Run the global initialization command directly, bypassing the
    /// retry policy (it *is* the recovery action).
    pub fn initialize(&self) -> Result<()> {
        let init = self.runner.run(&Self::args_of(&INITIALIZE_ARGS))?;
        if init.success() {
            *self.state.lock().expect("one-shot state poisoned") = RetryState::Normal;
            Ok(())
        } else {
            Err(LiquidbridgeError::Invocation {
                code: init.exit_code,
                stderr: init.stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Runner handing out scripted exit codes, recording every call
    struct MockRunner {
        exit_codes: Mutex<VecDeque<i32>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl MockRunner {
        fn new(exit_codes: &[i32]) -> Self {
            Self {
                exit_codes: Mutex::new(exit_codes.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn initialize_calls(&self) -> usize {
            self.calls()
                .iter()
                .filter(|args| args.iter().any(|a| a == "initialize"))
                .count()
        }
    }

    impl Runner for MockRunner {
        fn run(&self, args: &[String]) -> Result<Invocation> {
            self.calls.lock().unwrap().push(args.to_vec());
            let code = self.exit_codes.lock().unwrap().pop_front().unwrap_or(0);
            Ok(Invocation {
                exit_code: code,
                stdout: String::new(),
                stderr: format!("stderr for exit {}", code),
            })
        }
    }

    fn status_args() -> Vec<String> {
        STATUS_ARGS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_success_passes_through() {
        let oneshot = OneShot::new(MockRunner::new(&[0]));
        let invocation = oneshot.run(&status_args()).unwrap();

        assert!(invocation.success());
        assert_eq!(oneshot.runner.initialize_calls(), 0);
    }

    #[test]
    fn test_failure_then_success_initializes_once() {
        // status fails, initialize succeeds, retried status succeeds
        let oneshot = OneShot::new(MockRunner::new(&[1, 0, 0]));
        let invocation = oneshot.run(&status_args()).unwrap();

        assert!(invocation.success());
        assert_eq!(oneshot.runner.initialize_calls(), 1);
        assert_eq!(*oneshot.state.lock().unwrap(), RetryState::Normal);
    }

    #[test]
    fn test_retry_failure_is_fatal() {
        // status fails, initialize succeeds, retried status fails again
        let oneshot = OneShot::new(MockRunner::new(&[1, 0, 1]));
        let err = oneshot.run(&status_args()).unwrap_err();

        assert!(matches!(
            err,
            LiquidbridgeError::Invocation { code: 1, .. }
        ));
        assert_eq!(oneshot.runner.initialize_calls(), 1);
    }

    #[test]
    fn test_second_consecutive_failure_skips_initialize() {
        // First call: fail, init, retry fails (flag stays tripped).
        // Second call: fails fatally with no further initialize.
        let oneshot = OneShot::new(MockRunner::new(&[1, 0, 1, 1]));

        assert!(oneshot.run(&status_args()).is_err());
        let err = oneshot.run(&status_args()).unwrap_err();

        assert!(matches!(err, LiquidbridgeError::Invocation { .. }));
        assert_eq!(oneshot.runner.initialize_calls(), 1);
        assert_eq!(oneshot.runner.calls().len(), 4);
    }

    #[test]
    fn test_success_resets_failure_flag() {
        // fail, init, retry ok → flag reset; a later failure re-initializes
        let oneshot = OneShot::new(MockRunner::new(&[1, 0, 0, 1, 0, 0]));

        assert!(oneshot.run(&status_args()).is_ok());
        assert!(oneshot.run(&status_args()).is_ok());

        assert_eq!(oneshot.runner.initialize_calls(), 2);
    }

    #[test]
    fn test_nonzero_exit_other_than_one_also_retries() {
        let oneshot = OneShot::new(MockRunner::new(&[2, 0, 0]));
        assert!(oneshot.run(&status_args()).is_ok());
        assert_eq!(oneshot.runner.initialize_calls(), 1);
    }

    #[test]
    fn test_failed_initialize_surfaces_its_stderr() {
        // status fails, then initialize itself fails
        let oneshot = OneShot::new(MockRunner::new(&[1, 3]));
        let err = oneshot.run(&status_args()).unwrap_err();

        match err {
            LiquidbridgeError::Invocation { code, stderr } => {
                assert_eq!(code, 3);
                assert!(stderr.contains("exit 3"));
            }
            other => panic!("Expected Invocation error, got {:?}", other),
        }
    }

    #[test]
    fn test_fatal_error_carries_stderr_and_code() {
        let oneshot = OneShot::new(MockRunner::new(&[1, 0, 2]));
        let err = oneshot.run(&status_args()).unwrap_err();

        match err {
            LiquidbridgeError::Invocation { code, stderr } => {
                assert_eq!(code, 2);
                assert!(stderr.contains("exit 2"));
            }
            other => panic!("Expected Invocation error, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_initialize_resets_flag() {
        let oneshot = OneShot::new(MockRunner::new(&[1, 0, 1, 0, 1, 0, 0]));

        // Trip the flag: fail, init ok, retry fails
        assert!(oneshot.run(&status_args()).is_err());
        // Explicit initialize heals the path
        oneshot.initialize().unwrap();
        // Next failure is allowed its own recovery again
        assert!(oneshot.run(&status_args()).is_ok());
    }
}
