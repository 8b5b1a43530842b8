//! Interactive subprocess channel
//!
//! One channel owns exactly one liquidctl subprocess launched in
//! interactive mode: commands are written one per line to stdin and one
//! JSON response line is read back from stdout. A channel that produces
//! no response line is dead, which is a distinguishable outcome for the
//! caller (it triggers a restart through the registry), not an error of
//! its own.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use liquidbridge_core::{DeviceAddress, LiquidbridgeError, Result};
use tracing::{debug, warn};

/// Grace period between the `exit` command and a forced kill
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Lifecycle state of a channel; "absent" is represented by the registry
/// having no entry for the address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Subprocess spawned, no exchange completed yet
    Starting,
    /// At least one exchange produced a response line
    Ready,
    /// The subprocess exited or stopped producing output
    Dead,
}

/// Stdout remainder and stderr captured from a dead channel
#[derive(Debug, Default, Clone)]
pub struct ChannelDiagnostics {
    pub stdout: String,
    pub stderr: String,
}

/// One line-protocol session with a subprocess.
///
/// This trait is the seam for testing the registry and backend without
/// spawning real processes.
pub trait Channel {
    /// Write one command line, block reading one response line.
    ///
    /// `Ok(None)` means the subprocess produced no line (crashed or wrote
    /// nothing); the channel is dead afterwards. No retry happens here;
    /// restart policy belongs to the caller.
    fn exchange(&mut self, command: &str) -> Result<Option<String>>;

    /// Whether the subprocess is still running
    fn is_alive(&mut self) -> bool;

    /// Graceful shutdown: send `exit`, wait [`SHUTDOWN_GRACE`], then kill.
    /// The channel is dead afterwards even if the process ignored `exit`.
    fn shutdown(&mut self);

    /// Collect remaining stdout and stderr for a fatal diagnostic.
    /// Terminates the subprocess if it is somehow still alive.
    fn drain_output(&mut self) -> ChannelDiagnostics;

    /// Current lifecycle state
    fn state(&self) -> ChannelState;
}

/// Opens channels for device addresses.
///
/// The production implementation spawns liquidctl; tests substitute a
/// launcher yielding scripted channels.
pub trait Launcher {
    type Chan: Channel;

    fn open(&self, address: &DeviceAddress) -> Result<Self::Chan>;
}

/// Real channel over a liquidctl subprocess with piped standard streams
pub struct ProcessChannel {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: Option<ChildStderr>,
    state: ChannelState,
}

impl ProcessChannel {
    /// Spawn the given command with all three standard streams piped.
    ///
    /// Exposed so tests can run a channel over an arbitrary command.
    pub fn spawn(mut command: Command) -> Result<Self> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Spawning interactive session: {:?}", command);
        let mut child = command.spawn()?;

        // Pipes are always present with Stdio::piped
        let stdin = child.stdin.take().ok_or_else(|| {
            LiquidbridgeError::Io(std::io::Error::other("child stdin not captured"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            LiquidbridgeError::Io(std::io::Error::other("child stdout not captured"))
        })?;
        let stderr = child.stderr.take();

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr,
            state: ChannelState::Starting,
        })
    }

    fn kill_if_alive(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

impl Channel for ProcessChannel {
    fn exchange(&mut self, command: &str) -> Result<Option<String>> {
        if self.state == ChannelState::Dead {
            return Ok(None);
        }

        debug!("TX: {}", command);
        match writeln!(self.stdin, "{}", command).and_then(|_| self.stdin.flush()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // Subprocess went away; no line will be produced
                self.state = ChannelState::Dead;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let mut line = String::new();
        let read = self.stdout.read_line(&mut line)?;
        if read == 0 {
            warn!("Interactive session produced no output line");
            self.state = ChannelState::Dead;
            return Ok(None);
        }

        self.state = ChannelState::Ready;
        let line = line.trim_end().to_string();
        debug!("RX: {}", line);
        Ok(Some(line))
    }

    fn is_alive(&mut self) -> bool {
        self.state != ChannelState::Dead && matches!(self.child.try_wait(), Ok(None))
    }

    fn shutdown(&mut self) {
        // The tool terminates on `exit` without a guaranteed response line
        let _ = writeln!(self.stdin, "exit").and_then(|_| self.stdin.flush());

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                _ => {
                    warn!("Interactive session ignored exit, killing it");
                    self.kill_if_alive();
                    break;
                }
            }
        }
        self.state = ChannelState::Dead;
    }

    fn drain_output(&mut self) -> ChannelDiagnostics {
        self.kill_if_alive();
        self.state = ChannelState::Dead;

        let mut diagnostics = ChannelDiagnostics::default();
        let _ = self.stdout.read_to_string(&mut diagnostics.stdout);
        if let Some(mut stderr) = self.stderr.take() {
            let _ = stderr.read_to_string(&mut diagnostics.stderr);
        }
        diagnostics
    }

    fn state(&self) -> ChannelState {
        self.state
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.kill_if_alive();
    }
}

/// Launches liquidctl interactive sessions
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    exe: PathBuf,
}

impl ProcessLauncher {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    pub fn exe(&self) -> &std::path::Path {
        &self.exe
    }
}

impl Launcher for ProcessLauncher {
    type Chan = ProcessChannel;

    /// Launch `<tool> --json --usb-port <locator> interactive` or
    /// `<tool> --json --address <address> interactive` depending on the
    /// address transport. `--json` keeps every response machine-readable.
    fn open(&self, address: &DeviceAddress) -> Result<ProcessChannel> {
        let mut command = Command::new(&self.exe);
        command
            .arg("--json")
            .args(address.interactive_args())
            .arg("interactive");
        ProcessChannel::spawn(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> ProcessChannel {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        ProcessChannel::spawn(command).unwrap()
    }

    #[test]
    fn test_exchange_reads_one_line() {
        let mut channel = shell(r#"read line; echo "{\"status\":\"success\",\"data\":[]}""#);
        assert_eq!(channel.state(), ChannelState::Starting);

        let line = channel.exchange("status").unwrap();
        assert_eq!(line.as_deref(), Some(r#"{"status":"success","data":[]}"#));
        assert_eq!(channel.state(), ChannelState::Ready);
    }

    #[test]
    fn test_exchange_on_exited_process_is_dead() {
        let mut channel = shell("exit 0");
        let line = channel.exchange("status").unwrap();
        assert_eq!(line, None);
        assert_eq!(channel.state(), ChannelState::Dead);
    }

    #[test]
    fn test_dead_channel_stays_dead() {
        let mut channel = shell("exit 0");
        assert_eq!(channel.exchange("status").unwrap(), None);
        // Subsequent exchanges short-circuit without touching the process
        assert_eq!(channel.exchange("status").unwrap(), None);
    }

    #[test]
    fn test_drain_output_captures_stderr() {
        let mut channel = shell("echo 'device exploded' >&2; exit 1");
        assert_eq!(channel.exchange("status").unwrap(), None);

        let diagnostics = channel.drain_output();
        assert!(diagnostics.stderr.contains("device exploded"));
    }

    #[test]
    fn test_drain_output_captures_remaining_stdout() {
        // Writes a partial line (no newline follows the first one read)
        let mut channel = shell("read line; echo first; echo leftover; exit 0");
        assert_eq!(channel.exchange("status").unwrap().as_deref(), Some("first"));

        let diagnostics = channel.drain_output();
        assert!(diagnostics.stdout.contains("leftover"));
    }

    #[test]
    fn test_shutdown_graceful_exit() {
        let mut channel = shell("read line; exit 0");
        assert!(channel.is_alive());

        channel.shutdown();
        assert_eq!(channel.state(), ChannelState::Dead);
        assert!(!channel.is_alive());
    }

    #[test]
    fn test_shutdown_kills_unresponsive_process() {
        // Ignores the exit command and sleeps well past the grace period
        let mut channel = shell("read line; sleep 30");
        let started = Instant::now();
        channel.shutdown();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(channel.state(), ChannelState::Dead);
    }

    #[test]
    fn test_launcher_arguments_usb() {
        let address = DeviceAddress::parse("usb:1:4").unwrap();
        assert_eq!(address.interactive_args(), vec!["--usb-port", "1:4"]);
    }

    #[test]
    fn test_spawn_missing_executable_fails() {
        let launcher = ProcessLauncher::new("/nonexistent/liquidctl");
        let address = DeviceAddress::parse("/dev/hidraw0").unwrap();
        assert!(launcher.open(&address).is_err());
    }
}
