use crate::types::CommandResult;
use std::{
    io::Read,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const TIMEOUT_EXIT_CODE: i32 = 124;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs commands through the platform shell.
#[derive(Debug, Clone)]
pub struct Executor {
    timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Never fails: spawn errors map to exit code 1, timeouts to 124.
    pub fn execute(&self, command: &str) -> CommandResult {
        let child = match shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return failure(format!("failed to start command: {}", e)),
        };
        self.wait(child)
    }

    fn wait(&self, mut child: Child) -> CommandResult {
        // Drain both pipes concurrently so a chatty command cannot fill a
        // pipe buffer and stall before we see it exit.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        tracing::debug!("command timed out after {:?}", self.timeout);
                        // Readers may stay blocked on pipes inherited by
                        // grandchildren, so they are left detached.
                        return CommandResult {
                            returncode: TIMEOUT_EXIT_CODE,
                            stdout: String::new(),
                            stderr: format!(
                                "command timed out after {} seconds",
                                self.timeout.as_secs_f64()
                            ),
                        };
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    return failure(format!("failed to wait for command: {}", e));
                }
            }
        };

        CommandResult {
            returncode: status.code().unwrap_or(-1),
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        }
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn failure(message: String) -> CommandResult {
    CommandResult {
        returncode: 1,
        stdout: String::new(),
        stderr: message,
    }
}
