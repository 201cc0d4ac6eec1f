use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::KernelConfig;
use crate::error::ExecutionError;
use crate::mutants::ExecutionResult;
use crate::scratch::Scratch;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs one test program against one concrete source file.
///
/// Every invocation is a fresh interpreter in its own process group whose
/// module search path starts at the directory of the file under test, so
/// `import <module>` binds to that exact file. Bytecode caching is off.
#[derive(Debug, Clone)]
pub struct Harness {
    interpreter: String,
    timeout: Duration,
}

impl Harness {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Harness {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn from_config(config: &KernelConfig) -> Self {
        Self::new(config.interpreter.clone(), config.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Persist a test program at its per-test scratch path.
    pub fn stage_test(
        &self,
        scratch: &Scratch,
        test_id: &str,
        program: &str,
    ) -> Result<PathBuf, ExecutionError> {
        let path = scratch.test_path(test_id);
        scratch
            .write(&path, program)
            .map_err(|source| ExecutionError::Stage {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Stage `program` and run it against `source_file`.
    pub fn run_test(
        &self,
        scratch: &Scratch,
        test_id: &str,
        program: &str,
        source_file: &Path,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult, ExecutionError> {
        let script = self.stage_test(scratch, test_id, program)?;
        self.execute(&script, source_file, cancel)
    }

    /// Run an already staged script. Exit status 0 is a pass; running past
    /// the timeout is a failure flagged `timed_out`.
    pub fn execute(
        &self,
        script: &Path,
        source_file: &Path,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult, ExecutionError> {
        let module_dir = source_file.parent().unwrap_or(Path::new("."));
        let mut stderr_log = tempfile::tempfile().map_err(ExecutionError::Capture)?;
        let stderr = stderr_log.try_clone().map_err(ExecutionError::Capture)?;
        let start = Instant::now();

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-B")
            .arg(script)
            .current_dir(module_dir)
            .env("PYTHONPATH", python_path(module_dir))
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr));
        own_process_group(&mut command);
        let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
            program: self.interpreter.clone(),
            source,
        })?;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    // anything the test left running in the background goes too
                    kill_group(&child);
                    let duration = start.elapsed();
                    debug!(
                        script = %script.display(),
                        target = %source_file.display(),
                        code = ?status.code(),
                        ms = duration.as_millis() as u64,
                        stderr = %last_line(&mut stderr_log),
                        "test finished"
                    );
                    return Ok(ExecutionResult {
                        passed: status.success(),
                        timed_out: false,
                        duration,
                    });
                }
                Ok(None) => {
                    if cancel.is_cancelled() {
                        terminate(&mut child);
                        return Err(ExecutionError::Cancelled);
                    }
                    if start.elapsed() >= self.timeout {
                        terminate(&mut child);
                        debug!(
                            script = %script.display(),
                            target = %source_file.display(),
                            "test timed out"
                        );
                        return Ok(ExecutionResult {
                            passed: false,
                            timed_out: true,
                            duration: start.elapsed(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    terminate(&mut child);
                    return Err(ExecutionError::Wait(e));
                }
            }
        }
    }
}

fn terminate(child: &mut Child) {
    kill_group(child);
    if let Err(e) = child.kill() {
        warn!(error = %e, "failed to kill child process");
    }
    let _ = child.wait();
}

#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// SIGKILL the child's process group. The group outlives a reaped leader
/// while any member is still running.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn last_line(log: &mut File) -> String {
    let mut buf = String::new();
    if log.seek(SeekFrom::Start(0)).is_err() || log.read_to_string(&mut buf).is_err() {
        return String::new();
    }
    buf.lines().last().unwrap_or_default().to_string()
}

/// The module directory first, then whatever PYTHONPATH was inherited.
fn python_path(module_dir: &Path) -> OsString {
    let mut paths = vec![module_dir.to_path_buf()];
    if let Some(existing) = std::env::var_os("PYTHONPATH") {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths).unwrap_or_else(|_| module_dir.as_os_str().to_os_string())
}
