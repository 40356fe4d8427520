//! Running external programs.
//!
//! Everything the harness does outside of HTTP goes through [`Cmd`]: the
//! flightctl CLI, kubectl and oc, virsh, ssh, git, iptables. Output is always
//! captured; [`Cmd::output`] reports a non-zero exit as data while
//! [`Cmd::run`] turns it into [`CommandError::Failed`].

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::debug;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process died from a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

/// Errors from running an external program.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status:?}: {}", output.stderr.trim())]
    Failed {
        command: String,
        status: Option<i32>,
        output: CommandOutput,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("io error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    /// Output of the failed process, if it ran to completion.
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            Self::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Builder for one external command.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdin: Option<Vec<u8>>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
    new_process_group: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
            cwd: None,
            timeout: None,
            new_process_group: false,
        }
    }

    /// `bash -c <script>`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("bash").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Start the child as the leader of a new process group, so the whole
    /// tree can be signalled at once.
    pub fn new_process_group(mut self) -> Self {
        self.new_process_group = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Program and arguments joined by spaces, for logs and evidence files.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut std_command = std::process::Command::new(&self.program);
        if self.new_process_group {
            std_command.process_group(0);
        }

        let mut command = Command::from(std_command);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        command
    }

    /// Start the process without waiting for it. Stdin is not fed; the
    /// caller picks where stdout and stderr go.
    pub fn spawn(
        &self,
        stdout: impl Into<Stdio>,
        stderr: impl Into<Stdio>,
    ) -> Result<Child, CommandError> {
        let mut command = self.command();
        command.stdin(Stdio::null()).stdout(stdout).stderr(stderr);

        debug!(command = %self.display(), "spawning command");
        command.spawn().map_err(|source| CommandError::Spawn {
            program: self.program.clone(),
            source,
        })
    }

    /// Run to completion and capture output regardless of the exit status.
    pub async fn output(&self) -> Result<CommandOutput, CommandError> {
        let mut command = self.command();
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        debug!(command = %self.display(), "running command");
        let mut child = command.spawn().map_err(|source| CommandError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Feed stdin concurrently so a child that fills its stdout pipe
        // before reading all input cannot deadlock us.
        if let (Some(input), Some(mut pipe)) = (self.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                let _ = pipe.write_all(&input).await;
            });
        }

        let wait = child.wait_with_output();
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait).await.map_err(|_| {
                CommandError::Timeout {
                    command: self.display(),
                    timeout,
                }
            })?,
            None => wait.await,
        };
        let output = result.map_err(|source| CommandError::Io {
            command: self.display(),
            source,
        })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run to completion; a non-zero exit is an error.
    pub async fn run(&self) -> Result<CommandOutput, CommandError> {
        let output = self.output().await?;
        if output.success() {
            Ok(output)
        } else {
            Err(CommandError::Failed {
                command: self.display(),
                status: output.status,
                output,
            })
        }
    }

    /// Blocking [`Cmd::run`] for contexts without an async runtime, such as
    /// `Drop`. Stdin and the timeout are ignored.
    pub fn run_blocking(&self) -> Result<CommandOutput, CommandError> {
        let mut command = std::process::Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null());
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        debug!(command = %self.display(), "running command (blocking)");
        let output = command.output().map_err(|source| CommandError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let output = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if output.success() {
            Ok(output)
        } else {
            Err(CommandError::Failed {
                command: self.display(),
                status: output.status,
                output,
            })
        }
    }
}

/// Run `cmd`, failing on a non-zero exit.
pub async fn run(cmd: &Cmd) -> Result<CommandOutput, CommandError> {
    cmd.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let out = Cmd::shell("echo out; echo err >&2").run().await.unwrap();
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert_eq!(out.combined(), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let out = Cmd::new("cat").stdin("hello").run().await.unwrap();
        assert_eq!(out.stdout, "hello");
    }

    #[tokio::test]
    async fn test_env_is_set() {
        let out = Cmd::shell("echo $HARNESS_TEST_VAR")
            .env("HARNESS_TEST_VAR", "value")
            .run()
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "value");
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let cmd = Cmd::shell("echo boom >&2; exit 3");

        let out = cmd.output().await.unwrap();
        assert_eq!(out.status, Some(3));
        assert!(!out.success());

        let err = cmd.run().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(err.output().unwrap().status, Some(3));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = Cmd::new("/nonexistent/fctl-binary").output().await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = Cmd::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100))
            .output()
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_spawn_in_process_group() {
        let mut child = Cmd::new("sleep")
            .arg("5")
            .new_process_group()
            .spawn(Stdio::null(), Stdio::null())
            .unwrap();
        let pid = child.id().unwrap() as i32;

        let pgid = nix::unistd::getpgid(Some(nix::unistd::Pid::from_raw(pid))).unwrap();
        assert_eq!(pgid.as_raw(), pid);

        child.kill().await.unwrap();
    }

    #[test]
    fn test_run_blocking() {
        let out = Cmd::shell("echo $V").env("V", "sync").run_blocking().unwrap();
        assert_eq!(out.stdout, "sync\n");
        let err = Cmd::shell("exit 2").run_blocking().unwrap_err();
        assert_eq!(err.output().unwrap().status, Some(2));
    }

    #[test]
    fn test_display() {
        let cmd = Cmd::new("kubectl").args(["get", "pods", "-n", "flightctl"]);
        assert_eq!(cmd.display(), "kubectl get pods -n flightctl");
    }
}
