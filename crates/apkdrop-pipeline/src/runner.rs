//! External process runner with streamed output

use std::fmt;
use std::io;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, StageError};
use crate::event::StageSink;

/// Program and arguments of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
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
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs a command and forwards its merged stdout and stderr line by line
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Run `spec` to completion.
    ///
    /// Each output line is sent to `sink` without its trailing newline, the
    /// last unterminated line included. Returns once both streams are closed
    /// and the process has exited; a non-zero exit is an error. Dropping the
    /// returned future kills the process.
    pub async fn run(spec: &CommandSpec, sink: &StageSink) -> Result<()> {
        let command_line = spec.to_string();
        info!(command = %command_line, "starting process");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| StageError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| StageError::Pipe {
            command: command_line.clone(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| StageError::Pipe {
            command: command_line.clone(),
            stream: "stderr",
        })?;

        let stdout_task = tokio::spawn(forward_lines(stdout, sink.clone()));
        let stderr_task = tokio::spawn(forward_lines(stderr, sink.clone()));
        let (stdout_result, stderr_result) = tokio::join!(stdout_task, stderr_task);

        let mut line_count = 0;
        for result in [stdout_result, stderr_result] {
            match result.map_err(io::Error::other).and_then(|r| r) {
                Ok(count) => line_count += count,
                Err(source) => {
                    if let Err(e) = child.start_kill() {
                        warn!(command = %command_line, error = %e, "failed to kill process");
                    }
                    return Err(StageError::Stream {
                        command: command_line,
                        source,
                    });
                }
            }
        }

        let status = child.wait().await.map_err(|source| StageError::Stream {
            command: command_line.clone(),
            source,
        })?;
        debug!(command = %command_line, lines = line_count, status = %status, "process exited");

        if status.success() {
            Ok(())
        } else {
            Err(StageError::ExitStatus {
                command: command_line,
                code: status.code(),
            })
        }
    }
}

async fn forward_lines<R>(reader: R, sink: StageSink) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    let mut listening = true;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(count);
        }
        count += 1;
        // keep draining once the controller stops listening
        if listening {
            listening = sink.line(decode_line(&buf)).await;
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{mailbox, Mailbox, PipelineEvent};

    fn drain_lines(mailbox: &mut Mailbox) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(event) = mailbox.try_recv() {
            if let PipelineEvent::Line(line) = event {
                lines.push(line);
            }
        }
        lines
    }

    #[test]
    fn test_decode_line_strips_line_endings() {
        assert_eq!(decode_line(b"Built app.apk\r\n"), "Built app.apk");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn test_command_display() {
        let spec = CommandSpec::new("flutter").args(["build", "apk"]).arg("--debug");
        assert_eq!(spec.to_string(), "flutter build apk --debug");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_forwards_every_line() {
        let (sink, mut mailbox) = mailbox(32);
        let spec = CommandSpec::new("sh").args(["-c", "printf 'one\\ntwo\\nthree'"]);

        ProcessRunner::run(&spec, &sink).await.unwrap();
        drop(sink);

        assert_eq!(drain_lines(&mut mailbox), vec!["one", "two", "three"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_merges_stderr() {
        let (sink, mut mailbox) = mailbox(32);
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err 1>&2"]);

        ProcessRunner::run(&spec, &sink).await.unwrap();
        drop(sink);

        let mut lines = drain_lines(&mut mailbox);
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_silent_success() {
        let (sink, mut mailbox) = mailbox(4);
        ProcessRunner::run(&CommandSpec::new("true"), &sink)
            .await
            .unwrap();
        drop(sink);
        assert!(drain_lines(&mut mailbox).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_nonzero_exit_is_error() {
        let (sink, _mailbox) = mailbox(4);
        let spec = CommandSpec::new("sh").args(["-c", "echo failing; exit 3"]);

        let err = ProcessRunner::run(&spec, &sink).await.unwrap_err();
        assert!(matches!(err, StageError::ExitStatus { code: Some(3), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_run_kills_process() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let script = format!("sleep 1; touch '{}'", marker.display());
        let (sink, _mailbox) = mailbox(4);
        let spec = CommandSpec::new("sh").args(["-c", script.as_str()]);

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            ProcessRunner::run(&spec, &sink),
        )
        .await;
        assert!(outcome.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let (sink, _mailbox) = mailbox(4);
        let spec = CommandSpec::new("apkdrop-definitely-not-installed");

        let err = ProcessRunner::run(&spec, &sink).await.unwrap_err();
        assert!(matches!(err, StageError::Spawn { .. }));
    }
}
