use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command as TokioCommand;

/// Runs external command-line tools.
///
/// Every adapter goes through this so tests can script tool output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<Output>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealToolRunner;

#[async_trait]
impl ToolRunner for RealToolRunner {
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<Output> {
        tracing::debug!(program, ?args, ?cwd, "Running tool");
        TokioCommand::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            // Cancelled jobs drop this future; the child must not outlive it
            .kill_on_drop(true)
            .output()
            .await
    }
}

/// Exit status in a form suitable for error messages.
pub fn status_text(output: &Output) -> String {
    match output.status.code() {
        Some(code) => format!("exit code {}", code),
        None => "signal".to_string(),
    }
}

/// Last lines of stderr; ffmpeg in particular is very chatty.
pub fn stderr_tail(output: &Output, max_lines: usize) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Path as a command-line argument.
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}


#[cfg(test)]
mod tests {
    use super::test_support::output;
    use super::*;

    #[test]
    fn test_stderr_tail_and_status() {
        let out = output("", "a\nb\nc\nd", false).unwrap();
        assert_eq!(stderr_tail(&out, 2), "c\nd");
        assert_eq!(status_text(&out), "exit code 1");
    }

    #[tokio::test]
    async fn test_real_runner_reports_missing_program() {
        let result = RealToolRunner
            .run("definitely-not-a-real-tool-xyz", &[], Path::new("."))
            .await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
