use super::traits::{Tool, ToolFuture, ToolInputs, optional_str, required_str};
use anyhow::{Context, bail};
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Maximum captured output per stream (1 MB).
const MAX_OUTPUT_BYTES: usize = 1_048_576;
/// Environment variables passed through to the interpreter.
/// Functional variables only, never API keys or secrets.
const SAFE_ENV_VARS: &[&str] = &["PATH", "HOME", "LANG", "LC_ALL", "LC_CTYPE", "TMPDIR"];
/// Substrings that reject a snippet before it reaches the interpreter.
const BLOCKED_PATTERNS: &[&str] = &[
    "import os",
    "from os",
    "import subprocess",
    "from subprocess",
    "import shutil",
    "from shutil",
    "import socket",
    "from socket",
    "__import__",
    "os.system",
    "os.popen",
    "subprocess.",
    "eval(",
    "exec(",
];

/// Runs short Python snippets in a child process.
pub struct CodeExecutorTool {
    interpreter: String,
    timeout: Duration,
}

impl CodeExecutorTool {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }
}

/// First blocked pattern found in `code`, if any.
pub fn blocked_pattern(code: &str) -> Option<&'static str> {
    BLOCKED_PATTERNS
        .iter()
        .copied()
        .find(|pattern| code.contains(pattern))
}

fn truncate_output(mut text: String, stream: &str) -> String {
    if text.len() > MAX_OUTPUT_BYTES {
        text.truncate(text.floor_char_boundary(MAX_OUTPUT_BYTES));
        text.push_str(&format!("\n... [{stream} truncated at 1MB]"));
    }
    text
}

impl Tool for CodeExecutorTool {
    fn name(&self) -> &str {
        "code_executor"
    }

    fn description(&self) -> &str {
        "Execute Python code for calculations and data processing"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Source code to run"
                },
                "language": {
                    "type": "string",
                    "enum": ["python"],
                    "default": "python"
                }
            },
            "required": ["code"]
        })
    }

    fn invoke<'a>(&'a self, inputs: &'a ToolInputs) -> ToolFuture<'a> {
        Box::pin(async move {
            let code = required_str(inputs, "code")?;
            let language = optional_str(inputs, "language").unwrap_or("python");
            if language != "python" {
                bail!("Language '{language}' not supported");
            }
            if let Some(pattern) = blocked_pattern(code) {
                bail!("blocked by security policy: code contains '{pattern}'");
            }

            // Source goes in over stdin so nothing touches the filesystem.
            let mut cmd = tokio::process::Command::new(&self.interpreter);
            cmd.arg("-")
                .env_clear()
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            for var in SAFE_ENV_VARS {
                if let Ok(val) = std::env::var(var) {
                    cmd.env(var, val);
                }
            }

            let started = Instant::now();
            let mut child = cmd
                .spawn()
                .with_context(|| format!("Failed to start interpreter '{}'", self.interpreter))?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(code.as_bytes()).await?;
            }

            let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await
            {
                Ok(result) => result.context("Failed to collect interpreter output")?,
                Err(_) => bail!(
                    "Code execution timed out after {}s and was killed",
                    self.timeout.as_secs()
                ),
            };

            let stdout = truncate_output(
                String::from_utf8_lossy(&output.stdout).into_owned(),
                "output",
            );
            let stderr = truncate_output(
                String::from_utf8_lossy(&output.stderr).into_owned(),
                "stderr",
            );
            let exit_code = output.status.code().unwrap_or(-1);

            if !output.status.success() {
                bail!("Code exited with status {exit_code}: {}", stderr.trim());
            }

            Ok(json!({
                "stdout": stdout,
                "stderr": stderr,
                "exit_code": exit_code,
                "duration_ms": u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }))
        })
    }
}
