//! Process executor: answer prompts by running an external program.
//!
//! Lets an operator wire any CLI (`claude -p`, `gemini`, a wrapper script
//! around an HTTP API, ...) into the registry from config alone.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::bail;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use switchboard_core::config::CommandExecutorConfig;
use switchboard_core::session::format_history;
use switchboard_core::types::{ExecutionLayer, ExecutionResult, ExecutorMetadata, Message};
use switchboard_core::utils::expand_home;

use crate::traits::{ExecuteParams, Executor};

/// Placeholder replaced by the prompt in configured arguments.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variable carrying the caller's user id to the child process.
pub const USER_ID_ENV: &str = "SWITCHBOARD_USER_ID";

// ─────────────────────────────────────────────
// ProcessExecutor
// ─────────────────────────────────────────────

/// Runs `program args...` once per prompt and maps the outcome onto an
/// [`ExecutionResult`].
#[derive(Clone, Debug)]
pub struct ProcessExecutor {
    provider: String,
    layer: ExecutionLayer,
    name: Option<String>,
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    required_env: Vec<String>,
}

impl ProcessExecutor {
    /// Create an executor for `(provider, layer)` running `program`.
    pub fn new(provider: impl Into<String>, layer: ExecutionLayer, program: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            layer,
            name: None,
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            required_env: Vec::new(),
        }
    }

    /// Build from a `[[executors.commands]]` entry.
    pub fn from_config(cfg: &CommandExecutorConfig) -> anyhow::Result<Self> {
        if cfg.provider.trim().is_empty() {
            bail!("executor command has an empty provider");
        }
        if cfg.program.trim().is_empty() {
            bail!("executor command for {}/{} has an empty program", cfg.provider, cfg.layer);
        }

        let timeout_secs = if cfg.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            cfg.timeout_secs
        };

        Ok(Self {
            provider: cfg.provider.clone(),
            layer: cfg.layer,
            name: cfg.name.clone(),
            program: cfg.program.clone(),
            args: cfg.args.clone(),
            working_dir: cfg.working_dir.as_deref().map(expand_home),
            timeout: Duration::from_secs(timeout_secs),
            required_env: cfg.required_env.clone(),
        })
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_required_env<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_env = vars.into_iter().map(Into::into).collect();
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn layer(&self) -> ExecutionLayer {
        self.layer
    }

    /// Registry metadata; `config_required` lists the required env vars.
    pub fn metadata(&self) -> ExecutorMetadata {
        let mut meta = ExecutorMetadata::new(self.provider.clone(), self.layer)
            .with_config_required(self.required_env.clone());
        if let Some(name) = &self.name {
            meta.name = name.clone();
        }
        meta.description = format!("Runs `{}`", self.program);
        meta
    }

    /// Arguments with `{prompt}` substituted, or the prompt appended.
    fn build_args(&self, prompt: &str) -> Vec<String> {
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                if a.contains(PROMPT_PLACEHOLDER) {
                    substituted = true;
                    a.replace(PROMPT_PLACEHOLDER, prompt)
                } else {
                    a.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(prompt.to_string());
        }
        args
    }

    fn missing_env(&self) -> Vec<&str> {
        self.required_env
            .iter()
            .filter(|var| std::env::var_os(var.as_str()).map_or(true, |v| v.is_empty()))
            .map(String::as_str)
            .collect()
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(
        &self,
        prompt: &str,
        history: Option<&[Message]>,
        params: Option<&ExecuteParams>,
    ) -> ExecutionResult {
        let started = Instant::now();
        let elapsed = || started.elapsed().as_secs_f64();

        let full_prompt = match history.map(format_history) {
            Some(rendered) if !rendered.is_empty() => format!("{rendered}\n\nUser: {prompt}"),
            _ => prompt.to_string(),
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(&full_prompt))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(user_id) = params
            .and_then(|p| p.get("user_id"))
            .and_then(|v| v.as_str())
        {
            cmd.env(USER_ID_ENV, user_id);
        }

        info!(
            executor = %self.provider_name(),
            program = %self.program,
            "running executor process"
        );

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                warn!(program = %self.program, "failed to spawn executor process: {}", e);
                return ExecutionResult::failed(
                    format!("Failed to start {}: {e}", self.program),
                    "",
                    elapsed(),
                );
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

                if output.status.success() {
                    debug!(
                        executor = %self.provider_name(),
                        bytes = stdout.len(),
                        "executor process succeeded"
                    );
                    let mut result = ExecutionResult::ok(stdout, elapsed());
                    result.stderr = stderr;
                    return result;
                }

                let error = if stderr.is_empty() {
                    match output.status.code() {
                        Some(code) => format!("Process exited with code {code}"),
                        None => "Process terminated by signal".to_string(),
                    }
                } else {
                    stderr.clone()
                };
                warn!(executor = %self.provider_name(), "executor process failed: {}", error);
                let mut result = ExecutionResult::failed(error, stderr, elapsed());
                result.stdout = stdout;
                result
            }
            Ok(Err(e)) => ExecutionResult::failed(
                format!("Failed to wait for {}: {e}", self.program),
                "",
                elapsed(),
            ),
            Err(_) => {
                warn!(
                    executor = %self.provider_name(),
                    timeout_secs = self.timeout.as_secs(),
                    "executor process timed out"
                );
                ExecutionResult::failed(
                    format!("timed out after {}s", self.timeout.as_secs()),
                    "",
                    elapsed(),
                )
            }
        }
    }

    fn is_available(&self) -> bool {
        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "executor working directory missing");
                return false;
            }
        }
        let missing = self.missing_env();
        if !missing.is_empty() {
            debug!(?missing, "executor environment incomplete");
            return false;
        }
        true
    }

    fn provider_name(&self) -> String {
        format!("{}-{}", self.provider, self.layer)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
