//! Reply formatting.

use switchboard_core::types::ExecutionResult;
use switchboard_executors::ExecutorNotAvailable;

/// Header line for failures.
pub const ERROR_HEADER: &str = "❌ 处理失败 / Error";

/// Turns executor output into the text sent back to the user.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Success or failure reply for `result`, labelled with `executor_name` when known.
    pub fn format_result(&self, result: &ExecutionResult, executor_name: Option<&str>) -> String {
        if result.success {
            self.format_response(&result.stdout, executor_name)
        } else {
            self.format_error(&result.error_text(), executor_name)
        }
    }

    pub fn format_response(&self, output: &str, executor_name: Option<&str>) -> String {
        match executor_name {
            Some(name) => format!("【使用 {name} 回答】\n\n{output}"),
            None => output.to_string(),
        }
    }

    pub fn format_error(&self, error: &str, executor_name: Option<&str>) -> String {
        match executor_name {
            Some(name) => format!("【使用 {name} 回答】\n\n{ERROR_HEADER}\n\n{error}"),
            None => format!("{ERROR_HEADER}\n\n{error}"),
        }
    }

    /// Reply when no executor could be resolved.
    pub fn format_routing_error(&self, error: &ExecutorNotAvailable) -> String {
        self.format_error(&format!("路由失败 / Routing failed: {error}"), None)
    }
}
