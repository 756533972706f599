//! User-facing session commands (`/new`, `/session`, `/history`, `/help`)
//! and the canned replies they produce.
//!
//! The alias table and help text are plain data built once at startup and
//! handed to the [`SessionManager`](super::SessionManager).

use crate::types::{Message, Role};
use crate::utils::truncate_string;

use super::manager::SessionInfo;

/// History entries are cut to this many characters in `/history` replies.
pub const HISTORY_PREVIEW_CHARS: usize = 100;

/// Reply to `/new`.
pub const NEW_SESSION_REPLY: &str = "✅ 已创建新会话 / New session created";
/// Reply to `/session` when the user has no session.
pub const NO_SESSION_REPLY: &str = "ℹ️ 当前没有活跃会话 / No active session";
/// Reply to `/history` when the session is empty.
pub const NO_HISTORY_REPLY: &str = "ℹ️ 当前会话没有历史记录 / No history in current session";

const DEFAULT_HELP_TEXT: &str = "\
📖 使用帮助 / Help

🤖 AI 提供商前缀 / Provider prefixes
  API 层 / API layer:
    @claude, @claude-api   Claude API
    @gemini, @gemini-api   Gemini API
    @openai, @gpt          OpenAI API
  CLI 层 / CLI layer:
    @code, @claude-cli     Claude Code CLI
    @gemini-cli            Gemini CLI

💡 不带前缀时自动选择 / Without a prefix the bot picks a backend automatically.
   提到代码、文件或命令时会优先使用 CLI 层 / Mentions of code, files or commands prefer the CLI layer.

📝 会话命令 / Session commands
  /new, 新会话          开启新会话 / Start a new session
  /session, 会话信息    查看会话信息 / Show session info
  /history, 历史记录    查看对话历史 / Show conversation history
  /help, 帮助           显示帮助 / Show this help

💬 示例 / Examples
  @claude 什么是人工智能？
  @code 分析项目结构
  What is Rust?";

/// A recognized session command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    New,
    Info,
    History,
    Help,
}

/// Alias table and help text for session commands.
#[derive(Clone, Debug)]
pub struct SessionCommands {
    pub new: Vec<String>,
    pub info: Vec<String>,
    pub history: Vec<String>,
    pub help: Vec<String>,
    pub help_text: String,
}

impl Default for SessionCommands {
    fn default() -> Self {
        fn owned(aliases: &[&str]) -> Vec<String> {
            aliases.iter().map(|a| a.to_string()).collect()
        }

        Self {
            new: owned(&["/new", "新会话"]),
            info: owned(&["/session", "会话信息"]),
            history: owned(&["/history", "历史记录"]),
            help: owned(&["/help", "帮助", "help"]),
            help_text: DEFAULT_HELP_TEXT.to_string(),
        }
    }
}

impl SessionCommands {
    /// Match the whole trimmed, case-folded `text` against the alias table.
    pub fn parse(&self, text: &str) -> Option<SessionCommand> {
        let folded = text.trim().to_lowercase();
        let hit = |aliases: &[String]| aliases.iter().any(|a| a.to_lowercase() == folded);

        if hit(&self.help) {
            Some(SessionCommand::Help)
        } else if hit(&self.new) {
            Some(SessionCommand::New)
        } else if hit(&self.info) {
            Some(SessionCommand::Info)
        } else if hit(&self.history) {
            Some(SessionCommand::History)
        } else {
            None
        }
    }
}

/// Reply to `/session`.
pub fn render_info(info: Option<&SessionInfo>) -> String {
    match info {
        None => NO_SESSION_REPLY.to_string(),
        Some(info) => {
            let short_id: String = info.session_id.chars().take(8).collect();
            format!(
                "📊 会话信息 / Session Info:\n\
                 - Session ID: {short_id}...\n\
                 - 消息数 / Messages: {}\n\
                 - 会话时长 / Age: {}s",
                info.message_count, info.age_seconds
            )
        }
    }
}

/// Reply to `/history`.
pub fn render_history(messages: &[Message]) -> String {
    if messages.is_empty() {
        return NO_HISTORY_REPLY.to_string();
    }

    let mut lines = vec!["📜 对话历史 / Conversation History:".to_string()];
    for (i, msg) in messages.iter().enumerate() {
        let label = match msg.role {
            Role::User => "👤 User",
            Role::Assistant => "🤖 Assistant",
        };
        lines.push(format!(
            "{}. {label}: {}",
            i + 1,
            truncate_string(&msg.content, HISTORY_PREVIEW_CHARS)
        ));
    }
    lines.join("\n")
}
