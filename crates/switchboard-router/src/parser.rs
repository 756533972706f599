//! Command parser: `@provider` prefixes and CLI-intent keywords.
//!
//! A message may start with a prefix naming the backend explicitly
//! (`@code 分析项目结构`). Anything else is an implicit request and the
//! router decides where it goes.

use switchboard_core::types::{ExecutionLayer, ParsedCommand};
use tracing::debug;

/// Provider assigned to implicit commands before routing.
pub const IMPLICIT_PROVIDER: &str = "claude";
/// Layer assigned to implicit commands before routing.
pub const IMPLICIT_LAYER: ExecutionLayer = ExecutionLayer::Api;

/// Built-in prefix table: `(literal, provider, layer)`.
const DEFAULT_PREFIXES: &[(&str, &str, ExecutionLayer)] = &[
    ("@claude-api", "claude", ExecutionLayer::Api),
    ("@claude", "claude", ExecutionLayer::Api),
    ("@gemini-api", "gemini", ExecutionLayer::Api),
    ("@gemini", "gemini", ExecutionLayer::Api),
    ("@openai", "openai", ExecutionLayer::Api),
    ("@gpt", "openai", ExecutionLayer::Api),
    ("@claude-cli", "claude", ExecutionLayer::Cli),
    ("@code", "claude", ExecutionLayer::Cli),
    ("@gemini-cli", "gemini", ExecutionLayer::Cli),
];

// Keyword groups signalling the request needs a local CLI tool.
const CODE_INSPECTION: &[&str] = &[
    "查看代码",
    "分析代码",
    "代码库",
    "view code",
    "analyze code",
    "codebase",
];
const FILE_MUTATION: &[&str] = &[
    "修改文件",
    "读取文件",
    "写入文件",
    "创建文件",
    "modify file",
    "read file",
    "write file",
    "create file",
];
const COMMAND_EXECUTION: &[&str] = &["执行命令", "运行脚本", "execute command", "run script"];
const PROJECT_ANALYSIS: &[&str] = &["分析项目", "项目结构", "analyze project", "project structure"];

/// Every CLI-intent keyword, lowercase.
pub const CLI_KEYWORD_GROUPS: &[&[&str]] =
    &[CODE_INSPECTION, FILE_MUTATION, COMMAND_EXECUTION, PROJECT_ANALYSIS];

/// `true` if any CLI-intent keyword occurs anywhere in `text` (case-insensitive).
pub fn detect_cli_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    let hit = CLI_KEYWORD_GROUPS
        .iter()
        .flat_map(|group| group.iter())
        .find(|kw| lower.contains(*kw));
    if let Some(kw) = hit {
        debug!(keyword = kw, "CLI keyword detected");
    }
    hit.is_some()
}

// ─────────────────────────────────────────────
// Prefix table
// ─────────────────────────────────────────────

/// One entry of the prefix table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixRule {
    pub literal: String,
    pub provider: String,
    pub layer: ExecutionLayer,
}

impl PrefixRule {
    pub fn new(literal: impl Into<String>, provider: impl Into<String>, layer: ExecutionLayer) -> Self {
        Self {
            literal: literal.into(),
            provider: provider.into(),
            layer,
        }
    }

    /// Byte length of the prefix if `text` starts with it, ignoring ASCII case.
    fn match_len(&self, text: &str) -> Option<usize> {
        let len = self.literal.len();
        let head = text.get(..len)?;
        head.eq_ignore_ascii_case(&self.literal).then_some(len)
    }
}

/// Parses raw message text into a [`ParsedCommand`].
///
/// Rules are kept sorted by descending literal length so a single scan
/// finds the longest match (`@claude-cli` before `@claude`).
#[derive(Clone, Debug)]
pub struct CommandParser {
    rules: Vec<PrefixRule>,
}

impl CommandParser {
    /// A parser over the given prefix table.
    pub fn new(mut rules: Vec<PrefixRule>) -> Self {
        // Stable sort keeps table order among equal lengths.
        rules.sort_by(|a, b| b.literal.len().cmp(&a.literal.len()));
        Self { rules }
    }

    pub fn rules(&self) -> &[PrefixRule] {
        &self.rules
    }

    /// Split an optional leading prefix off `text`.
    pub fn parse_command(&self, text: &str) -> ParsedCommand {
        let trimmed = text.trim_start();

        for rule in &self.rules {
            if let Some(len) = rule.match_len(trimmed) {
                let message = trimmed[len..].trim().to_string();
                debug!(
                    prefix = %rule.literal,
                    provider = %rule.provider,
                    layer = %rule.layer,
                    "explicit prefix matched"
                );
                return ParsedCommand {
                    provider: rule.provider.clone(),
                    execution_layer: rule.layer,
                    message,
                    explicit: true,
                };
            }
        }

        ParsedCommand {
            provider: IMPLICIT_PROVIDER.to_string(),
            execution_layer: IMPLICIT_LAYER,
            message: text.to_string(),
            explicit: false,
        }
    }

    /// See [`detect_cli_keywords`].
    pub fn detect_cli_keywords(&self, text: &str) -> bool {
        detect_cli_keywords(text)
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(
            DEFAULT_PREFIXES
                .iter()
                .map(|(literal, provider, layer)| PrefixRule::new(*literal, *provider, *layer))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedCommand {
        CommandParser::default().parse_command(text)
    }

    fn target(text: &str) -> (String, ExecutionLayer, String) {
        let p = parse(text);
        (p.provider, p.execution_layer, p.message)
    }

    #[test]
    fn test_every_prefix() {
        let cases = [
            ("@claude-api hi", "claude", ExecutionLayer::Api),
            ("@claude hi", "claude", ExecutionLayer::Api),
            ("@gemini-api hi", "gemini", ExecutionLayer::Api),
            ("@gemini hi", "gemini", ExecutionLayer::Api),
            ("@openai hi", "openai", ExecutionLayer::Api),
            ("@gpt hi", "openai", ExecutionLayer::Api),
            ("@claude-cli hi", "claude", ExecutionLayer::Cli),
            ("@code hi", "claude", ExecutionLayer::Cli),
            ("@gemini-cli hi", "gemini", ExecutionLayer::Cli),
        ];
        for (text, provider, layer) in cases {
            let p = parse(text);
            assert!(p.explicit, "{text}");
            assert_eq!(p.provider, provider, "{text}");
            assert_eq!(p.execution_layer, layer, "{text}");
            assert_eq!(p.message, "hi", "{text}");
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(target("@claude-cli X").1, ExecutionLayer::Cli);
        assert_eq!(target("@gemini-cli X").1, ExecutionLayer::Cli);
        assert_eq!(target("@claude-api X").2, "X");
        assert_eq!(target("@gemini-api X").2, "X");
    }

    #[test]
    fn test_rules_sorted_longest_first() {
        let parser = CommandParser::default();
        let lens: Vec<usize> = parser.rules().iter().map(|r| r.literal.len()).collect();
        assert!(lens.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(target("@CLAUDE-API hi"), target("@claude-api hi"));
        assert_eq!(target("@Code hi"), target("@code hi"));
    }

    #[test]
    fn test_code_scenario() {
        let p = parse("@code 查看代码");
        assert_eq!(
            p,
            ParsedCommand {
                provider: "claude".into(),
                execution_layer: ExecutionLayer::Cli,
                message: "查看代码".into(),
                explicit: true,
            }
        );
    }

    #[test]
    fn test_prefix_only_gives_empty_message() {
        let p = parse("@gpt");
        assert!(p.explicit);
        assert_eq!(p.message, "");
        assert_eq!(parse("  @gemini   ").message, "");
    }

    #[test]
    fn test_leading_whitespace_before_prefix() {
        let p = parse("   @gpt  what is rust?  ");
        assert!(p.explicit);
        assert_eq!(p.provider, "openai");
        assert_eq!(p.message, "what is rust?");
    }

    #[test]
    fn test_only_whitespace_is_stripped_from_remainder() {
        assert_eq!(parse("@claude, hi!").message, ", hi!");
        assert_eq!(parse("@claude：你好").message, "：你好");
    }

    #[test]
    fn test_second_prefix_is_content() {
        let p = parse("@gpt @claude-cli do it");
        assert_eq!(p.provider, "openai");
        assert_eq!(p.execution_layer, ExecutionLayer::Api);
        assert_eq!(p.message, "@claude-cli do it");
    }

    #[test]
    fn test_no_prefix_is_unchanged() {
        for text in ["hello", "  padded  ", "ask @claude later", "", "email me@gpt.com", "中文 @code"] {
            let p = parse(text);
            assert!(!p.explicit, "{text:?}");
            assert_eq!(p.message, text);
            assert_eq!(p.provider, IMPLICIT_PROVIDER);
            assert_eq!(p.execution_layer, IMPLICIT_LAYER);
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        for text in ["@code 查看代码", "plain", "@GEMINI-cli  x "] {
            assert_eq!(parse(text), parse(text));
        }
    }

    #[test]
    fn test_non_ascii_start_does_not_panic() {
        assert!(!parse("分析项目结构").explicit);
        assert!(!parse("@").explicit);
        assert!(!parse("@clau").explicit);
    }

    #[test]
    fn test_custom_table() {
        let parser = CommandParser::new(vec![
            PrefixRule::new("@g", "gemini", ExecutionLayer::Api),
            PrefixRule::new("@gx", "gemini", ExecutionLayer::Cli),
        ]);
        let p = parser.parse_command("@gx hi");
        assert_eq!(p.execution_layer, ExecutionLayer::Cli);
        assert_eq!(p.message, "hi");
    }

    #[test]
    fn test_every_keyword_matches() {
        for kw in CLI_KEYWORD_GROUPS.iter().flat_map(|g| g.iter()) {
            assert!(detect_cli_keywords(kw), "{kw}");
            assert!(detect_cli_keywords(&format!("请帮我{kw}，谢谢")), "{kw}");
            assert!(detect_cli_keywords(&format!("please {kw}!")), "{kw}");
        }
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert!(detect_cli_keywords("Please ANALYZE PROJECT layout"));
        assert!(detect_cli_keywords("Read File foo.txt"));
    }

    #[test]
    fn test_keyword_partial_containment() {
        assert!(detect_cli_keywords("代码库管理"));
        assert!(detect_cli_keywords("mycodebase"));
        assert!(detect_cli_keywords("查看代码查看代码"));
    }

    #[test]
    fn test_keyword_misses() {
        for text in ["代码", "file", "what is rust?", "project", "", "read the file"] {
            assert!(!detect_cli_keywords(text), "{text:?}");
        }
    }
}
