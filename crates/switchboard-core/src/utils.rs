//! Utility helpers: path resolution, timestamps, string manipulation.

use std::path::PathBuf;

/// Maximum length (in characters) of a sanitized filename component.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Characters that are unsafe in filenames on at least one major platform.
const FILENAME_HAZARDS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\0'];

/// Get the Switchboard data directory (e.g. `~/.switchboard/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".switchboard")
}

/// Current time as unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Keep the first `max_chars` characters, appending "..." if anything was cut.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    let mut chars = s.char_indices();
    match chars.nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// Make a string safe to embed in a filename.
///
/// Filesystem-hazardous characters and control characters become `_`;
/// the result is capped at [`MAX_FILENAME_CHARS`] characters.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if FILENAME_HAZARDS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate_string("hello world", 5), "hello...");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_string("こんにちは世界です", 5), "こんにちは...");
    }

    #[test]
    fn test_sanitize_hazards() {
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("nul\0byte"), "nul_byte");
        assert_eq!(sanitize_filename("tab\there\nnewline"), "tab_here_newline");
    }

    #[test]
    fn test_sanitize_preserves_ordinary_text() {
        assert_eq!(sanitize_filename("ou_7d8a6e6d.user-1"), "ou_7d8a6e6d.user-1");
        assert_eq!(sanitize_filename("用户 42"), "用户 42");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(250);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/test/path");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with("test/path"));
    }

    #[test]
    fn test_expand_home_absolute() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_data_path_name() {
        assert!(get_data_path().ends_with(".switchboard"));
    }
}
