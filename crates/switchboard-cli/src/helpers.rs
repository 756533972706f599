//! Shared CLI helpers: response printing, banner, status marks.

use chrono::{Local, TimeZone};
use colored::Colorize;

/// Print a bot reply to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "📡 Switchboard".cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Print the banner shown at REPL start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "📡 Switchboard".cyan().bold(), version.dimmed());
    println!(
        "{}",
        "Type a message (try /help), or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder while an executor runs.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// Green check or dimmed dot.
pub fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "·".dimmed().to_string()
    }
}

/// Unix seconds as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Seconds as a short human duration (`42s`, `5m`, `3h`, `2d`).
pub fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86_400),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_age_units() {
        assert_eq!(format_age(-5), "0s");
        assert_eq!(format_age(42), "42s");
        assert_eq!(format_age(300), "5m");
        assert_eq!(format_age(3 * 3600 + 10), "3h");
        assert_eq!(format_age(2 * 86_400), "2d");
    }

    #[test]
    fn format_timestamp_shape() {
        let s = format_timestamp(1_700_000_000);
        assert_eq!(s.len(), 19);
        assert_eq!(&s[4..5], "-");
    }
}
