//! Terminal output for the CLI.

use adapter_core::Headers;
use console::style;

/// Prints command results. In `--json` mode only `json()` and `error()`
/// produce output, so stdout stays machine-readable.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn success(&self, msg: &str) {
        if !self.json {
            println!("{} {}", style("✓").green(), msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.json {
            eprintln!("{} {}", style("⚠").yellow(), msg);
        }
    }

    /// Report a failed command. JSON mode emits `{"error": ...}` on stderr.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("✗").red(), style(msg).red());
        }
    }

    /// Verbose-only trace on stderr.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.json {
            eprintln!("{} {}", style("→").dim(), style(msg).dim());
        }
    }

    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Start a titled block.
    pub fn section(&self, title: &str) {
        if !self.json {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn field(&self, name: &str, value: &str) {
        if !self.json {
            println!("  {}: {}", style(name).dim(), value);
        }
    }

    pub fn item(&self, text: &str) {
        if !self.json {
            println!("  {} {}", style("•").dim(), text);
        }
    }

    /// One item per header, in key order.
    pub fn header_map(&self, headers: &Headers) {
        for (name, value) in headers.iter() {
            self.item(&format!("{}: {}", name, value));
        }
    }

    pub fn status(&self, code: u16) {
        self.field("Status", &status_badge(code));
    }
}

/// Colour a status code by class.
pub fn status_badge(status: u16) -> String {
    match status {
        200..=299 => style(status).green().to_string(),
        300..=399 => style(status).cyan().to_string(),
        400..=499 => style(status).yellow().to_string(),
        _ => style(status).red().to_string(),
    }
}

/// Size of a body, e.g. `2.00 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    match bytes {
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_status_badge_keeps_code() {
        console::set_colors_enabled(false);
        assert_eq!(status_badge(200), "200");
        assert_eq!(status_badge(500), "500");
    }
}
