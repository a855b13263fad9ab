// src/utils/console.rs

//! Console presenter with server-style formatting.
//!
//! Diagnostic logging goes through the `log` facade; this is only for the
//! human-facing progress and summary lines the CLI prints.

use chrono::Local;

/// Timestamped console output, silenced entirely when `quiet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn emit(&self, tag: &str, message: &str) {
        if !self.quiet {
            println!("{}", format_line(tag, message));
        }
    }

    /// Print a plain informational line.
    pub fn info(&self, message: &str) {
        self.emit("INFO", message);
    }

    /// Print a success line.
    pub fn success(&self, message: &str) {
        self.emit("INFO", &format!("✓ {}", message));
    }

    /// Print a step in a process.
    pub fn step(&self, step_num: usize, total: usize, message: &str) {
        self.emit("INFO", &format!("[STEP {}/{}] {}", step_num, total, message));
    }

    /// Print a header block.
    pub fn header(&self, title: &str) {
        let border = "═".repeat(60);
        self.emit("INFO", &border);
        self.emit("INFO", &format!("  {}", title));
        self.emit("INFO", &border);
    }

    /// Print an indented sub-item.
    pub fn sub_item(&self, message: &str) {
        self.emit("INFO", &format!("    {}", message));
    }

    /// Print a titled list of key/value pairs.
    pub fn summary(&self, title: &str, items: &[(&str, String)]) {
        self.emit("INFO", &format!("[SUMMARY] {}", title));
        for (key, value) in items {
            self.sub_item(&format!("{}: {}", key, value));
        }
    }
}

/// Format a line with timestamp and tag.
fn format_line(tag: &str, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, tag, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_shape() {
        let line = format_line("INFO", "hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] [INFO] hello"));
    }
}
