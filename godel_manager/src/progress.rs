//! Progress indicators for the godel CLI
//!
//! Spinners draw on stderr so plugin output on stdout is never interleaved
//! with them. They are hidden in quiet mode and when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::*;

/// Global quiet mode flag
static QUIET_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::SeqCst);
}

pub fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::SeqCst)
}

pub const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"];

/// Spinner for an operation of unknown length.
pub fn spinner(message: &str) -> ProgressBar {
    if is_quiet() || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(SPINNER)
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn finish_success(pb: &ProgressBar, message: &str) {
    if pb.is_hidden() {
        return;
    }
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

pub fn finish_error(pb: &ProgressBar, message: &str) {
    if pb.is_hidden() {
        return;
    }
    pb.finish_with_message(format!("{} {}", "✗".red(), message));
}
