//! Console and log-file output for the toolgraph CLI.
//!
//! Everything is appended to `~/.config/toolgraph/toolgraph.log` (truncated on
//! every run). What reaches the console depends on the verbosity level set by
//! [`init_with_verbosity`]: 0 shows warnings and errors, 1 adds debug output,
//! 2 adds step tracing.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static QUIET: Mutex<bool> = Mutex::new(false);
static SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

const LOG_FILE_NAME: &str = "toolgraph.log";

/// Current verbosity level
pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

/// Whether success/step chatter is suppressed on the console
pub fn is_quiet() -> bool {
    QUIET.lock().ok().map(|v| *v).unwrap_or(false)
}

fn set_quiet(quiet: bool) {
    if let Ok(mut v) = QUIET.lock() {
        *v = quiet;
    }
}

/// Map the verbosity level onto a `tracing` filter directive for the toolgraph crates
pub fn verbosity_to_filter() -> String {
    let level = match get_verbosity() {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    format!("toolgraph={level},toolgraph_ast={level},toolgraph_manifest={level},toolgraph_config={level}")
}

/// Initialize the logger with a verbosity level
pub fn init_with_verbosity(verbosity: u8, quiet: bool) -> Result<(), String> {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
    set_quiet(quiet);

    init()
}

fn init() -> Result<(), String> {
    let config_dir = get_config_dir()?;
    fs::create_dir_all(&config_dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;

    let log_file = config_dir.join(LOG_FILE_NAME);

    // One log per run
    if log_file.exists() {
        let _ = fs::remove_file(&log_file);
    }

    let mut guard = LOG_FILE
        .lock()
        .map_err(|_| "Log file lock poisoned".to_string())?;
    *guard = Some(log_file);

    Ok(())
}

fn get_config_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let config_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("toolgraph");

    #[cfg(target_os = "windows")]
    let config_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("toolgraph");

    Ok(config_dir)
}

fn write_to_log(message: &str) {
    if let Ok(guard) = LOG_FILE.lock() {
        if let Some(ref log_path) = *guard {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "[{}] {}", timestamp, message);
            }
        }
    }
}

/// Log an informational message (console if verbose >= 1, always to file)
pub fn info(message: &str) {
    write_to_log(&format!("INFO {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{}", message);
    }
}

/// Log a debug message (console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    write_to_log(&format!("DEBUG {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{} {}", "DEBUG:".blue().bold(), message);
    }
}

/// Log a warning (file and console)
pub fn warn(message: &str) {
    write_to_log(&format!("WARN {}", message));
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}

/// Log an error (file and console)
pub fn error(message: &str) {
    write_to_log(&format!("ERROR {}", message));
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// User-facing success line, hidden with `--quiet`
pub fn success(message: &str) {
    write_to_log(&format!("SUCCESS {}", message));
    if is_quiet() {
        return;
    }
    eprintln!("{} {}", "\u{2714}".green().bold(), message);
}

/// Lifecycle step, echoed to the console at -vv
pub fn step(message: &str) {
    if get_verbosity() >= 2 {
        eprintln!("TRACE: {}", message);
    }
    write_to_log(&format!("STEP: {}", message));
}

/// Start a spinner (skipped in verbose or quiet mode)
pub fn spinner_start(message: &str) {
    if get_verbosity() > 0 || is_quiet() {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());

    if let Ok(mut guard) = SPINNER.lock() {
        *guard = Some(spinner);
    }
}

fn spinner_clear() {
    if let Ok(mut guard) = SPINNER.lock() {
        if let Some(spinner) = guard.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Complete the spinner with a success message
pub fn spinner_success(message: &str) {
    spinner_clear();
    success(message);
}

/// Stop the spinner with an error message
pub fn spinner_error(message: &str) {
    spinner_clear();
    write_to_log(&format!("ERROR {}", message));
    eprintln!("  {} {}", "\u{2717}".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_mentions_every_crate() {
        let filter = verbosity_to_filter();
        assert!(filter.contains("toolgraph_ast="));
        assert!(filter.contains("toolgraph_manifest="));
    }
}
