//! Output helpers shared by the commands.

use colored::Colorize;
use serde::Serialize;

use print3d_toolbox::{Notice, NoticeLevel};

use crate::OutputFormat;

/// Print a serializable result. Text mode uses the debug form; commands
/// with a richer text layout print it themselves.
pub fn print<T: Serialize + std::fmt::Debug>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}: failed to serialize output: {}", "Error".red(), e),
        },
        OutputFormat::Text => println!("{:#?}", value),
    }
}

/// Print a success line in text mode.
pub fn success(message: &str, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    if let OutputFormat::Text = format {
        println!("{} {}", "✓".green().bold(), message);
    }
}

/// Print operator notices in text mode; warnings and errors go to stderr.
pub fn notices(notices: &[Notice], format: OutputFormat, quiet: bool) {
    if quiet || matches!(format, OutputFormat::Json) {
        return;
    }
    for notice in notices {
        match notice.level {
            NoticeLevel::Info => println!("  {}", notice.message),
            NoticeLevel::Warning => eprintln!("{}: {}", "Warning".yellow().bold(), notice.message),
            NoticeLevel::Error => eprintln!("{}: {}", "Error".red().bold(), notice.message),
        }
    }
}
