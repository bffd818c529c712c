//! Output formatting utilities

mod progress;

pub use progress::ConsoleReporter;

use console::{style, Style};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Style for download links
pub fn link_style() -> Style {
    Style::new().cyan().bold().underlined()
}

/// Style a final-output line by what it reports
pub fn final_output_line(line: &str) -> String {
    if let Some(rest) = line.strip_prefix("Error:") {
        format!("{}{}", style("Error:").red().bold(), style(rest).red())
    } else if let Some(link) = line.strip_prefix("File link: ") {
        format!("File link: {}", link_style().apply_to(link))
    } else if line.starts_with("Elapsed time:") {
        style(line).dim().to_string()
    } else if line.ends_with('✅') {
        style(line).green().to_string()
    } else {
        line.to_string()
    }
}
