use colored::*;

use crate::sampler::LARGE_ENTRY_BYTES;

/// Typical per-origin LocalStorage quota; domains above it stand out
pub const ORIGIN_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

const UNITS: [(&str, u64, usize); 3] = [
    ("GB", 1024 * 1024 * 1024, 2),
    ("MB", 1024 * 1024, 2),
    ("KB", 1024, 1),
];

/// Human-readable byte count. Browser storage stays well below terabytes.
pub fn format_size(bytes: u64) -> String {
    UNITS
        .iter()
        .find(|(_, scale, _)| bytes >= *scale)
        .map(|(unit, scale, precision)| {
            format!("{:.*} {}", *precision, bytes as f64 / *scale as f64, unit)
        })
        .unwrap_or_else(|| format!("{} B", bytes))
}

/// Size colored against browser limits: red past the origin quota, yellow
/// past the large-entry threshold, dimmed when nothing is stored.
pub fn format_size_colored(bytes: u64) -> ColoredString {
    let s = format_size(bytes);
    if bytes >= ORIGIN_QUOTA_BYTES {
        s.red().bold()
    } else if bytes >= LARGE_ENTRY_BYTES {
        s.yellow()
    } else if bytes == 0 {
        s.dimmed()
    } else {
        s.normal()
    }
}

/// Format a ratio in [0, 1] as a percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

const EIGHTHS: [&str; 8] = ["", "▏", "▎", "▍", "▌", "▋", "▊", "▉"];

/// Horizontal share bar with eighth-cell resolution, so small storage
/// classes still show up next to a dominant one.
pub fn share_bar(fraction: f64, width: usize) -> String {
    let eighths = (fraction.clamp(0.0, 1.0) * width as f64 * 8.0).round() as usize;
    let full = eighths / 8;
    let partial = EIGHTHS[eighths % 8];
    let used = full + usize::from(!partial.is_empty());
    format!(
        "{}{}{}",
        "█".repeat(full).cyan(),
        partial.cyan(),
        " ".repeat(width.saturating_sub(used)).on_truecolor(40, 40, 40)
    )
}

/// Section title with a rule of the same width
pub fn print_header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {:<34} {}", key.dimmed(), value);
}

/// Shorten a hostname from the left so the registrable suffix stays visible
pub fn truncate_host(host: &str, max_len: usize) -> String {
    let len = host.chars().count();
    if len <= max_len {
        host.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let tail: String = host.chars().skip(len - (max_len - 3)).collect();
        format!("...{}", tail)
    }
}
