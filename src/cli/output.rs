use colored::*;

use crate::cleanup::{CleanMode, CleanReport};
use crate::common::format::{self, format_percent, format_size, format_size_colored};
use crate::filter::FilterSettings;
use crate::inventory::{DomainRecord, Inventory, StorageClass};
use crate::sampler::SizeBucket;

/// Print inventory results in human-readable format
pub fn print_inventory(inventory: &Inventory, detailed: bool, top_n: usize) {
    let stats = &inventory.stats;

    println!();
    println!("{}  OriginScope Inventory", "🔎");
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  Collected in {:.2}s  •  {} across {} domains  •  {} items",
        inventory.duration_secs,
        format_size_colored(stats.total_size),
        stats.domain_count.to_string().cyan(),
        stats.total_items
    );
    if !inventory.failed_origins.is_empty() {
        println!(
            "  {} {} of {} origins could not be sampled: {}",
            "⚠".yellow(),
            inventory.failed_origins.len(),
            inventory.sampled_origins,
            inventory.failed_origins.join(", ").dimmed()
        );
    }
    println!("{}", "─".repeat(60).dimmed());
    println!();

    if inventory.domains.is_empty() {
        println!("  {} No storage found.", "✨");
        return;
    }

    println!(
        "  {:<32} {:>10} {:>8}",
        "Domain".bold(),
        "Size".bold(),
        "Items".bold()
    );
    for record in inventory.domains.iter().take(top_n) {
        println!(
            "  {:<32} {:>10} {:>8}",
            format::truncate_host(&record.domain, 32),
            format_size_colored(record.total_size()),
            record.total_items()
        );
        if detailed {
            print_record_classes(record);
        }
    }
    if inventory.domains.len() > top_n {
        println!(
            "  ... and {} more",
            (inventory.domains.len() - top_n).to_string().dimmed()
        );
    }

    format::print_header("  Storage classes");
    for class in StorageClass::ALL {
        let total: u64 = inventory.domains.iter().map(|d| d.metric(class).size).sum();
        let fraction = if stats.total_size > 0 {
            total as f64 / stats.total_size as f64
        } else {
            0.0
        };
        println!(
            "  {:<16} {} {:>10}  avg {}",
            class.to_string(),
            format::share_bar(fraction, 20),
            format_size(total),
            format_size(stats.avg_item_size.get(class).round() as u64)
        );
    }

    format::print_header("  Entry sizes");
    for bucket in [SizeBucket::Lt1k, SizeBucket::Lt10k, SizeBucket::Lt100k, SizeBucket::Gte100k] {
        println!(
            "  {:<12} local {:>6}  session {:>6}  cookies {:>6}",
            bucket.to_string(),
            stats.size_buckets.local.get(bucket),
            stats.size_buckets.session.get(bucket),
            stats.size_buckets.cookies.get(bucket)
        );
    }

    format::print_header("  Concentration");
    format::print_kv(
        "Domains holding 80% of bytes",
        &stats.domains_for_share(0.8).to_string(),
    );
    format::print_kv(
        "Median domain size",
        &format_size(stats.size_summary.median),
    );
    format::print_kv(
        "Quartiles",
        &format!(
            "{} / {} / {}",
            format_size(stats.quartiles.q1),
            format_size(stats.quartiles.median),
            format_size(stats.quartiles.q3)
        ),
    );

    let cookies = &stats.cookie_security;
    let cookie_total = cookies.secure + cookies.insecure;
    if cookie_total > 0 {
        format::print_header("  Cookies");
        let ratio = |n: u64| format_percent(n as f64 / cookie_total as f64);
        format::print_kv("Secure", &ratio(cookies.secure));
        format::print_kv("HttpOnly", &ratio(cookies.http_only));
        format::print_kv(
            "SameSite strict/lax/none/unset",
            &format!(
                "{} / {} / {} / {}",
                cookies.same_site_strict,
                cookies.same_site_lax,
                cookies.same_site_none,
                cookies.same_site_unspecified
            ),
        );
        format::print_kv("Expiring within 7 days", &stats.cookie_expiry.lt7d.to_string());
        format::print_kv("Already expired", &stats.cookie_expiry.expired.to_string());
        if !stats.insecure_cookie_domains.is_empty() {
            println!("  {}", "Most insecure cookies:".dimmed());
            for entry in &stats.insecure_cookie_domains {
                println!("    {} {} ({})", "•".dimmed(), entry.domain, entry.count);
            }
        }
    }

    let quality = &stats.quality;
    if quality.local_json_failures + quality.session_json_failures > 0
        || quality.local_large_keys + quality.session_large_keys > 0
    {
        format::print_header("  Data quality");
        format::print_kv(
            "Non-JSON values (local/session)",
            &format!("{} / {}", quality.local_json_failures, quality.session_json_failures),
        );
        format::print_kv(
            "Entries >= 100 KB (local/session)",
            &format!("{} / {}", quality.local_large_keys, quality.session_large_keys),
        );
        for entry in &stats.json_failure_ranking {
            println!(
                "    {} {} {} ({})",
                "•".dimmed(),
                entry.domain,
                entry.fail_count,
                format_percent(entry.fail_rate).dimmed()
            );
        }
    }
    println!();
}

fn print_record_classes(record: &DomainRecord) {
    for class in StorageClass::ALL {
        let metric = record.metric(class);
        if metric.count == 0 {
            continue;
        }
        println!(
            "      {:<16} {:>6} items  {}",
            class.to_string().dimmed(),
            metric.count,
            format_size(metric.size)
        );
    }
}

/// Print the inventory as JSON
pub fn print_inventory_json(inventory: &Inventory) {
    match serde_json::to_string_pretty(inventory) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing inventory: {}", e),
    }
}

/// Print a minimal summary
pub fn print_inventory_quiet(inventory: &Inventory) {
    println!(
        "{}  {}  {}",
        format_size(inventory.stats.total_size),
        inventory.stats.domain_count,
        inventory.stats.total_items
    );
}

/// Print filter mode and rule lists
pub fn print_filter_settings(settings: &FilterSettings) {
    println!();
    format::print_kv("Mode", &settings.mode.to_string().bold().to_string());
    for (label, rules) in [("Whitelist", &settings.whitelist), ("Blacklist", &settings.blacklist)] {
        if rules.is_empty() {
            format::print_kv(label, &"(empty)".dimmed().to_string());
        } else {
            format::print_kv(label, "");
            for rule in rules {
                println!("    {} {}", "•".dimmed(), rule);
            }
        }
    }
    println!();
}

/// Print a selective cleanup report
pub fn print_clean_report(report: &CleanReport) {
    println!();
    let (icon, mode_label) = match report.mode {
        CleanMode::DryRun => ("ℹ️", "Dry run"),
        CleanMode::Execute => ("✓", "Cleared"),
    };

    println!(
        "  {} {}: {} domains, {}",
        icon,
        mode_label.bold(),
        report.cleared.len().to_string().cyan(),
        format_size_colored(report.bytes_freed),
    );
    println!("  {} Session: {}", "💾", report.session_id.cyan());

    if !report.skipped.is_empty() {
        println!(
            "  {} Protected by filter: {}",
            "🛡",
            report.skipped.join(", ").dimmed()
        );
    }

    if !report.failed.is_empty() {
        println!();
        println!("  {} {} errors:", "⚠".yellow(), report.failed.len());
        for (i, failed) in report.failed.iter().enumerate().take(10) {
            println!(
                "    {} {}: {}",
                format!("{}.", i + 1).dimmed(),
                failed.domain,
                failed.error.dimmed()
            );
        }
        if report.failed.len() > 10 {
            println!(
                "    ... and {} more",
                (report.failed.len() - 10).to_string().dimmed()
            );
        }
    }
    println!();
}
