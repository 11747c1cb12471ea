use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use originscope::cleanup::{self, CleanMode};
use originscope::cli::args::{Cli, Commands, ConfigAction, FilterAction, OutputFormat};
use originscope::cli::output;
use originscope::common::config::Config;
use originscope::common::format;
use originscope::filter::{FilterPolicy, FilterSettings, TomlSettingsStore};
use originscope::host::SnapshotHost;
use originscope::inventory::{CollectionCoordinator, Inventory};
use originscope::sampler::CookieSampler;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let filter = if cli.verbose {
        EnvFilter::new("originscope=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            ref snapshot,
            detailed,
            estimate_opaque,
        } => {
            let (config, format) = load_config(&cli)?;
            cmd_scan(&cli, &config, format, snapshot, detailed, estimate_opaque)
        }

        Commands::Filter { ref action } => {
            let (config, format) = load_config(&cli)?;
            cmd_filter(&cli, &config, format, action)
        }

        Commands::Clean {
            ref snapshot,
            execute,
        } => {
            let (config, format) = load_config(&cli)?;
            cmd_clean(&cli, &config, format, snapshot, execute)
        }

        Commands::Config { ref action } => cmd_config(action),

        Commands::Completions { ref shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let shell = match shell {
                originscope::cli::args::CompletionShell::Bash => clap_complete::Shell::Bash,
                originscope::cli::args::CompletionShell::Zsh => clap_complete::Shell::Zsh,
                originscope::cli::args::CompletionShell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(shell, &mut cmd, "originscope", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Config file plus the effective output format (`--format` wins)
fn load_config(cli: &Cli) -> Result<(Config, OutputFormat)> {
    let config = Config::load()?;
    let format = cli.format.unwrap_or(config.output_format);
    Ok((config, format))
}

fn load_policy(cli: &Cli, config: &Config) -> FilterPolicy {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(|| config.settings_path.clone());
    FilterPolicy::new(TomlSettingsStore::new(path))
}

fn collect(
    cli: &Cli,
    config: &Config,
    host: &SnapshotHost,
    estimate_opaque: bool,
) -> Result<Inventory> {
    let mut options = config.sampler_options();
    options.opaque_size_estimates |= estimate_opaque;

    let cookie_sampler = match host.now {
        Some(now) => CookieSampler::at(now),
        None => CookieSampler::new(),
    };

    let inventory = CollectionCoordinator::new(host)
        .with_sampler_options(options)
        .with_cookie_sampler(cookie_sampler)
        .with_top_n(cli.top.unwrap_or(config.top_n))
        .collect()
        .context("Storage collection failed")?;
    Ok(inventory)
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

fn cmd_scan(
    cli: &Cli,
    config: &Config,
    format: OutputFormat,
    snapshot: &std::path::Path,
    detailed: bool,
    estimate_opaque: bool,
) -> Result<()> {
    let host = SnapshotHost::from_file(snapshot)?;
    let inventory = collect(cli, config, &host, estimate_opaque)?;

    match format {
        OutputFormat::Human => {
            output::print_inventory(&inventory, detailed, cli.top.unwrap_or(config.top_n))
        }
        OutputFormat::Json => output::print_inventory_json(&inventory),
        OutputFormat::Quiet => output::print_inventory_quiet(&inventory),
    }

    Ok(())
}

// ─── Filter ───────────────────────────────────────────────────────────────────

fn cmd_filter(cli: &Cli, config: &Config, format: OutputFormat, action: &FilterAction) -> Result<()> {
    let policy = load_policy(cli, config);

    match action {
        FilterAction::Show => {
            let settings = policy
                .try_settings()
                .context("Failed to read filter settings")?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
                OutputFormat::Quiet => println!("{}", settings.mode),
                OutputFormat::Human => output::print_filter_settings(&settings),
            }
        }
        FilterAction::Check { url } => {
            let allowed = policy.is_allowed(url);
            let host = originscope::filter::normalize(url);
            match format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "input": url,
                        "hostname": host,
                        "allowed": allowed,
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                OutputFormat::Quiet => {
                    println!("{}", if allowed { "allowed" } else { "blocked" })
                }
                OutputFormat::Human => {
                    let verdict = if allowed {
                        "allowed".green().bold()
                    } else {
                        "blocked".red().bold()
                    };
                    let shown = if host.is_empty() { url.as_str() } else { host.as_str() };
                    println!("  {} is {}", shown, verdict);
                }
            }
        }
        FilterAction::SetMode { mode } => {
            let mut settings = editable_settings(&policy)?;
            settings.mode = (*mode).into();
            policy.save(&settings)?;
            println!("  {} Filter mode set to {}", "✓".green(), settings.mode);
        }
        FilterAction::Add { list, rule } => {
            let mut settings = editable_settings(&policy)?;
            if settings.add_rule((*list).into(), rule) {
                policy.save(&settings)?;
                println!("  {} Added {}", "✓".green(), rule);
            } else {
                println!("  {} {} is already listed", "ℹ️", rule);
            }
        }
        FilterAction::Remove { list, rule } => {
            let mut settings = editable_settings(&policy)?;
            if settings.remove_rule((*list).into(), rule) {
                policy.save(&settings)?;
                println!("  {} Removed {}", "✓".green(), rule);
            } else {
                println!("  {} {} was not listed", "ℹ️", rule);
            }
        }
    }

    Ok(())
}

/// Settings to edit; an unreadable file aborts instead of being overwritten
fn editable_settings(policy: &FilterPolicy) -> Result<FilterSettings> {
    policy
        .try_settings()
        .context("Refusing to edit filter settings that could not be read")
}

// ─── Clean ────────────────────────────────────────────────────────────────────

fn cmd_clean(
    cli: &Cli,
    config: &Config,
    format: OutputFormat,
    snapshot: &std::path::Path,
    execute: bool,
) -> Result<()> {
    let host = SnapshotHost::from_file(snapshot)?;
    let inventory = collect(cli, config, &host, false)?;
    let policy = load_policy(cli, config);

    let mode = if execute {
        CleanMode::Execute
    } else {
        CleanMode::DryRun
    };
    let show_progress = matches!(format, OutputFormat::Human);
    let report = cleanup::clean_domains(&inventory.domains, &policy, &host, mode, show_progress);

    match format {
        OutputFormat::Human => output::print_clean_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {
            println!(
                "{}  {}  {}",
                format::format_size(report.bytes_freed),
                report.cleared.len(),
                report.session_id
            );
        }
    }

    Ok(())
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            Config::init_dirs()?;
            let config = Config::default();
            config.save()?;
            println!("  {} OriginScope initialized at ~/.originscope", "✓".green());
            Ok(())
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("  {} Configuration reset to defaults", "✓".green());
            Ok(())
        }
    }
}
