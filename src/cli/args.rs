use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use crate::common::config::OutputFormat;

/// OriginScope: per-origin browser storage inventory
#[derive(Parser, Debug)]
#[command(
    name = "originscope",
    version,
    about = "Inventory browser storage per domain",
    long_about = "OriginScope samples LocalStorage, SessionStorage, IndexedDB, Cache Storage\n\
                   and cookies for every open origin, merges them per hostname and\n\
                   reports storage analytics. Domain filtering decides what is touched.",
    after_help = "EXAMPLES:\n  \
        originscope scan snapshot.json                 Inventory a browser snapshot\n  \
        originscope scan snapshot.json --format json   Full inventory as JSON\n  \
        originscope filter set-mode blacklist          Enable blacklist filtering\n  \
        originscope filter add blacklist *.ads.test    Block a domain family\n  \
        originscope filter check https://a.ads.test/   Check one URL\n  \
        originscope clean snapshot.json                Preview selective cleanup\n  \
        originscope clean snapshot.json --execute      Clear every allowed domain"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (overrides config)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Length of ranking lists (overrides config)
    #[arg(long, global = true, value_name = "N")]
    pub top: Option<usize>,

    /// Filter settings file (overrides config)
    #[arg(long, global = true, env = "ORIGINSCOPE_SETTINGS", value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inventory storage from a browser snapshot
    Scan {
        /// JSON snapshot of open origins and the cookie jar
        snapshot: PathBuf,

        /// Show per-domain class breakdown
        #[arg(long)]
        detailed: bool,

        /// Estimate IndexedDB/Cache sizes from their counts
        #[arg(long)]
        estimate_opaque: bool,
    },

    /// Inspect and edit domain filter settings
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Clear storage for every domain the filter allows
    Clean {
        /// JSON snapshot of open origins and the cookie jar
        snapshot: PathBuf,

        /// Actually clear (default is a dry run)
        #[arg(long)]
        execute: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
pub enum FilterAction {
    /// Show the current mode and rule lists
    Show,

    /// Check whether a URL or hostname is allowed
    Check {
        url: String,
    },

    /// Change the filter mode
    SetMode {
        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Add a rule to a list
    Add {
        #[arg(value_enum)]
        list: ListArg,
        /// Exact domain or `*.suffix`
        rule: String,
    },

    /// Remove a rule from a list
    Remove {
        #[arg(value_enum)]
        list: ListArg,
        rule: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset to default configuration
    Reset,

    /// Initialize the data directory and default config
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Disabled,
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListArg {
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

impl From<ModeArg> for crate::filter::FilterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Disabled => crate::filter::FilterMode::Disabled,
            ModeArg::Whitelist => crate::filter::FilterMode::Whitelist,
            ModeArg::Blacklist => crate::filter::FilterMode::Blacklist,
        }
    }
}

impl From<ListArg> for crate::filter::RuleList {
    fn from(list: ListArg) -> Self {
        match list {
            ListArg::Whitelist => crate::filter::RuleList::Whitelist,
            ListArg::Blacklist => crate::filter::RuleList::Blacklist,
        }
    }
}
