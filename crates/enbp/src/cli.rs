//! Clap derive structures for the `enbp` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// enbp -- package and deploy Enapter device blueprints
#[derive(Debug, Parser)]
#[command(
    name = "enbp",
    version,
    about = "Package and deploy Enapter device blueprints",
    long_about = "Zips blueprint sources described by a manifest.yml, uploads them to\n\
        Enapter Cloud or a local gateway, and assigns them to devices.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "ENBP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the config file's `output`)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Zip a blueprint from its manifest
    Pack(PackArgs),

    /// Package a blueprint, upload it and assign it to a device
    #[command(alias = "up")]
    Upload(UploadArgs),

    /// Manage cloud and gateway site connections
    #[command(alias = "s")]
    Sites(SitesArgs),

    /// List and select devices of the active site
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Poll the active site and device, printing changes until Ctrl-C
    Watch,

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Blueprints ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PackArgs {
    /// Path to the blueprint manifest
    #[arg(default_value = "manifest.yml")]
    pub manifest: PathBuf,

    /// Where to write the archive (defaults to blueprint.zip next to the manifest)
    #[arg(long, short = 'O')]
    pub out: Option<PathBuf>,

    /// List archive entries instead of writing the archive (unless --out is given)
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Path to the blueprint manifest (defaults to the most recently used one)
    pub manifest: Option<PathBuf>,

    /// Target device ID (defaults to the selected device)
    #[arg(long, short = 'd')]
    pub device: Option<String>,
}

// ── Sites ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List stored sites
    #[command(alias = "ls")]
    List,

    /// Connect to a gateway on the local network
    AddGateway {
        /// Gateway address, e.g. http://192.168.8.8
        #[arg(long, short = 'a')]
        address: Option<String>,

        /// Gateway API token (prompted when omitted)
        #[arg(long, env = "ENBP_GATEWAY_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Connect to a site on Enapter Cloud
    AddCloud {
        /// Cloud site ID (picked interactively when omitted)
        #[arg(long)]
        site_id: Option<String>,

        /// Display name (defaults to the remote name)
        #[arg(long)]
        name: Option<String>,

        /// Cloud API token (the stored one is used when omitted)
        #[arg(long, env = "ENBP_CLOUD_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Make a stored site the active one
    Connect {
        /// Site ID
        id: String,
    },

    /// Disconnect a site (defaults to the active one)
    Disconnect {
        /// Site ID
        id: Option<String>,
    },

    /// Forget a site and its token
    #[command(alias = "rm")]
    Remove {
        /// Site ID
        id: String,
    },

    /// Forget every site and token
    RemoveAll,

    /// Verify token, reachability and identity of a site (defaults to the active one)
    Check {
        /// Site ID
        id: Option<String>,
    },
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices of the active site
    #[command(alias = "ls")]
    List {
        /// Fetch from the site instead of the local cache
        #[arg(long, short = 'r')]
        refresh: bool,
    },

    /// Select the target device for uploads
    Select {
        /// Device ID
        id: String,
    },

    /// Clear the device selection
    Deselect,

    /// Show the selected device
    Active,

    /// Fetch the active site's devices into the local cache
    Refresh,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config and state file locations
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
