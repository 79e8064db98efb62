use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "prl",
    about = "Persistent Reasoning Lineage — identity-anchored, append-only lineage",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./prl.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Lineage log file, overriding the configured path
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the canonical encoding of a JSON payload
    Canon(CanonArgs),
    /// Derive an identity anchor, optionally checking an observed payload
    Anchor(AnchorArgs),
    /// Append a commit to the lineage log
    Append(AppendArgs),
    /// List commits in (timestamp, id) order
    Log(LogArgs),
    /// Show a single commit
    Show(ShowArgs),
    /// List the ancestors of a commit
    Ancestors(AncestorsArgs),
    /// List the common ancestors of two commits
    Lca(LcaArgs),
    /// Analyze a merge between two heads
    Analyze(AnalyzeArgs),
    /// Commit an explicitly resolved merge
    Resolve(ResolveArgs),
    /// Run the built-in merge scenarios on a scratch store
    Demo(DemoArgs),
}

/// Identity metadata, each field defaulting to the configured value.
#[derive(Args, Clone, Debug, Default)]
pub struct IdentityArgs {
    #[arg(long)]
    pub kind: Option<String>,
    #[arg(long)]
    pub namespace: Option<String>,
    #[arg(long)]
    pub scope: Option<String>,
}

#[derive(Args)]
pub struct CanonArgs {
    /// JSON text, `@path` to read a file, or `-` for stdin
    pub payload: String,
}

#[derive(Args)]
pub struct AnchorArgs {
    /// JSON text, `@path` to read a file, or `-` for stdin
    pub payload: String,
    #[command(flatten)]
    pub identity: IdentityArgs,
    /// Check this payload against the derived anchor
    #[arg(long)]
    pub observed: Option<String>,
}

#[derive(Args)]
pub struct AppendArgs {
    /// JSON text, `@path` to read a file, or `-` for stdin
    pub payload: String,
    #[arg(long, default_value = "add")]
    pub op: String,
    /// Parent commit id (repeat for merges)
    #[arg(short, long = "parent")]
    pub parents: Vec<String>,
    /// Explicit subject id; derived from the payload anchor when omitted
    #[arg(long)]
    pub subject: Option<String>,
    #[command(flatten)]
    pub identity: IdentityArgs,
    #[arg(short, long, default_value = "")]
    pub note: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub commit: String,
}

#[derive(Args)]
pub struct AncestorsArgs {
    pub commit: String,
}

#[derive(Args)]
pub struct LcaArgs {
    pub left: String,
    pub right: String,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    pub left: String,
    pub right: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub left: String,
    pub right: String,
    /// JSON object mapping subject id to resolved payload (`@path` or `-` allowed)
    #[arg(long)]
    pub resolutions: Option<String>,
    /// Start from the payloads the analysis proposes
    #[arg(long)]
    pub accept_proposals: bool,
    #[command(flatten)]
    pub identity: IdentityArgs,
    #[arg(short, long, default_value = "merge commit")]
    pub note: String,
}

#[derive(Args)]
pub struct DemoArgs {
    #[arg(long, default_value = "all")]
    pub scenario: Scenario,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    All,
    NoConflict,
    Conflict,
    Collision,
}
