use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::tag::TagFormat;

#[derive(Parser)]
#[command(name = "hoard")]
#[command(about = "Tracks which items have ever passed through a save's inventories")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config dir, e.g. ~/.config/hoard/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Watch a save and record item history until interrupted
    Track(TrackArgs),

    /// Scan a save once and list the items currently held
    Scan(ScanArgs),

    /// Show recorded history against the catalog
    Report(ReportArgs),

    /// Toggle whether an item counts as missing
    Ignore(IgnoreArgs),

    /// List worlds under the saves directory
    Worlds,
}

#[derive(Args, Clone, Default)]
pub struct SaveArgs {
    /// Save directory (defaults to the newest "New World" under the saves root)
    pub save: Option<PathBuf>,

    /// Item catalog: registry json dump or one id per line
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// On-disk format of the save files
    #[arg(long, value_enum)]
    pub format: Option<TagFormat>,
}

#[derive(Args)]
pub struct TrackArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Scan interval, e.g. "5s"
    #[arg(long)]
    pub interval: Option<String>,

    /// Print the full item table after each cycle instead of a progress line
    #[arg(long, default_value_t = false)]
    pub table: bool,
}

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub save: SaveArgs,

    /// Only items that are neither collected nor ignored
    #[arg(long, default_value_t = false)]
    pub missing: bool,

    /// Case-insensitive substring filter on item ids
    #[arg(long)]
    pub search: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct IgnoreArgs {
    /// Item identifier, e.g. minecraft:bedrock
    pub item: String,

    #[command(flatten)]
    pub save: SaveArgs,
}
