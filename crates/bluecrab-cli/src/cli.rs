use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bluecrab",
    about = "BlueCrab — tamper-evident append-only record store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "bluecrab.toml")]
    pub config: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a store configuration and schema stub
    Init(InitArgs),
    /// Seal a payload into the next block
    Append(AppendArgs),
    /// Verify chain integrity from genesis
    Verify(VerifyArgs),
    /// Rebuild linkage and digests from payload content
    Repair(RepairArgs),
    /// Show a single block
    Show(ShowArgs),
    /// Show the newest blocks
    Log(LogArgs),
    /// Export the chain as a text log
    Export(ExportArgs),
    /// Import a chain from a text log
    Import(ImportArgs),
    /// List the fields declared by the schema
    Fields(FieldsArgs),
    /// Find the first block carrying a key=value pair
    Find(FindArgs),
    /// Show store status
    Status(StatusArgs),
}

#[derive(Args)]
pub struct InitArgs {
    #[arg(long, default_value = "bluecrab")]
    pub protocol: String,
    #[arg(long, default_value = "bluecrab.schema")]
    pub schema: String,
    #[arg(long, default_value = "bluecrab.db")]
    pub storage: String,
    #[arg(long)]
    pub read_only: bool,
}

#[derive(Args)]
pub struct AppendArgs {
    pub payload: String,
    #[arg(long)]
    pub require_fields: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[arg(long)]
    pub require_fields: bool,
}

#[derive(Args)]
pub struct RepairArgs {}

#[derive(Args)]
pub struct ShowArgs {
    pub index: u64,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ExportArgs {
    pub path: String,
}

#[derive(Args)]
pub struct ImportArgs {
    pub path: String,
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args)]
pub struct FieldsArgs {}

#[derive(Args)]
pub struct FindArgs {
    pub key: String,
    pub value: String,
    #[arg(long, default_value = "0")]
    pub start: u64,
}

#[derive(Args)]
pub struct StatusArgs {}
