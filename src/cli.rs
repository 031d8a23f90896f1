use clap::{Parser, Subcommand};
use maildrain::config::Overrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "maildrain")]
#[command(about = "Drain an object storage prefix into a Maildir", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $MAILDRAIN_CONFIG or config/maildrain.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deliver every object under the prefix into the Maildir
    Drain(DrainArgs),
    /// Print the effective configuration as TOML
    Config(DrainArgs),
}

#[derive(clap::Args, Debug)]
pub struct DrainArgs {
    /// Name of the bucket
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix of the messages, without the trailing '/'
    #[arg(long)]
    pub prefix: Option<String>,

    /// Objects listed and fetched per page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Delete objects after they are delivered
    #[arg(long, overrides_with = "keep")]
    pub delete: bool,

    /// Keep objects in the bucket after delivery
    #[arg(long, overrides_with = "delete")]
    pub keep: bool,

    /// AWS profile from the shared credentials file
    #[arg(long)]
    pub profile: Option<String>,

    /// Maildir to deliver to
    #[arg(long)]
    pub maildir: Option<PathBuf>,

    /// Concurrent transfers per page
    #[arg(long)]
    pub workers: Option<usize>,

    /// Host name used in delivered filenames
    #[arg(long)]
    pub hostname: Option<String>,
}

impl DrainArgs {
    pub fn overrides(&self) -> Overrides {
        let delete = match (self.delete, self.keep) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };

        Overrides {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            page_size: self.page_size,
            delete,
            profile: self.profile.clone(),
            maildir: self.maildir.clone(),
            workers: self.workers,
            hostname: self.hostname.clone(),
        }
    }
}
