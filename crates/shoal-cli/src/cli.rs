use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shoal",
    about = "Distributed shared-array cluster: shard servers and workers",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Plain-text, whitespace-delimited peer address list (servers first).
    #[arg(long, global = true, default_value = "peers.txt")]
    pub peers: PathBuf,

    /// Default port for peer entries that carry no port of their own.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub port: u16,

    /// Explicit local address; rank is auto-detected when omitted.
    #[arg(long, global = true)]
    pub local: Option<SocketAddr>,

    /// Global element count of the shared array.
    #[arg(long, global = true, default_value_t = 1024)]
    pub table_size: usize,

    /// Number of server ranks (a prefix of the peer list); defaults to
    /// every peer.
    #[arg(long, global = true)]
    pub servers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve this rank's shard of the array
    Serve(ServeArgs),
    /// Add a constant-valued delta to the whole array
    Add(AddArgs),
    /// Fetch the whole array and print a digest
    Get(GetArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Shard checkpoint path: loaded at startup if present, stored on exit.
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Serve exactly this many requests, then exit (0 = serve forever).
    #[arg(long, default_value_t = 0)]
    pub requests: u64,
}

#[derive(Args)]
pub struct AddArgs {
    /// Delta applied to every element.
    #[arg(long)]
    pub value: f32,
}

#[derive(Args)]
pub struct GetArgs {
    /// Verify that every fetched element equals this value.
    #[arg(long)]
    pub expect: Option<f32>,
}
