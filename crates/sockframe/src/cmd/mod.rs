use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use sockframe_conn::{
    ConnectionConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_THRESHOLD,
};
use sockframe_frame::PREFIX_SIZE;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an echo server.
    Echo(EchoArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Listen and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Buffer sizing shared by every subcommand that opens a connection.
#[derive(Args, Debug, Clone)]
pub struct BufferArgs {
    /// Read buffer capacity in bytes; bounds the largest receivable message.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BUFFER_CAPACITY)]
    pub reader_capacity: usize,
    /// Write buffer capacity in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BUFFER_CAPACITY)]
    pub writer_capacity: usize,
    /// Flush as soon as more than this many bytes are queued.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    pub flush_threshold: usize,
    /// Only flush when the write buffer runs out of room.
    #[arg(long, conflicts_with = "flush_threshold")]
    pub no_auto_flush: bool,
}

impl BufferArgs {
    pub fn to_config(&self) -> CliResult<ConnectionConfig> {
        for (name, capacity) in [
            ("--reader-capacity", self.reader_capacity),
            ("--writer-capacity", self.writer_capacity),
        ] {
            if capacity <= PREFIX_SIZE {
                return Err(CliError::new(
                    USAGE,
                    format!("{name} must be greater than {PREFIX_SIZE}"),
                ));
            }
        }

        Ok(ConnectionConfig {
            reader_capacity: self.reader_capacity,
            writer_capacity: self.writer_capacity,
            flush_threshold: (!self.no_auto_flush).then_some(self.flush_threshold),
        })
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to bind (e.g. 127.0.0.1:7000).
    pub bind: SocketAddr,
    #[command(flatten)]
    pub buffers: BufferArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Candidate addresses, tried round-robin until one connects.
    #[arg(required = true)]
    pub addrs: Vec<SocketAddr>,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Wait for one reply message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Overall deadline for connecting, sending and waiting (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    #[command(flatten)]
    pub buffers: BufferArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (e.g. 127.0.0.1:7000).
    pub bind: SocketAddr,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    #[command(flatten)]
    pub buffers: BufferArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
