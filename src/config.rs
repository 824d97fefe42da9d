//! Command-line arguments and runtime configuration.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::archive::{DEFAULT_CHUNK_SIZE, StreamOptions};
use crate::error::Error;

/// Command-line arguments, as parsed by clap.
#[derive(Debug, Parser)]
#[command(name = "zipserve", version, about = "Streams directories as ZIP archives over HTTP")]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Seconds to pause between consecutive response chunks
    #[arg(short = 'g', long, value_name = "SECONDS", default_value_t = 0)]
    pub chunk_gap: u64,

    /// Directory whose subdirectories are served as archives
    #[arg(short = 'p', long, value_name = "DIR")]
    pub data_path: PathBuf,

    /// Address to listen on
    #[arg(short = 'a', long, value_name = "HOST:PORT", default_value = "0.0.0.0:8080")]
    pub addr: String,

    /// Upper bound on the size of one streamed chunk, in bytes
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = parse_chunk_size
    )]
    pub chunk_size: usize,

    /// HTML page served at /
    #[arg(long, value_name = "FILE", default_value = "index.html")]
    pub index_page: PathBuf,

    /// HTML page served when an archive is unknown
    #[arg(long, value_name = "FILE", default_value = "404.html")]
    pub error_page: PathBuf,
}

fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if n == 0 {
        return Err("chunk size must be at least 1 byte".to_owned());
    }
    Ok(n)
}

/// Validated runtime configuration, shared across handlers.
///
/// `verbose` is not carried here: it is consumed once at startup when the
/// log subscriber is installed.
#[derive(Debug)]
pub struct Config {
    pub data_root: PathBuf,
    pub addr: String,
    pub chunk_size: usize,
    pub chunk_gap: Duration,
    pub index_page: PathBuf,
    pub error_page: PathBuf,
}

impl Config {
    /// Validates `args` into a runnable configuration.
    ///
    /// The data path must name an existing directory. It is canonicalized up
    /// front so per-request joins and log lines show stable absolute paths.
    pub async fn from_args(args: Args) -> Result<Self, Error> {
        let data_root = tokio::fs::canonicalize(&args.data_path)
            .await
            .map_err(|source| Error::DataRoot { path: args.data_path.clone(), source })?;

        let meta = tokio::fs::metadata(&data_root)
            .await
            .map_err(|source| Error::DataRoot { path: data_root.clone(), source })?;
        if !meta.is_dir() {
            return Err(Error::DataRoot {
                path: data_root,
                source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            });
        }

        Ok(Self {
            data_root,
            addr: args.addr,
            chunk_size: args.chunk_size,
            chunk_gap: Duration::from_secs(args.chunk_gap),
            index_page: args.index_page,
            error_page: args.error_page,
        })
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions { chunk_size: self.chunk_size, chunk_gap: self.chunk_gap }
    }
}
