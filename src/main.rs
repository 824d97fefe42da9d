use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use zipserve::config::{Args, Config};
use zipserve::{Router, Server, handlers};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), zipserve::Error> {
    let config = Arc::new(Config::from_args(args).await?);

    let app = Router::new()
        .get("/", handlers::index(Arc::clone(&config)))
        .get("/archive/{archive_hash}/", handlers::archive(Arc::clone(&config)));

    Server::bind(&config.addr).await?.serve(app).await
}

/// `-v` lowers the default level to debug; `RUST_LOG` overrides both.
fn init_tracing(verbose: bool) {
    let default = if verbose { "zipserve=debug" } else { "zipserve=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
