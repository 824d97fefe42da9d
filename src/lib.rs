//! # zipserve
//!
//! An HTTP service that streams directories as ZIP archives, compressed on
//! the fly. Nothing is pre-built. Nothing is cached.
//!
//! ## The contract
//!
//! Files land on the host under one data root, one subdirectory per upload
//! (`/srv/photos/3bea29ccabbbf64bdebcc055319c5745/…`). A client that knows
//! the directory name fetches `/archive/3bea29…/` and receives a ZIP of its
//! contents, produced by a `zip` subprocess at request time:
//!
//! - **No staging** — archive bytes go straight from `zip`'s stdout to the
//!   socket in bounded chunks; disk usage never grows with downloads.
//! - **Always current** — every download re-reads the directory, so it
//!   reflects additions and deletions immediately.
//! - **No orphans** — the subprocess is killed and reaped on every exit
//!   path, including mid-download disconnects.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use zipserve::config::Config;
//! use zipserve::{Router, Server, handlers};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), zipserve::Error> {
//!     let config = Arc::new(Config {
//!         data_root: "/srv/photos".into(),
//!         addr: "0.0.0.0:8080".into(),
//!         chunk_size: zipserve::archive::DEFAULT_CHUNK_SIZE,
//!         chunk_gap: Duration::ZERO,
//!         index_page: "index.html".into(),
//!         error_page: "404.html".into(),
//!     });
//!
//!     let app = Router::new()
//!         .get("/", handlers::index(Arc::clone(&config)))
//!         .get("/archive/{archive_hash}/", handlers::archive(Arc::clone(&config)));
//!
//!     Server::bind(&config.addr).await?.serve(app).await
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod archive;
pub mod config;
pub mod handlers;
pub mod resolve;

pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{Body, ContentType, Response, ResponseSink};
pub use router::Router;
pub use server::Server;
