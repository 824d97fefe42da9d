//! Request handlers for the two routes the service exposes.
//!
//! Handlers are built by factory functions that capture the shared
//! [`Config`]. The returned closures satisfy [`Handler`] just like plain
//! `async fn`s, so `main` wires them into the router directly.

use std::sync::Arc;

use http::StatusCode;
use tracing::{error, info, warn};

use crate::archive::{StreamError, ZipCommand, stream_archive};
use crate::config::Config;
use crate::handler::Handler;
use crate::request::Request;
use crate::resolve::resolve_archive_dir;
use crate::response::{ContentType, Response};

/// `GET /` — serves the configured index page.
pub fn index(config: Arc<Config>) -> impl Handler {
    move |_req: Request| {
        let config = Arc::clone(&config);
        async move {
            match tokio::fs::read(&config.index_page).await {
                Ok(contents) => Response::html(contents),
                Err(e) => {
                    error!(page = %config.index_page.display(), "failed to read index page: {e}");
                    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
    }
}

/// `GET /archive/{archive_hash}/` — streams the named directory as a ZIP.
///
/// The response goes out as soon as the headers are built; a spawned task
/// keeps pumping compressor output into the body for as long as the client
/// stays connected. An unknown or invalid name gets the rendered error page.
pub fn archive(config: Arc<Config>) -> impl Handler {
    move |req: Request| {
        let config = Arc::clone(&config);
        async move {
            let name = req.param("archive_hash").unwrap_or("").to_owned();

            let Some(dir) = resolve_archive_dir(&config.data_root, &name).await else {
                warn!(archive = %name, "invalid archive requested");
                return not_found_page(&config).await;
            };

            let disposition = format!("attachment; filename=\"{name}.zip\"");
            let (sink, response) = Response::builder()
                .header("content-disposition", &disposition)
                .streamed(ContentType::Zip);

            let zip = ZipCommand::new();
            let opts = config.stream_options();
            tokio::spawn(async move {
                match stream_archive(&zip, &dir, sink, opts).await {
                    Ok(summary) => {
                        info!(
                            archive = %name,
                            chunks = summary.chunks,
                            bytes = summary.bytes,
                            "archive sent"
                        );
                    }
                    Err(e @ (StreamError::Disconnected | StreamError::Cancelled)) => {
                        warn!(archive = %name, "download interrupted: {e}");
                    }
                    Err(e) => {
                        error!(archive = %name, "archive stream failed: {e}");
                    }
                }
            });

            response
        }
    }
}

/// Renders the configured error page with a 404 status, falling back to
/// plain text if the page itself cannot be read.
async fn not_found_page(config: &Config) -> Response {
    match tokio::fs::read(&config.error_page).await {
        Ok(contents) => Response::builder().status(StatusCode::NOT_FOUND).html(contents),
        Err(e) => {
            error!(page = %config.error_page.display(), "failed to read error page: {e}");
            Response::builder().status(StatusCode::NOT_FOUND).text("archive not found")
        }
    }
}
