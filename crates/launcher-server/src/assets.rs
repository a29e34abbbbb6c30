//! Static install-flow assets and small response helpers.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::Path;
use tracing::{debug, warn};

/// Page served by `run` when `app.html` is missing from the asset directory.
const FALLBACK_LAUNCHER_PAGE: &str = concat!(
    "<!DOCTYPE html>\n<html>\n",
    "<head><meta charset=\"utf-8\"><title>crew-launcher</title></head>\n",
    "<body><p>Launching application&hellip;</p>",
    "<script>setTimeout(() => window.close(), 1000);</script></body>\n",
    "</html>\n",
);

pub(crate) fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

pub(crate) fn with_type(content_type: &str, body: impl Into<Body>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type.to_string())],
        body.into(),
    )
        .into_response()
}

/// Serve a file from `asset_dir` by its bare file name, 404 if absent.
pub(crate) async fn serve_asset(asset_dir: &Path, name: &str) -> Response {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return not_found();
    }

    let path = asset_dir.join(name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            with_type(mime.as_ref(), bytes)
        }
        Err(e) => {
            debug!("Asset {} not served: {}", path.display(), e);
            not_found()
        }
    }
}

/// The launcher UI page, served after a `run` request.
pub(crate) async fn launcher_page(asset_dir: &Path, page: &str) -> Response {
    let path = asset_dir.join(page);
    match tokio::fs::read(&path).await {
        Ok(bytes) => with_type("text/html", bytes),
        Err(e) => {
            warn!("Launcher page {} unavailable ({}), using built-in page", path.display(), e);
            with_type("text/html", FALLBACK_LAUNCHER_PAGE)
        }
    }
}
