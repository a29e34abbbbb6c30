//! One-shot installer server.
//!
//! Serves exactly one profile's manifest, icon and the static install-flow
//! assets until the page requests `/stop`. Every GET is dispatched on the last
//! path segment only, so the installer page can use paths scoped under the
//! profile (`/<id>/manifest.webmanifest`) while the assets live in one flat
//! directory.

use crate::assets::{not_found, serve_asset, with_type};
use crate::serve::serve_until;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use crew_launcher::config::PathsConfig;
use crew_launcher::{platform, Profile};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

const MANIFEST_NAME: &str = "manifest.webmanifest";
const MANIFEST_TYPE: &str = "application/manifest+json";
const ICON_NAME: &str = "appicon";
const STOP_NAME: &str = "stop";

struct InstallerState {
    profile: Profile,
    manifest_path: PathBuf,
    asset_dir: PathBuf,
    shutdown: Arc<Notify>,
}

/// Installer server for a single profile.
pub struct Installer {
    state: Arc<InstallerState>,
}

impl Installer {
    /// `manifest_path` is the persisted profile document, served verbatim.
    pub fn new(profile: Profile, manifest_path: PathBuf, asset_dir: PathBuf) -> Self {
        Self {
            state: Arc::new(InstallerState {
                profile,
                manifest_path,
                asset_dir,
                shutdown: Arc::new(Notify::new()),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .fallback(get(handle_installer))
            .with_state(self.state.clone())
    }

    /// URL of the install page for a server listening on `port`.
    pub fn install_url(&self, port: u16) -> String {
        format!(
            "http://localhost:{}/{}/{}",
            port,
            self.state.profile.id,
            PathsConfig::INSTALLER_PAGE
        )
    }

    /// Serve until the install page requests `/stop`.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let shutdown = self.state.shutdown.clone();
        serve_until(listener, self.router(), async move {
            shutdown.notified().await;
        })
        .await?;
        info!("Installer server stopped");
        Ok(())
    }
}

/// Open the install page through `url_opener` and serve until `/stop`.
///
/// A failure to open the page is logged; the server still runs so the page
/// can be opened by hand.
pub async fn run_installer(
    installer: Installer,
    listener: TcpListener,
    url_opener: &[String],
) -> anyhow::Result<()> {
    let url = installer.install_url(listener.local_addr()?.port());
    info!("Installer page: {}", url);

    if url_opener.is_empty() {
        warn!("No URL opener configured, open {} manually", url);
    } else if let Err(e) = platform::open_url(url_opener, &url) {
        warn!("Failed to open installer page: {}", e);
    }

    installer.serve(listener).await
}

async fn handle_installer(State(state): State<Arc<InstallerState>>, uri: Uri) -> Response {
    let name = uri.path().rsplit('/').next().unwrap_or_default();

    match name {
        MANIFEST_NAME => match tokio::fs::read(&state.manifest_path).await {
            Ok(bytes) => with_type(MANIFEST_TYPE, bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found(),
            Err(e) => {
                error!("Failed to read {}: {}", state.manifest_path.display(), e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        ICON_NAME => {
            let Some(icon) = state.profile.icon() else {
                return not_found();
            };
            match tokio::fs::read(&icon.path).await {
                Ok(bytes) => with_type(&icon.mime_type, bytes),
                Err(e) => {
                    warn!("Icon {} unavailable: {}", icon.path.display(), e);
                    not_found()
                }
            }
        }
        STOP_NAME => {
            info!("Installer stop requested");
            state.shutdown.notify_one();
            StatusCode::OK.into_response()
        }
        other => serve_asset(&state.asset_dir, other).await,
    }
}
