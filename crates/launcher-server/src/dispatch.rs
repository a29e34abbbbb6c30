//! Long-lived dispatch server.
//!
//! Routes `GET /<id>/<action>` for every installed profile:
//!
//! - `run` launches the profile's command (or `?shortcut=<action>`) and
//!   answers with the launcher page
//! - `stop` answers with a notice and shuts the server down
//!
//! Profiles are read from disk on every request, so profiles added or
//! removed while the daemon runs are picked up without a restart.

use crate::assets::{launcher_page, not_found, with_type};
use crate::serve::serve_until;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use crew_launcher::config::PathsConfig;
use crew_launcher::profile::load_profile;
use crew_launcher::{CommandSpawner, LauncherConfig, Profile, ProfileId};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Body of the `stop` response.
pub const STOP_NOTICE: &str = "crew-launcher server terminated: User interrupt.";

/// What a `run` request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Spawned(u32),
    ShortcutNotFound,
    SpawnFailed,
}

/// Why [`DispatchServer::serve`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
    /// A client requested `/<id>/stop`.
    StopRequested,
    /// The external shutdown future resolved (signal).
    Interrupted,
}

struct DispatchState {
    config: LauncherConfig,
    spawner: Arc<dyn CommandSpawner>,
    shutdown: Arc<Notify>,
}

impl DispatchState {
    fn launch(&self, profile: &Profile, shortcut: Option<&str>) -> LaunchOutcome {
        let command = match profile.command_line(shortcut) {
            Ok(command) => command,
            Err(e) => {
                error!("{}", e);
                return LaunchOutcome::ShortcutNotFound;
            }
        };

        let log_path = self.config.command_log(&profile.id);
        match self.spawner.spawn(command, &log_path) {
            Ok(pid) => {
                info!(
                    "Profile {} ({}): '{}' as PID {}, output in {}",
                    profile.id,
                    profile.name,
                    command,
                    pid,
                    log_path.display()
                );
                LaunchOutcome::Spawned(pid)
            }
            Err(e) => {
                error!("Failed to launch profile {}: {}", profile.id, e);
                LaunchOutcome::SpawnFailed
            }
        }
    }
}

/// Dispatch server over the profiles in `config.config_dir`.
pub struct DispatchServer {
    state: Arc<DispatchState>,
}

impl DispatchServer {
    pub fn new(config: LauncherConfig, spawner: Arc<dyn CommandSpawner>) -> Self {
        Self {
            state: Arc::new(DispatchState {
                config,
                spawner,
                shutdown: Arc::new(Notify::new()),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/:id/:action", get(handle_dispatch))
            .with_state(self.state.clone())
    }

    /// Serve until a `stop` request arrives or `interrupt` resolves.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        interrupt: F,
    ) -> anyhow::Result<DispatchExit>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (exit_tx, exit_rx) = tokio::sync::oneshot::channel();
        let stop = self.state.shutdown.clone();

        serve_until(listener, self.router(), async move {
            let exit = tokio::select! {
                _ = stop.notified() => DispatchExit::StopRequested,
                _ = interrupt => DispatchExit::Interrupted,
            };
            let _ = exit_tx.send(exit);
        })
        .await?;

        let exit = exit_rx.await.unwrap_or(DispatchExit::Interrupted);
        info!("Dispatch server stopped ({:?})", exit);
        Ok(exit)
    }
}

fn shortcut_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "shortcut")
        .map(|(_, value)| value.into_owned())
}

async fn handle_dispatch(
    State(state): State<Arc<DispatchState>>,
    params: Result<Path<(String, String)>, PathRejection>,
    RawQuery(query): RawQuery,
) -> Response {
    let Ok(Path((id, action))) = params else {
        return not_found();
    };
    let Ok(id) = id.parse::<ProfileId>() else {
        debug!("Not a profile identifier: {}", id);
        return not_found();
    };

    let profile = match load_profile(&state.config.config_dir, &id) {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            warn!("No profile for {}", id);
            return not_found();
        }
        Err(e) => {
            error!("Failed to load profile {}: {}", id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match action.as_str() {
        "run" => {
            let shortcut = shortcut_param(query.as_deref());
            state.launch(&profile, shortcut.as_deref());
            launcher_page(&state.config.asset_dir, PathsConfig::LAUNCHER_PAGE).await
        }
        "stop" => {
            info!("Stop requested through profile {}", id);
            state.shutdown.notify_one();
            with_type("text/plain", STOP_NOTICE)
        }
        _ => not_found(),
    }
}
