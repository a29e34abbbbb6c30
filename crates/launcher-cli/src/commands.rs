//! Subcommand implementations.
//!
//! Tokio runtimes are built per phase: the installer and the dispatch
//! listener are set up on a throwaway runtime, the process detaches, and the
//! dispatch server then runs on a fresh runtime in the daemon.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use crew_launcher::icon::ThemeIconResolver;
use crew_launcher::package::CrewFilelistLocator;
use crew_launcher::{DaemonHandle, DetachedSpawner, LauncherConfig, ProfileStore, StopOutcome};
use crew_launcher_server::{bind, run_installer, shutdown_signal, DispatchServer, Installer};
use std::net::TcpListener;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{error, info};

fn load_config() -> Result<LauncherConfig> {
    let config = LauncherConfig::from_env()?;
    config.ensure_dirs()?;
    Ok(config)
}

fn open_store(config: &LauncherConfig) -> Result<ProfileStore> {
    Ok(ProfileStore::open(
        &config.config_dir,
        Box::new(CrewFilelistLocator::new(config.package_meta_dir())),
        Box::new(ThemeIconResolver::new(config.icon_dirs.clone())),
    )?)
}

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")
}

fn stop_daemon(daemon: &DaemonHandle) -> Result<()> {
    match daemon.stop_existing()? {
        StopOutcome::Stopped(pid) => {
            println!("{}", format!("crew-launcher server daemon PID {} stopped.", pid).green());
        }
        StopOutcome::Signalled(pid) => {
            println!(
                "{}",
                format!(
                    "crew-launcher server daemon PID {} signalled but still shutting down.",
                    pid
                )
                .yellow()
            );
        }
        StopOutcome::AlreadyStopped(_) | StopOutcome::NotRunning => {
            println!("crew-launcher server daemon is not running.");
        }
    }
    Ok(())
}

/// Bind the dispatch port before detaching so a port conflict is reported
/// to the terminal rather than the daemon log.
fn bind_dispatch(config: &LauncherConfig, runtime: &Runtime) -> Result<TcpListener> {
    let listener = runtime
        .block_on(bind(&config.host, config.port))
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    Ok(listener.into_std()?)
}

/// Serve dispatch requests on `listener` until stopped, detaching first
/// unless `foreground`.
fn run_daemon(config: LauncherConfig, listener: TcpListener, foreground: bool) -> Result<()> {
    let daemon = DaemonHandle::new(&config);

    if foreground {
        daemon.record_pid(std::process::id())?;
        println!(
            "{}",
            format!("crew-launcher server running with PID {}.", std::process::id()).green()
        );
    } else {
        println!(
            "{}",
            format!(
                "crew-launcher server daemon started, log: {}",
                daemon.log_file().display()
            )
            .green()
        );
        daemon.daemonize()?;
    }

    let result = runtime().and_then(|runtime| {
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::from_std(listener)?;
            DispatchServer::new(config, Arc::new(DetachedSpawner))
                .serve(listener, shutdown_signal())
                .await
        })
    });

    daemon.release();
    match result {
        Ok(exit) => {
            info!("crew-launcher server exiting ({:?})", exit);
            Ok(())
        }
        Err(e) => {
            error!("Dispatch server failed: {:#}", e);
            Err(e)
        }
    }
}

pub fn add(reference: &str, update: bool) -> Result<()> {
    let config = load_config()?;
    stop_daemon(&DaemonHandle::new(&config))?;

    let mut store = open_store(&config)?;
    let (id, profile) = store.create(reference, update)?;
    let created = format!("Profile {} created for {}.", id, profile.source_path.display());
    println!("{}", created.green());

    let installer = Installer::new(profile, store.profile_path(&id), config.asset_dir.clone());
    let setup = runtime()?;
    setup.block_on(async {
        let listener = bind(&config.host, config.effective_installer_port()).await?;
        run_installer(installer, listener, &config.url_opener).await
    })?;
    let listener = bind_dispatch(&config, &setup)?;
    drop(setup);

    run_daemon(config, listener, false)
}

pub fn start(foreground: bool) -> Result<()> {
    let config = load_config()?;
    stop_daemon(&DaemonHandle::new(&config))?;

    let setup = runtime()?;
    let listener = bind_dispatch(&config, &setup)?;
    drop(setup);

    run_daemon(config, listener, foreground)
}

pub fn stop() -> Result<()> {
    let config = load_config()?;
    stop_daemon(&DaemonHandle::new(&config))
}

pub fn status() -> Result<()> {
    let config = load_config()?;
    let status = DaemonHandle::new(&config).status();

    match status.pid {
        Some(pid) => println!(
            "{}",
            format!("crew-launcher server daemon running with PID {}.", pid).green()
        ),
        None => println!("{}", "crew-launcher server daemon is not running.".red()),
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;

    println!("Installed launcher apps:");
    for summary in store.list() {
        println!("{}: {}", summary.app_name, summary.id);
    }
    Ok(())
}

pub fn remove(reference: &str) -> Result<()> {
    let config = load_config()?;
    let mut store = open_store(&config)?;

    let Some(id) = store.resolve_identifier(reference)? else {
        bail!("Cannot find a profile for {}", reference);
    };

    let path = store.profile_path(&id);
    store.delete(&id)?;
    println!("{}", format!("Profile {} removed!", path.display()).green());
    Ok(())
}

pub fn uuid(references: &[String]) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;

    let mut missing = 0;
    for reference in references {
        match store.resolve_identifier(reference) {
            Ok(Some(id)) => println!("{}", id),
            Ok(None) => {
                eprintln!("{}", format!("{}: No matching profile found.", reference).red());
                missing += 1;
            }
            Err(e) => {
                eprintln!("{}", format!("{}: {}", reference, e).red());
                missing += 1;
            }
        }
    }

    if missing > 0 {
        bail!("{} of {} reference(s) did not match a profile", missing, references.len());
    }
    Ok(())
}
