//! End-to-end tests for the `crew-launcher` binary.
//!
//! Every test runs the binary against its own temporary directories and
//! dispatch port, passed through `CREW_LAUNCHER_*` variables.

use crew_launcher::icon::ThemeIconResolver;
use crew_launcher::package::CrewFilelistLocator;
use crew_launcher::{ProfileId, ProfileStore};
use std::path::PathBuf;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

struct TestEnv {
    temp_dir: TempDir,
    port: u16,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("pwa")).unwrap();
        std::fs::write(temp_dir.path().join("pwa/app.html"), "<html>app</html>").unwrap();
        Self {
            temp_dir,
            port: free_port(),
        }
    }

    fn config_dir(&self) -> PathBuf {
        self.temp_dir.path().join("config")
    }

    fn pid_file(&self) -> PathBuf {
        self.temp_dir.path().join("tmp").join("daemon.pid")
    }

    fn command(&self) -> Command {
        let binary = env!("CARGO_BIN_EXE_crew-launcher");
        let mut command = Command::new(binary);
        command
            .env("CREW_LAUNCHER_CONFIG_DIR", self.config_dir())
            .env("CREW_LAUNCHER_TMP_DIR", self.temp_dir.path().join("tmp"))
            .env("CREW_LAUNCHER_ASSET_DIR", self.temp_dir.path().join("pwa"))
            .env("CREW_LAUNCHER_PORT", self.port.to_string())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .kill_on_drop(true);
        command
    }

    async fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .expect("failed to run crew-launcher")
    }

    /// Write a desktop entry and create its profile in the config dir.
    fn add_profile(&self) -> (ProfileId, PathBuf) {
        let icon = self.temp_dir.path().join("icons/foo.png");
        std::fs::create_dir_all(icon.parent().unwrap()).unwrap();
        std::fs::write(&icon, b"\x89PNG\r\n\x1a\n").unwrap();

        let desktop = self.temp_dir.path().join("applications/foo.desktop");
        std::fs::create_dir_all(desktop.parent().unwrap()).unwrap();
        std::fs::write(
            &desktop,
            format!(
                "[Desktop Entry]\nType=Application\nName=Foo\nExec=true %U\nIcon={}\n",
                icon.display()
            ),
        )
        .unwrap();

        std::fs::create_dir_all(self.config_dir()).unwrap();
        let mut store = ProfileStore::open(
            &self.config_dir(),
            Box::new(CrewFilelistLocator::new(self.temp_dir.path().join("meta"))),
            Box::new(ThemeIconResolver::new(vec![])),
        )
        .unwrap();
        let (id, _) = store.create(desktop.to_str().unwrap(), false).unwrap();
        (id, desktop)
    }
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A foreground dispatch server whose exit is awaited in the background, so
/// it is reaped as soon as it stops.
struct ForegroundServer {
    pid: u32,
    exit: JoinHandle<std::io::Result<ExitStatus>>,
}

impl ForegroundServer {
    async fn start(env: &TestEnv) -> Self {
        let mut child: Child = env
            .command()
            .args(["start", "--foreground"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn crew-launcher");
        let pid = child.id().expect("child has no PID");

        let stdout = child.stdout.take().expect("failed to capture stdout");
        let mut lines = tokio::io::BufReader::new(stdout).lines();
        let announced = format!("crew-launcher server running with PID {}.", pid);
        let started = tokio::time::timeout(Duration::from_secs(15), async {
            while let Ok(Some(line)) = lines.next_line().await {
                if line.contains(&announced) {
                    return true;
                }
            }
            false
        })
        .await;
        assert_eq!(started, Ok(true), "server did not announce itself");
        assert!(wait_for_port(env.port).await, "server never accepted connections");

        let exit = tokio::spawn(async move {
            let status = child.wait().await;
            drop(lines);
            status
        });
        Self { pid, exit }
    }

    async fn exited(self, timeout: Duration) -> ExitStatus {
        tokio::time::timeout(timeout, self.exit)
            .await
            .expect("server kept running")
            .unwrap()
            .unwrap()
    }
}

async fn wait_for_port(port: u16) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Send a raw `GET` and return the whole answer.
async fn http_get(port: u16, path: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut answer = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut answer)).await;
    String::from_utf8_lossy(&answer).into_owned()
}

fn assert_exit_code(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[tokio::test]
async fn test_start_status_stop() {
    let env = TestEnv::new();
    let server = ForegroundServer::start(&env).await;
    let pid = server.pid;
    assert!(env.pid_file().exists());

    let status = env.run(&["status"]).await;
    assert_exit_code(&status, 0);
    assert!(
        stdout(&status).contains(&format!("crew-launcher server daemon running with PID {}.", pid)),
        "{}",
        stdout(&status)
    );

    let stop = env.run(&["stop"]).await;
    assert_exit_code(&stop, 0);
    assert!(
        stdout(&stop).contains(&format!("crew-launcher server daemon PID {} stopped.", pid)),
        "{}",
        stdout(&stop)
    );
    assert!(server.exited(Duration::from_secs(5)).await.success());
    assert!(!env.pid_file().exists());

    let again = env.run(&["stop"]).await;
    assert_exit_code(&again, 0);
    assert!(stdout(&again).contains("crew-launcher server daemon is not running."));
}

#[tokio::test]
async fn test_http_stop_exits_despite_open_connection() {
    let env = TestEnv::new();
    let (id, _) = env.add_profile();
    let server = ForegroundServer::start(&env).await;

    // A client that never finishes its request.
    let mut idle = TcpStream::connect(("127.0.0.1", env.port)).await.unwrap();
    idle.write_all(format!("GET /{}/run HTTP/1.1\r\n", id).as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let answer = http_get(env.port, &format!("/{}/stop", id)).await;
    assert!(answer.starts_with("HTTP/1.1 200"), "{}", answer);
    assert!(answer.contains("crew-launcher server terminated: User interrupt."));

    assert!(server.exited(Duration::from_secs(5)).await.success());
    assert!(!env.pid_file().exists());
    assert!(TcpStream::connect(("127.0.0.1", env.port)).await.is_err());
}

#[tokio::test]
async fn test_stop_without_daemon() {
    let env = TestEnv::new();

    for _ in 0..2 {
        let stop = env.run(&["stop"]).await;
        assert_exit_code(&stop, 0);
        assert!(stdout(&stop).contains("crew-launcher server daemon is not running."));
    }
}

#[tokio::test]
async fn test_list_uuid_remove() {
    let env = TestEnv::new();
    let (id, desktop) = env.add_profile();
    let desktop = desktop.to_str().unwrap();

    let list = env.run(&["list"]).await;
    assert_exit_code(&list, 0);
    assert_eq!(stdout(&list), format!("Installed launcher apps:\nFoo: {}\n", id));

    let uuid = env.run(&["uuid", desktop]).await;
    assert_exit_code(&uuid, 0);
    assert_eq!(stdout(&uuid).trim(), id.to_string());

    let remove = env.run(&["remove", desktop]).await;
    assert_exit_code(&remove, 0);
    assert!(stdout(&remove).contains("removed!"), "{}", stdout(&remove));
    assert!(!env.config_dir().join(format!("{}.json", id)).exists());

    let missing = env.run(&["uuid", desktop]).await;
    assert_exit_code(&missing, 1);
    assert!(String::from_utf8_lossy(&missing.stderr).contains("No matching profile found."));
}

#[tokio::test]
async fn test_usage_error_exit_code() {
    let env = TestEnv::new();
    let output = env.run(&["frobnicate"]).await;
    assert_exit_code(&output, 2);
}
