//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which lays out a media root in a temp directory
//! and builds a full [`AppContext`] around it. The encoder is replaced by a
//! `sh -c` script and the prober reads the codec name from the file itself,
//! so no ffmpeg install is needed.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use stromboli::conversion::{ConversionSupervisor, Transcoder};
use stromboli::library::Sandbox;
use stromboli::probe::AudioProber;
use stromboli::server::{create_router, AppContext};
use tempfile::TempDir;
use tokio::process::Command;
use tower::ServiceExt;

/// Runs a shell script as the encoder, with the source path as `$1`.
pub struct ShellTranscoder {
    program: String,
    script: String,
    calls: AtomicUsize,
}

impl ShellTranscoder {
    pub fn new(script: &str) -> Self {
        Self {
            program: "sh".to_string(),
            script: script.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// An encoder whose program does not exist.
    pub fn missing() -> Self {
        Self {
            program: "/nonexistent/stromboli-test-encoder".to_string(),
            script: String::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcoder for ShellTranscoder {
    fn name(&self) -> &str {
        "test-encoder"
    }

    fn command(&self, source: &Path) -> Command {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c").arg(&self.script).arg("sh").arg(source);
        cmd
    }
}

/// Reports the file's trimmed contents as its audio codec. Empty files have
/// no audio; files starting with `!` fail to probe.
pub struct FileProber;

#[async_trait]
impl AudioProber for FileProber {
    async fn audio_codec(&self, path: &Path) -> stromboli_av::Result<Option<String>> {
        let contents = std::fs::read_to_string(path)?;
        let codec = contents.trim();
        if codec.starts_with('!') {
            return Err(stromboli_av::Error::tool_failed("ffprobe", codec));
        }
        Ok(Some(codec.to_string()).filter(|c| !c.is_empty()))
    }
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub transcoder: Arc<ShellTranscoder>,
    pub dir: TempDir,
}

impl TestHarness {
    /// Empty media root, encoder running `script`.
    pub fn new(script: &str) -> Self {
        Self::with_transcoder(ShellTranscoder::new(script))
    }

    pub fn with_transcoder(transcoder: ShellTranscoder) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let sandbox = Sandbox::new(dir.path()).expect("failed to create sandbox");
        let transcoder = Arc::new(transcoder);
        let supervisor = Arc::new(ConversionSupervisor::new(transcoder.clone()));
        let ctx = AppContext::new(sandbox, Arc::new(FileProber), supervisor);
        Self {
            ctx,
            transcoder,
            dir,
        }
    }

    /// Write a file under the media root, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(path, contents).expect("failed to write fixture");
    }

    pub fn mkdir(&self, rel: &str) {
        std::fs::create_dir_all(self.dir.path().join(rel)).expect("failed to create dir");
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    /// Start an Axum server on a random port.
    pub async fn serve(&self) -> SocketAddr {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    /// Wait until a conversion holds the slot and return its pid.
    pub async fn wait_active(&self) -> u32 {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(pid) = self.ctx.supervisor.active().await.and_then(|a| a.pid) {
                    return pid;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("no conversion became active")
    }

    /// Wait until the conversion slot is empty.
    pub async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.ctx.supervisor.active().await.is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("conversion slot was not released");
    }
}

/// Collect a response body.
pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

/// Whether a process with this pid still exists.
pub fn alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
