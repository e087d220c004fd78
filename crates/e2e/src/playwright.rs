//! Playwright browser automation
//!
//! A [`PlaywrightSession`] owns one Node process running a small bridge
//! script. The script keeps a single page open for the whole scenario and
//! answers newline-delimited JSON commands on stdin/stdout, so DOM state
//! survives from one step to the next.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::browser::{Browser, Launcher, Locator};
use crate::error::{E2eError, E2eResult};

/// Extra time the bridge gets on top of the engine's own action timeout.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(15);

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const path = require('path');
const playwright = require('playwright');

const options = JSON.parse(process.argv[2]);

function send(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function resolve(page, desc) {
  let locator = page;
  for (const s of desc.chain) {
    switch (s.by) {
      case 'css': locator = locator.locator(s.css); break;
      case 'label': locator = locator.getByLabel(s.text); break;
      case 'filter': locator = locator.locator(s.css).filter({ hasText: s.has_text }); break;
      case 'heading': locator = locator.getByRole('heading', { name: s.name }); break;
      default: throw new Error('unknown selector: ' + s.by);
    }
  }
  return desc.first ? locator.first() : locator;
}

(async () => {
  const browser = await playwright[options.browser].launch({ headless: options.headless });
  const context = await browser.newContext({
    viewport: { width: options.viewport_width, height: options.viewport_height },
    recordVideo: { dir: options.artifact_dir },
  });
  context.setDefaultTimeout(options.timeout_ms);
  await context.tracing.start({ screenshots: true, snapshots: true });
  const page = await context.newPage();
  let failed = false;
  let tracing = true;

  async function handle(cmd) {
    switch (cmd.op) {
      case 'goto': await page.goto(cmd.url); return null;
      case 'url': return page.url();
      case 'count': return await resolve(page, cmd.locator).count();
      case 'visible': return await resolve(page, cmd.locator).isVisible();
      case 'enabled': return await resolve(page, cmd.locator).isEnabled();
      case 'checked': return await resolve(page, cmd.locator).isChecked();
      case 'click': await resolve(page, cmd.locator).click(); return null;
      case 'fill': await resolve(page, cmd.locator).fill(cmd.value); return null;
      case 'text': {
        const locator = resolve(page, cmd.locator);
        if ((await locator.count()) === 0) return null;
        return await locator.first().textContent();
      }
      case 'attribute': {
        const locator = resolve(page, cmd.locator);
        if ((await locator.count()) === 0) return null;
        return await locator.first().getAttribute(cmd.name);
      }
      case 'input_value': return await resolve(page, cmd.locator).inputValue();
      case 'capture': {
        failed = true;
        const paths = [];
        const screenshot = path.join(options.artifact_dir, cmd.name + '.png');
        await page.screenshot({ path: screenshot, fullPage: true });
        paths.push(screenshot);
        if (tracing) {
          const trace = path.join(options.artifact_dir, cmd.name + '-trace.zip');
          await context.tracing.stop({ path: trace });
          tracing = false;
          paths.push(trace);
        }
        const video = page.video();
        if (video) paths.push(await video.path());
        return paths;
      }
      case 'close': {
        const video = page.video();
        if (tracing) await context.tracing.stop();
        await context.close();
        if (!failed && video) await video.delete();
        await browser.close();
        return null;
      }
      default: throw new Error('unknown op: ' + cmd.op);
    }
  }

  send({ id: 0, ok: true, value: null });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const cmd = JSON.parse(line);
    try {
      const value = await handle(cmd);
      send({ id: cmd.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      send({ id: cmd.id, ok: false, error: error.message, error_name: error.name });
    }
    if (cmd.op === 'close') break;
  }
  process.exit(0);
})().catch((error) => {
  send({ id: 0, ok: false, error: error.message, error_name: error.name });
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" => Ok(BrowserKind::Webkit),
            other => Err(E2eError::Configuration(format!("Unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub action_timeout: Duration,
    /// Per-scenario artifact directories are created below this one
    pub artifact_dir: PathBuf,
    /// Directory whose `node_modules` provides `playwright`
    pub node_project_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout: Duration::from_secs(20),
            artifact_dir: PathBuf::from("test-results/artifacts"),
            node_project_dir: PathBuf::from("."),
        }
    }
}

/// Launch options handed to the bridge script
#[derive(Debug, Serialize)]
struct BridgeOptions<'a> {
    browser: &'static str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    timeout_ms: u64,
    artifact_dir: &'a Path,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeOp<'a> {
    Goto { url: &'a str },
    Url,
    Count { locator: &'a Locator },
    Visible { locator: &'a Locator },
    Enabled { locator: &'a Locator },
    Checked { locator: &'a Locator },
    Click { locator: &'a Locator },
    Fill { locator: &'a Locator, value: &'a str },
    Text { locator: &'a Locator },
    Attribute { locator: &'a Locator, name: &'a str },
    InputValue { locator: &'a Locator },
    Capture { name: &'a str },
    Close,
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    op: BridgeOp<'a>,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_name: Option<String>,
}

impl BridgeResponse {
    fn into_result(self) -> E2eResult<serde_json::Value> {
        if self.ok {
            return Ok(self.value);
        }
        let message = self.error.unwrap_or_else(|| "unknown bridge error".to_string());
        match self.error_name.as_deref() {
            Some("TimeoutError") => Err(E2eError::Timeout(message)),
            _ => Err(E2eError::Playwright(message)),
        }
    }
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl BridgeIo {
    async fn read_response(&mut self) -> E2eResult<BridgeResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Playwright("bridge exited".to_string()))?;
            let line = line.trim();
            if !line.starts_with('{') {
                // Stray console output from the page or the engine
                debug!("[bridge] {}", line);
                continue;
            }
            return Ok(serde_json::from_str(line)?);
        }
    }

    async fn await_response(&mut self, id: u64) -> E2eResult<serde_json::Value> {
        loop {
            let response = self.read_response().await?;
            if response.id == id {
                return response.into_result();
            }
            warn!("Dropping stale bridge response {} (waiting for {})", response.id, id);
        }
    }
}

/// One browser context driven through the bridge.
pub struct PlaywrightSession {
    io: Mutex<BridgeIo>,
    child: Mutex<Child>,
    next_id: AtomicU64,
    response_timeout: Duration,
    artifact_dir: PathBuf,
    // Holds the bridge script on disk for the lifetime of the process
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Start Node, launch the browser and wait for the bridge to report ready
    pub async fn launch(config: &PlaywrightConfig, artifact_dir: PathBuf) -> E2eResult<Self> {
        std::fs::create_dir_all(&artifact_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let options = serde_json::to_string(&BridgeOptions {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            timeout_ms: config.action_timeout.as_millis() as u64,
            artifact_dir: &artifact_dir,
        })?;

        debug!("Running Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(options)
            .current_dir(&config.node_project_dir)
            .env("NODE_PATH", config.node_project_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        let mut io = BridgeIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let ready = timeout(LAUNCH_TIMEOUT, io.read_response())
            .await
            .map_err(|_| E2eError::Timeout("Playwright bridge to start".to_string()))??;
        ready.into_result()?;

        info!("Launched {} (headless: {})", config.browser.as_str(), config.headless);

        Ok(Self {
            io: Mutex::new(io),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
            response_timeout: config.action_timeout + RESPONSE_GRACE,
            artifact_dir,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    pub fn check_playwright_installed(node_project_dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(node_project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    async fn request(&self, op: BridgeOp<'_>) -> E2eResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&BridgeRequest { id, op })?;
        line.push('\n');

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        timeout(self.response_timeout, io.await_response(id))
            .await
            .map_err(|_| E2eError::Timeout(format!("bridge response to request {}", id)))?
    }

    async fn request_as<T: serde::de::DeserializeOwned>(&self, op: BridgeOp<'_>) -> E2eResult<T> {
        let value = self.request(op).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Make sure the Node process is gone
    async fn terminate(&self) -> E2eResult<()> {
        let mut child = self.child.lock().await;

        if let Ok(Ok(status)) = timeout(CLOSE_TIMEOUT, child.wait()).await {
            debug!("Bridge exited with {}", status);
            return Ok(());
        }

        // Try graceful shutdown first
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && timeout(Duration::from_millis(500), child.wait()).await.is_ok()
            {
                return Ok(());
            }
        }

        warn!("Force killing Playwright bridge");
        child.kill().await?;
        Ok(())
    }
}

#[async_trait]
impl Browser for PlaywrightSession {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.request(BridgeOp::Goto { url })
            .await
            .map_err(|e| match e {
                E2eError::Playwright(msg) | E2eError::Timeout(msg) => {
                    E2eError::Navigation(format!("{}: {}", url, msg))
                }
                other => other,
            })?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        self.request_as(BridgeOp::Url).await
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.request_as(BridgeOp::Count { locator }).await
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        self.request_as(BridgeOp::Visible { locator }).await
    }

    async fn is_enabled(&self, locator: &Locator) -> E2eResult<bool> {
        self.request_as(BridgeOp::Enabled { locator }).await
    }

    async fn is_checked(&self, locator: &Locator) -> E2eResult<bool> {
        self.request_as(BridgeOp::Checked { locator }).await
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        debug!("click {}", locator);
        self.request(BridgeOp::Click { locator }).await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        debug!("fill {}", locator);
        self.request(BridgeOp::Fill { locator, value }).await?;
        Ok(())
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        self.request_as(BridgeOp::Text { locator }).await
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        self.request_as(BridgeOp::Attribute { locator, name }).await
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        self.request_as(BridgeOp::InputValue { locator }).await
    }

    async fn capture_failure(&self, name: &str) -> E2eResult<Vec<PathBuf>> {
        let paths: Vec<PathBuf> = self.request_as(BridgeOp::Capture { name }).await?;
        info!("Kept {} artifact(s) in {}", paths.len(), self.artifact_dir.display());
        Ok(paths)
    }

    async fn close(&self) -> E2eResult<()> {
        let closed = self.request(BridgeOp::Close).await;
        self.terminate().await?;
        closed.map(|_| ())
    }
}

/// Starts one Playwright session per scenario attempt.
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    /// Create a launcher, failing early when Playwright is not installed
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        PlaywrightSession::check_playwright_installed(&config.node_project_dir)?;
        std::fs::create_dir_all(&config.artifact_dir)?;
        Ok(Self { config })
    }
}

#[async_trait]
impl Launcher for PlaywrightLauncher {
    async fn launch(&self, label: &str) -> E2eResult<Arc<dyn Browser>> {
        let dir = self.config.artifact_dir.join(sanitize(label));
        let session = PlaywrightSession::launch(&self.config, dir).await?;
        Ok(Arc::new(session))
    }
}

/// Directory-safe form of a scenario label
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let locator = Locator::css("#form-container-1").locator("[data-zip-code-input]");
        let request = BridgeRequest {
            id: 7,
            op: BridgeOp::Fill {
                locator: &locator,
                value: "10001",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["op"], "fill");
        assert_eq!(json["value"], "10001");
        assert_eq!(json["locator"]["chain"][1]["css"], "[data-zip-code-input]");

        let json = serde_json::to_value(BridgeRequest { id: 8, op: BridgeOp::InputValue { locator: &locator } }).unwrap();
        assert_eq!(json["op"], "input_value");
    }

    #[test]
    fn test_response_errors_map_to_taxonomy() {
        let timeout: BridgeResponse = serde_json::from_str(
            r#"{"id":3,"ok":false,"error":"locator.click: Timeout 20000ms exceeded.","error_name":"TimeoutError"}"#,
        )
        .unwrap();
        assert!(matches!(timeout.into_result(), Err(E2eError::Timeout(_))));

        let other: BridgeResponse =
            serde_json::from_str(r#"{"id":4,"ok":false,"error":"boom","error_name":"Error"}"#).unwrap();
        assert!(matches!(other.into_result(), Err(E2eError::Playwright(_))));

        let ok: BridgeResponse = serde_json::from_str(r#"{"id":5,"ok":true,"value":3}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), serde_json::json!(3));
    }

    #[test]
    fn test_browser_kind_parse() {
        assert_eq!("firefox".parse::<BrowserKind>().unwrap(), BrowserKind::Firefox);
        assert_eq!("chrome".parse::<BrowserKind>().unwrap(), BrowserKind::Chromium);
        assert!("opera".parse::<BrowserKind>().is_err());
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize("zip-code-validation#2"), "zip-code-validation-2");
        assert_eq!(sanitize("End to End"), "End-to-End");
    }

    #[test]
    fn test_bridge_handles_every_op() {
        for op in [
            "goto", "url", "count", "visible", "enabled", "checked", "click", "fill", "text",
            "attribute", "input_value", "capture", "close",
        ] {
            assert!(BRIDGE_SCRIPT.contains(&format!("case '{}'", op)), "missing op {op}");
        }
    }
}
