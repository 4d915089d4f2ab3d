use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::browser::driver::{PageDriver, WaitUntil};
use crate::error::CrawlError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Options passed to browser_server.js as its single argv JSON argument.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchOptions {
    #[serde(skip)]
    pub node_binary: String,
    #[serde(skip)]
    pub server_script: String,
    pub headless: bool,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub args: Vec<String>,
    /// Install the `navigator.webdriver` override before any page script runs.
    pub stealth: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            node_binary: "node".to_string(),
            server_script: "node/browser_server.js".to_string(),
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            locale: "en-US".to_string(),
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
            stealth: true,
        }
    }
}

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
        timeout_ms: u64,
        wait_until: WaitUntil,
    },
    WaitForLoadState {
        cmd: &'static str,
        state: WaitUntil,
        timeout_ms: u64,
    },
    Wait {
        cmd: &'static str,
        duration_ms: u64,
    },
    Selector {
        cmd: &'static str,
        selector: String,
    },
    ClickNth {
        cmd: &'static str,
        selector: String,
        index: usize,
    },
    QueryTexts {
        cmd: &'static str,
        selector: String,
        limit: usize,
    },
    Bare {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str, timeout_ms: u64, wait_until: WaitUntil) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
            timeout_ms,
            wait_until,
        }
    }

    pub fn wait_for_load_state(state: WaitUntil, timeout_ms: u64) -> Self {
        BrowserRequest::WaitForLoadState {
            cmd: "wait_for_load_state",
            state,
            timeout_ms,
        }
    }

    pub fn wait(duration_ms: u64) -> Self {
        BrowserRequest::Wait {
            cmd: "wait",
            duration_ms,
        }
    }

    pub fn content() -> Self {
        BrowserRequest::Bare { cmd: "content" }
    }

    pub fn title() -> Self {
        BrowserRequest::Bare { cmd: "title" }
    }

    pub fn current_url() -> Self {
        BrowserRequest::Bare { cmd: "current_url" }
    }

    pub fn query_visible(selector: &str) -> Self {
        BrowserRequest::Selector {
            cmd: "query_visible",
            selector: selector.to_string(),
        }
    }

    pub fn query_count(selector: &str) -> Self {
        BrowserRequest::Selector {
            cmd: "query_count",
            selector: selector.to_string(),
        }
    }

    pub fn click(selector: &str) -> Self {
        BrowserRequest::Selector {
            cmd: "click",
            selector: selector.to_string(),
        }
    }

    pub fn click_nth(selector: &str, index: usize) -> Self {
        BrowserRequest::ClickNth {
            cmd: "click_nth",
            selector: selector.to_string(),
            index,
        }
    }

    pub fn query_texts(selector: &str, limit: usize) -> Self {
        BrowserRequest::QueryTexts {
            cmd: "query_texts",
            selector: selector.to_string(),
            limit,
        }
    }

    pub fn hide_overlays() -> Self {
        BrowserRequest::Bare {
            cmd: "hide_overlays",
        }
    }

    pub fn quit() -> Self {
        BrowserRequest::Bare { cmd: "quit" }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub texts: Option<Vec<String>>,
}

/// A persistent browser session backed by browser_server.js.
///
/// Launches a long-lived Node.js process that keeps a Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    closed: bool,
}

impl BrowserSession {
    /// Launch a new browser session by spawning browser_server.js.
    pub fn launch(options: &LaunchOptions) -> Result<Self, CrawlError> {
        let launch_json = serde_json::to_string(options).map_err(|e| CrawlError::JsonSerialize {
            context: "LaunchOptions".into(),
            source: e,
        })?;

        debug!(script = %options.server_script, headless = options.headless, "launching browser bridge");

        let mut child = Command::new(&options.node_binary)
            .arg(&options.server_script)
            .arg(&launch_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| CrawlError::SubprocessSpawn {
                script: options.server_script.clone(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            CrawlError::SessionIO("Failed to capture stdin of browser_server.js".into())
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CrawlError::SessionIO("Failed to capture stdout of browser_server.js".into())
        })?;

        let mut reader = BufReader::new(stdout);

        // Wait for the ready signal
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| CrawlError::SessionIO(format!("Failed to read ready signal: {}", e)))?;

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| CrawlError::JsonParse {
                context: "browser_server.js ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            let _ = child.kill();
            return Err(CrawlError::SessionProtocol {
                command: "launch".into(),
                error: response
                    .error
                    .unwrap_or_else(|| "Did not receive ready signal from browser_server.js".into()),
            });
        }

        Ok(BrowserSession {
            child,
            stdin,
            reader,
            closed: false,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, CrawlError> {
        let json = serde_json::to_string(request).map_err(|e| CrawlError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;
        trace!(request = %json, "bridge request");

        writeln!(self.stdin, "{}", json).map_err(|e| {
            CrawlError::SessionIO(format!("Failed to write to browser_server.js stdin: {}", e))
        })?;

        self.stdin.flush().map_err(|e| {
            CrawlError::SessionIO(format!("Failed to flush browser_server.js stdin: {}", e))
        })?;

        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            CrawlError::SessionIO(format!("Failed to read from browser_server.js stdout: {}", e))
        })?;

        if line.trim().is_empty() {
            return Err(CrawlError::SessionIO(
                "Empty response from browser_server.js (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| CrawlError::JsonParse {
            context: "browser_server.js response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(
        &mut self,
        request: &BrowserRequest,
        command_name: &str,
    ) -> Result<BrowserResponse, CrawlError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(CrawlError::SessionProtocol {
                command: command_name.into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(response)
    }

    /// Count elements matching a CSS selector.
    pub fn query_count(&mut self, selector: &str) -> Result<u32, CrawlError> {
        let response = self.send_ok(&BrowserRequest::query_count(selector), "query_count")?;
        Ok(response.count.unwrap_or(0))
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> Result<(), CrawlError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Best-effort: the process may already be gone
        if let Err(e) = self.send(&BrowserRequest::quit()) {
            warn!("browser bridge did not acknowledge quit: {}", e);
        }
        let _ = self.child.wait();
        Ok(())
    }
}

impl PageDriver for BrowserSession {
    fn navigate(
        &mut self,
        url: &str,
        timeout_ms: u64,
        wait_until: WaitUntil,
    ) -> Result<(), CrawlError> {
        self.send_ok(&BrowserRequest::navigate(url, timeout_ms, wait_until), "navigate")?;
        Ok(())
    }

    fn wait_for_load_state(&mut self, state: WaitUntil, timeout_ms: u64) -> Result<(), CrawlError> {
        self.send_ok(
            &BrowserRequest::wait_for_load_state(state, timeout_ms),
            "wait_for_load_state",
        )?;
        Ok(())
    }

    fn wait(&mut self, duration_ms: u64) -> Result<(), CrawlError> {
        self.send_ok(&BrowserRequest::wait(duration_ms), "wait")?;
        Ok(())
    }

    fn content(&mut self) -> Result<String, CrawlError> {
        let response = self.send_ok(&BrowserRequest::content(), "content")?;
        response.html.ok_or_else(|| CrawlError::SessionProtocol {
            command: "content".into(),
            error: "No html in content response".into(),
        })
    }

    fn title(&mut self) -> Result<String, CrawlError> {
        let response = self.send_ok(&BrowserRequest::title(), "title")?;
        Ok(response.title.unwrap_or_default())
    }

    fn current_url(&mut self) -> Result<String, CrawlError> {
        let response = self.send_ok(&BrowserRequest::current_url(), "current_url")?;
        response.url.ok_or_else(|| CrawlError::SessionProtocol {
            command: "current_url".into(),
            error: "No URL in current_url response".into(),
        })
    }

    fn is_visible(&mut self, selector: &str) -> Result<bool, CrawlError> {
        let response = self.send_ok(&BrowserRequest::query_visible(selector), "query_visible")?;
        Ok(response.visible.unwrap_or(false))
    }

    fn click(&mut self, selector: &str) -> Result<(), CrawlError> {
        self.send_ok(&BrowserRequest::click(selector), "click")?;
        Ok(())
    }

    fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), CrawlError> {
        self.send_ok(&BrowserRequest::click_nth(selector, index), "click_nth")?;
        Ok(())
    }

    fn texts(&mut self, selector: &str, limit: usize) -> Result<Vec<String>, CrawlError> {
        let response = self.send_ok(&BrowserRequest::query_texts(selector, limit), "query_texts")?;
        Ok(response.texts.unwrap_or_default())
    }

    fn hide_overlays(&mut self) -> Result<u32, CrawlError> {
        let response = self.send_ok(&BrowserRequest::hide_overlays(), "hide_overlays")?;
        Ok(response.count.unwrap_or(0))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
