use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

/// Playwright load states accepted by `page.goto(..., wait_until=...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

/// Page-level browser primitives used by the crawler.
///
/// `BrowserSession` implements this against a live Chromium; tests provide
/// scripted implementations.
pub trait PageDriver {
    fn navigate(&mut self, url: &str, timeout_ms: u64, wait_until: WaitUntil)
    -> Result<(), CrawlError>;

    fn wait_for_load_state(&mut self, state: WaitUntil, timeout_ms: u64) -> Result<(), CrawlError>;

    /// Sleep inside the page (lets timers and XHRs run).
    fn wait(&mut self, duration_ms: u64) -> Result<(), CrawlError>;

    /// Serialized DOM of the current page.
    fn content(&mut self) -> Result<String, CrawlError>;

    fn title(&mut self) -> Result<String, CrawlError>;

    fn current_url(&mut self) -> Result<String, CrawlError>;

    /// Whether the first element matching `selector` exists and is visible.
    fn is_visible(&mut self, selector: &str) -> Result<bool, CrawlError>;

    /// Click the first element matching `selector`.
    fn click(&mut self, selector: &str) -> Result<(), CrawlError>;

    /// Click the `index`-th (0-based) element matching `selector`.
    fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), CrawlError>;

    /// Inner texts of the first `limit` elements matching `selector`.
    fn texts(&mut self, selector: &str, limit: usize) -> Result<Vec<String>, CrawlError>;

    /// Hide open dialogs and remove overlay/backdrop nodes. Returns how many
    /// nodes were touched.
    fn hide_overlays(&mut self) -> Result<u32, CrawlError>;
}
