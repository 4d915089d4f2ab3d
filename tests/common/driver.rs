use std::collections::{HashSet, VecDeque};

use form_crawler::browser::driver::{PageDriver, WaitUntil};
use form_crawler::error::CrawlError;

/// In-memory `PageDriver` that replays a scripted page.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    /// Results handed out by successive `navigate` calls; `Ok` once drained.
    pub navigate_results: VecDeque<Result<(), String>>,
    pub network_idle_fails: bool,
    /// `wait` records the pause, then errors as a closed page would.
    pub waits_fail: bool,
    pub html: String,
    /// Served by `content` after the first `click_nth`.
    pub html_after_trigger: Option<String>,
    pub title: String,
    pub url: String,
    /// `click_nth` moves the page here when set.
    pub trigger_navigates_to: Option<String>,
    /// Selectors reported visible; clicking one hides it.
    pub visible: HashSet<String>,
    pub failing_clicks: HashSet<String>,
    pub trigger_texts: Vec<String>,
    pub overlays: u32,

    pub navigations: Vec<(String, u64, WaitUntil)>,
    pub waits: Vec<u64>,
    pub clicks: Vec<String>,
    pub nth_clicks: Vec<(String, usize)>,
    triggered: bool,
}

impl ScriptedDriver {
    pub fn with_html(html: &str) -> Self {
        Self {
            html: html.to_string(),
            title: "Fixture".to_string(),
            ..Self::default()
        }
    }

    pub fn failing_navigations(mut self, errors: &[&str]) -> Self {
        self.navigate_results = errors.iter().map(|e| Err(e.to_string())).collect();
        self
    }

    pub fn visible(mut self, selectors: &[&str]) -> Self {
        self.visible = selectors.iter().map(|s| s.to_string()).collect();
        self
    }
}

fn protocol(command: &str, error: &str) -> CrawlError {
    CrawlError::SessionProtocol {
        command: command.to_string(),
        error: error.to_string(),
    }
}

impl PageDriver for ScriptedDriver {
    fn navigate(
        &mut self,
        url: &str,
        timeout_ms: u64,
        wait_until: WaitUntil,
    ) -> Result<(), CrawlError> {
        self.navigations.push((url.to_string(), timeout_ms, wait_until));
        match self.navigate_results.pop_front() {
            Some(Err(e)) => Err(protocol("navigate", &e)),
            _ => {
                self.url = url.to_string();
                Ok(())
            }
        }
    }

    fn wait_for_load_state(&mut self, _state: WaitUntil, _timeout_ms: u64) -> Result<(), CrawlError> {
        if self.network_idle_fails {
            Err(protocol("wait_for_load_state", "Timeout 30000ms exceeded"))
        } else {
            Ok(())
        }
    }

    fn wait(&mut self, duration_ms: u64) -> Result<(), CrawlError> {
        self.waits.push(duration_ms);
        if self.waits_fail {
            Err(protocol("wait", "Target page, context or browser has been closed"))
        } else {
            Ok(())
        }
    }

    fn content(&mut self) -> Result<String, CrawlError> {
        match (&self.html_after_trigger, self.triggered) {
            (Some(html), true) => Ok(html.clone()),
            _ => Ok(self.html.clone()),
        }
    }

    fn title(&mut self) -> Result<String, CrawlError> {
        Ok(self.title.clone())
    }

    fn current_url(&mut self) -> Result<String, CrawlError> {
        Ok(self.url.clone())
    }

    fn is_visible(&mut self, selector: &str) -> Result<bool, CrawlError> {
        Ok(self.visible.contains(selector))
    }

    fn click(&mut self, selector: &str) -> Result<(), CrawlError> {
        if self.failing_clicks.contains(selector) {
            return Err(protocol("click", "element is not attached to the DOM"));
        }
        self.clicks.push(selector.to_string());
        self.visible.remove(selector);
        Ok(())
    }

    fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), CrawlError> {
        self.nth_clicks.push((selector.to_string(), index));
        self.triggered = true;
        if let Some(target) = &self.trigger_navigates_to {
            self.url = target.clone();
        }
        Ok(())
    }

    fn texts(&mut self, _selector: &str, limit: usize) -> Result<Vec<String>, CrawlError> {
        Ok(self.trigger_texts.iter().take(limit).cloned().collect())
    }

    fn hide_overlays(&mut self) -> Result<u32, CrawlError> {
        Ok(self.overlays)
    }
}
