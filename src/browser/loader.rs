use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::browser::driver::{PageDriver, WaitUntil};
use crate::error::CrawlError;

/// Pages slower than this are flagged in diagnostics.
pub const SLOW_LOAD_MS: u128 = 30_000;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Timeout for the first, quick attempt.
    pub quick_timeout_ms: u64,
    /// Timeout for the fallback attempts.
    pub timeout_ms: u64,
    /// Best-effort network idle wait after a successful load.
    pub network_idle_timeout_ms: u64,
    /// Extra sleep for JavaScript frameworks to render.
    pub settle_ms: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            quick_timeout_ms: 30_000,
            timeout_ms: 60_000,
            network_idle_timeout_ms: 30_000,
            settle_ms: 3_000,
        }
    }
}

impl LoadOptions {
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        let timeout_ms = timeout_secs.saturating_mul(1000);
        Self {
            quick_timeout_ms: timeout_ms.min(30_000),
            timeout_ms,
            ..Self::default()
        }
    }

    /// Strategy ladder, tried in order until one navigation succeeds.
    pub fn strategies(&self) -> [(WaitUntil, u64); 3] {
        [
            (WaitUntil::Load, self.quick_timeout_ms),
            (WaitUntil::DomContentLoaded, self.timeout_ms),
            (WaitUntil::Load, self.timeout_ms),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadAttempt {
    pub wait_until: WaitUntil,
    pub timeout_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// The wait condition of the attempt that succeeded.
    pub strategy: WaitUntil,
    pub attempts: Vec<LoadAttempt>,
    pub elapsed_ms: u128,
    pub network_idle: bool,
}

impl LoadReport {
    pub fn is_slow(&self) -> bool {
        self.elapsed_ms > SLOW_LOAD_MS
    }
}

/// Navigate to `url`, falling back through the strategy ladder.
pub fn load_page(
    driver: &mut dyn PageDriver,
    url: &str,
    options: &LoadOptions,
) -> Result<LoadReport, CrawlError> {
    let start = Instant::now();
    let mut attempts = Vec::new();
    let mut loaded = None;

    for (i, (wait_until, timeout_ms)) in options.strategies().into_iter().enumerate() {
        debug!(
            attempt = i + 1,
            wait_until = wait_until.as_str(),
            timeout_ms,
            "navigating to {}",
            url
        );
        match driver.navigate(url, timeout_ms, wait_until) {
            Ok(()) => {
                attempts.push(LoadAttempt {
                    wait_until,
                    timeout_ms,
                    error: None,
                });
                loaded = Some(wait_until);
                break;
            }
            Err(e) => {
                warn!(
                    "load strategy {} ({}, {}ms) failed: {}",
                    i + 1,
                    wait_until.as_str(),
                    timeout_ms,
                    e
                );
                attempts.push(LoadAttempt {
                    wait_until,
                    timeout_ms,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let Some(strategy) = loaded else {
        return Err(CrawlError::PageLoad {
            url: url.to_string(),
            attempts: attempts
                .iter()
                .map(|a| {
                    format!(
                        "{} ({}ms): {}",
                        a.wait_until.as_str(),
                        a.timeout_ms,
                        a.error.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect(),
        });
    };

    let network_idle =
        match driver.wait_for_load_state(WaitUntil::NetworkIdle, options.network_idle_timeout_ms) {
            Ok(()) => true,
            Err(e) => {
                warn!("network may still be active, continuing: {}", e);
                false
            }
        };

    if options.settle_ms > 0 {
        if let Err(e) = driver.wait(options.settle_ms) {
            warn!("settle wait failed: {}", e);
        }
    }

    let elapsed_ms = start.elapsed().as_millis();
    info!(
        strategy = strategy.as_str(),
        elapsed_ms, network_idle, "page loaded: {}", url
    );

    Ok(LoadReport {
        strategy,
        attempts,
        elapsed_ms,
        network_idle,
    })
}
