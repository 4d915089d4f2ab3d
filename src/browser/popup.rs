use serde::Serialize;
use tracing::{debug, info, warn};

use crate::browser::driver::PageDriver;
use crate::extract::selectors::POPUP_DISMISSERS;

/// What the popup handler did on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopupOutcome {
    /// Selectors clicked, in click order (a selector may repeat across rounds).
    pub dismissed: Vec<String>,
    pub rounds: usize,
    /// Dialog/overlay nodes hidden or removed by the final sweep.
    pub overlays_hidden: u32,
}

/// Dismisses cookie banners, modals and overlays that block interaction.
#[derive(Debug, Clone)]
pub struct PopupHandler {
    pub selectors: Vec<String>,
    pub max_rounds: usize,
    pub pause_ms: u64,
}

impl Default for PopupHandler {
    fn default() -> Self {
        Self {
            selectors: POPUP_DISMISSERS.iter().map(|s| s.to_string()).collect(),
            max_rounds: 3,
            pause_ms: 1_000,
        }
    }
}

impl PopupHandler {
    /// Run the dismissal loop. Never fails: every error is logged and skipped.
    pub fn dismiss(&self, driver: &mut dyn PageDriver) -> PopupOutcome {
        let mut outcome = PopupOutcome::default();

        for round in 0..self.max_rounds {
            outcome.rounds = round + 1;
            let mut clicked = 0;

            for selector in &self.selectors {
                match driver.is_visible(selector) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        debug!("visibility check for '{}' failed: {}", selector, e);
                        continue;
                    }
                }

                match driver.click(selector) {
                    Ok(()) => {
                        info!("dismissed popup: {}", selector);
                        outcome.dismissed.push(selector.clone());
                        clicked += 1;
                        if let Err(e) = driver.wait(self.pause_ms) {
                            debug!("pause after popup click failed: {}", e);
                        }
                    }
                    Err(e) => warn!("popup handling warning ({}): {}", selector, e),
                }
            }

            if clicked == 0 {
                break;
            }
        }

        match driver.hide_overlays() {
            Ok(n) => outcome.overlays_hidden = n,
            Err(e) => warn!("could not hide overlays: {}", e),
        }

        outcome
    }
}
