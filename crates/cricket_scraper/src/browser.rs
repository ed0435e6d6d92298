//! Headless browser seam for client-rendered pages.
//!
//! `BrowserAutomation` is blocking (headless_chrome is), callers run it on
//! tokio's blocking pool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info};

/// One page load: open `url` as `user_agent`, wait for `ready_selector`, run `script`.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: String,
    pub user_agent: String,
    pub ready_selector: String,
    /// Expression evaluated in the page; must produce a string.
    pub script: String,
    pub timeout: Duration,
}

pub trait BrowserAutomation: Send + Sync {
    /// Returns the string the script evaluated to.
    fn render_and_evaluate(&self, request: &PageRequest) -> Result<String>;
}

/// Slack between the longest wait we ask for and Chrome's idle shutdown.
const IDLE_MARGIN: Duration = Duration::from_secs(30);

/// Local Chrome/Chromium, a fresh process per call.
#[derive(Debug, Clone)]
pub struct HeadlessChrome {
    pub sandbox: bool,
    /// Chrome exits on its own after this much inactivity. Never shorter than
    /// the page timeout plus `IDLE_MARGIN`, see `idle_timeout_for`.
    pub idle_timeout: Duration,
}

impl Default for HeadlessChrome {
    fn default() -> Self {
        Self {
            sandbox: false,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

impl HeadlessChrome {
    /// Idle shutdown must not fire while we are still waiting for the page.
    pub fn idle_timeout_for(&self, page_timeout: Duration) -> Duration {
        self.idle_timeout.max(page_timeout + IDLE_MARGIN)
    }
}

impl BrowserAutomation for HeadlessChrome {
    fn render_and_evaluate(&self, request: &PageRequest) -> Result<String> {
        let session = BrowserSession::launch(self, self.idle_timeout_for(request.timeout))?;
        let tab = &session.tab;

        tab.set_user_agent(&request.user_agent, None, None)
            .context("Failed to set user agent")?;
        tab.set_default_timeout(request.timeout);

        // Jen navigace, nečekáme na load všech zdrojů; stačí, když se objeví kontejner.
        tab.navigate_to(&request.url)
            .with_context(|| format!("Chrome navigate to {} failed", request.url))?;
        tab.wait_for_element_with_custom_timeout(&request.ready_selector, request.timeout)
            .with_context(|| format!("Chrome wait_for_element({}) failed", request.ready_selector))?;

        let result = tab
            .evaluate(&request.script, false)
            .context("In-page extraction script failed")?;

        match result.value {
            Some(serde_json::Value::String(raw)) => {
                debug!("extraction script returned {} bytes", raw.len());
                Ok(raw)
            }
            other => Err(anyhow!("extraction script returned a non-string value: {:?}", other)),
        }
    }
}

/// Browser process plus its single tab. Dropping the session closes the tab
/// and the `Browser` drop kills the process, whichever way the call ends.
struct BrowserSession {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl BrowserSession {
    fn launch(chrome: &HeadlessChrome, idle_timeout: Duration) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(chrome.sandbox)
            .idle_browser_timeout(idle_timeout)
            .build()
            .context("Failed to build Chrome launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to create browser tab")?;
        info!("Chrome launched for schedule extraction");

        Ok(Self { tab, _browser: browser })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            debug!("Chrome tab close failed: {}", e);
        }
    }
}
