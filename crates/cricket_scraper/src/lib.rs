//! Cricbuzz scraper for live scores and the upcoming international schedule.
//!
//! Two independent pipelines:
//! - live scores: one plain HTTP GET, HTML parsed with `scraper`
//! - upcoming schedule: client-rendered, so it is loaded in headless Chrome and
//!   extracted by a script running inside the page
//!
//! Každý fetcher má dvě podoby: `try_fetch_*` vrací typovanou chybu,
//! `fetch_*` ji zaloguje a vrátí prázdný seznam.

pub mod browser;
pub mod live;
pub mod upcoming;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{debug, info, warn};

use crate::browser::{BrowserAutomation, HeadlessChrome, PageRequest};
use crate::upcoming::{dedupe_by_link, SchedulePayload, EXTRACT_UPCOMING_SCRIPT, SCHEDULE_READY_SELECTOR};

/// Desktop Firefox identity for the plain HTTP fetch. Cricbuzz rejects clients it does not recognise.
const LIVE_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0";
const LIVE_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const LIVE_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
const LIVE_REFERER: &str = "https://www.google.com/";

/// Chrome identity for the schedule page, which is more bot-sensitive.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Live match as published on `/live-matches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveMatch {
    pub title: String,
    pub team1: String,
    pub score1: String,
    pub team2: String,
    pub score2: String,
    pub status: String,
}

/// Upcoming match as published on `/upcoming-matches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingMatch {
    pub series: String,
    #[serde(rename = "match")]
    pub title: String,
    pub date: String,
    pub venue: String,
    pub teams: String,
    pub link: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} answered HTTP {status}")]
    HttpStatus { url: String, status: StatusCode },
    #[error("{url} served an anti-bot challenge page")]
    Blocked { url: String },
    #[error("browser automation failed: {0:#}")]
    Browser(anyhow::Error),
    #[error("browser task did not complete: {0}")]
    Task(#[from] task::JoinError),
    #[error("page script returned invalid JSON: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("page script returned payload version {found}, expected {expected}")]
    PayloadVersion { found: u32, expected: u32 },
    #[error("invalid site origin {origin}: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },
}

/// Where to scrape and how patient to be about it.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub live_url: String,
    pub upcoming_url: String,
    /// Prefix for the relative match links found on the schedule page.
    pub site_origin: String,
    pub request_timeout: Duration,
    /// Upper bound for the schedule container to appear after navigation.
    pub browser_timeout: Duration,
    pub max_concurrent_browsers: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            live_url: "https://www.cricbuzz.com/cricket-match/live-scores".to_string(),
            upcoming_url: "https://www.cricbuzz.com/cricket-schedule/upcoming-series/international"
                .to_string(),
            site_origin: "https://www.cricbuzz.com".to_string(),
            request_timeout: Duration::from_secs(15),
            browser_timeout: Duration::from_secs(30),
            max_concurrent_browsers: 2,
        }
    }
}

pub struct CricketScraper {
    client: reqwest::Client,
    browser: Arc<dyn BrowserAutomation>,
    browser_slots: Arc<Semaphore>,
    config: ScraperConfig,
}

impl CricketScraper {
    /// Scraper backed by a local headless Chrome.
    pub fn new(config: ScraperConfig) -> Result<Self> {
        Self::with_browser(config, Arc::new(HeadlessChrome::default()))
    }

    pub fn with_browser(config: ScraperConfig, browser: Arc<dyn BrowserAutomation>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(LIVE_ACCEPT));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(LIVE_ACCEPT_LANGUAGE));
        headers.insert(header::REFERER, HeaderValue::from_static(LIVE_REFERER));

        let client = reqwest::Client::builder()
            .user_agent(LIVE_USER_AGENT)
            .default_headers(headers)
            .timeout(config.request_timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            browser,
            browser_slots: Arc::new(Semaphore::new(config.max_concurrent_browsers.max(1))),
            config,
        })
    }

    pub async fn try_fetch_live_matches(&self) -> Result<Vec<LiveMatch>, ScrapeError> {
        let url = &self.config.live_url;
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus { url: url.clone(), status });
        }

        let html = resp.text().await?;
        let matches = live::parse_live_matches(&html);
        if matches.is_empty() && live::looks_like_challenge_page(&html) {
            return Err(ScrapeError::Blocked { url: url.clone() });
        }

        debug!("live page {} bytes -> {} matches", html.len(), matches.len());
        Ok(matches)
    }

    /// Never fails: any error is logged and reported as an empty list.
    pub async fn fetch_live_matches(&self) -> Vec<LiveMatch> {
        match self.try_fetch_live_matches().await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("live matches fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn try_fetch_upcoming_matches(&self) -> Result<Vec<UpcomingMatch>, ScrapeError> {
        // Jeden Chrome na permit; Semaphore se nikdy nezavírá.
        let permit = Arc::clone(&self.browser_slots)
            .acquire_owned()
            .await
            .map_err(|e| ScrapeError::Browser(anyhow::Error::new(e)))?;

        let request = PageRequest {
            url: self.config.upcoming_url.clone(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            ready_selector: SCHEDULE_READY_SELECTOR.to_string(),
            script: EXTRACT_UPCOMING_SCRIPT.to_string(),
            timeout: self.config.browser_timeout,
        };

        let browser = Arc::clone(&self.browser);
        // Permit patří Chrome jobu, ne future: zrušený request slot neuvolní, dokud Chrome běží.
        let raw = task::spawn_blocking(move || {
            let _permit = permit;
            browser.render_and_evaluate(&request)
        })
        .await?
        .map_err(ScrapeError::Browser)?;

        let payload = SchedulePayload::from_json(&raw)?;
        let extracted = payload.into_matches(&self.config.site_origin)?;
        let total = extracted.len();
        let matches = dedupe_by_link(extracted);

        info!("schedule page: {} rows, {} unique links", total, matches.len());
        Ok(matches)
    }

    /// Never fails: any error is logged and reported as an empty list.
    pub async fn fetch_upcoming_matches(&self) -> Vec<UpcomingMatch> {
        match self.try_fetch_upcoming_matches().await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("upcoming matches fetch failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// Routes this thread's tracing output into a buffer until the guard drops.
    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    struct CannedBrowser {
        reply: Result<String, String>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl CannedBrowser {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl BrowserAutomation for CannedBrowser {
        fn render_and_evaluate(&self, request: &PageRequest) -> anyhow::Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    const THREE_ROWS: &str = r#"{"version":1,"rows":[
        {"series":"Ashes","title":"1st Test","href":"/m/1","date":"Nov 21","venue":"Perth","teams":"AUS vs ENG"},
        {"series":"Ashes","title":"2nd Test","href":"/m/2","date":"Dec 4","venue":"Brisbane","teams":"AUS vs ENG"},
        {"series":"Ashes","title":"1st Test (rescheduled)","href":"/m/1","date":"Nov 22","venue":"Perth","teams":"AUS vs ENG"}
    ]}"#;

    #[tokio::test]
    async fn upcoming_fetch_dedupes_and_uses_chrome_identity() {
        let browser = CannedBrowser::new(Ok(THREE_ROWS));
        let scraper = CricketScraper::with_browser(ScraperConfig::default(), browser.clone()).unwrap();

        let matches = scraper.try_fetch_upcoming_matches().await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].title, "1st Test (rescheduled)");
        assert_eq!(matches[0].link, "https://www.cricbuzz.com/m/1");
        assert_eq!(matches[1].title, "2nd Test");

        let requests = browser.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_agent, BROWSER_USER_AGENT);
        assert_eq!(requests[0].ready_selector, SCHEDULE_READY_SELECTOR);
        assert_eq!(requests[0].url, ScraperConfig::default().upcoming_url);
    }

    #[tokio::test]
    async fn upcoming_fetch_is_idempotent() {
        let scraper =
            CricketScraper::with_browser(ScraperConfig::default(), CannedBrowser::new(Ok(THREE_ROWS))).unwrap();

        let first = scraper.try_fetch_upcoming_matches().await.unwrap();
        let second = scraper.try_fetch_upcoming_matches().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn browser_failure_is_typed_and_masked() {
        let scraper = CricketScraper::with_browser(
            ScraperConfig::default(),
            CannedBrowser::new(Err("wait_for_element timed out")),
        )
        .unwrap();

        let err = scraper.try_fetch_upcoming_matches().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Browser(_)));
        assert!(err.to_string().contains("wait_for_element timed out"));

        let (logs, _guard) = capture_logs();
        assert!(scraper.fetch_upcoming_matches().await.is_empty());
        let logs = logs.contents();
        assert!(logs.contains("upcoming matches fetch failed"), "{logs}");
        assert!(logs.contains("wait_for_element timed out"), "{logs}");
    }

    /// Sleeps like a slow page load and records how many jobs overlap.
    #[derive(Default)]
    struct SlowBrowser {
        running: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl BrowserAutomation for SlowBrowser {
        fn render_and_evaluate(&self, _request: &PageRequest) -> anyhow::Result<String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(600));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(THREE_ROWS.to_string())
        }
    }

    #[tokio::test]
    async fn cancelled_requests_keep_browser_slot_until_chrome_exits() {
        let browser = Arc::new(SlowBrowser::default());
        let config = ScraperConfig {
            max_concurrent_browsers: 1,
            ..ScraperConfig::default()
        };
        let scraper = CricketScraper::with_browser(config, browser.clone()).unwrap();

        // Klient odpadne dřív, než Chrome doběhne.
        for _ in 0..3 {
            let cancelled =
                tokio::time::timeout(Duration::from_millis(50), scraper.try_fetch_upcoming_matches()).await;
            assert!(cancelled.is_err());
        }

        let matches = scraper.try_fetch_upcoming_matches().await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(browser.peak.load(Ordering::SeqCst), 1);
        assert_eq!(browser.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn live_transport_failure_is_masked() {
        // Port 9 (discard) na loopbacku nikdo neposlouchá.
        let config = ScraperConfig {
            live_url: "http://127.0.0.1:9/live-scores".to_string(),
            request_timeout: Duration::from_secs(2),
            ..ScraperConfig::default()
        };
        let scraper = CricketScraper::with_browser(config, CannedBrowser::new(Ok(THREE_ROWS))).unwrap();

        assert!(matches!(
            scraper.try_fetch_live_matches().await,
            Err(ScrapeError::Transport(_))
        ));

        let (logs, _guard) = capture_logs();
        assert!(scraper.fetch_live_matches().await.is_empty());
        let logs = logs.contents();
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("live matches fetch failed: request failed"), "{logs}");
    }

    #[test]
    fn serializes_upcoming_title_as_match() {
        let m = UpcomingMatch {
            series: "Ashes".to_string(),
            title: "1st Test".to_string(),
            date: "Nov 21".to_string(),
            venue: "Perth".to_string(),
            teams: "AUS vs ENG".to_string(),
            link: "#".to_string(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["match"], "1st Test");
        assert!(json.get("title").is_none());
    }
}
