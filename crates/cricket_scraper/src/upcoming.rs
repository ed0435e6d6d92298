//! Upcoming schedule: the data contract of the in-page extraction script and
//! everything the host does with its output.
//!
//! The script (`assets/extract_upcoming.js`) runs inside Chrome and only
//! reports what it saw; defaults and link resolution happen here, so the two
//! sides share nothing but the versioned payload shape.

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::{ScrapeError, UpcomingMatch};

pub const SCHEDULE_PAYLOAD_VERSION: u32 = 1;

/// Top-level match container; its presence means client-side rendering is done.
pub const SCHEDULE_READY_SELECTOR: &str = ".cb-col-100.cb-col";

pub const EXTRACT_UPCOMING_SCRIPT: &str = include_str!("../assets/extract_upcoming.js");

pub const UNKNOWN_SERIES: &str = "Unknown Series";
pub const UNKNOWN_MATCH: &str = "Unknown Match";
pub const DATE_NOT_AVAILABLE: &str = "Date Not Available";
pub const VENUE_NOT_AVAILABLE: &str = "Venue Not Available";
pub const TEAMS_NOT_AVAILABLE: &str = "Teams Not Available";
pub const MISSING_LINK: &str = "#";

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulePayload {
    pub version: u32,
    #[serde(default)]
    pub rows: Vec<ScheduleRow>,
}

/// One match row as seen by the page script. `None` = selector missed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleRow {
    pub series: Option<String>,
    pub title: Option<String>,
    pub href: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub teams: Option<String>,
}

impl SchedulePayload {
    pub fn from_json(raw: &str) -> Result<Self, ScrapeError> {
        let payload: SchedulePayload = serde_json::from_str(raw)?;
        if payload.version != SCHEDULE_PAYLOAD_VERSION {
            return Err(ScrapeError::PayloadVersion {
                found: payload.version,
                expected: SCHEDULE_PAYLOAD_VERSION,
            });
        }
        Ok(payload)
    }

    /// Flat list in extraction order, every field defaulted independently.
    pub fn into_matches(self, site_origin: &str) -> Result<Vec<UpcomingMatch>, ScrapeError> {
        Url::parse(site_origin).map_err(|source| ScrapeError::InvalidOrigin {
            origin: site_origin.to_string(),
            source,
        })?;

        Ok(self
            .rows
            .into_iter()
            .map(|row| UpcomingMatch {
                series: or_default(row.series, UNKNOWN_SERIES),
                title: or_default(row.title, UNKNOWN_MATCH),
                date: or_default(row.date, DATE_NOT_AVAILABLE),
                venue: or_default(row.venue, VENUE_NOT_AVAILABLE),
                teams: or_default(row.teams, TEAMS_NOT_AVAILABLE),
                link: resolve_link(site_origin, row.href.as_deref()),
            })
            .collect())
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Relative hrefs are appended to the site origin as-is (no resolution, no
/// re-encoding), absolute ones are kept; a missing href becomes `#`.
pub fn resolve_link(site_origin: &str, href: Option<&str>) -> String {
    let Some(href) = href.map(str::trim).filter(|h| !h.is_empty() && *h != MISSING_LINK) else {
        return MISSING_LINK.to_string();
    };

    if Url::parse(href).is_ok() {
        return href.to_string();
    }

    let origin = site_origin.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}

/// At most one record per link: a later duplicate replaces the payload but
/// keeps the slot of the first occurrence. All `#` links collapse into one.
pub fn dedupe_by_link(matches: Vec<UpcomingMatch>) -> Vec<UpcomingMatch> {
    let mut by_link: IndexMap<String, UpcomingMatch> = IndexMap::with_capacity(matches.len());
    for m in matches {
        by_link.insert(m.link.clone(), m);
    }
    by_link.into_values().collect()
}
