//! Live scores page parsing.
//!
//! Struktura cricbuzz live-scores:
//! <div class="cb-mtch-lst cb-col cb-col-100 cb-tms-itm">
//!   <h3 class="cb-lv-scr-mtch-hdr">India vs Australia, 3rd ODI</h3>
//!   <div class="cb-scr-wll-chvrn">IND 245/4 AUS 198/10</div>
//!   <div class="cb-text-complete">India won by 47 runs</div>
//! </div>

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::LiveMatch;

pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_STATUS: &str = "Upcoming";

static MATCH_BLOCK: Lazy<Selector> = Lazy::new(|| selector("div[class*='cb-mtch-lst']"));
static MATCH_HEADER: Lazy<Selector> = Lazy::new(|| selector("h3.cb-lv-scr-mtch-hdr"));
static SCORE_LINE: Lazy<Selector> = Lazy::new(|| selector(".cb-scr-wll-chvrn"));
static STATUS_COMPLETE: Lazy<Selector> = Lazy::new(|| selector(".cb-text-complete"));
static STATUS_LIVE: Lazy<Selector> = Lazy::new(|| selector(".cb-text-live"));
static STATUS_PREVIEW: Lazy<Selector> = Lazy::new(|| selector(".cb-text-preview"));

/// Team code glued to its score ("AUS198/10") or a bare code ("AUS").
static SEGMENT_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]+(\d|$)").expect("valid regex"));
static TEAM_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]+").expect("valid regex"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

/// Scores split out of the combined "IND 245/4 AUS 198/10" line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreLine {
    pub team1: String,
    pub score1: String,
    pub team2: String,
    pub score2: String,
}

/// One record per match block with a non-empty header, in document order.
pub fn parse_live_matches(html: &str) -> Vec<LiveMatch> {
    let document = Html::parse_document(html);

    document
        .select(&MATCH_BLOCK)
        .filter_map(|block| {
            let title = text_of(block, &MATCH_HEADER);
            if title.is_empty() {
                return None;
            }

            let ScoreLine { team1, score1, team2, score2 } = split_score_line(&text_of(block, &SCORE_LINE));
            let status = resolve_status(
                &text_of(block, &STATUS_COMPLETE),
                &text_of(block, &STATUS_LIVE),
                &text_of(block, &STATUS_PREVIEW),
            );

            Some(LiveMatch { title, team1, score1, team2, score2, status })
        })
        .collect()
}

/// Completed beats live, live beats preview; nothing at all means the match has not started.
pub fn resolve_status(complete: &str, live: &str, preview: &str) -> String {
    [complete, live, preview]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STATUS)
        .to_string()
}

pub fn split_score_line(line: &str) -> ScoreLine {
    let segments = score_segments(line);
    let (team1, score1) = split_segment(segments.first().map(String::as_str));
    let (team2, score2) = split_segment(segments.get(1).map(String::as_str));

    ScoreLine { team1, score1, team2, score2 }
}

/// A new segment starts before every token that opens with a team code followed by a digit,
/// either in the same token or in the next one.
fn score_segments(line: &str) -> Vec<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut segments: Vec<Vec<&str>> = Vec::new();

    for (i, &token) in tokens.iter().enumerate() {
        let starts_segment = segments.is_empty() || is_team_token(token, tokens.get(i + 1).copied());

        match segments.last_mut() {
            Some(current) if !starts_segment => current.push(token),
            _ => segments.push(vec![token]),
        }
    }

    segments.into_iter().map(|s| s.join(" ")).collect()
}

fn is_team_token(token: &str, next: Option<&str>) -> bool {
    let Some(caps) = SEGMENT_START.captures(token) else {
        return false;
    };
    // "AUS198/10" nese skóre přímo, holé "AUS" musí mít číslo v dalším tokenu
    caps.get(1).is_some_and(|m| !m.as_str().is_empty())
        || next.is_some_and(|n| n.starts_with(|c: char| c.is_ascii_digit()))
}

fn split_segment(segment: Option<&str>) -> (String, String) {
    let Some(segment) = segment else {
        return (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string());
    };

    let code = TEAM_CODE.find(segment).map(|m| m.as_str()).unwrap_or("");
    let score = segment[code.len()..].trim();

    (or_not_available(code), or_not_available(score))
}

fn or_not_available(value: &str) -> String {
    if value.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

/// Text of every match of `sel` under `block`, concatenated and trimmed.
fn text_of(block: ElementRef<'_>, sel: &Selector) -> String {
    block
        .select(sel)
        .flat_map(|e| e.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Cloudflare & co. answer 200 with an interstitial instead of the listing.
/// Only challenge-specific markers count; plain reCAPTCHA script tags do not.
pub fn looks_like_challenge_page(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("<title>just a moment")
        || lower.contains("cf-challenge")
        || lower.contains("challenge-platform")
        || lower.contains("cf-turnstile")
}
