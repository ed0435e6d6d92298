//! CricBuddy — republishes cricbuzz live scores and the upcoming schedule as JSON.
//!
//!   GET /                  welcome text
//!   GET /live-matches      [LiveMatch]
//!   GET /upcoming-matches  [UpcomingMatch]

pub mod config;
pub mod routes;

pub use config::AppConfig;
pub use routes::{build_router, AppState};
