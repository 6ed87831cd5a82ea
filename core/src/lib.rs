//! Issuer-level disclosure-risk scoring over SEC filing anomaly alerts.
//!
//! Alert events (late filings, Friday-evening filings, 8-K spikes) are
//! decayed by age, saturated per anomaly type, blended per lookback window,
//! blended again across windows, and ranked with dense tie-sharing ranks.

pub mod anomaly;
pub mod combine;
pub mod config;
pub mod decay;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod features;
pub mod ranking;
pub mod store;
pub mod types;

pub use engine::{run_risk_scoring, RunSummary, ScoringEngine};
pub use error::{ScoreError, ScoreResult};
