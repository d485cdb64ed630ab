use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type shared by both fetchers. Everything here is an external-I/O
/// failure; none of it ever reaches the refresh scheduler.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("selector miss: {0}")]
    SelectorMiss(String),
}

/// What a refresh attempt did to the cache. Fetchers report this instead of
/// raising, so the polling cadence is independent of fetch health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Updated,
    Failed,
}

/// What a fetcher does to its cache entries when a fetch fails.
///
/// `HoldLast` keeps the previous values (staleness is invisible to the
/// display); `ShowError` replaces them with a visible error marker. The
/// weather fetcher defaults to `HoldLast`, the pollen fetcher to `ShowError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    HoldLast,
    ShowError,
}
