/*
 *  pollen.rs
 *
 *  DataBot - atmospheric data on a Pimoroni ScrollBot
 *	(c) 2020-26 Stuart Hunter
 *
 *	TODO:
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use std::fmt;
use std::time::Duration;

use log::{error, info};
use reqwest::{Client, header};
use scraper::{Html, Selector};

use crate::config::PollenSettings;
use crate::fetch::{FailurePolicy, FetchError, FetchOutcome};
use crate::report::ReportCache;

/// Marker written to the pollen entry when a scrape fails under `ShowError`.
/// Distinct from every real category literal.
pub const POLLEN_ERROR: &str = "POLLEN ERROR";

const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

/// Pollen level as published on the Met Office forecast page. The page emits
/// a one- or two-letter code per region; anything unrecognized is carried
/// through verbatim rather than guessed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollenCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
    NoPollen,
    Other(String),
}

impl PollenCategory {
    /// Exact-match lookup on the scraped token.
    pub fn from_code(code: &str) -> Self {
        match code {
            "L" => PollenCategory::Low,
            "M" => PollenCategory::Moderate,
            "H" => PollenCategory::High,
            "VH" => PollenCategory::VeryHigh,
            "None" => PollenCategory::NoPollen,
            other => PollenCategory::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PollenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollenCategory::Low => write!(f, "LOW"),
            PollenCategory::Moderate => write!(f, "MODERATE"),
            PollenCategory::High => write!(f, "HIGH"),
            PollenCategory::VeryHigh => write!(f, "VERY HIGH"),
            PollenCategory::NoPollen => write!(f, "NO POLLEN"),
            PollenCategory::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Scrapes the Met Office pollen-forecast page for one region and writes the
/// category text into the report cache. Like the weather fetcher it never
/// raises; unlike it, the default failure policy here is `ShowError`, so a
/// broken scrape is visible on the display instead of silently stale.
#[derive(Debug)]
pub struct PollenFetcher {
    client: Client,
    url: String,
    region: String,
    policy: FailurePolicy,
    cache: ReportCache,
}

impl PollenFetcher {
    pub fn new(settings: &PollenSettings, cache: ReportCache) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        Ok(PollenFetcher {
            client,
            url: settings.url.clone(),
            region: settings.region.clone(),
            policy: settings.on_failure,
            cache,
        })
    }

    /// One refresh attempt. Display padding is NOT applied here; the display
    /// cycle owns presentation.
    pub async fn refresh(&self) -> FetchOutcome {
        match self.fetch_category().await {
            Ok(category) => {
                info!("pollen ({}): {}", self.region, category);
                self.cache.set_pollen(category.to_string());
                FetchOutcome::Updated
            }
            Err(e) => {
                error!("pollen scrape failed: {e}");
                match self.policy {
                    FailurePolicy::ShowError => self.cache.set_pollen(POLLEN_ERROR),
                    FailurePolicy::HoldLast => {}
                }
                FetchOutcome::Failed
            }
        }
    }

    async fn fetch_category(&self) -> Result<PollenCategory, FetchError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        // Parsing stays in a sync helper; scraper's DOM is not Send and must
        // not be held across an await.
        let code = extract_code(&body, &self.region)?;
        Ok(PollenCategory::from_code(&code))
    }
}

/// Pull the category token out of the forecast page. The page carries one
/// table per region, keyed by a region id element ("ne" is north-east
/// England); the first table cell's span holds today's code.
fn extract_code(html: &str, region: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);

    let selector = Selector::parse(&format!("#{region} table tbody tr td div span"))
        .map_err(|e| FetchError::Parse(format!("bad pollen selector: {e:?}")))?;

    let element = document.select(&selector).next().ok_or_else(|| {
        FetchError::SelectorMiss(format!("no pollen cell for region '{region}'"))
    })?;

    let code = element.text().collect::<String>().trim().to_string();
    if code.is_empty() {
        return Err(FetchError::SelectorMiss(format!(
            "empty pollen cell for region '{region}'"
        )));
    }
    Ok(code)
}
