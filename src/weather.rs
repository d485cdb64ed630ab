/*
 *  weather.rs
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
use std::time::Duration;

use log::{error, info};
use reqwest::{Client, header};
use serde::Deserialize;

use crate::config::WeatherSettings;
use crate::fetch::{FailurePolicy, FetchError, FetchOutcome};
use crate::report::{ReportCache, WeatherReport};

/// Marker written to the weather entries under the `ShowError` policy.
/// Distinct from any value OpenWeatherMap can return.
pub const WEATHER_ERROR: &str = "WX ERROR";

const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// Current-weather shape from api.openweathermap.org/data/2.5/weather.
// Only the "main" block is of interest; a response without it is a parse
// failure, never a partial cache update.
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    pressure: f64,
    humidity: i64,
}

/// Polls OpenWeatherMap for one preconfigured city id and writes the result
/// into the report cache. Never raises: failures are logged, the configured
/// failure policy is applied, and the outcome is returned for observability.
#[derive(Debug)]
pub struct WeatherFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    city_id: u32,
    policy: FailurePolicy,
    cache: ReportCache,
}

impl WeatherFetcher {
    pub fn new(settings: &WeatherSettings, cache: ReportCache) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));

        // Bounded timeouts so a wedged request cannot stall this kind's
        // refresh cadence indefinitely.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        Ok(WeatherFetcher {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            city_id: settings.city_id,
            policy: settings.on_failure,
            cache,
        })
    }

    /// One refresh attempt. On success pressure, temperature and humidity
    /// land in the cache together; on failure the cache is left alone
    /// (`HoldLast`) or marked (`ShowError`), never partially written.
    pub async fn refresh(&self) -> FetchOutcome {
        match self.fetch_current().await {
            Ok(report) => {
                info!(
                    "weather: {:.0} hPa, {:.1} C, {}% humidity",
                    report.pressure_hpa, report.temperature_c, report.humidity_pct
                );
                self.cache.set_weather(report);
                FetchOutcome::Updated
            }
            Err(e) => {
                error!("weather fetch failed: {e}");
                if self.policy == FailurePolicy::ShowError {
                    self.cache.set_weather_error(WEATHER_ERROR);
                }
                FetchOutcome::Failed
            }
        }
    }

    async fn fetch_current(&self) -> Result<WeatherReport, FetchError> {
        let params = [
            ("id", self.city_id.to_string()),
            ("units", "metric".to_string()),
            ("appid", self.api_key.clone()),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_report(&body)
    }
}

fn parse_report(body: &str) -> Result<WeatherReport, FetchError> {
    let parsed: CurrentWeather =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(WeatherReport {
        pressure_hpa: parsed.main.pressure,
        temperature_c: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportKind, ReportValue};

    const SAMPLE: &str = r#"{
        "coord": {"lon": -1.4471, "lat": 55.0397},
        "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds"}],
        "main": {
            "temp": 18.2,
            "feels_like": 17.9,
            "temp_min": 17.1,
            "temp_max": 19.0,
            "pressure": 1013,
            "humidity": 71
        },
        "id": 2634032,
        "name": "Whitley Bay"
    }"#;

    #[test]
    fn parses_current_weather() {
        let report = parse_report(SAMPLE).unwrap();
        assert_eq!(report.pressure_hpa, 1013.0);
        assert_eq!(report.temperature_c, 18.2);
        assert_eq!(report.humidity_pct, 71);
    }

    #[test]
    fn missing_main_block_is_a_parse_failure() {
        let err = parse_report(r#"{"cod": 401, "message": "Invalid API key"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn missing_field_is_a_parse_failure() {
        let err = parse_report(r#"{"main": {"temp": 18.2, "humidity": 71}}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn garbage_body_is_a_parse_failure() {
        assert!(matches!(
            parse_report("<html>rate limited</html>").unwrap_err(),
            FetchError::Parse(_)
        ));
    }

    fn unroutable_settings(policy: FailurePolicy) -> crate::config::WeatherSettings {
        crate::config::WeatherSettings {
            // nothing listens on the discard port, so the fetch fails fast
            base_url: "http://127.0.0.1:9/weather".to_string(),
            api_key: "test-key".to_string(),
            city_id: 2634032,
            latitude: 55.03973,
            longitude: -1.44713,
            interval_secs: 600,
            on_failure: policy,
        }
    }

    // The stale-on-failure scenario: a good fetch fills the cache, a failed
    // one leaves every entry exactly as it was.
    #[tokio::test]
    async fn failed_fetch_holds_last_values() {
        let cache = ReportCache::new();
        cache.set_weather(parse_report(SAMPLE).unwrap());

        let fetcher =
            WeatherFetcher::new(&unroutable_settings(FailurePolicy::HoldLast), cache.clone())
                .unwrap();
        assert_eq!(fetcher.refresh().await, FetchOutcome::Failed);

        assert_eq!(cache.get(ReportKind::Pressure), Some(ReportValue::Number(1013.0)));
        assert_eq!(cache.get(ReportKind::Temperature), Some(ReportValue::Number(18.2)));
    }

    #[tokio::test]
    async fn failed_fetch_can_mark_instead_of_holding() {
        let cache = ReportCache::new();
        cache.set_weather(parse_report(SAMPLE).unwrap());

        let fetcher =
            WeatherFetcher::new(&unroutable_settings(FailurePolicy::ShowError), cache.clone())
                .unwrap();
        assert_eq!(fetcher.refresh().await, FetchOutcome::Failed);

        assert_eq!(
            cache.get(ReportKind::Pressure),
            Some(ReportValue::Text(WEATHER_ERROR.to_string()))
        );
        assert_eq!(
            cache.get(ReportKind::Temperature),
            Some(ReportValue::Text(WEATHER_ERROR.to_string()))
        );
    }
}
