/*
 *  report.rs
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
use std::sync::{Arc, RwLock};

/// The data kinds the display knows how to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Pressure,
    Temperature,
    #[allow(dead_code)]
    Humidity,
    Pollen,
}

/// Last-known value for one data kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportValue {
    Number(f64),
    Text(String),
}

/// One complete current-weather observation. All fields land in the cache
/// together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeatherReport {
    pub pressure_hpa: f64,
    pub temperature_c: f64,
    pub humidity_pct: i64,
}

#[derive(Debug)]
enum WeatherSlot {
    Report(WeatherReport),
    Error(String),
}

#[derive(Debug, Default)]
struct Inner {
    weather: Option<WeatherSlot>,
    pollen: Option<String>,
}

/// Latest-known-value store, written by the fetchers and read by the display
/// cycle. Cloning the handle is cheap; all clones share the same store.
///
/// The whole weather observation lives under one lock so a reader can never
/// see pressure from one fetch and temperature from another. No freshness
/// timestamp is kept: a failed fetch under `HoldLast` silently keeps the old
/// values.
#[derive(Debug, Clone, Default)]
pub struct ReportCache {
    inner: Arc<RwLock<Inner>>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value for `kind`, or `None` if nothing has been cached yet.
    pub fn get(&self, kind: ReportKind) -> Option<ReportValue> {
        let inner = self.inner.read().unwrap();
        match kind {
            ReportKind::Pressure => match inner.weather.as_ref()? {
                WeatherSlot::Report(r) => Some(ReportValue::Number(r.pressure_hpa)),
                WeatherSlot::Error(marker) => Some(ReportValue::Text(marker.clone())),
            },
            ReportKind::Temperature => match inner.weather.as_ref()? {
                WeatherSlot::Report(r) => Some(ReportValue::Number(r.temperature_c)),
                WeatherSlot::Error(marker) => Some(ReportValue::Text(marker.clone())),
            },
            ReportKind::Humidity => match inner.weather.as_ref()? {
                WeatherSlot::Report(r) => Some(ReportValue::Number(r.humidity_pct as f64)),
                WeatherSlot::Error(marker) => Some(ReportValue::Text(marker.clone())),
            },
            ReportKind::Pollen => inner.pollen.clone().map(ReportValue::Text),
        }
    }

    /// Replace the weather observation. Atomic with respect to readers.
    pub fn set_weather(&self, report: WeatherReport) {
        let mut inner = self.inner.write().unwrap();
        inner.weather = Some(WeatherSlot::Report(report));
    }

    /// Replace every weather entry with a visible error marker. Used by the
    /// `ShowError` failure policy; still one atomic write.
    pub fn set_weather_error(&self, marker: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.weather = Some(WeatherSlot::Error(marker.to_string()));
    }

    pub fn set_pollen(&self, text: impl Into<String>) {
        let mut inner = self.inner.write().unwrap();
        inner.pollen = Some(text.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let cache = ReportCache::new();
        assert_eq!(cache.get(ReportKind::Pressure), None);
        assert_eq!(cache.get(ReportKind::Temperature), None);
        assert_eq!(cache.get(ReportKind::Humidity), None);
        assert_eq!(cache.get(ReportKind::Pollen), None);
    }

    #[test]
    fn weather_fields_update_together() {
        let cache = ReportCache::new();
        cache.set_weather(WeatherReport {
            pressure_hpa: 1013.0,
            temperature_c: 18.2,
            humidity_pct: 71,
        });

        assert_eq!(cache.get(ReportKind::Pressure), Some(ReportValue::Number(1013.0)));
        assert_eq!(cache.get(ReportKind::Temperature), Some(ReportValue::Number(18.2)));
        assert_eq!(cache.get(ReportKind::Humidity), Some(ReportValue::Number(71.0)));
    }

    #[test]
    fn weather_error_marker_covers_all_weather_kinds() {
        let cache = ReportCache::new();
        cache.set_weather_error("WX ERROR");

        for kind in [ReportKind::Pressure, ReportKind::Temperature, ReportKind::Humidity] {
            assert_eq!(cache.get(kind), Some(ReportValue::Text("WX ERROR".to_string())));
        }
        assert_eq!(cache.get(ReportKind::Pollen), None);
    }

    #[test]
    fn pollen_is_independent_of_weather() {
        let cache = ReportCache::new();
        cache.set_pollen("VERY HIGH");
        assert_eq!(
            cache.get(ReportKind::Pollen),
            Some(ReportValue::Text("VERY HIGH".to_string()))
        );
        assert_eq!(cache.get(ReportKind::Pressure), None);
    }

    #[test]
    fn clones_share_the_store() {
        let cache = ReportCache::new();
        let reader = cache.clone();
        cache.set_pollen("LOW");
        assert_eq!(reader.get(ReportKind::Pollen), Some(ReportValue::Text("LOW".to_string())));
    }
}
