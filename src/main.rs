/*
 *  main.rs
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
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use env_logger::Env;
use linux_embedded_hal::I2cdev;
use log::{error, info};
use tokio::signal::unix::{SignalKind, signal};

mod clock_font;
mod config;
mod display;
mod fetch;
mod hat;
mod pollen;
mod refresh;
mod report;
mod weather;

use display::{CycleSettings, DisplayCycle};
use hat::Hat;
use hat::scrollphat::ScrollPhatHd;
use pollen::PollenFetcher;
use refresh::Refresher;
use report::ReportCache;
use weather::WeatherFetcher;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP so the refresh tasks can be stopped
/// before exit.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::load()?;

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!(
        "DataBot v{} built {}",
        env!("CARGO_PKG_VERSION"),
        BUILD_DATE
    );

    let i2c = I2cdev::new(&settings.i2c_bus)
        .with_context(|| format!("opening I2C bus {}", settings.i2c_bus))?;
    let mut hat = ScrollPhatHd::new(i2c).context("initializing Scroll pHAT HD")?;
    hat.set_rotation(settings.display.rotate_deg)?;
    hat.set_brightness(settings.display.brightness);

    let cache = ReportCache::new();

    let weather = Arc::new(WeatherFetcher::new(&settings.weather, cache.clone())?);
    let pollen = Arc::new(PollenFetcher::new(&settings.pollen, cache.clone())?);

    let mut weather_poll = Refresher::spawn(
        "weather",
        Duration::from_secs(settings.weather.interval_secs),
        {
            let fetcher = Arc::clone(&weather);
            move || {
                let fetcher = Arc::clone(&fetcher);
                async move { fetcher.refresh().await }
            }
        },
    );
    let mut pollen_poll = Refresher::spawn(
        "pollen",
        Duration::from_secs(settings.pollen.interval_secs),
        {
            let fetcher = Arc::clone(&pollen);
            move || {
                let fetcher = Arc::clone(&fetcher);
                async move { fetcher.refresh().await }
            }
        },
    );

    let cycle = DisplayCycle::new(
        hat,
        cache.clone(),
        CycleSettings {
            dwell: Duration::from_secs(settings.display.dwell_secs),
            scroll_tick: Duration::from_millis(settings.display.scroll_tick_ms),
        },
    );

    // the display cycle runs forever; a signal is the only way out
    tokio::select! {
        _ = cycle.run() => {}
        result = signal_handler() => {
            if let Err(e) = result {
                error!("signal handler failed: {e}");
            }
        }
    }

    weather_poll.stop().await;
    pollen_poll.stop().await;
    info!("DataBot shut down cleanly");
    Ok(())
}
