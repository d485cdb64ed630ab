/*
 *  display.rs
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

use chrono::{DateTime, Local};
use log::{error, warn};
use tokio::time::sleep;

use crate::hat::{Hat, HatError, HatFont};
use crate::report::{ReportCache, ReportKind, ReportValue};

/// Shown for any kind that has never been fetched.
const PLACEHOLDER: &str = "--";

/// Per-pixel PWM level for text; global brightness scales it at flush.
const TEXT_LEVEL: u8 = 255;

/// The three views, visited in strict order forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Clock,
    Pressure,
    Pollen,
}

impl DisplayState {
    pub fn next(self) -> Self {
        match self {
            DisplayState::Clock => DisplayState::Pressure,
            DisplayState::Pressure => DisplayState::Pollen,
            DisplayState::Pollen => DisplayState::Clock,
        }
    }
}

/// Timing knobs for the cycle, resolved from configuration.
#[derive(Debug, Clone, Copy)]
pub struct CycleSettings {
    /// How long each view stays up.
    pub dwell: Duration,
    /// Step rate when a view has to scroll.
    pub scroll_tick: Duration,
}

/// Foreground loop: render clock, cached pressure/temperature, cached
/// pollen, each for one dwell, forever. All waits are async sleeps so the
/// background refresh tasks keep their cadence.
pub struct DisplayCycle<H: Hat> {
    hat: H,
    cache: ReportCache,
    state: DisplayState,
    settings: CycleSettings,
}

/// Zero-padded 24-hour wall time, e.g. "14:07".
pub fn format_clock(now: &DateTime<Local>) -> String {
    now.format("%H:%M").to_string()
}

impl<H: Hat> DisplayCycle<H> {
    pub fn new(hat: H, cache: ReportCache, settings: CycleSettings) -> Self {
        DisplayCycle {
            hat,
            cache,
            state: DisplayState::Clock,
            settings,
        }
    }

    /// Runs until the process exits. A render failure is logged and the
    /// cycle moves on; one bad I2C transfer must not kill the display.
    pub async fn run(mut self) {
        loop {
            if let Err(e) = self.step().await {
                error!("display render failed: {e}");
            }
        }
    }

    /// Render the current view (including its dwell), then advance.
    async fn step(&mut self) -> Result<(), HatError> {
        match self.state {
            DisplayState::Clock => self.render_clock().await?,
            DisplayState::Pressure => self.render_pressure().await?,
            DisplayState::Pollen => self.render_pollen().await?,
        }
        self.state = self.state.next();
        Ok(())
    }

    async fn render_clock(&mut self) -> Result<(), HatError> {
        let text = format_clock(&Local::now());
        self.hat.clear();
        self.hat.write_string(&text, 0, HatFont::Clock, TEXT_LEVEL);
        self.hat.show()?;
        sleep(self.settings.dwell).await;
        Ok(())
    }

    // Pressure, then temperature as a second sub-frame.
    async fn render_pressure(&mut self) -> Result<(), HatError> {
        let pressure = self.report_text(ReportKind::Pressure, 0);
        self.render_fixed(&pressure).await?;

        let temperature = self.report_text(ReportKind::Temperature, 1);
        self.render_fixed(&temperature).await
    }

    async fn render_pollen(&mut self) -> Result<(), HatError> {
        let text = match self.cache.get(ReportKind::Pollen) {
            Some(ReportValue::Text(s)) => s,
            Some(ReportValue::Number(v)) => v.to_string(),
            None => PLACEHOLDER.to_string(),
        };
        // scroll padding is presentation, so it is applied here and not by
        // the pollen fetcher
        let padded = format!(" {text} ");

        self.hat.clear();
        let width = self.hat.write_string(&padded, 0, HatFont::Text, TEXT_LEVEL);
        self.hat.show()?;

        if width > self.hat.width() {
            for offset in 1..=(width - self.hat.width()) as i32 {
                sleep(self.settings.scroll_tick).await;
                self.hat.scroll_to(offset);
                self.hat.show()?;
            }
        } else {
            sleep(self.settings.dwell).await;
        }
        Ok(())
    }

    // This view never scrolls; an overflow is rendered clipped.
    async fn render_fixed(&mut self, text: &str) -> Result<(), HatError> {
        self.hat.clear();
        let width = self.hat.write_string(text, 0, HatFont::Text, TEXT_LEVEL);
        if width > self.hat.width() {
            warn!(
                "'{text}' is {width}px, wider than the {}px matrix; clipped",
                self.hat.width()
            );
        }
        self.hat.show()?;
        sleep(self.settings.dwell).await;
        Ok(())
    }

    fn report_text(&self, kind: ReportKind, decimals: usize) -> String {
        match self.cache.get(kind) {
            Some(ReportValue::Number(v)) => format!("{v:.decimals$}"),
            Some(ReportValue::Text(s)) => s,
            None => PLACEHOLDER.to_string(),
        }
    }
}
